#[derive(Debug, thiserror::Error)]
pub enum OfflineError {
    #[error("network request to {url} failed: {reason}")]
    Network { url: String, reason: String },

    #[error("precache of {url} failed with HTTP {status}")]
    Precache { url: String, status: u16 },

    #[error("invalid URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("worker is {actual}, expected {expected}")]
    InvalidState {
        expected: &'static str,
        actual: &'static str,
    },
}
