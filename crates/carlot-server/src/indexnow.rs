//! IndexNow URL submission.

use std::time::Duration;

use serde::Serialize;

/// Largest `urlList` the IndexNow API accepts in one request.
pub const MAX_URLS_PER_BATCH: usize = 10_000;

#[derive(Debug, thiserror::Error)]
pub enum IndexNowError {
    #[error("IndexNow request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IndexNow rejected batch {batch} with HTTP {status}")]
    Rejected { batch: usize, status: u16 },

    #[error("site URL {0:?} has no host")]
    InvalidSiteUrl(String),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SubmitBody<'a> {
    host: &'a str,
    key: &'a str,
    key_location: &'a str,
    url_list: &'a [String],
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmitReport {
    pub submitted: usize,
    pub batches: usize,
}

#[derive(Debug, Clone)]
pub struct IndexNowClient {
    client: reqwest::Client,
    endpoint: String,
    host: String,
    key: String,
    key_location: String,
}

impl IndexNowClient {
    /// Creates a client submitting URLs of `site_url` with verification key
    /// `key`, served at `{site_url}/{key}.txt`.
    ///
    /// # Errors
    ///
    /// Returns [`IndexNowError::InvalidSiteUrl`] if `site_url` has no host,
    /// or [`IndexNowError::Http`] if the HTTP client cannot be built.
    pub fn new(
        endpoint: &str,
        site_url: &str,
        key: &str,
        timeout_secs: u64,
    ) -> Result<Self, IndexNowError> {
        let host = reqwest::Url::parse(site_url)
            .ok()
            .and_then(|url| url.host_str().map(ToOwned::to_owned))
            .ok_or_else(|| IndexNowError::InvalidSiteUrl(site_url.to_owned()))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.to_owned(),
            host,
            key: key.to_owned(),
            key_location: format!("{}/{key}.txt", site_url.trim_end_matches('/')),
        })
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Submits `urls` in batches of at most [`MAX_URLS_PER_BATCH`].
    ///
    /// Stops at the first rejected batch.
    ///
    /// # Errors
    ///
    /// Returns [`IndexNowError::Rejected`] on a non-2xx response or
    /// [`IndexNowError::Http`] on network failure.
    pub async fn submit(&self, urls: &[String]) -> Result<SubmitReport, IndexNowError> {
        let mut report = SubmitReport {
            submitted: 0,
            batches: 0,
        };

        for (batch, chunk) in urls.chunks(MAX_URLS_PER_BATCH).enumerate() {
            let body = SubmitBody {
                host: &self.host,
                key: &self.key,
                key_location: &self.key_location,
                url_list: chunk,
            };
            let response = self.client.post(&self.endpoint).json(&body).send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(IndexNowError::Rejected {
                    batch,
                    status: status.as_u16(),
                });
            }

            report.submitted += chunk.len();
            report.batches += 1;
            tracing::info!(batch, urls = chunk.len(), status = status.as_u16(), "IndexNow batch accepted");
        }

        Ok(report)
    }
}
