use std::net::SocketAddr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Single configuration entry point for the storefront backend.
///
/// Every credential comes from the environment; none of the defaults are
/// suitable for production use.
#[derive(Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    /// Public origin of the storefront, e.g. `https://www.example-cars.co.th`.
    pub site_url: String,
    pub shopify_store_domain: String,
    pub shopify_storefront_token: String,
    pub shopify_api_version: String,
    pub shopify_webhook_secret: Option<String>,
    pub admin_token: Option<String>,
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
    pub revalidate_secret: Option<String>,
    pub recaptcha_secret: Option<String>,
    pub indexnow_key: Option<String>,
    pub indexnow_endpoint: String,
    pub kv_rest_api_url: Option<String>,
    pub kv_rest_api_token: Option<String>,
    pub request_timeout_secs: u64,
    pub max_retries: u32,
    pub retry_backoff_base_secs: u64,
    pub cache_ttl_secs: u64,
}

impl AppConfig {
    #[must_use]
    pub fn is_production(&self) -> bool {
        self.env == Environment::Production
    }
}

fn redact(value: Option<&String>) -> Option<&'static str> {
    value.map(|_| "[redacted]")
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("site_url", &self.site_url)
            .field("shopify_store_domain", &self.shopify_store_domain)
            .field("shopify_storefront_token", &"[redacted]")
            .field("shopify_api_version", &self.shopify_api_version)
            .field(
                "shopify_webhook_secret",
                &redact(self.shopify_webhook_secret.as_ref()),
            )
            .field("admin_token", &redact(self.admin_token.as_ref()))
            .field("admin_username", &self.admin_username)
            .field("admin_password", &redact(self.admin_password.as_ref()))
            .field("revalidate_secret", &redact(self.revalidate_secret.as_ref()))
            .field("recaptcha_secret", &redact(self.recaptcha_secret.as_ref()))
            .field("indexnow_key", &self.indexnow_key)
            .field("indexnow_endpoint", &self.indexnow_endpoint)
            .field("kv_rest_api_url", &self.kv_rest_api_url)
            .field("kv_rest_api_token", &redact(self.kv_rest_api_token.as_ref()))
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_base_secs", &self.retry_backoff_base_secs)
            .field("cache_ttl_secs", &self.cache_ttl_secs)
            .finish()
    }
}
