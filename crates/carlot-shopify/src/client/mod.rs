//! GraphQL client for the Shopify Storefront API.

mod cars;

use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::error::ShopifyError;
use crate::retry::retry_with_backoff;
use crate::types::GraphQlResponse;

/// Maximum number of pages `fetch_all_cars` walks before giving up.
/// Prevents infinite loops on cycling cursors.
pub(super) const MAX_PAGES: usize = 40;

/// Largest `first:` argument the Storefront API accepts.
pub(super) const MAX_PAGE_SIZE: u32 = 250;

const ACCESS_TOKEN_HEADER: &str = "X-Shopify-Storefront-Access-Token";

/// Storefront API client.
///
/// Every request is bounded by the configured timeout. Rate limiting (429),
/// upstream 5xx, and network failures are retried with exponential backoff
/// up to `max_retries` additional attempts.
pub struct StorefrontClient {
    client: Client,
    endpoint: String,
    access_token: String,
    max_retries: u32,
    backoff_base_secs: u64,
}

impl std::fmt::Debug for StorefrontClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorefrontClient")
            .field("endpoint", &self.endpoint)
            .field("access_token", &"[redacted]")
            .field("max_retries", &self.max_retries)
            .field("backoff_base_secs", &self.backoff_base_secs)
            .finish_non_exhaustive()
    }
}

impl StorefrontClient {
    /// Creates a client for `https://{store_domain}/api/{api_version}/graphql.json`.
    ///
    /// # Errors
    ///
    /// Returns [`ShopifyError::InvalidEndpoint`] if the domain does not form a
    /// valid URL, or [`ShopifyError::Http`] if the HTTP client cannot be built.
    pub fn new(
        store_domain: &str,
        api_version: &str,
        access_token: &str,
        timeout_secs: u64,
        max_retries: u32,
        backoff_base_secs: u64,
    ) -> Result<Self, ShopifyError> {
        let endpoint = Self::endpoint_url(store_domain, api_version)?;
        Self::with_endpoint(
            &endpoint,
            access_token,
            timeout_secs,
            max_retries,
            backoff_base_secs,
        )
    }

    /// Creates a client posting to an explicit GraphQL endpoint URL.
    ///
    /// # Errors
    ///
    /// Returns [`ShopifyError::InvalidEndpoint`] if `endpoint` is not a valid
    /// URL, or [`ShopifyError::Http`] if the HTTP client cannot be built.
    pub fn with_endpoint(
        endpoint: &str,
        access_token: &str,
        timeout_secs: u64,
        max_retries: u32,
        backoff_base_secs: u64,
    ) -> Result<Self, ShopifyError> {
        reqwest::Url::parse(endpoint).map_err(|e| ShopifyError::InvalidEndpoint {
            endpoint: endpoint.to_owned(),
            reason: e.to_string(),
        })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(5))
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.to_owned(),
            access_token: access_token.to_owned(),
            max_retries,
            backoff_base_secs,
        })
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn endpoint_url(store_domain: &str, api_version: &str) -> Result<String, ShopifyError> {
        let domain = store_domain.trim().trim_end_matches('/');
        if domain.is_empty() || domain.contains('/') {
            return Err(ShopifyError::InvalidEndpoint {
                endpoint: store_domain.to_owned(),
                reason: "expected a bare store domain such as shop.myshopify.com".into(),
            });
        }

        let url = format!("https://{domain}/api/{api_version}/graphql.json");
        reqwest::Url::parse(&url)
            .map(|u| u.to_string())
            .map_err(|e| ShopifyError::InvalidEndpoint {
                endpoint: url,
                reason: e.to_string(),
            })
    }

    /// Posts `{ query, variables }` and deserializes `data` into `T`.
    ///
    /// A response carrying both `data` and `errors` is accepted: the errors
    /// are logged and the partial data returned.
    ///
    /// # Errors
    ///
    /// - [`ShopifyError::RateLimited`] on HTTP 429 after retries.
    /// - [`ShopifyError::UnexpectedStatus`] on any other non-2xx status.
    /// - [`ShopifyError::Deserialize`] when the body is not the expected JSON.
    /// - [`ShopifyError::GraphQl`] when the response has errors and no data.
    /// - [`ShopifyError::Http`] on network or timeout failure after retries.
    pub(crate) async fn execute<T: DeserializeOwned>(
        &self,
        operation: &str,
        query: &str,
        variables: Value,
    ) -> Result<T, ShopifyError> {
        let body = json!({ "query": query, "variables": variables });

        let response: GraphQlResponse<T> =
            retry_with_backoff(self.max_retries, self.backoff_base_secs, || {
                let client = &self.client;
                let endpoint = self.endpoint.as_str();
                let access_token = self.access_token.as_str();
                let body = &body;
                async move {
                    let response = client
                        .post(endpoint)
                        .header(ACCESS_TOKEN_HEADER, access_token)
                        .json(body)
                        .send()
                        .await?;
                    let status = response.status();

                    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                        let retry_after_secs = response
                            .headers()
                            .get(reqwest::header::RETRY_AFTER)
                            .and_then(|v| v.to_str().ok())
                            .and_then(|s| s.parse::<u64>().ok())
                            .unwrap_or(2);
                        return Err(ShopifyError::RateLimited { retry_after_secs });
                    }

                    if !status.is_success() {
                        return Err(ShopifyError::UnexpectedStatus {
                            status: status.as_u16(),
                            operation: operation.to_owned(),
                        });
                    }

                    let text = response.text().await?;
                    serde_json::from_str::<GraphQlResponse<T>>(&text).map_err(|e| {
                        ShopifyError::Deserialize {
                            context: format!("{operation} response"),
                            source: e,
                        }
                    })
                }
            })
            .await?;

        let messages: Vec<String> = response.errors.into_iter().map(|e| e.message).collect();
        match response.data {
            Some(data) => {
                if !messages.is_empty() {
                    tracing::warn!(
                        operation,
                        errors = %messages.join("; "),
                        "Storefront API returned partial data with errors"
                    );
                }
                Ok(data)
            }
            None if messages.is_empty() => Err(ShopifyError::GraphQl {
                operation: operation.to_owned(),
                messages: vec!["response contained no data".to_owned()],
            }),
            None => Err(ShopifyError::GraphQl {
                operation: operation.to_owned(),
                messages,
            }),
        }
    }
}

#[cfg(test)]
#[path = "../client_test.rs"]
mod tests;
