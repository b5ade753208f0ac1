//! Retry with exponential backoff for Storefront API calls.
//!
//! Only transient failures are retried: rate limiting, network errors, and
//! upstream 5xx responses. GraphQL errors, 4xx responses, and malformed
//! bodies return immediately.

use std::future::Future;
use std::time::Duration;

use crate::error::ShopifyError;

fn is_retriable(err: &ShopifyError) -> bool {
    match err {
        ShopifyError::RateLimited { .. } | ShopifyError::Http(_) => true,
        ShopifyError::UnexpectedStatus { status, .. } => *status >= 500,
        _ => false,
    }
}

/// Executes `operation`, retrying transient errors up to `max_retries`
/// additional times.
///
/// The wait before retry `n` (1-based) is `backoff_base_secs * 2^(n-1)`
/// seconds. With `max_retries = 2` the operation runs at most 3 times.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_secs: u64,
    mut operation: F,
) -> Result<T, ShopifyError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ShopifyError>>,
{
    let mut attempt = 0u32;

    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        if !is_retriable(&err) || attempt >= max_retries {
            return Err(err);
        }

        let delay_secs = backoff_base_secs.saturating_mul(1u64 << attempt.min(62));
        tracing::warn!(
            attempt,
            max_retries,
            delay_secs,
            error = %err,
            "transient Storefront API error, retrying after backoff"
        );
        tokio::time::sleep(Duration::from_secs(delay_secs)).await;
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    async fn count_calls(
        max_retries: u32,
        fail_times: u32,
        err: fn() -> ShopifyError,
    ) -> (Result<u32, ShopifyError>, u32) {
        let call_count = Arc::new(AtomicU32::new(0));
        let cc = Arc::clone(&call_count);
        let result = retry_with_backoff(max_retries, 0, || {
            let cc = Arc::clone(&cc);
            async move {
                let n = cc.fetch_add(1, Ordering::SeqCst);
                if n < fail_times {
                    Err(err())
                } else {
                    Ok(n)
                }
            }
        })
        .await;
        (result, call_count.load(Ordering::SeqCst))
    }

    fn rate_limited() -> ShopifyError {
        ShopifyError::RateLimited { retry_after_secs: 0 }
    }

    fn server_error() -> ShopifyError {
        ShopifyError::UnexpectedStatus {
            status: 502,
            operation: "AllCars".to_owned(),
        }
    }

    fn forbidden() -> ShopifyError {
        ShopifyError::UnexpectedStatus {
            status: 403,
            operation: "AllCars".to_owned(),
        }
    }

    fn graphql_error() -> ShopifyError {
        ShopifyError::GraphQl {
            operation: "CarByHandle".to_owned(),
            messages: vec!["Field 'foo' doesn't exist".to_owned()],
        }
    }

    #[tokio::test]
    async fn succeeds_immediately_on_first_try() {
        let (result, calls) = count_calls(3, 0, rate_limited).await;
        assert_eq!(result.unwrap(), 0);
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn retries_rate_limited_then_succeeds() {
        let (result, calls) = count_calls(3, 2, rate_limited).await;
        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls, 3);
    }

    #[tokio::test]
    async fn retries_server_errors() {
        let (result, calls) = count_calls(1, 1, server_error).await;
        assert!(result.is_ok());
        assert_eq!(calls, 2);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let (result, calls) = count_calls(2, 10, rate_limited).await;
        assert_eq!(calls, 3);
        assert!(matches!(result, Err(ShopifyError::RateLimited { .. })));
    }

    #[tokio::test]
    async fn does_not_retry_client_errors() {
        let (result, calls) = count_calls(3, 10, forbidden).await;
        assert_eq!(calls, 1);
        assert!(matches!(
            result,
            Err(ShopifyError::UnexpectedStatus { status: 403, .. })
        ));
    }

    #[tokio::test]
    async fn does_not_retry_graphql_errors() {
        let (result, calls) = count_calls(3, 10, graphql_error).await;
        assert_eq!(calls, 1);
        assert!(matches!(result, Err(ShopifyError::GraphQl { .. })));
    }
}
