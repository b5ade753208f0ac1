use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    Extension, Json,
};
use carlot_core::{car_path, localized_paths};
use serde::{Deserialize, Serialize};

use crate::cache::PRODUCTS_TAG;
use crate::middleware::RequestId;
use crate::signature::verify_shopify_hmac;

use super::{ApiError, AppState};

const HMAC_HEADER: &str = "x-shopify-hmac-sha256";
const TOPIC_HEADER: &str = "x-shopify-topic";
const SHOP_DOMAIN_HEADER: &str = "x-shopify-shop-domain";

const PRODUCT_DELETE_TOPIC: &str = "products/delete";

/// Fields read from a Shopify product webhook payload.
#[derive(Debug, Deserialize)]
struct ProductPayload {
    #[serde(default)]
    id: Option<serde_json::Value>,
    #[serde(default)]
    admin_graphql_api_id: Option<String>,
    #[serde(default)]
    handle: Option<String>,
}

impl ProductPayload {
    /// Product id in whichever form the payload carries it.
    fn product_id(&self) -> Option<String> {
        if let Some(gid) = self.admin_graphql_api_id.as_deref().filter(|s| !s.is_empty()) {
            return Some(gid.to_owned());
        }
        match self.id.as_ref()? {
            serde_json::Value::Number(n) => Some(n.to_string()),
            serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct WebhookSummary {
    topic: String,
    shop_domain: Option<String>,
    handle: Option<String>,
    revalidated: Vec<String>,
    tags: Vec<&'static str>,
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Paths whose cached data depends on the product. Without a handle only the
/// listings are known; the detail page is still covered by the tag.
fn affected_paths(handle: Option<&str>) -> Vec<String> {
    let mut paths = vec!["/".to_owned(), "/all-cars".to_owned()];
    paths.extend(handle.map(car_path));
    paths.iter().flat_map(|path| localized_paths(path)).collect()
}

/// Receives Shopify product webhooks and drops cached pages for the product.
///
/// The signature is checked against the raw body before anything is parsed.
/// Revalidation is best-effort: once the request is authentic and names a
/// product, the response is 200 so Shopify does not retry. Delete payloads
/// carry only the product id, so a handle is optional for that topic.
pub(super) async fn shopify_webhook(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookSummary>, ApiError> {
    let Some(secret) = state.config.shopify_webhook_secret.as_deref() else {
        tracing::warn!("webhook received but SHOPIFY_WEBHOOK_SECRET is not configured");
        return Err(ApiError::new(
            req_id.0,
            "unauthorized",
            "webhook verification is not configured",
        ));
    };

    let Some(signature) = header_str(&headers, HMAC_HEADER) else {
        return Err(ApiError::new(
            req_id.0,
            "unauthorized",
            "missing webhook signature",
        ));
    };

    if !verify_shopify_hmac(secret, &body, signature) {
        tracing::warn!("rejected webhook with invalid signature");
        return Err(ApiError::new(
            req_id.0,
            "unauthorized",
            "invalid webhook signature",
        ));
    }

    let payload: ProductPayload = serde_json::from_slice(&body).map_err(|e| {
        ApiError::new(
            req_id.0.clone(),
            "bad_request",
            format!("malformed webhook body: {e}"),
        )
    })?;

    let topic = header_str(&headers, TOPIC_HEADER)
        .unwrap_or("unknown")
        .to_owned();
    let shop_domain = header_str(&headers, SHOP_DOMAIN_HEADER).map(ToOwned::to_owned);
    let is_delete = topic == PRODUCT_DELETE_TOPIC;

    let handle = payload
        .handle
        .as_deref()
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .map(ToOwned::to_owned);
    let product_id = payload.product_id();

    if handle.is_none() {
        if !is_delete {
            return Err(ApiError::new(
                req_id.0,
                "validation_error",
                "webhook payload has no product handle",
            ));
        }
        if product_id.is_none() {
            return Err(ApiError::new(
                req_id.0,
                "validation_error",
                "webhook payload has no product id",
            ));
        }
    }

    let revalidated = affected_paths(handle.as_deref());
    for path in &revalidated {
        state.cache.invalidate_path(path).await;
    }
    let dropped = state.cache.invalidate_tag(PRODUCTS_TAG).await;

    if is_delete {
        if let Some(id) = product_id.as_deref() {
            if let Err(e) = state.status_store.clear(id).await {
                tracing::warn!(product_id = %id, error = %e, "failed to clear status override");
            }
        }
    }

    tracing::info!(
        topic = %topic,
        shop_domain = shop_domain.as_deref().unwrap_or("-"),
        handle = handle.as_deref().unwrap_or("-"),
        paths = revalidated.len(),
        dropped,
        "processed Shopify webhook"
    );

    Ok(Json(WebhookSummary {
        topic,
        shop_domain,
        handle,
        revalidated,
        tags: vec![PRODUCTS_TAG],
    }))
}
