use axum::{extract::State, Extension, Json};
use serde::Serialize;

use crate::middleware::RequestId;

use super::{ApiError, ApiResponse, AppState};

/// Variables reported by `/api/debug-env`. Only presence is ever exposed.
const REPORTED_ENV_VARS: &[&str] = &[
    "SHOPIFY_STORE_DOMAIN",
    "SHOPIFY_STOREFRONT_ACCESS_TOKEN",
    "SHOPIFY_API_VERSION",
    "SHOPIFY_WEBHOOK_SECRET",
    "CARLOT_ENV",
    "CARLOT_SITE_URL",
    "CARLOT_ADMIN_TOKEN",
    "ADMIN_USERNAME",
    "ADMIN_PASSWORD",
    "REVALIDATE_SECRET",
    "RECAPTCHA_SECRET_KEY",
    "INDEXNOW_KEY",
    "KV_REST_API_URL",
    "KV_REST_API_TOKEN",
];

#[derive(Debug, Serialize)]
pub(super) struct HealthData {
    status: &'static str,
    env: String,
    shopify: ShopifyHealth,
    status_store: &'static str,
    cached_pages: usize,
}

#[derive(Debug, Serialize)]
struct ShopifyHealth {
    store_domain: bool,
    storefront_token: bool,
    api_version: String,
}

#[derive(Debug, Serialize)]
pub(super) struct Pong {
    pong: bool,
    timestamp: i64,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub(super) struct EnvVarPresence {
    name: &'static str,
    set: bool,
}

pub(super) async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Json<ApiResponse<HealthData>> {
    let config = &state.config;
    let data = HealthData {
        status: "ok",
        env: config.env.to_string(),
        shopify: ShopifyHealth {
            store_domain: !config.shopify_store_domain.is_empty(),
            storefront_token: !config.shopify_storefront_token.is_empty(),
            api_version: config.shopify_api_version.clone(),
        },
        status_store: state.status_store.backend(),
        cached_pages: state.cache.len().await,
    };
    Json(ApiResponse::new(data, req_id.0))
}

pub(super) async fn ping() -> Json<Pong> {
    Json(Pong {
        pong: true,
        timestamp: chrono::Utc::now().timestamp_millis(),
    })
}

fn env_presence<F>(lookup: F) -> Vec<EnvVarPresence>
where
    F: Fn(&str) -> bool,
{
    REPORTED_ENV_VARS
        .iter()
        .map(|&name| EnvVarPresence {
            name,
            set: lookup(name),
        })
        .collect()
}

/// Lists which configuration variables are set. Disabled in production.
pub(super) async fn debug_env(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<Vec<EnvVarPresence>>>, ApiError> {
    if state.config.is_production() {
        return Err(ApiError::new(
            req_id.0,
            "forbidden",
            "debug endpoints are disabled in production",
        ));
    }

    let data = env_presence(|name| {
        std::env::var(name)
            .map(|v| !v.trim().is_empty())
            .unwrap_or(false)
    });
    Ok(Json(ApiResponse::new(data, req_id.0)))
}
