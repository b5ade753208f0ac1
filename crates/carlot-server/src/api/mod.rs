mod admin;
mod cars;
mod health;
mod leads;
mod revalidate;
mod seo;
mod webhooks;

use std::{sync::Arc, time::Duration};

use axum::{
    extract::rejection::JsonRejection,
    http::{header, HeaderName, HeaderValue, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use carlot_core::AppConfig;
use carlot_shopify::StorefrontClient;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};

use crate::{
    cache::ResponseCache,
    indexnow::IndexNowClient,
    middleware::{
        block_bots, cache_control, enforce_rate_limit, request_id, require_admin_token, AdminAuth,
        BotBlocker, RateLimitState,
    },
    recaptcha::{RecaptchaVerifier, SITEVERIFY_URL},
    status_store::StatusStore,
};

pub use cars::CachedPage;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub shopify: Arc<StorefrontClient>,
    pub cache: ResponseCache<CachedPage>,
    pub status_store: StatusStore,
    pub indexnow: Option<IndexNowClient>,
    pub recaptcha: Option<RecaptchaVerifier>,
}

impl AppState {
    /// Builds every shared client from the loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any HTTP client cannot be built or the Shopify
    /// store domain does not form a valid endpoint.
    pub fn from_config(config: Arc<AppConfig>) -> anyhow::Result<Self> {
        let shopify = StorefrontClient::new(
            &config.shopify_store_domain,
            &config.shopify_api_version,
            &config.shopify_storefront_token,
            config.request_timeout_secs,
            config.max_retries,
            config.retry_backoff_base_secs,
        )?;

        let indexnow = config
            .indexnow_key
            .as_deref()
            .map(|key| {
                IndexNowClient::new(
                    &config.indexnow_endpoint,
                    &config.site_url,
                    key,
                    config.request_timeout_secs,
                )
            })
            .transpose()?;

        let recaptcha = config
            .recaptcha_secret
            .as_deref()
            .map(|secret| {
                RecaptchaVerifier::new(SITEVERIFY_URL, secret, config.request_timeout_secs)
            })
            .transpose()?;

        Ok(Self {
            shopify: Arc::new(shopify),
            cache: ResponseCache::new(Duration::from_secs(config.cache_ttl_secs)),
            status_store: StatusStore::from_config(&config)?,
            indexnow,
            recaptcha,
            config,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl<T: Serialize> ApiResponse<T> {
    pub(super) fn new(data: T, request_id: String) -> Self {
        Self {
            data,
            meta: ResponseMeta::new(request_id),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }

    /// Maps a JSON body rejection to a 400 with the rejection's message.
    pub(super) fn from_json_rejection(request_id: String, rejection: &JsonRejection) -> Self {
        Self::new(request_id, "bad_request", rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "unauthorized" => StatusCode::UNAUTHORIZED,
            "forbidden" => StatusCode::FORBIDDEN,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            "upstream_error" => StatusCode::BAD_GATEWAY,
            "not_configured" => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-request-id"),
        ])
}

fn admin_router(auth: AdminAuth, rate_limit: RateLimitState) -> Router<AppState> {
    let protected = Router::new()
        .route("/api/admin/indexnow", post(admin::submit_indexnow))
        .route(
            "/api/admin/cars/{id}/status",
            get(admin::get_status)
                .put(admin::set_status)
                .delete(admin::clear_status),
        )
        .route_layer(axum::middleware::from_fn_with_state(auth, require_admin_token));

    Router::new()
        .route("/api/admin/login", post(admin::login))
        .merge(protected)
        .route_layer(axum::middleware::from_fn_with_state(
            rate_limit,
            enforce_rate_limit,
        ))
}

pub fn build_app(
    state: AppState,
    auth: AdminAuth,
    rate_limit: RateLimitState,
    bots: BotBlocker,
) -> Router {
    let mut public_routes = Router::new()
        .route("/api/health", get(health::health))
        .route("/api/ping", get(health::ping))
        .route("/api/debug-env", get(health::debug_env))
        .route("/api/cars", get(cars::list_cars))
        .route("/api/cars/homepage", get(cars::homepage_cars))
        .route("/api/cars/specs", post(cars::car_specs))
        .route("/api/cars/{handle}", get(cars::get_car))
        .route("/api/webhooks/shopify", post(webhooks::shopify_webhook))
        .route("/api/revalidate", post(revalidate::revalidate))
        .route("/api/leads", post(leads::submit_lead))
        .route("/sitemap.xml", get(seo::sitemap));

    if let Some(key) = state.config.indexnow_key.as_deref() {
        public_routes = public_routes.route(&format!("/{key}.txt"), get(seo::indexnow_key_file));
    }

    Router::new()
        .merge(public_routes)
        .merge(admin_router(auth, rate_limit))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id))
                .layer(axum::middleware::from_fn_with_state(bots, block_bots))
                .layer(axum::middleware::from_fn(cache_control))
                .layer(SetResponseHeaderLayer::if_not_present(
                    header::X_CONTENT_TYPE_OPTIONS,
                    HeaderValue::from_static("nosniff"),
                ))
                .layer(SetResponseHeaderLayer::if_not_present(
                    header::X_FRAME_OPTIONS,
                    HeaderValue::from_static("DENY"),
                ))
                .layer(SetResponseHeaderLayer::if_not_present(
                    header::REFERRER_POLICY,
                    HeaderValue::from_static("strict-origin-when-cross-origin"),
                )),
        )
        .with_state(state)
}

pub fn default_rate_limit_state() -> RateLimitState {
    RateLimitState::new(60, Duration::from_secs(60))
}
