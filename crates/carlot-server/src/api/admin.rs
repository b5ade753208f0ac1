use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, Path, State},
    Extension, Json,
};
use carlot_core::CarStatus;
use serde::{Deserialize, Serialize};

use crate::indexnow::SubmitReport;
use crate::middleware::RequestId;
use crate::signature::secrets_match;
use crate::status_store::StatusStoreError;

use super::{
    cars::load_all_cars,
    seo::{page_url, public_paths},
    ApiError, ApiResponse, AppState,
};

#[derive(Debug, Deserialize)]
pub(super) struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub(super) struct LoginResponse {
    token: String,
    token_type: &'static str,
}

#[derive(Debug, Deserialize)]
pub(super) struct StatusUpdate {
    pub status: CarStatus,
}

#[derive(Debug, Serialize)]
pub(super) struct StatusOverride {
    car_id: String,
    status: Option<CarStatus>,
}

#[derive(Debug, Serialize)]
pub(super) struct ClearedOverride {
    car_id: String,
    cleared: bool,
}

#[derive(Debug, Default, Deserialize)]
struct IndexNowRequest {
    #[serde(default)]
    urls: Option<Vec<String>>,
}

fn store_error(req_id: String, error: &StatusStoreError) -> ApiError {
    tracing::error!(error = %error, "status store request failed");
    ApiError::new(req_id, "internal_error", "status store unavailable")
}

/// Exchanges the admin username and password for the bearer token.
pub(super) async fn login(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<LoginResponse>>, ApiError> {
    let Json(request) =
        payload.map_err(|e| ApiError::from_json_rejection(req_id.0.clone(), &e))?;
    let config = &state.config;

    let (Some(username), Some(password)) = (
        config.admin_username.as_deref(),
        config.admin_password.as_deref(),
    ) else {
        tracing::warn!("admin login attempted but ADMIN_USERNAME/ADMIN_PASSWORD are not set");
        return Err(ApiError::new(req_id.0, "unauthorized", "invalid credentials"));
    };

    // Both comparisons always run.
    let user_ok = secrets_match(&request.username, username);
    let pass_ok = secrets_match(&request.password, password);
    if !(user_ok & pass_ok) {
        tracing::warn!("rejected admin login");
        return Err(ApiError::new(req_id.0, "unauthorized", "invalid credentials"));
    }

    let Some(token) = config.admin_token.clone() else {
        return Err(ApiError::new(
            req_id.0,
            "not_configured",
            "CARLOT_ADMIN_TOKEN is not set",
        ));
    };

    tracing::info!("admin login succeeded");
    Ok(Json(ApiResponse::new(
        LoginResponse {
            token,
            token_type: "Bearer",
        },
        req_id.0,
    )))
}

pub(super) async fn get_status(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(car_id): Path<String>,
) -> Result<Json<ApiResponse<StatusOverride>>, ApiError> {
    let status = state
        .status_store
        .get(&car_id)
        .await
        .map_err(|e| store_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse::new(
        StatusOverride { car_id, status },
        req_id.0,
    )))
}

/// Sets a reserved/sold override. Takes effect on the next read; cached
/// listings are not touched because overrides apply after the cache.
pub(super) async fn set_status(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(car_id): Path<String>,
    payload: Result<Json<StatusUpdate>, JsonRejection>,
) -> Result<Json<ApiResponse<StatusOverride>>, ApiError> {
    let Json(update) =
        payload.map_err(|e| ApiError::from_json_rejection(req_id.0.clone(), &e))?;

    state
        .status_store
        .set(&car_id, update.status)
        .await
        .map_err(|e| store_error(req_id.0.clone(), &e))?;

    tracing::info!(car_id = %car_id, status = update.status.as_str(), "status override set");
    Ok(Json(ApiResponse::new(
        StatusOverride {
            car_id,
            status: Some(update.status),
        },
        req_id.0,
    )))
}

pub(super) async fn clear_status(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(car_id): Path<String>,
) -> Result<Json<ApiResponse<ClearedOverride>>, ApiError> {
    let cleared = state
        .status_store
        .clear(&car_id)
        .await
        .map_err(|e| store_error(req_id.0.clone(), &e))?;

    tracing::info!(car_id = %car_id, cleared, "status override cleared");
    Ok(Json(ApiResponse::new(
        ClearedOverride { car_id, cleared },
        req_id.0,
    )))
}

/// Submits URLs to IndexNow. An empty body submits every public page.
pub(super) async fn submit_indexnow(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    body: Bytes,
) -> Result<Json<ApiResponse<SubmitReport>>, ApiError> {
    let Some(client) = state.indexnow.as_ref() else {
        return Err(ApiError::new(
            req_id.0,
            "not_configured",
            "INDEXNOW_KEY is not set",
        ));
    };

    let request: IndexNowRequest = if body.iter().all(u8::is_ascii_whitespace) {
        IndexNowRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| {
            ApiError::new(req_id.0.clone(), "bad_request", format!("malformed body: {e}"))
        })?
    };

    let urls = match request.urls.filter(|urls| !urls.is_empty()) {
        Some(urls) => urls,
        None => {
            let cars = load_all_cars(&state).await;
            public_paths(&cars)
                .iter()
                .map(|path| page_url(&state.config.site_url, path))
                .collect()
        }
    };

    match client.submit(&urls).await {
        Ok(report) => {
            tracing::info!(
                submitted = report.submitted,
                batches = report.batches,
                "submitted URLs to IndexNow"
            );
            Ok(Json(ApiResponse::new(report, req_id.0)))
        }
        Err(e) => {
            tracing::error!(error = %e, "IndexNow submission failed");
            Err(ApiError::new(
                req_id.0,
                "upstream_error",
                "IndexNow submission failed",
            ))
        }
    }
}
