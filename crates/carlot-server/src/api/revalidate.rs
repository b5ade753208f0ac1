use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;
use crate::signature::secrets_match;

use super::{ApiError, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct RevalidateQuery {
    pub secret: Option<String>,
    pub tag: Option<String>,
    pub path: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct RevalidateResponse {
    revalidated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<String>,
    /// Milliseconds since the Unix epoch.
    timestamp: i64,
}

enum Target {
    Tag(String),
    Path(String),
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

/// On-demand revalidation by tag or path.
///
/// Repeating a call is harmless: an already-dropped entry still answers
/// `revalidated: true`.
pub(super) async fn revalidate(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<RevalidateQuery>,
) -> Result<Json<RevalidateResponse>, ApiError> {
    let authorized = match (
        query.secret.as_deref(),
        state.config.revalidate_secret.as_deref(),
    ) {
        (Some(provided), Some(expected)) => secrets_match(provided, expected),
        _ => false,
    };
    if !authorized {
        return Err(ApiError::new(req_id.0, "unauthorized", "invalid secret"));
    }

    let target = match (non_blank(query.tag), non_blank(query.path)) {
        (Some(tag), None) => Target::Tag(tag),
        (None, Some(path)) if path.starts_with('/') => Target::Path(path),
        (None, Some(_)) => {
            return Err(ApiError::new(
                req_id.0,
                "validation_error",
                "path must start with '/'",
            ));
        }
        _ => {
            return Err(ApiError::new(
                req_id.0,
                "bad_request",
                "provide exactly one of 'tag' or 'path'",
            ));
        }
    };

    let timestamp = chrono::Utc::now().timestamp_millis();
    let response = match target {
        Target::Tag(tag) => {
            let dropped = state.cache.invalidate_tag(&tag).await;
            tracing::info!(tag = %tag, dropped, "revalidated tag");
            RevalidateResponse {
                revalidated: true,
                tag: Some(tag),
                path: None,
                timestamp,
            }
        }
        Target::Path(path) => {
            let dropped = state.cache.invalidate_path(&path).await;
            tracing::info!(path = %path, dropped, "revalidated path");
            RevalidateResponse {
                revalidated: true,
                tag: None,
                path: Some(path),
                timestamp,
            }
        }
    };

    Ok(Json(response))
}
