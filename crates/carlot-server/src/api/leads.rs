use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{ApiError, ApiResponse, AppState};

const MAX_NAME_CHARS: usize = 100;
const MAX_MESSAGE_CHARS: usize = 2_000;

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub(super) enum LeadKind {
    Contact,
    CreditCheck,
}

#[derive(Debug, Deserialize)]
pub(super) struct LeadRequest {
    pub name: String,
    pub phone: String,
    pub kind: LeadKind,
    #[serde(default)]
    pub car_handle: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub recaptcha_token: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct LeadAccepted {
    lead_id: String,
    kind: LeadKind,
    car_handle: Option<String>,
}

/// Normalizes a Thai phone number to its national digits.
///
/// Spaces and dashes are dropped and a `+66` prefix becomes `0`. The result
/// must be 9 or 10 digits starting with `0`.
pub(super) fn normalize_thai_phone(raw: &str) -> Option<String> {
    let compact: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect();
    let national = match compact.strip_prefix("+66") {
        Some(rest) => format!("0{}", rest.trim_start_matches('0')),
        None => compact,
    };

    let valid = (9..=10).contains(&national.len())
        && national.starts_with('0')
        && national.chars().all(|c| c.is_ascii_digit());
    valid.then_some(national)
}

/// Keeps the last three digits of a phone number for logs.
fn mask_phone(phone: &str) -> String {
    let visible = phone.len().saturating_sub(3);
    format!("{}{}", "*".repeat(visible), &phone[visible..])
}

fn client_ip(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn validate(request: &LeadRequest) -> Result<String, &'static str> {
    let name = request.name.trim();
    if name.is_empty() {
        return Err("name is required");
    }
    if name.chars().count() > MAX_NAME_CHARS {
        return Err("name is too long");
    }
    if request
        .message
        .as_deref()
        .is_some_and(|m| m.chars().count() > MAX_MESSAGE_CHARS)
    {
        return Err("message is too long");
    }
    normalize_thai_phone(&request.phone).ok_or("phone must be a Thai number of 9-10 digits")
}

/// Accepts a contact or credit-check form submission.
pub(super) async fn submit_lead(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    headers: HeaderMap,
    payload: Result<Json<LeadRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) =
        payload.map_err(|e| ApiError::from_json_rejection(req_id.0.clone(), &e))?;

    let phone = validate(&request)
        .map_err(|message| ApiError::new(req_id.0.clone(), "validation_error", message))?;

    if let Some(verifier) = state.recaptcha.as_ref() {
        let Some(token) = request
            .recaptcha_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
        else {
            return Err(ApiError::new(
                req_id.0,
                "forbidden",
                "recaptcha token is required",
            ));
        };

        match verifier.verify(token, client_ip(&headers)).await {
            Ok(true) => {}
            Ok(false) => {
                return Err(ApiError::new(
                    req_id.0,
                    "forbidden",
                    "recaptcha verification failed",
                ));
            }
            Err(e) => {
                tracing::warn!(error = %e, "recaptcha verification request failed");
                return Err(ApiError::new(
                    req_id.0,
                    "forbidden",
                    "recaptcha verification failed",
                ));
            }
        }
    }

    let car_handle = request
        .car_handle
        .as_deref()
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .map(ToOwned::to_owned);
    let lead_id = Uuid::new_v4().to_string();

    tracing::info!(
        lead_id = %lead_id,
        kind = ?request.kind,
        name = %request.name.trim(),
        phone = %mask_phone(&phone),
        car_handle = car_handle.as_deref().unwrap_or("-"),
        "lead received"
    );

    let accepted = LeadAccepted {
        lead_id,
        kind: request.kind,
        car_handle,
    };
    Ok((
        StatusCode::ACCEPTED,
        Json(ApiResponse::new(accepted, req_id.0)),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(name: &str, phone: &str) -> LeadRequest {
        LeadRequest {
            name: name.to_owned(),
            phone: phone.to_owned(),
            kind: LeadKind::Contact,
            car_handle: None,
            message: None,
            recaptcha_token: None,
        }
    }

    #[test]
    fn thai_phone_accepts_local_and_international_forms() {
        assert_eq!(normalize_thai_phone("081-234-5678").as_deref(), Some("0812345678"));
        assert_eq!(normalize_thai_phone("+66 81 234 5678").as_deref(), Some("0812345678"));
        assert_eq!(normalize_thai_phone("+66081 234 5678").as_deref(), Some("0812345678"));
        assert_eq!(normalize_thai_phone("02 123 4567").as_deref(), Some("021234567"));
    }

    #[test]
    fn thai_phone_rejects_wrong_length_or_prefix() {
        assert_eq!(normalize_thai_phone("12345678"), None);
        assert_eq!(normalize_thai_phone("1812345678"), None);
        assert_eq!(normalize_thai_phone("081234567890"), None);
        assert_eq!(normalize_thai_phone("08a2345678"), None);
        assert_eq!(normalize_thai_phone(""), None);
    }

    #[test]
    fn validate_checks_name() {
        assert_eq!(validate(&request("  ", "0812345678")), Err("name is required"));
        let long = "ก".repeat(MAX_NAME_CHARS + 1);
        assert_eq!(validate(&request(&long, "0812345678")), Err("name is too long"));
        assert_eq!(
            validate(&request("สมชาย", "081 234 5678")).as_deref(),
            Ok("0812345678")
        );
    }

    #[test]
    fn mask_phone_keeps_last_digits() {
        assert_eq!(mask_phone("0812345678"), "*******678");
        assert_eq!(mask_phone("12"), "12");
    }

    #[test]
    fn lead_kind_uses_snake_case() {
        let kind: LeadKind = serde_json::from_str("\"credit_check\"").unwrap();
        assert_eq!(kind, LeadKind::CreditCheck);
    }

    #[test]
    fn client_ip_uses_first_forwarded_address() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.7, 10.0.0.1".parse().unwrap());
        assert_eq!(client_ip(&headers), Some("203.0.113.7"));
        assert_eq!(client_ip(&HeaderMap::new()), None);
    }
}
