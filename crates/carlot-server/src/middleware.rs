use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    extract::{Request, State},
    http::{
        header::{AUTHORIZATION, CACHE_CONTROL, USER_AGENT},
        HeaderValue, Method, StatusCode,
    },
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use carlot_core::AppConfig;
use carlot_offline::CachePolicy;
use regex::Regex;
use serde::Serialize;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::signature::secrets_match;

/// Scrapers and SEO crawlers refused at the edge. Search engines pass.
const BLOCKED_BOTS: &[&str] = &[
    "AhrefsBot",
    "SemrushBot",
    "MJ12bot",
    "DotBot",
    "PetalBot",
    "Bytespider",
    "BLEXBot",
    "DataForSeoBot",
    "MegaIndex",
    "serpstatbot",
    "ClaudeBot",
    "GPTBot",
];

/// Newtype wrapping a request ID string, stored as a request extension.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Bearer-token guard for the admin routes.
#[derive(Debug, Clone)]
pub struct AdminAuth {
    token: Option<Arc<str>>,
    pub enabled: bool,
}

impl AdminAuth {
    /// Reads `CARLOT_ADMIN_TOKEN` from the config.
    ///
    /// Without a token, development leaves admin routes open and every
    /// other environment rejects all admin requests.
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        match config.admin_token.as_deref() {
            Some(token) => Self::with_token(token),
            None if config.env == carlot_core::Environment::Development => {
                tracing::warn!("CARLOT_ADMIN_TOKEN not set; admin auth disabled in development");
                Self {
                    token: None,
                    enabled: false,
                }
            }
            None => {
                tracing::warn!("CARLOT_ADMIN_TOKEN not set; admin routes will reject every request");
                Self {
                    token: None,
                    enabled: true,
                }
            }
        }
    }

    #[must_use]
    pub fn with_token(token: &str) -> Self {
        Self {
            token: Some(Arc::from(token)),
            enabled: true,
        }
    }

    fn allows(&self, provided: &str) -> bool {
        self.token
            .as_deref()
            .is_some_and(|expected| secrets_match(provided, expected))
    }
}

#[derive(Debug, Clone)]
struct RateLimitWindow {
    started_at: Instant,
    count: usize,
}

/// Fixed-window limiter shared by every request it guards.
#[derive(Debug, Clone)]
pub struct RateLimitState {
    max_requests: usize,
    window: Duration,
    state: Arc<Mutex<RateLimitWindow>>,
}

impl RateLimitState {
    #[must_use]
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            state: Arc::new(Mutex::new(RateLimitWindow {
                started_at: Instant::now(),
                count: 0,
            })),
        }
    }
}

/// User-agent blocklist matcher.
#[derive(Debug, Clone)]
pub struct BotBlocker {
    pattern: Arc<Regex>,
}

impl BotBlocker {
    /// Builds the matcher from [`BLOCKED_BOTS`].
    ///
    /// # Errors
    ///
    /// Returns an error if the pattern fails to compile.
    pub fn default_blocklist() -> Result<Self, regex::Error> {
        Self::new(BLOCKED_BOTS)
    }

    /// # Errors
    ///
    /// Returns an error if the pattern fails to compile.
    pub fn new(bots: &[&str]) -> Result<Self, regex::Error> {
        let alternation = bots
            .iter()
            .map(|bot| regex::escape(bot))
            .collect::<Vec<_>>()
            .join("|");
        let pattern = Regex::new(&format!("(?i)({alternation})"))?;
        Ok(Self {
            pattern: Arc::new(pattern),
        })
    }

    #[must_use]
    pub fn is_blocked(&self, user_agent: &str) -> bool {
        self.pattern.is_match(user_agent)
    }
}

#[derive(Debug, Serialize)]
struct MiddlewareErrorBody {
    error: MiddlewareError,
}

#[derive(Debug, Serialize)]
struct MiddlewareError {
    code: &'static str,
    message: &'static str,
}

fn middleware_error(status: StatusCode, code: &'static str, message: &'static str) -> Response {
    (
        status,
        Json(MiddlewareErrorBody {
            error: MiddlewareError { code, message },
        }),
    )
        .into_response()
}

/// Axum middleware that extracts or generates a request ID.
///
/// If the incoming request has an `x-request-id` header, that value is used.
/// Otherwise a new `UUIDv4` is generated. The ID is inserted into request
/// extensions as [`RequestId`] and echoed on the response.
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.trim().is_empty())
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);

    req.extensions_mut().insert(RequestId(id.clone()));

    let mut res = next.run(req).await;

    if let Ok(val) = HeaderValue::from_str(&id) {
        res.headers_mut().insert("x-request-id", val);
    }

    res
}

/// Middleware enforcing the admin bearer token when enabled.
pub async fn require_admin_token(
    State(auth): State<AdminAuth>,
    req: Request,
    next: Next,
) -> Response {
    if !auth.enabled {
        return next.run(req).await;
    }

    match extract_bearer_token(req.headers().get(AUTHORIZATION)) {
        Some(token) if auth.allows(token) => next.run(req).await,
        _ => middleware_error(
            StatusCode::UNAUTHORIZED,
            "unauthorized",
            "missing or invalid bearer token",
        ),
    }
}

/// Middleware enforcing a fixed request-per-window limit.
pub async fn enforce_rate_limit(
    State(rate_limit): State<RateLimitState>,
    req: Request,
    next: Next,
) -> Response {
    let mut window = rate_limit.state.lock().await;

    if window.started_at.elapsed() >= rate_limit.window {
        window.started_at = Instant::now();
        window.count = 0;
    }

    if window.count >= rate_limit.max_requests {
        return middleware_error(
            StatusCode::TOO_MANY_REQUESTS,
            "rate_limited",
            "rate limit exceeded",
        );
    }

    window.count += 1;
    drop(window);

    next.run(req).await
}

/// Middleware refusing requests from blocklisted crawlers.
pub async fn block_bots(State(blocker): State<BotBlocker>, req: Request, next: Next) -> Response {
    let user_agent = req
        .headers()
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if blocker.is_blocked(user_agent) {
        tracing::debug!(user_agent, path = %req.uri().path(), "blocked crawler");
        return middleware_error(StatusCode::FORBIDDEN, "forbidden", "crawler not allowed");
    }

    next.run(req).await
}

/// Sets `Cache-Control` on successful `GET` responses that did not set one.
///
/// Page and static routes get the header of their offline route class;
/// other API responses are marked `no-store`.
pub async fn cache_control(req: Request, next: Next) -> Response {
    let is_get = req.method() == Method::GET;
    let path = req.uri().path().to_owned();

    let mut res = next.run(req).await;

    if !is_get || !res.status().is_success() || res.headers().contains_key(CACHE_CONTROL) {
        return res;
    }

    let value = CachePolicy::classify_path(&Method::GET, &path)
        .cache_control()
        .or_else(|| path.starts_with("/api/").then_some("no-store"));

    if let Some(value) = value {
        res.headers_mut()
            .insert(CACHE_CONTROL, HeaderValue::from_static(value));
    }

    res
}

fn extract_bearer_token(value: Option<&HeaderValue>) -> Option<&str> {
    value
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_bearer_token_accepts_valid_header() {
        let header = HeaderValue::from_static("Bearer test-token");
        assert_eq!(extract_bearer_token(Some(&header)), Some("test-token"));
    }

    #[test]
    fn extract_bearer_token_rejects_non_bearer_header() {
        let header = HeaderValue::from_static("Basic abc123");
        assert_eq!(extract_bearer_token(Some(&header)), None);
        assert_eq!(extract_bearer_token(None), None);
    }

    #[test]
    fn admin_auth_compares_token_exactly() {
        let auth = AdminAuth::with_token("admin-secret");
        assert!(auth.allows("admin-secret"));
        assert!(!auth.allows("admin-secre"));
        assert!(!auth.allows("admin-secret "));
    }

    #[test]
    fn admin_auth_without_token_allows_nothing() {
        let auth = AdminAuth {
            token: None,
            enabled: true,
        };
        assert!(!auth.allows(""));
        assert!(!auth.allows("anything"));
    }

    #[test]
    fn bot_blocker_matches_scrapers_case_insensitively() {
        let blocker = BotBlocker::default_blocklist().unwrap();
        for ua in [
            "Mozilla/5.0 (compatible; AhrefsBot/7.0; +http://ahrefs.com/robot/)",
            "Mozilla/5.0 (compatible; semrushbot/7~bl)",
            "Mozilla/5.0 (Linux; Android 5.0) AppleWebKit/537.36 (KHTML, like Gecko) Mobile Safari/537.36 (compatible; Bytespider)",
        ] {
            assert!(blocker.is_blocked(ua), "{ua}");
        }
    }

    #[test]
    fn bot_blocker_lets_search_engines_and_browsers_through() {
        let blocker = BotBlocker::default_blocklist().unwrap();
        for ua in [
            "Mozilla/5.0 (compatible; Googlebot/2.1; +http://www.google.com/bot.html)",
            "Mozilla/5.0 (compatible; bingbot/2.0; +http://www.bing.com/bingbot.htm)",
            "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) AppleWebKit/605.1.15",
            "",
        ] {
            assert!(!blocker.is_blocked(ua), "{ua}");
        }
    }
}
