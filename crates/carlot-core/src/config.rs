use std::str::FromStr;

use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Reads `.env` (if present) into the process, then builds the config.
///
/// # Errors
///
/// Fails when a required variable is unset or a value does not parse.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Builds the config from the current process environment only.
///
/// # Errors
///
/// Fails when a required variable is unset or a value does not parse.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Blank values count as unset everywhere.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let optional = |var: &str| lookup(var).ok().filter(|v| !v.trim().is_empty());

    let require =
        |var: &str| optional(var).ok_or_else(|| ConfigError::MissingEnvVar(var.to_owned()));

    let or_default = |var: &str, default: &str| optional(var).unwrap_or_else(|| default.to_owned());

    let shopify_store_domain = normalize_store_domain(&require("SHOPIFY_STORE_DOMAIN")?);
    let shopify_storefront_token = require("SHOPIFY_STOREFRONT_ACCESS_TOKEN")?;
    let shopify_api_version = or_default("SHOPIFY_API_VERSION", "2024-10");

    let env = parse_environment(&or_default("CARLOT_ENV", "development"))?;
    let bind_addr = parse_or(&optional, "CARLOT_BIND_ADDR", "0.0.0.0:3000")?;
    let log_level = or_default("CARLOT_LOG_LEVEL", "info");
    let site_url = or_default("CARLOT_SITE_URL", "https://localhost:3000")
        .trim_end_matches('/')
        .to_string();

    let kv_rest_api_url = optional("KV_REST_API_URL");
    let kv_rest_api_token = optional("KV_REST_API_TOKEN");
    if kv_rest_api_url.is_some() && kv_rest_api_token.is_none() {
        return Err(ConfigError::MissingEnvVar("KV_REST_API_TOKEN".to_string()));
    }

    Ok(AppConfig {
        env,
        bind_addr,
        log_level,
        site_url,
        shopify_store_domain,
        shopify_storefront_token,
        shopify_api_version,
        shopify_webhook_secret: optional("SHOPIFY_WEBHOOK_SECRET"),
        admin_token: optional("CARLOT_ADMIN_TOKEN"),
        admin_username: optional("ADMIN_USERNAME"),
        admin_password: optional("ADMIN_PASSWORD"),
        revalidate_secret: optional("REVALIDATE_SECRET"),
        recaptcha_secret: optional("RECAPTCHA_SECRET_KEY"),
        indexnow_key: optional("INDEXNOW_KEY"),
        indexnow_endpoint: or_default("INDEXNOW_ENDPOINT", "https://api.indexnow.org/indexnow"),
        kv_rest_api_url,
        kv_rest_api_token,
        request_timeout_secs: parse_or(&optional, "CARLOT_REQUEST_TIMEOUT_SECS", "10")?,
        max_retries: parse_or(&optional, "CARLOT_MAX_RETRIES", "2")?,
        retry_backoff_base_secs: parse_or(&optional, "CARLOT_RETRY_BACKOFF_BASE_SECS", "1")?,
        cache_ttl_secs: parse_or(&optional, "CARLOT_CACHE_TTL_SECS", "60")?,
    })
}

fn parse_or<T, F>(optional: &F, var: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    let raw = optional(var).unwrap_or_else(|| default.to_owned());
    raw.trim().parse::<T>().map_err(|e| ConfigError::InvalidEnvVar {
        var: var.to_owned(),
        reason: e.to_string(),
    })
}

/// Unrecognized names are rejected rather than mapped to development.
fn parse_environment(raw: &str) -> Result<Environment, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "development" | "dev" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" | "prod" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "CARLOT_ENV".to_owned(),
            reason: format!(
                "unknown environment {other:?}; expected development, test or production"
            ),
        }),
    }
}

/// Strips scheme and trailing slashes so `https://shop.myshopify.com/`
/// and `shop.myshopify.com` configure the same store.
fn normalize_store_domain(raw: &str) -> String {
    let trimmed = raw.trim();
    let without_scheme = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .unwrap_or(trimmed);
    without_scheme.trim_end_matches('/').to_string()
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
