//! Google reCAPTCHA token verification.

use std::time::Duration;

use serde::Deserialize;

pub const SITEVERIFY_URL: &str = "https://www.google.com/recaptcha/api/siteverify";

/// Minimum v3 score accepted. v2 responses carry no score.
const MIN_SCORE: f64 = 0.5;

#[derive(Debug, Deserialize)]
struct SiteverifyResponse {
    success: bool,
    score: Option<f64>,
    #[serde(default, rename = "error-codes")]
    error_codes: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct RecaptchaVerifier {
    client: reqwest::Client,
    endpoint: String,
    secret: String,
}

impl RecaptchaVerifier {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(endpoint: &str, secret: &str, timeout_secs: u64) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.to_owned(),
            secret: secret.to_owned(),
        })
    }

    /// Returns whether Google accepts `token`.
    ///
    /// # Errors
    ///
    /// Returns an error when siteverify cannot be reached or answers with
    /// something other than the expected JSON.
    pub async fn verify(&self, token: &str, remote_ip: Option<&str>) -> Result<bool, reqwest::Error> {
        let mut form = vec![("secret", self.secret.as_str()), ("response", token)];
        if let Some(ip) = remote_ip {
            form.push(("remoteip", ip));
        }

        let outcome: SiteverifyResponse = self
            .client
            .post(&self.endpoint)
            .form(&form)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if !outcome.success {
            tracing::info!(errors = ?outcome.error_codes, "reCAPTCHA token rejected");
            return Ok(false);
        }
        Ok(outcome.score.is_none_or(|score| score >= MIN_SCORE))
    }
}
