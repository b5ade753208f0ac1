//! Per-car status overrides ("reserved" / "sold") set by admins.
//!
//! Backed either by process memory or by an Upstash-style REST key-value
//! service. Overrides are last-write-wins.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use carlot_core::{AppConfig, Car, CarStatus, PATH_SEGMENT};
use futures::stream::{self, StreamExt};
use percent_encoding::utf8_percent_encode;
use serde::Deserialize;
use tokio::sync::RwLock;

const KEY_PREFIX: &str = "car-status:";

/// Keys per `MGET` call, keeping request paths a sane length.
const MGET_BATCH_SIZE: usize = 100;
const MGET_CONCURRENCY: usize = 4;

#[derive(Debug, thiserror::Error)]
pub enum StatusStoreError {
    #[error("key-value request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("key-value service returned HTTP {status}")]
    UnexpectedStatus { status: u16 },

    #[error("stored status {0:?} is not a valid car status")]
    InvalidValue(String),

    #[error("key-value service returned {actual} values for {expected} keys")]
    LengthMismatch { expected: usize, actual: usize },
}

/// Storage key for a car id. Shopify GIDs and bare numeric ids map to the
/// same key.
#[must_use]
pub fn status_key(car_id: &str) -> String {
    let id = car_id.trim();
    let id = id.rsplit('/').next().unwrap_or(id);
    format!("{KEY_PREFIX}{id}")
}

fn parse_stored(raw: &str) -> Option<CarStatus> {
    match raw.parse::<CarStatus>() {
        Ok(status) => Some(status),
        Err(_) => {
            tracing::warn!(value = raw, "ignoring invalid stored car status");
            None
        }
    }
}

#[derive(Debug, Clone)]
pub struct RestStatusStore {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct RestResult {
    result: Option<serde_json::Value>,
}

impl RestStatusStore {
    #[must_use]
    pub fn new(client: reqwest::Client, base_url: &str, token: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
            token: token.to_owned(),
        }
    }

    fn command_url(&self, command: &str, args: &[&str]) -> String {
        let mut url = format!("{}/{command}", self.base_url);
        for arg in args {
            url.push('/');
            url.extend(utf8_percent_encode(arg, PATH_SEGMENT));
        }
        url
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<RestResult, StatusStoreError> {
        let response = request.bearer_auth(&self.token).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(StatusStoreError::UnexpectedStatus {
                status: status.as_u16(),
            });
        }
        Ok(response.json::<RestResult>().await?)
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StatusStoreError> {
        let url = self.command_url("get", &[key]);
        let result = self.send(self.client.get(url)).await?;
        Ok(result.result.and_then(value_string))
    }

    /// One `MGET` round trip. Values come back in key order.
    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<String>>, StatusStoreError> {
        let args: Vec<&str> = keys.iter().map(String::as_str).collect();
        let url = self.command_url("mget", &args);
        let result = self.send(self.client.get(url)).await?;

        let values = match result.result {
            Some(serde_json::Value::Array(values)) => values,
            Some(serde_json::Value::Null) | None => Vec::new(),
            Some(_) => {
                return Err(StatusStoreError::LengthMismatch {
                    expected: keys.len(),
                    actual: 1,
                })
            }
        };
        if values.len() != keys.len() {
            return Err(StatusStoreError::LengthMismatch {
                expected: keys.len(),
                actual: values.len(),
            });
        }
        Ok(values.into_iter().map(value_string).collect())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StatusStoreError> {
        let url = self.command_url("set", &[key, value]);
        self.send(self.client.post(url)).await.map(|_| ())
    }

    async fn del(&self, key: &str) -> Result<bool, StatusStoreError> {
        let url = self.command_url("del", &[key]);
        let result = self.send(self.client.post(url)).await?;
        Ok(result
            .result
            .and_then(|v| v.as_u64())
            .is_some_and(|deleted| deleted > 0))
    }
}

fn value_string(value: serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(value) => Some(value),
        serde_json::Value::Null => None,
        other => Some(other.to_string()),
    }
}

#[derive(Debug, Clone)]
pub enum StatusStore {
    Memory(Arc<RwLock<HashMap<String, CarStatus>>>),
    Rest(RestStatusStore),
}

impl StatusStore {
    #[must_use]
    pub fn memory() -> Self {
        Self::Memory(Arc::new(RwLock::new(HashMap::new())))
    }

    /// Uses the REST store when `KV_REST_API_URL` is configured, memory
    /// otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(config: &AppConfig) -> Result<Self, StatusStoreError> {
        match (&config.kv_rest_api_url, &config.kv_rest_api_token) {
            (Some(url), Some(token)) => {
                let client = reqwest::Client::builder()
                    .timeout(Duration::from_secs(config.request_timeout_secs))
                    .build()?;
                Ok(Self::Rest(RestStatusStore::new(client, url, token)))
            }
            _ => Ok(Self::memory()),
        }
    }

    #[must_use]
    pub fn backend(&self) -> &'static str {
        match self {
            Self::Memory(_) => "memory",
            Self::Rest(_) => "rest",
        }
    }

    /// Returns the override for `car_id`, if one is set.
    ///
    /// # Errors
    ///
    /// Returns an error if the REST store is unreachable or holds a value
    /// that is not a car status.
    pub async fn get(&self, car_id: &str) -> Result<Option<CarStatus>, StatusStoreError> {
        let key = status_key(car_id);
        match self {
            Self::Memory(map) => Ok(map.read().await.get(&key).copied()),
            Self::Rest(rest) => match rest.get(&key).await? {
                Some(raw) => raw
                    .parse::<CarStatus>()
                    .map(Some)
                    .map_err(|_| StatusStoreError::InvalidValue(raw)),
                None => Ok(None),
            },
        }
    }

    /// Sets the override for `car_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the REST store rejects the write.
    pub async fn set(&self, car_id: &str, status: CarStatus) -> Result<(), StatusStoreError> {
        let key = status_key(car_id);
        match self {
            Self::Memory(map) => {
                map.write().await.insert(key, status);
                Ok(())
            }
            Self::Rest(rest) => rest.set(&key, status.as_str()).await,
        }
    }

    /// Removes the override for `car_id`. Returns whether one existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the REST store rejects the delete.
    pub async fn clear(&self, car_id: &str) -> Result<bool, StatusStoreError> {
        let key = status_key(car_id);
        match self {
            Self::Memory(map) => Ok(map.write().await.remove(&key).is_some()),
            Self::Rest(rest) => rest.del(&key).await,
        }
    }

    /// Overrides for many cars, in input order.
    ///
    /// The REST store is read with batched `MGET` calls. A stored value that
    /// is not a car status is logged and treated as no override.
    ///
    /// # Errors
    ///
    /// Returns an error if any batch request fails.
    pub async fn get_many(
        &self,
        car_ids: &[&str],
    ) -> Result<Vec<Option<CarStatus>>, StatusStoreError> {
        let keys: Vec<String> = car_ids.iter().map(|id| status_key(id)).collect();
        match self {
            Self::Memory(map) => {
                let map = map.read().await;
                Ok(keys.iter().map(|key| map.get(key).copied()).collect())
            }
            Self::Rest(rest) => {
                if keys.is_empty() {
                    return Ok(Vec::new());
                }
                let requests: Vec<_> = keys
                    .chunks(MGET_BATCH_SIZE)
                    .map(|chunk| rest.mget(chunk))
                    .collect();
                let batches: Vec<_> = stream::iter(requests)
                    .buffered(MGET_CONCURRENCY)
                    .collect()
                    .await;

                let mut statuses = Vec::with_capacity(keys.len());
                for batch in batches {
                    statuses.extend(
                        batch?
                            .into_iter()
                            .map(|raw| raw.as_deref().and_then(parse_stored)),
                    );
                }
                Ok(statuses)
            }
        }
    }

    /// Replaces each car's derived status with its override, if any.
    ///
    /// A failed lookup keeps every derived status.
    pub async fn apply_overrides(&self, cars: &mut [Car]) {
        if cars.is_empty() {
            return;
        }
        let ids: Vec<&str> = cars.iter().map(|car| car.id.as_str()).collect();
        let overrides = match self.get_many(&ids).await {
            Ok(overrides) => overrides,
            Err(e) => {
                tracing::warn!(cars = cars.len(), error = %e, "status override lookup failed");
                return;
            }
        };

        for (car, status) in cars.iter_mut().zip(overrides) {
            if let Some(status) = status {
                car.status = status;
            }
        }
    }
}
