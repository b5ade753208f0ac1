//! Service worker lifecycle: install, activate, fetch, and message events.

use async_trait::async_trait;
use http::{Method, StatusCode};
use url::Url;

use crate::error::OfflineError;
use crate::policy::{CachePolicy, RouteClass};
use crate::storage::CacheStorage;

const OFFLINE_HTML: &str = "<!doctype html><html lang=\"th\"><head><meta charset=\"utf-8\">\
<title>ออฟไลน์ | Offline</title></head><body><h1>คุณกำลังออฟไลน์</h1>\
<p>You are offline. Please check your connection and try again.</p></body></html>";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub method: Method,
    pub url: Url,
}

impl FetchRequest {
    /// Builds a `GET` request.
    ///
    /// # Errors
    ///
    /// Returns [`OfflineError::InvalidUrl`] if `url` is not absolute.
    pub fn get(url: &str) -> Result<Self, OfflineError> {
        Ok(Self {
            method: Method::GET,
            url: parse_url(url)?,
        })
    }

    /// Cache key: the URL without its fragment.
    #[must_use]
    pub fn cache_key(&self) -> String {
        let mut url = self.url.clone();
        url.set_fragment(None);
        url.into()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl FetchResponse {
    #[must_use]
    pub fn html(status: StatusCode, body: &str) -> Self {
        Self {
            status,
            content_type: Some("text/html; charset=utf-8".to_owned()),
            body: body.as_bytes().to_vec(),
        }
    }

    #[must_use]
    pub fn empty(status: StatusCode) -> Self {
        Self {
            status,
            content_type: None,
            body: Vec::new(),
        }
    }

    /// Synthetic response for a page that is neither reachable nor cached.
    #[must_use]
    pub fn offline_page() -> Self {
        Self::html(StatusCode::SERVICE_UNAVAILABLE, OFFLINE_HTML)
    }

    /// Synthetic response for an asset that is neither reachable nor cached.
    #[must_use]
    pub fn offline_asset() -> Self {
        Self::empty(StatusCode::SERVICE_UNAVAILABLE)
    }

    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.status.is_success()
    }
}

/// Outbound fetches made by the worker.
#[async_trait]
pub trait Network: Send + Sync {
    /// Performs the request. `Err` means the network was unreachable; an HTTP
    /// error status is still `Ok`.
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, OfflineError>;
}

/// Messages posted to the worker from a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerMessage {
    SkipWaiting,
    PreloadImages(Vec<String>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Parsed,
    Installing,
    Installed,
    Activating,
    Activated,
    Redundant,
}

impl WorkerState {
    fn as_str(self) -> &'static str {
        match self {
            Self::Parsed => "parsed",
            Self::Installing => "installing",
            Self::Installed => "installed",
            Self::Activating => "activating",
            Self::Activated => "activated",
            Self::Redundant => "redundant",
        }
    }
}

pub struct ServiceWorker<S, N> {
    version: String,
    policy: CachePolicy,
    storage: S,
    network: N,
    precache: Vec<String>,
    state: WorkerState,
    skip_waiting: bool,
    clients_claimed: bool,
}

impl<S: CacheStorage, N: Network> ServiceWorker<S, N> {
    /// Creates a worker for cache `version` that precaches `precache` URLs on
    /// install.
    pub fn new(
        version: impl Into<String>,
        precache: Vec<String>,
        storage: S,
        network: N,
    ) -> Self {
        Self {
            version: version.into(),
            policy: CachePolicy::default(),
            storage,
            network,
            precache,
            state: WorkerState::Parsed,
            skip_waiting: false,
            clients_claimed: false,
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: CachePolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn state(&self) -> WorkerState {
        self.state
    }

    #[must_use]
    pub fn clients_claimed(&self) -> bool {
        self.clients_claimed
    }

    #[must_use]
    pub fn storage(&self) -> &S {
        &self.storage
    }

    #[must_use]
    pub fn static_cache(&self) -> String {
        format!("carlot-static-{}", self.version)
    }

    #[must_use]
    pub fn pages_cache(&self) -> String {
        format!("carlot-pages-{}", self.version)
    }

    #[must_use]
    pub fn images_cache(&self) -> String {
        format!("carlot-images-{}", self.version)
    }

    fn current_caches(&self) -> [String; 3] {
        [self.static_cache(), self.pages_cache(), self.images_cache()]
    }

    /// Precaches every static asset into the versioned static cache.
    ///
    /// All-or-nothing: any failed asset makes the worker redundant. When a
    /// `SkipWaiting` message arrived earlier the worker activates
    /// immediately.
    ///
    /// # Errors
    ///
    /// Returns [`OfflineError::Precache`] for a non-2xx asset, or the network
    /// or storage error that stopped the install.
    pub async fn install(&mut self) -> Result<(), OfflineError> {
        self.expect_state(WorkerState::Parsed)?;
        self.state = WorkerState::Installing;

        if let Err(e) = self.precache_all().await {
            tracing::warn!(version = %self.version, error = %e, "service worker install failed");
            self.state = WorkerState::Redundant;
            return Err(e);
        }

        self.state = WorkerState::Installed;
        tracing::debug!(version = %self.version, assets = self.precache.len(), "service worker installed");

        if self.skip_waiting {
            self.activate().await?;
        }
        Ok(())
    }

    async fn precache_all(&self) -> Result<(), OfflineError> {
        let cache_name = self.static_cache();
        let mut fetched = Vec::with_capacity(self.precache.len());

        for url in &self.precache {
            let request = FetchRequest::get(url)?;
            let response = self.network.fetch(&request).await?;
            if !response.is_ok() {
                return Err(OfflineError::Precache {
                    url: url.clone(),
                    status: response.status.as_u16(),
                });
            }
            fetched.push((request.cache_key(), response));
        }

        for (key, response) in fetched {
            self.storage.put(&cache_name, &key, response).await?;
        }
        Ok(())
    }

    /// Deletes caches left by other versions and claims open clients.
    ///
    /// Returns the names of the deleted caches.
    ///
    /// # Errors
    ///
    /// Returns [`OfflineError::InvalidState`] unless the worker is installed,
    /// or a storage error.
    pub async fn activate(&mut self) -> Result<Vec<String>, OfflineError> {
        self.expect_state(WorkerState::Installed)?;
        self.state = WorkerState::Activating;

        let keep = self.current_caches();
        let mut deleted = Vec::new();
        for name in self.storage.cache_names().await? {
            if keep.contains(&name) {
                continue;
            }
            if self.storage.delete(&name).await? {
                deleted.push(name);
            }
        }

        self.clients_claimed = true;
        self.state = WorkerState::Activated;
        tracing::info!(version = %self.version, deleted = ?deleted, "service worker activated");
        Ok(deleted)
    }

    /// Handles a fetch event.
    ///
    /// Returns `None` when the request is not intercepted and the browser
    /// should fetch it normally. Intercepted requests always get a response:
    /// network failures fall back to the cache, then to a synthetic 503.
    pub async fn handle_fetch(&self, request: &FetchRequest) -> Option<FetchResponse> {
        if self.state != WorkerState::Activated {
            return None;
        }

        match self.policy.classify(&request.method, &request.url) {
            RouteClass::Page => Some(self.network_first(request).await),
            RouteClass::Static => Some(self.cache_first(request).await),
            RouteClass::Bypass | RouteClass::Passthrough => None,
        }
    }

    /// Handles a message posted from a page.
    ///
    /// # Errors
    ///
    /// Propagates activation errors triggered by `SkipWaiting`.
    pub async fn handle_message(&mut self, message: WorkerMessage) -> Result<(), OfflineError> {
        match message {
            WorkerMessage::SkipWaiting => {
                self.skip_waiting = true;
                if self.state == WorkerState::Installed {
                    self.activate().await?;
                }
            }
            WorkerMessage::PreloadImages(urls) => {
                let cached = self.preload_images(&urls).await;
                tracing::debug!(requested = urls.len(), cached, "preloaded images");
            }
        }
        Ok(())
    }

    /// Fetches and caches images not already cached. Failures are skipped.
    ///
    /// Returns how many images were newly cached.
    pub async fn preload_images<T: AsRef<str>>(&self, urls: &[T]) -> usize {
        let cache_name = self.images_cache();
        let mut cached = 0;

        for url in urls {
            let Ok(request) = FetchRequest::get(url.as_ref()) else {
                tracing::debug!(url = url.as_ref(), "skipping invalid preload URL");
                continue;
            };
            let key = request.cache_key();
            if matches!(self.storage.match_any(&key).await, Ok(Some(_))) {
                continue;
            }
            match self.network.fetch(&request).await {
                Ok(response) if response.is_ok() => {
                    if self.store(&cache_name, &key, response).await {
                        cached += 1;
                    }
                }
                Ok(response) => {
                    tracing::debug!(url = %key, status = %response.status, "image preload rejected");
                }
                Err(e) => tracing::debug!(url = %key, error = %e, "image preload failed"),
            }
        }
        cached
    }

    async fn network_first(&self, request: &FetchRequest) -> FetchResponse {
        let key = request.cache_key();
        match self.network.fetch(request).await {
            Ok(response) => {
                if response.is_ok() {
                    self.store(&self.pages_cache(), &key, response.clone()).await;
                }
                response
            }
            Err(e) => {
                tracing::debug!(url = %key, error = %e, "page fetch failed, trying cache");
                self.lookup(&key)
                    .await
                    .unwrap_or_else(FetchResponse::offline_page)
            }
        }
    }

    async fn cache_first(&self, request: &FetchRequest) -> FetchResponse {
        let key = request.cache_key();
        if let Some(cached) = self.lookup(&key).await {
            return cached;
        }

        match self.network.fetch(request).await {
            Ok(response) => {
                if response.is_ok() {
                    let cache_name = if request.url.path().starts_with("/_next/static/") {
                        self.static_cache()
                    } else {
                        self.images_cache()
                    };
                    self.store(&cache_name, &key, response.clone()).await;
                }
                response
            }
            Err(e) => {
                tracing::debug!(url = %key, error = %e, "asset fetch failed with no cached copy");
                FetchResponse::offline_asset()
            }
        }
    }

    async fn lookup(&self, key: &str) -> Option<FetchResponse> {
        match self.storage.match_any(key).await {
            Ok(hit) => hit,
            Err(e) => {
                tracing::warn!(url = key, error = %e, "cache lookup failed");
                None
            }
        }
    }

    async fn store(&self, cache_name: &str, key: &str, response: FetchResponse) -> bool {
        match self.storage.put(cache_name, key, response).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(cache = cache_name, url = key, error = %e, "cache write failed");
                false
            }
        }
    }

    fn expect_state(&self, expected: WorkerState) -> Result<(), OfflineError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(OfflineError::InvalidState {
                expected: expected.as_str(),
                actual: self.state.as_str(),
            })
        }
    }
}

fn parse_url(url: &str) -> Result<Url, OfflineError> {
    Url::parse(url).map_err(|source| OfflineError::InvalidUrl {
        url: url.to_owned(),
        source,
    })
}

#[cfg(test)]
#[path = "worker_test.rs"]
mod tests;
