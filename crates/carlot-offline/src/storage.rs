//! Named response caches, modeled on the browser Cache Storage API.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::OfflineError;
use crate::worker::FetchResponse;

#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Stores `response` under `key` in the cache named `cache_name`,
    /// creating the cache if needed.
    async fn put(
        &self,
        cache_name: &str,
        key: &str,
        response: FetchResponse,
    ) -> Result<(), OfflineError>;

    /// Looks `key` up across every cache, oldest cache first.
    async fn match_any(&self, key: &str) -> Result<Option<FetchResponse>, OfflineError>;

    /// Names of every existing cache.
    async fn cache_names(&self) -> Result<Vec<String>, OfflineError>;

    /// Deletes a cache. Returns `false` when no cache had that name.
    async fn delete(&self, cache_name: &str) -> Result<bool, OfflineError>;
}

/// In-process [`CacheStorage`].
#[derive(Debug, Default)]
pub struct MemoryCacheStorage {
    caches: RwLock<BTreeMap<String, HashMap<String, FetchResponse>>>,
}

impl MemoryCacheStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries in one cache, `None` if the cache does not exist.
    pub async fn len(&self, cache_name: &str) -> Option<usize> {
        self.caches.read().await.get(cache_name).map(HashMap::len)
    }

    pub async fn contains(&self, cache_name: &str, key: &str) -> bool {
        self.caches
            .read()
            .await
            .get(cache_name)
            .is_some_and(|cache| cache.contains_key(key))
    }
}

#[async_trait]
impl CacheStorage for MemoryCacheStorage {
    async fn put(
        &self,
        cache_name: &str,
        key: &str,
        response: FetchResponse,
    ) -> Result<(), OfflineError> {
        self.caches
            .write()
            .await
            .entry(cache_name.to_owned())
            .or_default()
            .insert(key.to_owned(), response);
        Ok(())
    }

    async fn match_any(&self, key: &str) -> Result<Option<FetchResponse>, OfflineError> {
        let caches = self.caches.read().await;
        Ok(caches.values().find_map(|cache| cache.get(key).cloned()))
    }

    async fn cache_names(&self) -> Result<Vec<String>, OfflineError> {
        Ok(self.caches.read().await.keys().cloned().collect())
    }

    async fn delete(&self, cache_name: &str) -> Result<bool, OfflineError> {
        Ok(self.caches.write().await.remove(cache_name).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;

    #[tokio::test]
    async fn put_then_match_across_caches() {
        let storage = MemoryCacheStorage::new();
        storage
            .put("carlot-pages-v1", "https://a/x", FetchResponse::html(StatusCode::OK, "x"))
            .await
            .unwrap();

        let hit = storage.match_any("https://a/x").await.unwrap();
        assert_eq!(hit.map(|r| r.status), Some(StatusCode::OK));
        assert!(storage.match_any("https://a/y").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_reports_whether_cache_existed() {
        let storage = MemoryCacheStorage::new();
        storage
            .put("old", "k", FetchResponse::empty(StatusCode::OK))
            .await
            .unwrap();

        assert!(storage.delete("old").await.unwrap());
        assert!(!storage.delete("old").await.unwrap());
        assert!(storage.cache_names().await.unwrap().is_empty());
    }
}
