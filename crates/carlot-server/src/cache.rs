//! In-process response cache with path and tag invalidation.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

/// Tag attached to every entry derived from product data.
pub const PRODUCTS_TAG: &str = "products";

#[derive(Debug)]
struct Entry<V> {
    value: V,
    tags: HashSet<String>,
    inserted_at: Instant,
}

/// Short-lived cache of upstream data keyed by the page path it backs.
///
/// Entries expire after the TTL and can be dropped early by path or by tag.
#[derive(Debug)]
pub struct ResponseCache<V> {
    ttl: Duration,
    entries: Arc<RwLock<HashMap<String, Entry<V>>>>,
}

impl<V> Clone for ResponseCache<V> {
    fn clone(&self) -> Self {
        Self {
            ttl: self.ttl,
            entries: Arc::clone(&self.entries),
        }
    }
}

impl<V: Clone> ResponseCache<V> {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Returns the cached value for `path` unless it has expired.
    pub async fn get(&self, path: &str) -> Option<V> {
        let entries = self.entries.read().await;
        entries
            .get(path)
            .filter(|entry| entry.inserted_at.elapsed() < self.ttl)
            .map(|entry| entry.value.clone())
    }

    pub async fn insert(&self, path: &str, tags: &[&str], value: V) {
        let entry = Entry {
            value,
            tags: tags.iter().map(|t| (*t).to_owned()).collect(),
            inserted_at: Instant::now(),
        };
        let mut entries = self.entries.write().await;
        entries.retain(|_, e| e.inserted_at.elapsed() < self.ttl);
        entries.insert(path.to_owned(), entry);
    }

    /// Drops the entry for `path`. Returns whether one was present.
    pub async fn invalidate_path(&self, path: &str) -> bool {
        self.entries.write().await.remove(path).is_some()
    }

    /// Drops every entry carrying `tag`. Returns how many were removed.
    pub async fn invalidate_tag(&self, tag: &str) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.tags.contains(tag));
        before - entries.len()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}
