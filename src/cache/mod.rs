//! Key-value caching at the service boundary.
//!
//! A [`CacheStore`] holds JSON values with a TTL. Stores never surface errors:
//! a store that cannot answer behaves like a miss. [`CacheManager`] adds key
//! namespacing and typed access on top of a store.

mod memory;

pub use memory::{start_cleanup_task, MemoryCache};

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::CacheConfig;

/// Storage backend for cached JSON values.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Option<Value>;

    async fn set(&self, key: &str, value: Value, ttl: Duration);

    async fn delete(&self, key: &str);

    /// Remove every key matching a glob (`*`, `?`). Returns the count removed.
    async fn delete_pattern(&self, pattern: &str) -> usize;

    fn is_connected(&self) -> bool;
}

/// A store that never holds anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCache;

#[async_trait]
impl CacheStore for NoopCache {
    async fn get(&self, _key: &str) -> Option<Value> {
        None
    }

    async fn set(&self, _key: &str, _value: Value, _ttl: Duration) {}

    async fn delete(&self, _key: &str) {}

    async fn delete_pattern(&self, _pattern: &str) -> usize {
        0
    }

    fn is_connected(&self) -> bool {
        false
    }
}

/// Namespaced, typed access to a [`CacheStore`].
///
/// Keys are colon-delimited and always start with the configured prefix,
/// e.g. `moviehub:search:dune:any:relevance`.
#[derive(Clone)]
pub struct CacheManager {
    store: Arc<dyn CacheStore>,
    prefix: String,
}

impl CacheManager {
    pub fn new(store: Arc<dyn CacheStore>, prefix: impl Into<String>) -> Self {
        Self {
            store,
            prefix: prefix.into(),
        }
    }

    /// A manager that always misses.
    pub fn disabled() -> Self {
        Self::new(Arc::new(NoopCache), "moviehub")
    }

    /// Build the store selected by config. Returns the memory store too so
    /// the caller can schedule its cleanup.
    pub fn from_config(config: &CacheConfig) -> (Self, Option<Arc<MemoryCache>>) {
        if !config.enabled {
            return (Self::new(Arc::new(NoopCache), config.key_prefix.clone()), None);
        }
        let memory = Arc::new(MemoryCache::new(config.max_entries));
        (
            Self::new(memory.clone(), config.key_prefix.clone()),
            Some(memory),
        )
    }

    pub fn is_connected(&self) -> bool {
        self.store.is_connected()
    }

    /// Join `parts` under the prefix, skipping empty parts.
    pub fn make_key(&self, parts: &[&str]) -> String {
        std::iter::once(self.prefix.as_str())
            .chain(parts.iter().copied())
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join(":")
    }

    pub fn search_key(&self, query: &str, year: Option<i32>, sort: &str) -> String {
        let year = year.map_or_else(|| "any".to_string(), |y| y.to_string());
        self.make_key(&["search", &query.to_lowercase(), &year, sort])
    }

    pub fn movie_key(&self, id: &str) -> String {
        self.make_key(&["movie", id])
    }

    pub fn llm_key(&self, kind: &str, title: &str) -> String {
        self.make_key(&["llm", kind, &title.to_lowercase()])
    }

    /// Typed read. Entries that no longer decode are treated as misses.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.store.get(key).await?;
        match serde_json::from_value(value) {
            Ok(v) => {
                debug!(key, "Cache hit");
                Some(v)
            }
            Err(e) => {
                warn!(key, error = %e, "Discarding undecodable cache entry");
                self.store.delete(key).await;
                None
            }
        }
    }

    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        match serde_json::to_value(value) {
            Ok(v) => self.store.set(key, v, ttl).await,
            Err(e) => warn!(key, error = %e, "Value not cacheable"),
        }
    }

    pub async fn delete(&self, key: &str) {
        self.store.delete(key).await;
    }

    /// Return the cached value, or run `fetcher` and cache its success.
    pub async fn get_or_set<T, E, F, Fut>(&self, key: &str, ttl: Duration, fetcher: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(hit) = self.get(key).await {
            return Ok(hit);
        }
        debug!(key, "Cache miss");
        let value = fetcher().await?;
        self.set(key, &value, ttl).await;
        Ok(value)
    }

    /// Drop cached searches, for one query or all of them.
    pub async fn invalidate_search(&self, query: Option<&str>) -> usize {
        let pattern = match query {
            Some(q) => self.make_key(&["search", &q.to_lowercase(), "*"]),
            None => self.make_key(&["search", "*"]),
        };
        self.store.delete_pattern(&pattern).await
    }

    pub async fn invalidate_movie(&self, id: &str) {
        self.store.delete(&self.movie_key(id)).await;
    }

    /// Drop everything under this manager's prefix.
    pub async fn clear_all(&self) -> usize {
        let removed = self.store.delete_pattern(&self.make_key(&["*"])).await;
        tracing::info!(removed, "All caches cleared");
        removed
    }
}
