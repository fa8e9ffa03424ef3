//! In-process TTL cache.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use regex::Regex;
use serde_json::Value;

use super::CacheStore;

struct CacheEntry {
    value: Value,
    expires_at: Instant,
}

/// Thread-safe key-value cache with per-entry expiry and a size bound.
///
/// When full, the entry closest to expiry is evicted to make room.
pub struct MemoryCache {
    entries: DashMap<String, CacheEntry>,
    max_entries: usize,
}

impl MemoryCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            max_entries: max_entries.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn cleanup_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.expires_at > now);
        before.saturating_sub(self.entries.len())
    }

    fn evict_soonest(&self) {
        let victim = self
            .entries
            .iter()
            .min_by_key(|entry| entry.expires_at)
            .map(|entry| entry.key().clone());

        if let Some(key) = victim {
            self.entries.remove(&key);
        }
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(10_000)
    }
}

/// Translate a Redis-style glob (`*`, `?`) into an anchored regex.
pub(crate) fn glob_to_regex(pattern: &str) -> Option<Regex> {
    let mut re = String::with_capacity(pattern.len() + 8);
    re.push('^');
    let mut literal = String::new();
    for c in pattern.chars() {
        match c {
            '*' | '?' => {
                re.push_str(&regex::escape(&literal));
                literal.clear();
                re.push_str(if c == '*' { ".*" } else { "." });
            }
            other => literal.push(other),
        }
    }
    re.push_str(&regex::escape(&literal));
    re.push('$');
    Regex::new(&re).ok()
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> Option<Value> {
        let entry = self.entries.get(key)?;
        if entry.expires_at <= Instant::now() {
            drop(entry);
            self.entries.remove(key);
            return None;
        }
        Some(entry.value.clone())
    }

    async fn set(&self, key: &str, value: Value, ttl: Duration) {
        if !self.entries.contains_key(key) && self.entries.len() >= self.max_entries {
            self.cleanup_expired();
            if self.entries.len() >= self.max_entries {
                self.evict_soonest();
            }
        }
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    async fn delete(&self, key: &str) {
        self.entries.remove(key);
    }

    async fn delete_pattern(&self, pattern: &str) -> usize {
        let Some(re) = glob_to_regex(pattern) else {
            tracing::warn!(pattern, "Ignoring invalid cache pattern");
            return 0;
        };
        let before = self.entries.len();
        self.entries.retain(|key, _| !re.is_match(key));
        before.saturating_sub(self.entries.len())
    }

    fn is_connected(&self) -> bool {
        true
    }
}

/// Spawn a background task that periodically drops expired entries.
pub fn start_cleanup_task(
    cache: std::sync::Arc<MemoryCache>,
    interval_secs: u64,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            interval.tick().await;
            let removed = cache.cleanup_expired();
            if removed > 0 {
                tracing::debug!(removed, "Expired cache entries removed");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn glob_translation() {
        let re = glob_to_regex("moviehub:search:*").unwrap();
        assert!(re.is_match("moviehub:search:dune:any:relevance"));
        assert!(!re.is_match("moviehub:movie:tmdb-1"));

        let re = glob_to_regex("a.b?").unwrap();
        assert!(re.is_match("a.bc"));
        assert!(!re.is_match("axbc"));
    }

    #[tokio::test]
    async fn set_get_delete() {
        let cache = MemoryCache::new(10);
        cache.set("k", json!({"a": 1}), Duration::from_secs(60)).await;
        assert_eq!(cache.get("k").await, Some(json!({"a": 1})));

        cache.delete("k").await;
        assert_eq!(cache.get("k").await, None);
    }

    #[tokio::test]
    async fn expired_entries_miss() {
        let cache = MemoryCache::new(10);
        cache.set("k", json!(1), Duration::ZERO).await;
        assert_eq!(cache.get("k").await, None);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn evicts_when_full() {
        let cache = MemoryCache::new(2);
        cache.set("short", json!(1), Duration::from_secs(10)).await;
        cache.set("long", json!(2), Duration::from_secs(100)).await;
        cache.set("new", json!(3), Duration::from_secs(50)).await;

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("short").await, None);
        assert_eq!(cache.get("long").await, Some(json!(2)));
    }

    #[tokio::test]
    async fn delete_pattern_counts_removed() {
        let cache = MemoryCache::new(10);
        let ttl = Duration::from_secs(60);
        cache.set("p:search:a", json!(1), ttl).await;
        cache.set("p:search:b", json!(2), ttl).await;
        cache.set("p:movie:x", json!(3), ttl).await;

        assert_eq!(cache.delete_pattern("p:search:*").await, 2);
        assert_eq!(cache.len(), 1);
    }
}
