//! In-process tag cache
//!
//! LRU eviction + optional TTL + tag index for bulk invalidation.

use crate::core::{CacheEntryOptions, CacheStats, TagCache};
use crate::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

/// Configuration for [`MemoryCache`]
#[derive(Debug, Clone)]
pub struct MemoryCacheConfig {
    /// Maximum number of entries
    pub max_entries: usize,
    /// TTL applied when the caller does not pass one (None = no expiry)
    pub default_ttl: Option<Duration>,
}

impl Default for MemoryCacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 1024,
            default_ttl: None,
        }
    }
}

#[derive(Debug)]
struct CacheEntry {
    value: Value,
    tags: Vec<String>,
    expires_at: Option<Instant>,
    last_access: u64,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<String, CacheEntry>,
    /// tag -> keys
    tag_index: HashMap<String, HashSet<String>>,
    access_counter: u64,
    hits: u64,
    misses: u64,
}

impl CacheState {
    fn remove(&mut self, key: &str) -> Option<CacheEntry> {
        let entry = self.entries.remove(key)?;
        for tag in &entry.tags {
            if let Some(keys) = self.tag_index.get_mut(tag) {
                keys.remove(key);
                if keys.is_empty() {
                    self.tag_index.remove(tag);
                }
            }
        }
        Some(entry)
    }

    fn evict_lru(&mut self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, e)| e.last_access)
            .map(|(k, _)| k.clone());
        if let Some(key) = oldest {
            self.remove(&key);
        }
    }

    /// Returns the live entry, dropping it first if it has expired
    fn live_entry(&mut self, key: &str, now: Instant) -> Option<&mut CacheEntry> {
        if self.entries.get(key).is_some_and(|e| e.is_expired(now)) {
            self.remove(key);
        }
        self.entries.get_mut(key)
    }
}

/// A simple in-memory [`TagCache`]
///
/// Good enough for tests and single-process hosts; hosts with a shared
/// cache wire their own implementation instead.
#[derive(Debug, Default)]
pub struct MemoryCache {
    config: MemoryCacheConfig,
    state: Mutex<CacheState>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::with_config(MemoryCacheConfig::default())
    }

    pub fn with_config(config: MemoryCacheConfig) -> Self {
        Self {
            config,
            state: Mutex::new(CacheState::default()),
        }
    }

    /// Remove expired entries
    pub fn cleanup_expired(&self) -> usize {
        let now = Instant::now();
        let mut state = self.state.lock();
        let expired: Vec<String> = state
            .entries
            .iter()
            .filter(|(_, e)| e.is_expired(now))
            .map(|(k, _)| k.clone())
            .collect();
        for key in &expired {
            state.remove(key);
        }
        expired.len()
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl TagCache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let now = Instant::now();
        let mut state = self.state.lock();
        state.access_counter += 1;
        let counter = state.access_counter;

        let value = state.live_entry(key, now).map(|entry| {
            entry.last_access = counter;
            entry.value.clone()
        });

        if value.is_some() {
            state.hits += 1;
        } else {
            state.misses += 1;
        }
        Ok(value)
    }

    async fn set(&self, key: &str, value: Value, options: CacheEntryOptions) -> Result<()> {
        let ttl = options.ttl.or(self.config.default_ttl);
        let mut state = self.state.lock();

        state.remove(key);
        while state.entries.len() >= self.config.max_entries.max(1) {
            state.evict_lru();
        }

        state.access_counter += 1;
        let last_access = state.access_counter;
        for tag in &options.tags {
            state
                .tag_index
                .entry(tag.clone())
                .or_default()
                .insert(key.to_string());
        }
        state.entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                tags: options.tags,
                expires_at: ttl.map(|ttl| Instant::now() + ttl),
                last_access,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        Ok(self.state.lock().remove(key).is_some())
    }

    async fn delete_by_tag(&self, tag: &str) -> Result<usize> {
        let mut state = self.state.lock();
        let keys: Vec<String> = state
            .tag_index
            .get(tag)
            .map(|keys| keys.iter().cloned().collect())
            .unwrap_or_default();
        for key in &keys {
            state.remove(key);
        }
        Ok(keys.len())
    }

    async fn clear(&self) -> Result<()> {
        let mut state = self.state.lock();
        state.entries.clear();
        state.tag_index.clear();
        Ok(())
    }

    async fn has(&self, key: &str) -> Result<bool> {
        let now = Instant::now();
        Ok(self.state.lock().live_entry(key, now).is_some())
    }

    async fn stats(&self) -> Result<CacheStats> {
        let state = self.state.lock();
        Ok(CacheStats {
            entries: state.entries.len(),
            hits: state.hits,
            misses: state.misses,
            tags: state.tag_index.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_set_get() {
        let cache = MemoryCache::new();
        cache.set("a", json!(1), CacheEntryOptions::new()).await.unwrap();

        assert_eq!(cache.get("a").await.unwrap(), Some(json!(1)));
        assert_eq!(cache.get("missing").await.unwrap(), None);

        let stats = cache.stats().await.unwrap();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[tokio::test]
    async fn test_delete_by_tag() {
        let cache = MemoryCache::new();
        let doc = CacheEntryOptions::new().tag("doc:1");
        cache.set("doc:1:summary", json!("s"), doc.clone()).await.unwrap();
        cache.set("doc:1:links", json!([]), doc).await.unwrap();
        cache
            .set("doc:2:summary", json!("t"), CacheEntryOptions::new().tag("doc:2"))
            .await
            .unwrap();

        assert_eq!(cache.delete_by_tag("doc:1").await.unwrap(), 2);
        assert!(!cache.has("doc:1:links").await.unwrap());
        assert!(cache.has("doc:2:summary").await.unwrap());
        assert_eq!(cache.stats().await.unwrap().tags, 1);
    }

    #[tokio::test]
    async fn test_ttl_expiry() {
        let cache = MemoryCache::new();
        cache
            .set(
                "short",
                json!(true),
                CacheEntryOptions::new().ttl(Duration::from_millis(10)),
            )
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(cache.get("short").await.unwrap(), None);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_lru_eviction() {
        let cache = MemoryCache::with_config(MemoryCacheConfig {
            max_entries: 2,
            default_ttl: None,
        });
        cache.set("a", json!(1), CacheEntryOptions::new()).await.unwrap();
        cache.set("b", json!(2), CacheEntryOptions::new()).await.unwrap();

        // a를 최근 사용으로 갱신
        cache.get("a").await.unwrap();
        cache.set("c", json!(3), CacheEntryOptions::new()).await.unwrap();

        assert!(cache.has("a").await.unwrap());
        assert!(!cache.has("b").await.unwrap());
        assert_eq!(cache.len(), 2);
    }
}
