//! Time-based cache for configuration records
//!
//! Configuration is read-only during a run, so repeated reads of the same
//! pipeline, mapping set or lookup entry can be served from memory for a
//! short time. Entries expire after a fixed TTL; there is no background
//! timer, expiry is checked on read. Callers can also invalidate explicitly.
//!
//! Copyright (c) 2025 RateBridge Team
//! Licensed under the Apache-2.0 license

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

/// Configuration for cache behavior
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CacheConfig {
    /// Maximum number of entries before the least recently used is evicted
    pub max_entries: usize,
    /// How long an entry stays valid, in seconds
    pub ttl_secs: u64,
    /// Whether to enable cache
    pub enabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 1000,
            ttl_secs: 30,
            enabled: true,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    cached_at: Instant,
}

impl<V> CacheEntry<V> {
    fn is_valid(&self, ttl: Duration) -> bool {
        self.cached_at.elapsed() <= ttl
    }
}

/// Cache statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

/// TTL map with LRU eviction
#[derive(Debug)]
pub struct TtlCache<K, V> {
    entries: HashMap<K, CacheEntry<V>>,
    access_order: Vec<K>,
    ttl: Duration,
    max_entries: usize,
    enabled: bool,
    hits: u64,
    misses: u64,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Create a cache with default configuration
    pub fn new() -> Self {
        Self::with_config(&CacheConfig::default())
    }

    /// Create a cache with custom configuration
    pub fn with_config(config: &CacheConfig) -> Self {
        Self {
            entries: HashMap::new(),
            access_order: Vec::new(),
            ttl: config.ttl(),
            max_entries: config.max_entries.max(1),
            enabled: config.enabled,
            hits: 0,
            misses: 0,
        }
    }

    /// Get a cached value if present and not expired
    pub fn get(&mut self, key: &K) -> Option<V> {
        if !self.enabled {
            return None;
        }

        let valid = self.entries.get(key).map(|e| e.is_valid(self.ttl));
        match valid {
            Some(true) => {
                self.hits += 1;
                self.touch(key);
                self.entries.get(key).map(|e| e.value.clone())
            }
            Some(false) => {
                self.misses += 1;
                self.invalidate(key);
                None
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Store a value
    pub fn put(&mut self, key: K, value: V) {
        if !self.enabled {
            return;
        }

        if !self.entries.contains_key(&key) && self.entries.len() >= self.max_entries {
            self.evict_lru();
        }

        self.entries.insert(
            key.clone(),
            CacheEntry {
                value,
                cached_at: Instant::now(),
            },
        );
        self.touch(&key);
    }

    /// Drop one entry, returning whether it existed
    pub fn invalidate(&mut self, key: &K) -> bool {
        self.access_order.retain(|k| k != key);
        self.entries.remove(key).is_some()
    }

    /// Drop every entry matching a predicate
    pub fn invalidate_where(&mut self, predicate: impl Fn(&K) -> bool) {
        self.entries.retain(|k, _| !predicate(k));
        self.access_order.retain(|k| !predicate(k));
    }

    /// Clear all cache entries
    pub fn invalidate_all(&mut self) {
        self.entries.clear();
        self.access_order.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            hits: self.hits,
            misses: self.misses,
        }
    }

    fn touch(&mut self, key: &K) {
        self.access_order.retain(|k| k != key);
        self.access_order.push(key.clone());
    }

    fn evict_lru(&mut self) {
        if self.access_order.is_empty() {
            return;
        }
        let oldest = self.access_order.remove(0);
        self.entries.remove(&oldest);
    }
}

impl<K, V> Default for TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(ttl_secs: u64, max_entries: usize) -> CacheConfig {
        CacheConfig {
            max_entries,
            ttl_secs,
            enabled: true,
        }
    }

    #[test]
    fn test_put_and_get() {
        let mut cache = TtlCache::new();
        cache.put("a".to_string(), 1);
        assert_eq!(cache.get(&"a".to_string()), Some(1));
        assert_eq!(cache.get(&"b".to_string()), None);
        assert_eq!(cache.stats(), CacheStats { entries: 1, hits: 1, misses: 1 });
    }

    #[test]
    fn test_zero_ttl_expires() {
        let mut cache = TtlCache::with_config(&config(0, 10));
        cache.put("a", 1);
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(cache.get(&"a"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_lru_eviction() {
        let mut cache = TtlCache::with_config(&config(60, 2));
        cache.put("a", 1);
        cache.put("b", 2);
        assert_eq!(cache.get(&"a"), Some(1));
        cache.put("c", 3);
        assert_eq!(cache.get(&"b"), None);
        assert_eq!(cache.get(&"a"), Some(1));
        assert_eq!(cache.get(&"c"), Some(3));
    }

    #[test]
    fn test_invalidation() {
        let mut cache = TtlCache::new();
        cache.put(("p1", 1), "x");
        cache.put(("p1", 2), "y");
        cache.put(("p2", 1), "z");
        assert!(cache.invalidate(&("p1", 1)));
        cache.invalidate_where(|(p, _)| *p == "p1");
        assert_eq!(cache.len(), 1);
        cache.invalidate_all();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_disabled_cache_never_stores() {
        let mut cache = TtlCache::with_config(&CacheConfig {
            enabled: false,
            ..CacheConfig::default()
        });
        cache.put(1, 1);
        assert_eq!(cache.get(&1), None);
    }
}
