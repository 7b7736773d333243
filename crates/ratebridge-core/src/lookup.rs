//! Lookup tables
//!
//! A lookup table is a named key to value store used by `lookup`
//! transformations and `enrich` steps. The store itself lives outside the
//! engine; it is reached through [`LookupResolver`].
//!
//! Copyright (c) 2025 RateBridge Team
//! Licensed under the Apache-2.0 license

use crate::config::cache::{CacheConfig, TtlCache};
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Resolves `(table, key)` pairs to stored values
#[async_trait]
pub trait LookupResolver: Send + Sync {
    /// `Ok(None)` when the table exists but has no entry for `key`;
    /// an error when the table itself is unknown or the store fails
    async fn lookup(&self, table: &str, key: &str) -> Result<Option<Value>>;
}

/// Lookup tables held in memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryLookup {
    tables: HashMap<String, HashMap<String, Value>>,
}

impl InMemoryLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tables(tables: HashMap<String, HashMap<String, Value>>) -> Self {
        Self { tables }
    }

    /// Add or replace a whole table
    pub fn with_table<I, K>(mut self, name: impl Into<String>, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        self.tables
            .insert(name.into(), entries.into_iter().map(|(k, v)| (k.into(), v)).collect());
        self
    }

    /// Insert one entry, creating the table if needed
    pub fn insert(&mut self, table: impl Into<String>, key: impl Into<String>, value: Value) {
        self.tables.entry(table.into()).or_default().insert(key.into(), value);
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    pub fn table_len(&self, table: &str) -> Option<usize> {
        self.tables.get(table).map(HashMap::len)
    }

    /// Synchronous lookup used by the async trait impl
    pub fn get(&self, table: &str, key: &str) -> Result<Option<Value>> {
        let entries = self.tables.get(table).ok_or_else(|| Error::LookupTableNotFound {
            table: table.to_string(),
        })?;
        Ok(entries.get(key).cloned())
    }
}

#[async_trait]
impl LookupResolver for InMemoryLookup {
    async fn lookup(&self, table: &str, key: &str) -> Result<Option<Value>> {
        self.get(table, key)
    }
}

#[async_trait]
impl<T: LookupResolver + ?Sized> LookupResolver for Arc<T> {
    async fn lookup(&self, table: &str, key: &str) -> Result<Option<Value>> {
        (**self).lookup(table, key).await
    }
}

/// Caches resolved entries, including misses, for a short TTL
pub struct CachedLookup {
    inner: Arc<dyn LookupResolver>,
    cache: Mutex<TtlCache<(String, String), Option<Value>>>,
}

impl CachedLookup {
    pub fn new(inner: Arc<dyn LookupResolver>, config: &CacheConfig) -> Self {
        Self {
            inner,
            cache: Mutex::new(TtlCache::with_config(config)),
        }
    }

    /// Forget every cached entry of one table
    pub fn invalidate_table(&self, table: &str) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.invalidate_where(|(t, _)| t == table);
        }
    }

    pub fn invalidate_all(&self) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.invalidate_all();
        }
    }
}

#[async_trait]
impl LookupResolver for CachedLookup {
    async fn lookup(&self, table: &str, key: &str) -> Result<Option<Value>> {
        let cache_key = (table.to_string(), key.to_string());
        let cached = match self.cache.lock() {
            Ok(mut cache) => cache.get(&cache_key),
            Err(_) => None,
        };
        if let Some(hit) = cached {
            return Ok(hit);
        }

        let value = self.inner.lookup(table, key).await?;
        if let Ok(mut cache) = self.cache.lock() {
            cache.put(cache_key, value.clone());
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingLookup {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LookupResolver for CountingLookup {
        async fn lookup(&self, _table: &str, key: &str) -> Result<Option<Value>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Some(json!(format!("v-{}", key))))
        }
    }

    #[tokio::test]
    async fn test_in_memory_hit_and_miss() {
        let lookups = InMemoryLookup::new().with_table("state-territory", [("CA", json!("T1"))]);
        assert_eq!(lookups.lookup("state-territory", "CA").await.unwrap(), Some(json!("T1")));
        assert_eq!(lookups.lookup("state-territory", "ZZ").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_unknown_table_is_an_error() {
        let lookups = InMemoryLookup::new();
        let err = lookups.lookup("missing", "k").await.unwrap_err();
        assert!(matches!(err, Error::LookupTableNotFound { .. }));
    }

    #[tokio::test]
    async fn test_cached_lookup_reuses_entries() {
        let inner = Arc::new(CountingLookup { calls: AtomicUsize::new(0) });
        let cached = CachedLookup::new(inner.clone(), &CacheConfig::default());

        assert_eq!(cached.lookup("t", "a").await.unwrap(), Some(json!("v-a")));
        assert_eq!(cached.lookup("t", "a").await.unwrap(), Some(json!("v-a")));
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);

        cached.invalidate_table("t");
        cached.lookup("t", "a").await.unwrap();
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
    }
}
