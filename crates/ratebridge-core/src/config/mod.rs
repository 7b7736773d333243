//! Configuration access
//!
//! Pipelines, mappings, rules and the external-system registry are authored
//! and stored elsewhere; the engine reads them through [`ConfigProvider`].
//! Records are read-only during a run.
//!
//! # Module Organization
//!
//! - [`bundle`] - a self-contained configuration document loaded from a file
//! - [`cache`] - TTL cache and the caching provider wrapper
//!
//! Copyright (c) 2025 RateBridge Team
//! Licensed under the Apache-2.0 license

pub mod bundle;
pub mod cache;

use crate::error::Result;
use crate::http::ExternalSystem;
use crate::pipeline::Pipeline;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

pub use bundle::ConfigBundle;
pub use cache::{CacheConfig, CacheStats, TtlCache};

/// Source of pipeline and system records
#[async_trait]
pub trait ConfigProvider: Send + Sync {
    /// A pipeline with its steps, routing rules, mappings and rules
    async fn pipeline(&self, id: &str) -> Result<Option<Arc<Pipeline>>>;

    /// Every known pipeline, used for routing
    async fn pipelines(&self) -> Result<Vec<Arc<Pipeline>>>;

    /// A registered external system
    async fn system(&self, code: &str) -> Result<Option<ExternalSystem>>;
}

#[async_trait]
impl<T: ConfigProvider + ?Sized> ConfigProvider for Arc<T> {
    async fn pipeline(&self, id: &str) -> Result<Option<Arc<Pipeline>>> {
        (**self).pipeline(id).await
    }

    async fn pipelines(&self) -> Result<Vec<Arc<Pipeline>>> {
        (**self).pipelines().await
    }

    async fn system(&self, code: &str) -> Result<Option<ExternalSystem>> {
        (**self).system(code).await
    }
}

/// Serves repeated reads from a TTL cache
///
/// Misses are cached too. Invalidation is explicit or by expiry.
pub struct CachedConfigProvider {
    inner: Arc<dyn ConfigProvider>,
    pipelines: Mutex<TtlCache<String, Option<Arc<Pipeline>>>>,
    catalog: Mutex<TtlCache<(), Vec<Arc<Pipeline>>>>,
    systems: Mutex<TtlCache<String, Option<ExternalSystem>>>,
}

impl CachedConfigProvider {
    pub fn new(inner: Arc<dyn ConfigProvider>, config: &CacheConfig) -> Self {
        Self {
            inner,
            pipelines: Mutex::new(TtlCache::with_config(config)),
            catalog: Mutex::new(TtlCache::with_config(config)),
            systems: Mutex::new(TtlCache::with_config(config)),
        }
    }

    /// Drop one pipeline and the routing catalog
    pub fn invalidate_pipeline(&self, id: &str) {
        if let Ok(mut cache) = self.pipelines.lock() {
            cache.invalidate(&id.to_string());
        }
        if let Ok(mut cache) = self.catalog.lock() {
            cache.invalidate_all();
        }
    }

    pub fn invalidate_system(&self, code: &str) {
        if let Ok(mut cache) = self.systems.lock() {
            cache.invalidate(&code.to_string());
        }
    }

    pub fn invalidate_all(&self) {
        if let Ok(mut cache) = self.pipelines.lock() {
            cache.invalidate_all();
        }
        if let Ok(mut cache) = self.catalog.lock() {
            cache.invalidate_all();
        }
        if let Ok(mut cache) = self.systems.lock() {
            cache.invalidate_all();
        }
    }

    pub fn pipeline_stats(&self) -> CacheStats {
        self.pipelines.lock().map(|c| c.stats()).unwrap_or_default()
    }
}

fn cached<K, V>(cache: &Mutex<TtlCache<K, V>>, key: &K) -> Option<V>
where
    K: Eq + std::hash::Hash + Clone,
    V: Clone,
{
    cache.lock().ok().and_then(|mut c| c.get(key))
}

fn store<K, V>(cache: &Mutex<TtlCache<K, V>>, key: K, value: V)
where
    K: Eq + std::hash::Hash + Clone,
    V: Clone,
{
    if let Ok(mut c) = cache.lock() {
        c.put(key, value);
    }
}

#[async_trait]
impl ConfigProvider for CachedConfigProvider {
    async fn pipeline(&self, id: &str) -> Result<Option<Arc<Pipeline>>> {
        let key = id.to_string();
        if let Some(hit) = cached(&self.pipelines, &key) {
            return Ok(hit);
        }
        let value = self.inner.pipeline(id).await?;
        store(&self.pipelines, key, value.clone());
        Ok(value)
    }

    async fn pipelines(&self) -> Result<Vec<Arc<Pipeline>>> {
        if let Some(hit) = cached(&self.catalog, &()) {
            return Ok(hit);
        }
        let value = self.inner.pipelines().await?;
        store(&self.catalog, (), value.clone());
        Ok(value)
    }

    async fn system(&self, code: &str) -> Result<Option<ExternalSystem>> {
        let key = code.to_string();
        if let Some(hit) = cached(&self.systems, &key) {
            return Ok(hit);
        }
        let value = self.inner.system(code).await?;
        store(&self.systems, key, value.clone());
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingProvider {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ConfigProvider for CountingProvider {
        async fn pipeline(&self, id: &str) -> Result<Option<Arc<Pipeline>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok((id == "known").then(|| Arc::new(Pipeline::new(id))))
        }

        async fn pipelines(&self) -> Result<Vec<Arc<Pipeline>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![Arc::new(Pipeline::new("known"))])
        }

        async fn system(&self, _code: &str) -> Result<Option<ExternalSystem>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(None)
        }
    }

    #[tokio::test]
    async fn test_repeated_reads_hit_the_cache() {
        let inner = Arc::new(CountingProvider::default());
        let provider = CachedConfigProvider::new(inner.clone(), &CacheConfig::default());

        assert!(provider.pipeline("known").await.unwrap().is_some());
        assert!(provider.pipeline("known").await.unwrap().is_some());
        assert!(provider.pipeline("missing").await.unwrap().is_none());
        assert!(provider.pipeline("missing").await.unwrap().is_none());
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);

        let stats = provider.pipeline_stats();
        assert_eq!(stats.hits, 2);
    }

    #[tokio::test]
    async fn test_invalidation_forces_reload() {
        let inner = Arc::new(CountingProvider::default());
        let provider = CachedConfigProvider::new(inner.clone(), &CacheConfig::default());

        provider.pipeline("known").await.unwrap();
        provider.pipelines().await.unwrap();
        provider.invalidate_pipeline("known");
        provider.pipeline("known").await.unwrap();
        provider.pipelines().await.unwrap();
        assert_eq!(inner.calls.load(Ordering::SeqCst), 4);

        provider.system("rater").await.unwrap();
        provider.invalidate_all();
        provider.system("rater").await.unwrap();
        assert_eq!(inner.calls.load(Ordering::SeqCst), 6);
    }

    #[tokio::test]
    async fn test_disabled_cache_always_delegates() {
        let inner = Arc::new(CountingProvider::default());
        let config = CacheConfig {
            enabled: false,
            ..CacheConfig::default()
        };
        let provider = CachedConfigProvider::new(inner.clone(), &config);
        provider.system("a").await.unwrap();
        provider.system("a").await.unwrap();
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
    }
}
