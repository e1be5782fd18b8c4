//! Read-through cache over a [`CatalogSource`]
//!
//! - **Keys**: one variant per operation, carrying its arguments
//! - **Values**: shared item lists, never partially updated
//! - **Errors**: failed loads are returned to the caller and never cached
//! - **TTL**: 30 minutes by default, configurable via [`CacheConfig`]

use std::sync::Arc;

use carindex_core::CatalogSource;
use carindex_domain::{CacheConfig, CarIndexError, CatalogItem, Result};
use moka::future::Cache;
use tracing::{debug, info};

use crate::observability::{log_metric, CatalogMetrics};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Years,
    Brands { year: Option<i32> },
    Models { year: i32, brand_id: String },
    Versions { year: i32, brand_id: String, model_id: String },
}

type Items = Arc<Vec<CatalogItem>>;

/// Downstream-facing catalog with per-call-signature caching.
pub struct CachedCatalog {
    source: Arc<dyn CatalogSource>,
    cache: Cache<CacheKey, Items>,
    metrics: Arc<CatalogMetrics>,
}

impl CachedCatalog {
    pub fn new(source: Arc<dyn CatalogSource>, config: &CacheConfig, metrics: Arc<CatalogMetrics>) -> Self {
        info!(ttl_secs = config.ttl_secs, max_capacity = config.max_capacity, "catalog cache configured");
        let cache = Cache::builder().max_capacity(config.max_capacity).time_to_live(config.ttl()).build();
        Self { source, cache, metrics }
    }

    /// Years rendered as items whose id and name are the year itself.
    pub async fn years(&self) -> Result<Items> {
        let source = self.source.clone();
        self.load(CacheKey::Years, async move {
            Ok(source.years().await?.into_iter().map(year_item).collect())
        })
        .await
    }

    pub async fn brands(&self, year: Option<i32>) -> Result<Items> {
        let source = self.source.clone();
        self.load(CacheKey::Brands { year }, async move { source.brands(year).await }).await
    }

    pub async fn models(&self, year: i32, brand_id: &str) -> Result<Items> {
        let source = self.source.clone();
        let key = CacheKey::Models { year, brand_id: brand_id.to_string() };
        let brand_id = brand_id.to_string();
        self.load(key, async move { source.models(year, &brand_id).await }).await
    }

    pub async fn versions(&self, year: i32, brand_id: &str, model_id: &str) -> Result<Items> {
        let source = self.source.clone();
        let key = CacheKey::Versions {
            year,
            brand_id: brand_id.to_string(),
            model_id: model_id.to_string(),
        };
        let (brand_id, model_id) = (brand_id.to_string(), model_id.to_string());
        self.load(key, async move { source.versions(year, &brand_id, &model_id).await }).await
    }

    /// Drop every cached entry.
    pub async fn clear(&self) {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
        info!("catalog cache cleared");
    }

    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    async fn load<F>(&self, key: CacheKey, init: F) -> Result<Items>
    where
        F: std::future::Future<Output = Result<Vec<CatalogItem>>>,
    {
        let entry = self
            .cache
            .entry(key.clone())
            .or_try_insert_with(async move { init.await.map(Arc::new) })
            .await
            .map_err(|err: Arc<CarIndexError>| CarIndexError::clone(&err))?;

        if entry.is_fresh() {
            log_metric(self.metrics.record_cache_miss(), "catalog.cache.misses");
            debug!(?key, "catalog cache miss");
        } else {
            log_metric(self.metrics.record_cache_hit(), "catalog.cache.hits");
        }
        Ok(entry.into_value())
    }
}

fn year_item(year: i32) -> CatalogItem {
    CatalogItem::new(year.to_string(), year.to_string())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;

    #[derive(Default)]
    struct CountingSource {
        calls: AtomicUsize,
        fail_models: bool,
    }

    #[async_trait]
    impl CatalogSource for CountingSource {
        async fn years(&self) -> Result<Vec<i32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![2024, 2023])
        }

        async fn brands(&self, year: Option<i32>) -> Result<Vec<CatalogItem>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![CatalogItem::new("1", format!("Brand {year:?}"))])
        }

        async fn models(&self, _year: i32, brand_id: &str) -> Result<Vec<CatalogItem>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_models {
                return Err(CarIndexError::Network("upstream down".into()));
            }
            Ok(vec![CatalogItem::new("10", format!("Model of {brand_id}"))])
        }

        async fn versions(&self, _year: i32, _brand_id: &str, _model_id: &str) -> Result<Vec<CatalogItem>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![CatalogItem::new("v", "Version")])
        }
    }

    fn cached(source: Arc<CountingSource>) -> (CachedCatalog, Arc<CatalogMetrics>) {
        let metrics = Arc::new(CatalogMetrics::new());
        (CachedCatalog::new(source, &CacheConfig::default(), metrics.clone()), metrics)
    }

    #[tokio::test]
    async fn repeated_calls_hit_the_cache() {
        let source = Arc::new(CountingSource::default());
        let (catalog, metrics) = cached(source.clone());

        let first = catalog.years().await.unwrap();
        let second = catalog.years().await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first[0], CatalogItem::new("2024", "2024"));
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        assert_eq!(metrics.snapshot().cache_hits, 1);
        assert_eq!(metrics.snapshot().cache_misses, 1);
    }

    #[tokio::test]
    async fn arguments_are_part_of_the_key() {
        let source = Arc::new(CountingSource::default());
        let (catalog, _) = cached(source.clone());

        catalog.brands(Some(2024)).await.unwrap();
        catalog.brands(None).await.unwrap();
        catalog.models(2024, "1").await.unwrap();
        catalog.models(2024, "2").await.unwrap();
        catalog.versions(2024, "1", "10").await.unwrap();
        catalog.versions(2024, "1", "10").await.unwrap();

        assert_eq!(source.calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn clear_forces_reload() {
        let source = Arc::new(CountingSource::default());
        let (catalog, _) = cached(source.clone());

        catalog.brands(None).await.unwrap();
        catalog.clear().await;
        catalog.brands(None).await.unwrap();

        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let source = Arc::new(CountingSource { fail_models: true, ..Default::default() });
        let (catalog, _) = cached(source.clone());

        assert!(catalog.models(2024, "1").await.is_err());
        assert!(catalog.models(2024, "1").await.is_err());

        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
        assert_eq!(catalog.entry_count(), 0);
    }
}
