//! Catalog pipeline metrics
//!
//! Independent counters use Relaxed ordering; the cache hit rate reads its
//! two counters with SeqCst so the ratio comes from one consistent snapshot.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;

use super::{MetricsError, MetricsResult};

#[derive(Debug, Default)]
pub struct CatalogMetrics {
    api_requests: AtomicU64,
    api_failures: AtomicU64,
    unauthorized_retries: AtomicU64,
    token_refreshes: AtomicU64,
    token_logins: AtomicU64,
    auth_failures: AtomicU64,
    pages_fetched: AtomicU64,
    page_failures: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    sync_runs: AtomicU64,
    last_sync_duration_ms: AtomicU64,
}

/// Point-in-time copy of every counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CatalogMetricsSnapshot {
    pub api_requests: u64,
    pub api_failures: u64,
    pub unauthorized_retries: u64,
    pub token_refreshes: u64,
    pub token_logins: u64,
    pub auth_failures: u64,
    pub pages_fetched: u64,
    pub page_failures: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub sync_runs: u64,
    pub last_sync_duration_ms: u64,
}

impl CatalogMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_api_request(&self, success: bool) -> MetricsResult<()> {
        self.api_requests.fetch_add(1, Ordering::Relaxed);
        if !success {
            self.api_failures.fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    }

    /// A catalog call got a 401 and was retried after a forced refresh.
    pub fn record_unauthorized_retry(&self) -> MetricsResult<()> {
        self.unauthorized_retries.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    pub fn record_token_refresh(&self) -> MetricsResult<()> {
        self.token_refreshes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    pub fn record_token_login(&self) -> MetricsResult<()> {
        self.token_logins.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    pub fn record_auth_failure(&self) -> MetricsResult<()> {
        self.auth_failures.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    pub fn record_page(&self, success: bool) -> MetricsResult<()> {
        if success {
            self.pages_fetched.fetch_add(1, Ordering::Relaxed);
        } else {
            self.page_failures.fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    }

    pub fn record_cache_hit(&self) -> MetricsResult<()> {
        self.cache_hits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    pub fn record_cache_miss(&self) -> MetricsResult<()> {
        self.cache_misses.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    pub fn record_sync_run(&self, duration: Duration) -> MetricsResult<()> {
        self.sync_runs.fetch_add(1, Ordering::Relaxed);
        let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        self.last_sync_duration_ms.store(millis, Ordering::Relaxed);
        Ok(())
    }

    /// Cache hit rate as a percentage (0.0 to 100.0).
    pub fn cache_hit_rate(&self) -> MetricsResult<f64> {
        let hits = self.cache_hits.load(Ordering::SeqCst);
        let misses = self.cache_misses.load(Ordering::SeqCst);
        let total = hits + misses;
        if total == 0 {
            return Err(MetricsError::EmptyData { metric: "cache_hit_rate" });
        }
        Ok((hits as f64 / total as f64) * 100.0)
    }

    pub fn last_sync_duration(&self) -> MetricsResult<Duration> {
        if self.sync_runs.load(Ordering::Relaxed) == 0 {
            return Err(MetricsError::EmptyData { metric: "last_sync_duration" });
        }
        Ok(Duration::from_millis(self.last_sync_duration_ms.load(Ordering::Relaxed)))
    }

    pub fn snapshot(&self) -> CatalogMetricsSnapshot {
        CatalogMetricsSnapshot {
            api_requests: self.api_requests.load(Ordering::Relaxed),
            api_failures: self.api_failures.load(Ordering::Relaxed),
            unauthorized_retries: self.unauthorized_retries.load(Ordering::Relaxed),
            token_refreshes: self.token_refreshes.load(Ordering::Relaxed),
            token_logins: self.token_logins.load(Ordering::Relaxed),
            auth_failures: self.auth_failures.load(Ordering::Relaxed),
            pages_fetched: self.pages_fetched.load(Ordering::Relaxed),
            page_failures: self.page_failures.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::SeqCst),
            cache_misses: self.cache_misses.load(Ordering::SeqCst),
            sync_runs: self.sync_runs.load(Ordering::Relaxed),
            last_sync_duration_ms: self.last_sync_duration_ms.load(Ordering::Relaxed),
        }
    }
}
