//! Cron-driven catalog synchronization.
//!
//! Each tick runs [`SyncOrchestrator::sync_all_with_cancel`]. A tick that
//! arrives while a walk is still in progress is skipped by the orchestrator's
//! own guard. Stopping the scheduler cancels the in-flight walk between
//! nodes, and every lifecycle operation is wrapped in a timeout.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use carindex_core::SyncOrchestrator;
//! use carindex_domain::SyncConfig;
//! use carindex_infra::observability::CatalogMetrics;
//! use carindex_infra::scheduling::{CatalogSchedulerConfig, CatalogSyncScheduler, SchedulerResult};
//!
//! # async fn example(orchestrator: Arc<SyncOrchestrator>) -> SchedulerResult<()> {
//! let config = CatalogSchedulerConfig::from_sync_config(&SyncConfig::default());
//! let mut scheduler =
//!     CatalogSyncScheduler::with_config(config, orchestrator, Arc::new(CatalogMetrics::new())).await?;
//!
//! scheduler.start().await?;
//! // ... application runs ...
//! scheduler.stop().await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use carindex_core::{SyncError, SyncOrchestrator};
use carindex_domain::SyncConfig;
use parking_lot::Mutex;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_cron_scheduler::{Job, JobScheduler};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::observability::{log_metric, CatalogMetrics};
use crate::scheduling::error::{SchedulerError, SchedulerResult};

#[derive(Debug, Clone)]
pub struct CatalogSchedulerConfig {
    /// Six-field cron expression (seconds first).
    pub cron_expression: String,
    pub start_timeout: Duration,
    pub stop_timeout: Duration,
    /// Timeout for awaiting the monitor task join handle.
    pub join_timeout: Duration,
}

impl CatalogSchedulerConfig {
    pub fn from_sync_config(config: &SyncConfig) -> Self {
        Self {
            cron_expression: config.cron_expression.clone(),
            start_timeout: config.job_timeout(),
            stop_timeout: config.job_timeout(),
            join_timeout: config.job_timeout(),
        }
    }
}

impl Default for CatalogSchedulerConfig {
    fn default() -> Self {
        Self::from_sync_config(&SyncConfig::default())
    }
}

/// Catalog sync scheduler with explicit lifecycle management.
pub struct CatalogSyncScheduler {
    scheduler: Arc<RwLock<JobScheduler>>,
    config: CatalogSchedulerConfig,
    job_id: Uuid,
    monitor_handle: Option<JoinHandle<()>>,
    /// Token handed to each walk; replaced on every start.
    cancellation: Arc<Mutex<CancellationToken>>,
    orchestrator: Arc<SyncOrchestrator>,
    metrics: Arc<CatalogMetrics>,
}

impl CatalogSyncScheduler {
    pub async fn with_config(
        config: CatalogSchedulerConfig,
        orchestrator: Arc<SyncOrchestrator>,
        metrics: Arc<CatalogMetrics>,
    ) -> SchedulerResult<Self> {
        let raw_scheduler =
            JobScheduler::new().await.map_err(|source| SchedulerError::CreationFailed { source })?;

        let mut scheduler = Self {
            scheduler: Arc::new(RwLock::new(raw_scheduler)),
            config,
            job_id: Uuid::nil(),
            monitor_handle: None,
            cancellation: Arc::new(Mutex::new(CancellationToken::new())),
            orchestrator,
            metrics,
        };

        scheduler.job_id = scheduler.register_sync_job().await?;
        Ok(scheduler)
    }

    #[instrument(skip(self), fields(cron = %self.config.cron_expression))]
    pub async fn start(&mut self) -> SchedulerResult<()> {
        if self.is_running() {
            return Err(SchedulerError::AlreadyRunning);
        }

        let cancel = CancellationToken::new();
        *self.cancellation.lock() = cancel.clone();

        let scheduler = self.scheduler.clone();
        let start_timeout = self.config.start_timeout;
        tokio::time::timeout(start_timeout, async move {
            let guard = scheduler.write().await;
            guard.start().await
        })
        .await
        .map_err(|source| SchedulerError::Timeout { duration: start_timeout, source })?
        .map_err(|source| SchedulerError::StartFailed { source })?;

        self.monitor_handle = Some(tokio::spawn(async move {
            cancel.cancelled().await;
            debug!("catalog scheduler monitor cancelled");
        }));

        info!(job_id = %self.job_id, "catalog sync scheduler started");
        Ok(())
    }

    /// Stop ticking and cancel any walk in progress.
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> SchedulerResult<()> {
        if !self.is_running() {
            return Err(SchedulerError::NotRunning);
        }

        self.cancellation.lock().cancel();

        let scheduler = self.scheduler.clone();
        let stop_timeout = self.config.stop_timeout;
        tokio::time::timeout(stop_timeout, async move {
            let mut guard = scheduler.write().await;
            guard.shutdown().await
        })
        .await
        .map_err(|source| SchedulerError::Timeout { duration: stop_timeout, source })?
        .map_err(|source| SchedulerError::StopFailed { source })?;

        if let Some(handle) = self.monitor_handle.take() {
            let join_timeout = self.config.join_timeout;
            tokio::time::timeout(join_timeout, handle)
                .await
                .map_err(|source| SchedulerError::Timeout { duration: join_timeout, source })??;
        }

        info!("catalog sync scheduler stopped");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.monitor_handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    pub fn job_id(&self) -> Uuid {
        self.job_id
    }

    async fn register_sync_job(&mut self) -> SchedulerResult<Uuid> {
        if self.job_id != Uuid::nil() {
            return Ok(self.job_id);
        }

        let orchestrator = self.orchestrator.clone();
        let metrics = self.metrics.clone();
        let cancellation = self.cancellation.clone();

        let job_definition = Job::new_async(self.config.cron_expression.as_str(), move |_id, _lock| {
            let orchestrator = orchestrator.clone();
            let metrics = metrics.clone();
            let cancel = cancellation.lock().clone();
            Box::pin(async move { run_scheduled_sync(&orchestrator, &metrics, cancel).await })
        })
        .map_err(|source| SchedulerError::JobRegistrationFailed { source })?;

        let job_id = job_definition.guid();
        let scheduler = self.scheduler.write().await;
        scheduler
            .add(job_definition)
            .await
            .map_err(|source| SchedulerError::JobRegistrationFailed { source })?;

        debug!(cron = %self.config.cron_expression, %job_id, "registered catalog sync job");
        Ok(job_id)
    }
}

async fn run_scheduled_sync(
    orchestrator: &SyncOrchestrator,
    metrics: &CatalogMetrics,
    cancel: CancellationToken,
) {
    if cancel.is_cancelled() {
        return;
    }

    let started = Instant::now();
    match orchestrator.sync_all_with_cancel(cancel).await {
        Ok(summary) => {
            log_metric(metrics.record_sync_run(started.elapsed()), "scheduler.sync.duration");
            info!(
                run_id = %summary.run_id,
                total_vehicles = summary.total_vehicles,
                errors = summary.errors,
                cancelled = summary.cancelled,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "scheduled catalog sync finished"
            );
        }
        Err(SyncError::AlreadyRunning) => {
            info!("catalog sync still in progress; skipping tick");
        }
        Err(err) => {
            log_metric(metrics.record_sync_run(started.elapsed()), "scheduler.sync.duration");
            error!(error = %err, "scheduled catalog sync failed");
        }
    }
}

impl Drop for CatalogSyncScheduler {
    fn drop(&mut self) {
        if self.is_running() {
            warn!("CatalogSyncScheduler dropped while running; cancelling tasks");
            self.cancellation.lock().cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use carindex_core::{CatalogSource, CatalogStore};
    use carindex_domain::{CatalogField, CatalogItem, RecordFilter, Result, SyncRecord};
    use chrono::{DateTime, Utc};

    use super::*;

    /// Ten years, one brand each, `brand_delay` per brand lookup.
    struct SlowSource {
        brand_delay: Duration,
    }

    #[async_trait]
    impl CatalogSource for SlowSource {
        async fn years(&self) -> Result<Vec<i32>> {
            Ok((2015..2025).rev().collect())
        }

        async fn brands(&self, _year: Option<i32>) -> Result<Vec<CatalogItem>> {
            tokio::time::sleep(self.brand_delay).await;
            Ok(vec![CatalogItem::new("1", "Fiat")])
        }

        async fn models(&self, _year: i32, _brand_id: &str) -> Result<Vec<CatalogItem>> {
            Ok(vec![CatalogItem::new("10", "Uno")])
        }

        async fn versions(&self, _year: i32, _brand_id: &str, _model_id: &str) -> Result<Vec<CatalogItem>> {
            Ok(vec![CatalogItem::new("100", "Way")])
        }
    }

    #[derive(Default)]
    struct CountingStore {
        upserts: AtomicUsize,
    }

    #[async_trait]
    impl CatalogStore for CountingStore {
        async fn upsert(&self, record: &SyncRecord) -> Result<SyncRecord> {
            self.upserts.fetch_add(1, Ordering::SeqCst);
            Ok(record.clone())
        }

        async fn distinct(&self, _field: CatalogField, _filter: &RecordFilter) -> Result<Vec<String>> {
            Ok(Vec::new())
        }

        async fn count(&self, _filter: &RecordFilter) -> Result<u64> {
            Ok(self.upserts.load(Ordering::SeqCst) as u64)
        }

        async fn latest_sync(&self) -> Result<Option<DateTime<Utc>>> {
            Ok(None)
        }
    }

    fn fast_config() -> CatalogSchedulerConfig {
        CatalogSchedulerConfig {
            cron_expression: "*/1 * * * * *".into(),
            start_timeout: Duration::from_secs(2),
            stop_timeout: Duration::from_secs(2),
            join_timeout: Duration::from_secs(2),
        }
    }

    fn orchestrator(brand_delay: Duration) -> (Arc<SyncOrchestrator>, Arc<CountingStore>) {
        let store = Arc::new(CountingStore::default());
        let orchestrator = SyncOrchestrator::new(Arc::new(SlowSource { brand_delay }), store.clone());
        (Arc::new(orchestrator), store)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn scheduled_tick_runs_a_sync() {
        let (orchestrator, store) = orchestrator(Duration::ZERO);
        let metrics = Arc::new(CatalogMetrics::new());
        let mut scheduler = CatalogSyncScheduler::with_config(fast_config(), orchestrator, metrics.clone())
            .await
            .expect("scheduler created");

        scheduler.start().await.expect("start succeeds");
        tokio::time::sleep(Duration::from_millis(2500)).await;
        scheduler.stop().await.expect("stop succeeds");

        assert!(metrics.snapshot().sync_runs >= 1);
        assert!(store.upserts.load(Ordering::SeqCst) >= 10);
        assert!(!scheduler.is_running());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn double_start_is_rejected() {
        let (orchestrator, _) = orchestrator(Duration::ZERO);
        let mut scheduler =
            CatalogSyncScheduler::with_config(fast_config(), orchestrator, Arc::new(CatalogMetrics::new()))
                .await
                .expect("scheduler created");

        scheduler.start().await.expect("first start");
        let err = scheduler.start().await.expect_err("second start fails");
        assert!(matches!(err, SchedulerError::AlreadyRunning));
        scheduler.stop().await.expect("stop succeeds");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn stop_without_start_is_rejected() {
        let (orchestrator, _) = orchestrator(Duration::ZERO);
        let mut scheduler =
            CatalogSyncScheduler::with_config(fast_config(), orchestrator, Arc::new(CatalogMetrics::new()))
                .await
                .expect("scheduler created");

        assert!(matches!(scheduler.stop().await, Err(SchedulerError::NotRunning)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn stop_cancels_walk_in_progress() {
        let (orchestrator, store) = orchestrator(Duration::from_millis(400));
        let mut scheduler =
            CatalogSyncScheduler::with_config(fast_config(), orchestrator.clone(), Arc::new(CatalogMetrics::new()))
                .await
                .expect("scheduler created");

        scheduler.start().await.expect("start succeeds");
        let deadline = Instant::now() + Duration::from_secs(3);
        while !orchestrator.is_running() && Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(orchestrator.is_running(), "sync never started");

        scheduler.stop().await.expect("stop succeeds");
        let deadline = Instant::now() + Duration::from_secs(2);
        while orchestrator.is_running() && Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        assert!(!orchestrator.is_running());
        assert!(store.upserts.load(Ordering::SeqCst) < 10);
    }

    #[tokio::test]
    async fn invalid_cron_expression_fails_registration() {
        let (orchestrator, _) = orchestrator(Duration::ZERO);
        let config = CatalogSchedulerConfig { cron_expression: "not a cron".into(), ..fast_config() };

        let result = CatalogSyncScheduler::with_config(config, orchestrator, Arc::new(CatalogMetrics::new())).await;
        assert!(matches!(result, Err(SchedulerError::JobRegistrationFailed { .. })));
    }
}
