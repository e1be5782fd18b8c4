//! Application context - dependency injection container

use std::sync::Arc;

use carindex_core::SyncOrchestrator;
use carindex_domain::{CarIndexError, Config, Result};
use carindex_infra::scheduling::SchedulerError;
use carindex_infra::{
    CachedCatalog, CatalogClient, CatalogMetrics, CatalogSchedulerConfig, CatalogSyncScheduler,
    DbManager, SqliteCatalogStore,
};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::utils::health::{ComponentHealth, HealthStatus};

/// Application context - holds all services and dependencies
pub struct AppContext {
    pub config: Config,
    pub db: Arc<DbManager>,
    pub store: Arc<SqliteCatalogStore>,
    pub client: Arc<CatalogClient>,
    /// Downstream-facing, cached view of the remote catalog
    pub catalog: Arc<CachedCatalog>,
    pub orchestrator: Arc<SyncOrchestrator>,
    pub metrics: Arc<CatalogMetrics>,

    /// Present only when periodic sync is enabled
    scheduler: Mutex<Option<CatalogSyncScheduler>>,
}

impl AppContext {
    /// Wire every component from `config`.
    ///
    /// The scheduler is constructed but not started; see
    /// [`AppContext::start_scheduler`].
    pub async fn new_with_config(config: Config) -> Result<Self> {
        config.validate()?;

        let db = Arc::new(DbManager::from_config(&config.database)?);
        db.run_migrations()?;

        let metrics = Arc::new(CatalogMetrics::new());
        let store = Arc::new(SqliteCatalogStore::new(db.clone()));
        let client = Arc::new(CatalogClient::from_config(&config.catalog, metrics.clone())?);
        let catalog = Arc::new(CachedCatalog::new(client.clone(), &config.cache, metrics.clone()));
        let orchestrator = Arc::new(
            SyncOrchestrator::new(client.clone(), store.clone())
                .with_source_tag(config.sync.source_tag.clone()),
        );

        let scheduler = if config.sync.enabled {
            let scheduler = CatalogSyncScheduler::with_config(
                CatalogSchedulerConfig::from_sync_config(&config.sync),
                orchestrator.clone(),
                metrics.clone(),
            )
            .await
            .map_err(|err| {
                tracing::error!(error = %err, "failed to construct catalog sync scheduler");
                CarIndexError::from(err)
            })?;
            Some(scheduler)
        } else {
            info!("periodic catalog sync disabled");
            None
        };

        info!(db_path = %db.path().display(), sync_enabled = config.sync.enabled, "application context ready");

        Ok(Self {
            config,
            db,
            store,
            client,
            catalog,
            orchestrator,
            metrics,
            scheduler: Mutex::new(scheduler),
        })
    }

    /// Start periodic sync. Returns `false` when sync is disabled.
    pub async fn start_scheduler(&self) -> Result<bool> {
        let mut guard = self.scheduler.lock().await;
        let Some(scheduler) = guard.as_mut() else {
            return Ok(false);
        };

        scheduler.start().await.map_err(|err| {
            tracing::error!(error = %err, "failed to start catalog sync scheduler");
            CarIndexError::from(err)
        })?;
        Ok(true)
    }

    pub async fn scheduler_running(&self) -> bool {
        self.scheduler.lock().await.as_ref().is_some_and(CatalogSyncScheduler::is_running)
    }

    /// Probe each component; never fails.
    pub async fn health_check(&self) -> HealthStatus {
        let mut components = vec![self.check_database_health().await];

        components.push(if self.client.credentials().has_valid_token() {
            ComponentHealth::healthy("credentials")
        } else {
            ComponentHealth::healthy_with("credentials", "no cached token; next call logs in")
        });

        components.push(ComponentHealth::healthy_with(
            "catalog_cache",
            format!("{} entries", self.catalog.entry_count()),
        ));

        components.push(match self.scheduler.lock().await.as_ref() {
            None => ComponentHealth::healthy_with("scheduler", "disabled"),
            Some(scheduler) if scheduler.is_running() => ComponentHealth::healthy("scheduler"),
            Some(_) => ComponentHealth::unhealthy("scheduler", "enabled but not running"),
        });

        HealthStatus::from_components(components)
    }

    async fn check_database_health(&self) -> ComponentHealth {
        let db = self.db.clone();
        match tokio::task::spawn_blocking(move || db.health_check()).await {
            Ok(Ok(())) => ComponentHealth::healthy("database"),
            Ok(Err(err)) => {
                warn!(error = %err, "database health check failed");
                ComponentHealth::unhealthy("database", format!("query failed: {err}"))
            }
            Err(err) => {
                tracing::error!(error = %err, "database health check task panicked");
                ComponentHealth::unhealthy("database", format!("task panic: {err}"))
            }
        }
    }

    /// Stop the scheduler (cancelling any walk it started). Idempotent.
    pub async fn shutdown(&self) -> Result<()> {
        info!("shutdown called on AppContext");

        let mut guard = self.scheduler.lock().await;
        if let Some(scheduler) = guard.as_mut() {
            match scheduler.stop().await {
                Ok(()) | Err(SchedulerError::NotRunning) => {}
                Err(err) => {
                    warn!(error = %err, "catalog sync scheduler did not stop cleanly");
                    return Err(err.into());
                }
            }
        }

        let snapshot = self.metrics.snapshot();
        info!(
            api_requests = snapshot.api_requests,
            sync_runs = snapshot.sync_runs,
            cache_hits = snapshot.cache_hits,
            "application context shut down"
        );
        Ok(())
    }
}
