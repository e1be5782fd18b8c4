//! Catalog synchronization service
//!
//! Walks year → brand → model → version depth-first and upserts every leaf.
//! Each node is handled by the same step: expand it, record the outcome,
//! continue with the next node. A failure below the year level is counted and
//! its subtree skipped; only year enumeration and credential failures end the
//! run.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use carindex_domain::constants::DEFAULT_SOURCE_TAG;
use carindex_domain::{
    CarIndexError, CatalogField, CatalogItem, RecordFilter, SyncLevel, SyncRecord, SyncStats,
    SyncSummary,
};
use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::errors::SyncError;
use super::ports::CatalogStore;
use crate::catalog::ports::CatalogSource;

/// One unit of work on the traversal stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogNode {
    Year(i32),
    Brand { year: i32, brand: CatalogItem },
    Model { year: i32, brand: CatalogItem, model: CatalogItem },
    Version { year: i32, brand: CatalogItem, model: CatalogItem, version: CatalogItem },
}

impl CatalogNode {
    pub fn level(&self) -> SyncLevel {
        match self {
            Self::Year(_) => SyncLevel::Year,
            Self::Brand { .. } => SyncLevel::Brand,
            Self::Model { .. } => SyncLevel::Model,
            Self::Version { .. } => SyncLevel::Version,
        }
    }
}

/// Clears the running flag when a run ends, however it ends.
struct RunGuard<'a>(&'a AtomicBool);

impl<'a> RunGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self, SyncError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| Self(flag))
            .map_err(|_| SyncError::AlreadyRunning)
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Materializes the remote catalog into a [`CatalogStore`].
pub struct SyncOrchestrator {
    source: Arc<dyn CatalogSource>,
    store: Arc<dyn CatalogStore>,
    source_tag: String,
    running: AtomicBool,
}

impl SyncOrchestrator {
    pub fn new(source: Arc<dyn CatalogSource>, store: Arc<dyn CatalogStore>) -> Self {
        Self { source, store, source_tag: DEFAULT_SOURCE_TAG.to_string(), running: AtomicBool::new(false) }
    }

    /// Override the `source` tag written on every record.
    pub fn with_source_tag(mut self, tag: impl Into<String>) -> Self {
        self.source_tag = tag.into();
        self
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Synchronize every year the catalog knows about.
    pub async fn sync_all(&self) -> Result<SyncSummary, SyncError> {
        self.sync_all_with_cancel(CancellationToken::new()).await
    }

    pub async fn sync_all_with_cancel(
        &self,
        cancel: CancellationToken,
    ) -> Result<SyncSummary, SyncError> {
        let _guard = RunGuard::acquire(&self.running)?;
        info!("catalog sync started");

        let years = self.source.years().await.map_err(|err| {
            warn!(error = %err, "failed to enumerate catalog years");
            if err.is_auth() {
                SyncError::Auth(err)
            } else {
                SyncError::Enumeration(err)
            }
        })?;

        let roots = years.into_iter().map(CatalogNode::Year).collect();
        self.walk(roots, &cancel).await
    }

    /// Synchronize a single year.
    pub async fn sync_year(&self, year: i32) -> Result<SyncSummary, SyncError> {
        self.sync_year_with_cancel(year, CancellationToken::new()).await
    }

    pub async fn sync_year_with_cancel(
        &self,
        year: i32,
        cancel: CancellationToken,
    ) -> Result<SyncSummary, SyncError> {
        let _guard = RunGuard::acquire(&self.running)?;
        info!(year, "catalog sync started");
        self.walk(vec![CatalogNode::Year(year)], &cancel).await
    }

    /// Statistics over the records currently in the store.
    pub async fn stats(&self) -> Result<SyncStats, SyncError> {
        let all = RecordFilter::default();

        let total_records = self.store.count(&all).await.map_err(SyncError::Store)?;
        let mut years: Vec<i32> = self
            .store
            .distinct(CatalogField::Year, &all)
            .await
            .map_err(SyncError::Store)?
            .iter()
            .filter_map(|value| value.parse().ok())
            .collect();
        years.sort_unstable_by(|a, b| b.cmp(a));
        let brand_count =
            self.store.distinct(CatalogField::BrandId, &all).await.map_err(SyncError::Store)?.len()
                as u64;
        let last_sync = self.store.latest_sync().await.map_err(SyncError::Store)?;

        Ok(SyncStats { total_records, years, brand_count, last_sync })
    }

    async fn walk(
        &self,
        roots: Vec<CatalogNode>,
        cancel: &CancellationToken,
    ) -> Result<SyncSummary, SyncError> {
        let mut summary = SyncSummary::begin();
        let mut stack: Vec<CatalogNode> = roots.into_iter().rev().collect();

        while let Some(node) = stack.pop() {
            if cancel.is_cancelled() {
                info!(pending = stack.len() + 1, "catalog sync cancelled");
                return Ok(summary.finish(true));
            }

            if let CatalogNode::Version { .. } = node {
                self.persist(node, &mut summary).await;
                continue;
            }

            let level = node.level();
            match self.expand(&node).await {
                Ok(children) => {
                    summary.record_visit(level);
                    stack.extend(children.into_iter().rev());
                }
                Err(err) if err.is_auth() => {
                    warn!(sync_level = %level, error = %err, "catalog sync aborted on authentication failure");
                    return Err(SyncError::Auth(err));
                }
                Err(err) => {
                    warn!(sync_level = %level, node = ?node, error = %err, "skipping catalog subtree");
                    summary.record_enumeration_error(level);
                }
            }
        }

        let summary = summary.finish(false);
        info!(
            total_vehicles = summary.total_vehicles,
            errors = summary.errors,
            years = summary.years,
            brands = summary.brands,
            models = summary.models,
            "catalog sync finished"
        );
        Ok(summary)
    }

    async fn expand(&self, node: &CatalogNode) -> Result<Vec<CatalogNode>, CarIndexError> {
        let children = match node {
            CatalogNode::Year(year) => self
                .source
                .brands(Some(*year))
                .await?
                .into_iter()
                .map(|brand| CatalogNode::Brand { year: *year, brand })
                .collect(),
            CatalogNode::Brand { year, brand } => self
                .source
                .models(*year, &brand.id)
                .await?
                .into_iter()
                .map(|model| CatalogNode::Model { year: *year, brand: brand.clone(), model })
                .collect(),
            CatalogNode::Model { year, brand, model } => self
                .source
                .versions(*year, &brand.id, &model.id)
                .await?
                .into_iter()
                .map(|version| CatalogNode::Version {
                    year: *year,
                    brand: brand.clone(),
                    model: model.clone(),
                    version,
                })
                .collect(),
            CatalogNode::Version { .. } => Vec::new(),
        };
        Ok(children)
    }

    async fn persist(&self, node: CatalogNode, summary: &mut SyncSummary) {
        let CatalogNode::Version { year, brand, model, version } = node else {
            return;
        };

        let record = SyncRecord {
            year,
            brand,
            model,
            version,
            last_sync: Utc::now(),
            source: self.source_tag.clone(),
        };

        match self.store.upsert(&record).await {
            Ok(_) => {
                debug!(key = ?record.key(), "catalog record upserted");
                summary.record_persisted();
            }
            Err(err) => {
                warn!(key = ?record.key(), error = %err, "failed to persist catalog record");
                summary.record_persistence_error();
            }
        }
    }
}
