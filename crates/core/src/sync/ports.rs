//! Port interface for the persistent record store

use async_trait::async_trait;
use carindex_domain::{CatalogField, RecordFilter, Result, SyncRecord};
use chrono::{DateTime, Utc};

/// Store of materialized catalog leaves keyed by `(year, brand, model, version)`.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Insert the record, or refresh `last_sync`/`source` and names when its
    /// composite key already exists. Returns the stored record.
    async fn upsert(&self, record: &SyncRecord) -> Result<SyncRecord>;

    /// Distinct values of `field` among records matching `filter`
    async fn distinct(&self, field: CatalogField, filter: &RecordFilter) -> Result<Vec<String>>;

    async fn count(&self, filter: &RecordFilter) -> Result<u64>;

    /// Most recent `last_sync` across all records
    async fn latest_sync(&self) -> Result<Option<DateTime<Utc>>>;
}
