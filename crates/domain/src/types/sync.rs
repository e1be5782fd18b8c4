//! Synchronization records and run summaries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::catalog::CatalogItem;
use crate::impl_domain_status_conversions;

/// Identity of one catalog leaf: (year, brand id, model id, version id).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CompositeKey {
    pub year: i32,
    pub brand_id: String,
    pub model_id: String,
    pub version_id: String,
}

/// A fully resolved (year, brand, model, version) combination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncRecord {
    pub year: i32,
    pub brand: CatalogItem,
    pub model: CatalogItem,
    pub version: CatalogItem,
    pub last_sync: DateTime<Utc>,
    pub source: String,
}

impl SyncRecord {
    pub fn key(&self) -> CompositeKey {
        CompositeKey {
            year: self.year,
            brand_id: self.brand.id.clone(),
            model_id: self.model.id.clone(),
            version_id: self.version.id.clone(),
        }
    }
}

/// Hierarchy level at which a sync step ran (or failed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncLevel {
    Year,
    Brand,
    Model,
    Version,
}

impl_domain_status_conversions!(SyncLevel {
    Year => "year",
    Brand => "brand",
    Model => "model",
    Version => "version",
});

/// Columns that can be enumerated with `distinct`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogField {
    Year,
    BrandId,
    BrandName,
    ModelId,
    VersionId,
    Source,
}

impl_domain_status_conversions!(CatalogField {
    Year => "year",
    BrandId => "brand_id",
    BrandName => "brand_name",
    ModelId => "model_id",
    VersionId => "version_id",
    Source => "source",
});

/// Optional narrowing for store queries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordFilter {
    pub year: Option<i32>,
    pub brand_id: Option<String>,
}

impl RecordFilter {
    pub fn for_year(year: i32) -> Self {
        Self { year: Some(year), brand_id: None }
    }

    pub fn matches(&self, record: &SyncRecord) -> bool {
        self.year.map_or(true, |year| record.year == year)
            && self.brand_id.as_deref().map_or(true, |id| record.brand.id == id)
    }
}

/// Outcome of one synchronization run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSummary {
    pub run_id: Uuid,
    /// Leaves written successfully
    pub total_vehicles: u64,
    /// Every caught failure, across all levels
    pub errors: u64,
    pub years: u64,
    pub brands: u64,
    pub models: u64,
    pub brand_errors: u64,
    pub model_errors: u64,
    pub version_errors: u64,
    pub persistence_errors: u64,
    pub cancelled: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl SyncSummary {
    pub fn begin() -> Self {
        Self {
            run_id: Uuid::now_v7(),
            total_vehicles: 0,
            errors: 0,
            years: 0,
            brands: 0,
            models: 0,
            brand_errors: 0,
            model_errors: 0,
            version_errors: 0,
            persistence_errors: 0,
            cancelled: false,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Count a node whose children were enumerated successfully.
    pub fn record_visit(&mut self, level: SyncLevel) {
        match level {
            SyncLevel::Year => self.years += 1,
            SyncLevel::Brand => self.brands += 1,
            SyncLevel::Model => self.models += 1,
            SyncLevel::Version => {}
        }
    }

    /// Count a failure to enumerate the children of a node at `level`.
    ///
    /// A year whose brands could not be listed is a brand-level failure, a
    /// brand whose models could not be listed is a model-level failure, and
    /// so on.
    pub fn record_enumeration_error(&mut self, level: SyncLevel) {
        self.errors += 1;
        match level {
            SyncLevel::Year => self.brand_errors += 1,
            SyncLevel::Brand => self.model_errors += 1,
            SyncLevel::Model | SyncLevel::Version => self.version_errors += 1,
        }
    }

    pub fn record_persisted(&mut self) {
        self.total_vehicles += 1;
    }

    pub fn record_persistence_error(&mut self) {
        self.errors += 1;
        self.persistence_errors += 1;
    }

    pub fn finish(mut self, cancelled: bool) -> Self {
        self.cancelled = cancelled;
        self.finished_at = Some(Utc::now());
        self
    }
}

/// Store-level statistics about the materialized catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStats {
    pub total_records: u64,
    /// Distinct years, newest first
    pub years: Vec<i32>,
    pub brand_count: u64,
    pub last_sync: Option<DateTime<Utc>>,
}
