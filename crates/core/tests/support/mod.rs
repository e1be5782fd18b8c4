//! Shared test helpers for `carindex-core` integration tests.
//!
//! In-memory adapters for the catalog and store ports so the sync walk can be
//! exercised without HTTP or SQLite.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use carindex_core::{CatalogSource, CatalogStore};
use carindex_domain::{
    CarIndexError, CatalogField, CatalogItem, CompositeKey, RecordFilter, Result, SyncRecord,
};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

fn item(id: &str) -> CatalogItem {
    CatalogItem::new(id, id.to_uppercase())
}

/// Hand-built catalog tree with injectable failures.
#[derive(Default)]
pub struct InMemoryCatalog {
    brands: BTreeMap<i32, Vec<CatalogItem>>,
    models: HashMap<(i32, String), Vec<CatalogItem>>,
    versions: HashMap<(i32, String, String), Vec<CatalogItem>>,
    failing_years: Option<CarIndexError>,
    failing_models: HashMap<String, CarIndexError>,
    failing_versions: HashMap<String, CarIndexError>,
    brand_delay: Option<Duration>,
    calls: Mutex<Vec<String>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `brand` in `year` with `models`, each carrying `versions`.
    pub fn with_brand(mut self, year: i32, brand: &str, models: Vec<(&str, Vec<&str>)>) -> Self {
        self.brands.entry(year).or_default().push(item(brand));
        let model_items = models.iter().map(|(model, _)| item(model)).collect();
        self.models.insert((year, brand.to_string()), model_items);
        for (model, versions) in &models {
            self.versions.insert(
                (year, brand.to_string(), model.to_string()),
                versions.iter().map(|version| item(version)).collect(),
            );
        }
        self
    }

    pub fn failing_years(mut self, err: CarIndexError) -> Self {
        self.failing_years = Some(err);
        self
    }

    pub fn failing_models_for(mut self, brand: &str, err: CarIndexError) -> Self {
        self.failing_models.insert(brand.to_string(), err);
        self
    }

    pub fn failing_versions_for(mut self, model: &str, err: CarIndexError) -> Self {
        self.failing_versions.insert(model.to_string(), err);
        self
    }

    pub fn with_brand_delay(mut self, delay: Duration) -> Self {
        self.brand_delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl CatalogSource for InMemoryCatalog {
    async fn years(&self) -> Result<Vec<i32>> {
        self.calls.lock().push("years".into());
        if let Some(err) = &self.failing_years {
            return Err(err.clone());
        }
        Ok(self.brands.keys().rev().copied().collect())
    }

    async fn brands(&self, year: Option<i32>) -> Result<Vec<CatalogItem>> {
        self.calls.lock().push(format!("brands:{year:?}"));
        if let Some(delay) = self.brand_delay {
            tokio::time::sleep(delay).await;
        }
        Ok(match year {
            Some(year) => self.brands.get(&year).cloned().unwrap_or_default(),
            None => self.brands.values().flatten().cloned().collect(),
        })
    }

    async fn models(&self, year: i32, brand_id: &str) -> Result<Vec<CatalogItem>> {
        self.calls.lock().push(format!("models:{year}:{brand_id}"));
        if let Some(err) = self.failing_models.get(brand_id) {
            return Err(err.clone());
        }
        Ok(self.models.get(&(year, brand_id.to_string())).cloned().unwrap_or_default())
    }

    async fn versions(
        &self,
        year: i32,
        brand_id: &str,
        model_id: &str,
    ) -> Result<Vec<CatalogItem>> {
        self.calls.lock().push(format!("versions:{year}:{brand_id}:{model_id}"));
        if let Some(err) = self.failing_versions.get(model_id) {
            return Err(err.clone());
        }
        Ok(self
            .versions
            .get(&(year, brand_id.to_string(), model_id.to_string()))
            .cloned()
            .unwrap_or_default())
    }
}

/// Store keyed by composite identity, like the SQLite adapter.
#[derive(Default)]
pub struct InMemoryStore {
    records: Mutex<BTreeMap<CompositeKey, SyncRecord>>,
    rejected_versions: HashSet<String>,
    upserts: Mutex<u64>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every upsert whose version id is `version_id`.
    pub fn rejecting_version(mut self, version_id: &str) -> Self {
        self.rejected_versions.insert(version_id.to_string());
        self
    }

    pub fn records(&self) -> Vec<SyncRecord> {
        self.records.lock().values().cloned().collect()
    }

    pub fn upsert_calls(&self) -> u64 {
        *self.upserts.lock()
    }
}

#[async_trait]
impl CatalogStore for InMemoryStore {
    async fn upsert(&self, record: &SyncRecord) -> Result<SyncRecord> {
        *self.upserts.lock() += 1;
        if self.rejected_versions.contains(&record.version.id) {
            return Err(CarIndexError::Database(format!("rejected {}", record.version.id)));
        }
        self.records.lock().insert(record.key(), record.clone());
        Ok(record.clone())
    }

    async fn distinct(&self, field: CatalogField, filter: &RecordFilter) -> Result<Vec<String>> {
        let records = self.records.lock();
        let mut values: Vec<String> = records
            .values()
            .filter(|record| filter.matches(record))
            .map(|record| match field {
                CatalogField::Year => record.year.to_string(),
                CatalogField::BrandId => record.brand.id.clone(),
                CatalogField::BrandName => record.brand.name.clone(),
                CatalogField::ModelId => record.model.id.clone(),
                CatalogField::VersionId => record.version.id.clone(),
                CatalogField::Source => record.source.clone(),
            })
            .collect();
        values.sort();
        values.dedup();
        Ok(values)
    }

    async fn count(&self, filter: &RecordFilter) -> Result<u64> {
        Ok(self.records.lock().values().filter(|record| filter.matches(record)).count() as u64)
    }

    async fn latest_sync(&self) -> Result<Option<DateTime<Utc>>> {
        Ok(self.records.lock().values().map(|record| record.last_sync).max())
    }
}
