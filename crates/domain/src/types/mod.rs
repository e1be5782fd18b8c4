//! Domain types and models
//!
//! - [`catalog`]: the four-level catalog hierarchy as seen by consumers
//! - [`sync`]: persisted leaf records, their identity, and run summaries

pub mod catalog;
pub mod sync;

pub use catalog::{Brand, CatalogItem, CatalogModel, ModelGroup, VehicleVersion, YearRange};
pub use sync::{
    CatalogField, CompositeKey, RecordFilter, SyncLevel, SyncRecord, SyncStats, SyncSummary,
};
