//! # CarIndex Infrastructure
//!
//! Infrastructure implementations of the core ports.
//!
//! This crate contains:
//! - The catalog API integration (credentials, pagination, client, cache)
//! - SQLite persistence for synchronized leaves
//! - The cron-driven sync scheduler
//! - Configuration loading and in-process metrics
//!
//! ## Architecture
//! - Implements traits defined in `carindex-core`
//! - Depends on `carindex-domain`, `carindex-core` and `carindex-common`
//! - Contains all "impure" code (network, disk, timers)

pub mod catalog;
pub mod config;
pub mod database;
pub mod errors;
pub mod http;
pub mod observability;
pub mod scheduling;

// Re-export commonly used items
pub use catalog::{CachedCatalog, CatalogClient, CredentialManager};
pub use database::{DbManager, SqliteCatalogStore};
pub use errors::InfraError;
pub use observability::CatalogMetrics;
pub use scheduling::{CatalogSchedulerConfig, CatalogSyncScheduler};
