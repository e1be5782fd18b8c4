//! # CarIndex Core
//!
//! Pure business logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - Port interfaces for the remote catalog and the record store
//! - Year-membership rules and model grouping
//! - The hierarchy walk that materializes the catalog
//!
//! ## Architecture Principles
//! - Only depends on `carindex-domain`
//! - No database or HTTP code
//! - All external dependencies via traits

pub mod catalog;
pub mod sync;

pub use catalog::ports::CatalogSource;
pub use sync::ports::CatalogStore;
pub use sync::{CatalogNode, SyncError, SyncOrchestrator};
