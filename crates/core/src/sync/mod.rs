//! Catalog synchronization: store port, errors and the hierarchy walk

pub mod errors;
pub mod ports;
pub mod service;

pub use errors::SyncError;
pub use ports::CatalogStore;
pub use service::{CatalogNode, SyncOrchestrator};
