//! Scheduling infrastructure for periodic catalog synchronization
//!
//! The scheduler follows explicit lifecycle rules:
//! - start/stop are explicit and rejected when repeated
//! - the monitor task's join handle is tracked
//! - stopping cancels any walk in progress
//! - lifecycle operations are wrapped in timeouts

pub mod catalog_scheduler;
pub mod error;

pub use catalog_scheduler::{CatalogSchedulerConfig, CatalogSyncScheduler};
pub use error::{SchedulerError, SchedulerResult};
