//! Command surface exposed to the binary and embedders.

pub mod catalog;

pub use catalog::{
    clear_cache, health, list_brands, list_models, list_versions, list_years, metrics_snapshot,
    reset_credentials, sync_now, sync_stats, sync_year,
};
