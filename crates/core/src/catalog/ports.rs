//! Port interface for the remote vehicle catalog

use async_trait::async_trait;
use carindex_domain::{CatalogItem, Result};

/// Read access to the four-level catalog hierarchy.
///
/// Adapters are expected to apply year filtering and model grouping before
/// returning, so every level is already scoped to the requested year.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// All model years with published prices, newest first
    async fn years(&self) -> Result<Vec<i32>>;

    /// Brands priced in `year`, or every brand when `year` is `None`
    async fn brands(&self, year: Option<i32>) -> Result<Vec<CatalogItem>>;

    /// Model groups of `brand_id` that belong to `year`
    async fn models(&self, year: i32, brand_id: &str) -> Result<Vec<CatalogItem>>;

    /// Versions (trims) of one model group
    async fn versions(&self, year: i32, brand_id: &str, model_id: &str)
        -> Result<Vec<CatalogItem>>;
}
