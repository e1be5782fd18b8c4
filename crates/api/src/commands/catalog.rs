//! Catalog commands
//!
//! Browsing goes through the cached remote catalog; sync and stats go through
//! the orchestrator and the local store. Every command logs its outcome and
//! duration.

use std::future::Future;
use std::time::Instant;

use carindex_domain::{CarIndexError, CatalogItem, Result, SyncStats, SyncSummary};
use carindex_infra::observability::CatalogMetricsSnapshot;

use crate::context::AppContext;
use crate::utils::health::HealthStatus;
use crate::utils::logging::log_command_execution;

async fn run_command<T, F>(command: &'static str, work: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    let start = Instant::now();
    let result = work.await;
    log_command_execution(command, start.elapsed(), result.as_ref().err());
    result
}

fn require_year(year: i32) -> Result<i32> {
    if year <= 0 {
        return Err(CarIndexError::InvalidInput(format!("invalid model year: {year}")));
    }
    Ok(year)
}

fn require_id<'a>(field: &str, value: &'a str) -> Result<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(CarIndexError::InvalidInput(format!("{field} must not be empty")));
    }
    Ok(value)
}

/// Years with published prices, newest first.
pub async fn list_years(ctx: &AppContext) -> Result<Vec<CatalogItem>> {
    run_command("catalog::list_years", async { Ok(ctx.catalog.years().await?.to_vec()) }).await
}

/// Brands priced in `year`, or all brands.
pub async fn list_brands(ctx: &AppContext, year: Option<i32>) -> Result<Vec<CatalogItem>> {
    run_command("catalog::list_brands", async {
        let year = year.map(require_year).transpose()?;
        Ok(ctx.catalog.brands(year).await?.to_vec())
    })
    .await
}

pub async fn list_models(ctx: &AppContext, year: i32, brand_id: &str) -> Result<Vec<CatalogItem>> {
    run_command("catalog::list_models", async {
        let year = require_year(year)?;
        let brand_id = require_id("brand_id", brand_id)?;
        Ok(ctx.catalog.models(year, brand_id).await?.to_vec())
    })
    .await
}

pub async fn list_versions(
    ctx: &AppContext,
    year: i32,
    brand_id: &str,
    model_id: &str,
) -> Result<Vec<CatalogItem>> {
    run_command("catalog::list_versions", async {
        let year = require_year(year)?;
        let brand_id = require_id("brand_id", brand_id)?;
        let model_id = require_id("model_id", model_id)?;
        Ok(ctx.catalog.versions(year, brand_id, model_id).await?.to_vec())
    })
    .await
}

/// Synchronize every year now. Fails if a sync is already running.
pub async fn sync_now(ctx: &AppContext) -> Result<SyncSummary> {
    run_command("catalog::sync_now", async { Ok(ctx.orchestrator.sync_all().await?) }).await
}

pub async fn sync_year(ctx: &AppContext, year: i32) -> Result<SyncSummary> {
    run_command("catalog::sync_year", async {
        let year = require_year(year)?;
        Ok(ctx.orchestrator.sync_year(year).await?)
    })
    .await
}

/// Statistics over the locally synchronized records.
pub async fn sync_stats(ctx: &AppContext) -> Result<SyncStats> {
    run_command("catalog::sync_stats", async { Ok(ctx.orchestrator.stats().await?) }).await
}

pub async fn clear_cache(ctx: &AppContext) -> Result<()> {
    run_command("catalog::clear_cache", async {
        ctx.catalog.clear().await;
        Ok(())
    })
    .await
}

/// Drop cached credentials so the next remote call logs in again.
pub async fn reset_credentials(ctx: &AppContext) -> Result<()> {
    run_command("catalog::reset_credentials", async {
        ctx.client.credentials().invalidate();
        Ok(())
    })
    .await
}

pub fn metrics_snapshot(ctx: &AppContext) -> CatalogMetricsSnapshot {
    ctx.metrics.snapshot()
}

pub async fn health(ctx: &AppContext) -> HealthStatus {
    ctx.health_check().await
}
