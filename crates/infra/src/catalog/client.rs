//! Catalog API client
//!
//! Domain-level calls over the paginated fetcher. Every call obtains a token
//! from the [`CredentialManager`] first; a 401 from the catalog forces one
//! refresh and one retry of the whole call.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use carindex_common::{
    FixedIntervalGate, RateLimiter, SystemClock, TokenBucket, TokenBucketConfig,
};
use carindex_core::catalog::{
    brands_for_year, fallback_versions, group_models, matches_year, years_from_brands,
};
use carindex_core::CatalogSource;
use carindex_domain::{
    Brand, CarIndexError, CatalogApiConfig, CatalogItem, CatalogModel, Result, VehicleVersion,
};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use super::auth::{CredentialManager, HttpAuthTransport, TokenLifetimes};
use super::errors::ApiError;
use super::pagination::{PaginatedFetcher, PaginationSettings};
use super::types::{BrandDto, ModelDto, VersionDto};
use crate::http::HttpClient;
use crate::observability::{log_metric, CatalogMetrics};

const BRAND_PARAMS: [(&str, &str); 2] = [("prices", "true"), ("list_price", "true")];

/// Pick the pacing policy for catalog requests.
///
/// A configured burst capacity selects a token bucket refilled one request
/// per interval; otherwise requests are spaced by a fixed interval.
pub fn rate_limiter_for(config: &CatalogApiConfig) -> Result<Arc<dyn RateLimiter>> {
    match config.burst_capacity {
        Some(capacity) => {
            let bucket_config = TokenBucketConfig::builder()
                .capacity(capacity)
                .refill_amount(1)
                .refill_interval(config.request_interval())
                .build()
                .map_err(|err| CarIndexError::Config(err.to_string()))?;
            let bucket = TokenBucket::new(bucket_config)
                .map_err(|err| CarIndexError::Config(err.to_string()))?;
            Ok(Arc::new(bucket))
        }
        None => Ok(Arc::new(FixedIntervalGate::new(config.request_interval()))),
    }
}

pub struct CatalogClient {
    base_url: String,
    credentials: CredentialManager,
    fetcher: PaginatedFetcher,
    metrics: Arc<CatalogMetrics>,
    /// Group names seen while listing models, keyed by (brand id, group id).
    group_names: Mutex<HashMap<(String, String), String>>,
}

impl CatalogClient {
    pub fn new(
        base_url: impl Into<String>,
        credentials: CredentialManager,
        fetcher: PaginatedFetcher,
        metrics: Arc<CatalogMetrics>,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
            fetcher,
            metrics,
            group_names: Mutex::new(HashMap::new()),
        }
    }

    /// Wire the client, credential manager and rate limiter from config.
    pub fn from_config(config: &CatalogApiConfig, metrics: Arc<CatalogMetrics>) -> Result<Self> {
        let http = HttpClient::builder().timeout(config.timeout()).build()?;
        let auth_http = HttpClient::builder().timeout(config.timeout()).max_attempts(2).build()?;

        let transport = Arc::new(HttpAuthTransport::from_config(auth_http, config));
        let credentials = CredentialManager::with_clock(
            transport,
            TokenLifetimes::from_config(config),
            Arc::new(SystemClock),
            metrics.clone(),
        );

        let fetcher = PaginatedFetcher::new(
            http,
            rate_limiter_for(config)?,
            metrics.clone(),
            PaginationSettings::from_config(config),
        );

        Ok(Self::new(&config.base_url, credentials, fetcher, metrics))
    }

    pub fn credentials(&self) -> &CredentialManager {
        &self.credentials
    }

    pub fn metrics(&self) -> &Arc<CatalogMetrics> {
        &self.metrics
    }

    /// Years with published prices, newest first.
    #[instrument(skip(self))]
    pub async fn get_years(&self) -> std::result::Result<Vec<i32>, ApiError> {
        let brands = self.all_brands().await?;
        Ok(years_from_brands(&brands))
    }

    /// Every brand, or only those priced in `year`.
    #[instrument(skip(self))]
    pub async fn get_brands(&self, year: Option<i32>) -> std::result::Result<Vec<Brand>, ApiError> {
        let brands = self.all_brands().await?;
        Ok(match year {
            Some(year) => brands_for_year(&brands, year).into_iter().cloned().collect(),
            None => brands,
        })
    }

    /// Model groups of `brand_id` that belong to `year`.
    #[instrument(skip(self))]
    pub async fn get_models(
        &self,
        year: i32,
        brand_id: &str,
    ) -> std::result::Result<Vec<CatalogItem>, ApiError> {
        let models: Vec<CatalogModel> = self
            .fetch::<ModelDto>(&format!("/brands/{brand_id}/models/"), &[])
            .await?
            .into_iter()
            .map(CatalogModel::from)
            .collect();

        let total = models.len();
        let in_year: Vec<&CatalogModel> =
            models.iter().filter(|model| matches_year(model, year).is_some()).collect();
        debug!(brand_id, year, total, matched = in_year.len(), "filtered models by year");

        self.remember_groups(brand_id, &in_year);
        Ok(group_models(in_year))
    }

    /// Raw variants of one model group, with no fallback.
    #[instrument(skip(self))]
    pub async fn get_version_details(
        &self,
        brand_id: &str,
        group_id: &str,
    ) -> std::result::Result<Vec<VehicleVersion>, ApiError> {
        let versions =
            self.fetch::<VersionDto>(&format!("/brands/{brand_id}/groups/{group_id}/models/"), &[]).await?;

        let known_name = self.group_names.lock().get(&(brand_id.to_string(), group_id.to_string())).cloned();

        Ok(versions
            .into_iter()
            .map(|dto| {
                let group_name = dto
                    .group
                    .as_ref()
                    .map(|group| group.name.clone())
                    .or_else(|| known_name.clone())
                    .unwrap_or_default();
                dto.into_version(&group_name)
            })
            .collect())
    }

    /// Versions of one model group as catalog items.
    ///
    /// An upstream failure or an empty group yields the fixed fallback trims.
    /// Credential failures still propagate.
    #[instrument(skip(self))]
    pub async fn get_versions(
        &self,
        brand_id: &str,
        group_id: &str,
    ) -> std::result::Result<Vec<CatalogItem>, ApiError> {
        match self.get_version_details(brand_id, group_id).await {
            Ok(versions) if !versions.is_empty() => {
                Ok(versions.iter().map(VehicleVersion::to_item).collect())
            }
            Ok(_) => {
                debug!(brand_id, group_id, "group has no versions; using fallback trims");
                Ok(fallback_versions())
            }
            Err(err) if err.is_credential_failure() => Err(err),
            Err(err) => {
                warn!(brand_id, group_id, error = %err, "version lookup failed; using fallback trims");
                Ok(fallback_versions())
            }
        }
    }

    async fn all_brands(&self) -> std::result::Result<Vec<Brand>, ApiError> {
        let params: Vec<(&str, String)> =
            BRAND_PARAMS.iter().map(|(key, value)| (*key, (*value).to_string())).collect();
        Ok(self.fetch::<BrandDto>("/brands/", &params).await?.into_iter().map(Brand::from).collect())
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> std::result::Result<Vec<T>, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        let token = self.credentials.ensure_valid().await?;

        match self.fetcher.fetch_all(&url, params, &token).await {
            Err(original) if original.is_unauthorized() => {
                warn!(path, "catalog rejected the access token; refreshing and retrying once");
                log_metric(self.metrics.record_unauthorized_retry(), "catalog.api.unauthorized_retries");

                let token = self.credentials.force_refresh().await?;
                self.fetcher.fetch_all(&url, params, &token).await.map_err(|retry_err| {
                    debug!(path, error = %retry_err, "retry after refresh failed");
                    original
                })
            }
            other => other,
        }
    }

    fn remember_groups(&self, brand_id: &str, models: &[&CatalogModel]) {
        let mut names = self.group_names.lock();
        for model in models {
            if let Some(group) = &model.group {
                names.insert((brand_id.to_string(), group.id.clone()), group.name.clone());
            }
        }
    }
}

impl std::fmt::Debug for CatalogClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogClient")
            .field("base_url", &self.base_url)
            .field("credentials", &self.credentials)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl CatalogSource for CatalogClient {
    async fn years(&self) -> Result<Vec<i32>> {
        Ok(self.get_years().await?)
    }

    async fn brands(&self, year: Option<i32>) -> Result<Vec<CatalogItem>> {
        Ok(self.get_brands(year).await?.iter().map(Brand::to_item).collect())
    }

    async fn models(&self, year: i32, brand_id: &str) -> Result<Vec<CatalogItem>> {
        Ok(self.get_models(year, brand_id).await?)
    }

    async fn versions(&self, _year: i32, brand_id: &str, model_id: &str) -> Result<Vec<CatalogItem>> {
        Ok(self.get_versions(brand_id, model_id).await?)
    }
}
