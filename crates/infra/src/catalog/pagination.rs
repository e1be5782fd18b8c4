//! Multi-page collector for catalog endpoints
//!
//! The total page count is only known from the first response's pagination
//! header. Later pages are fetched sequentially behind the rate limiter and a
//! failed page is skipped rather than aborting the whole fetch.

use std::sync::Arc;
use std::time::Duration;

use carindex_common::RateLimiter;
use carindex_domain::CatalogApiConfig;
use reqwest::header::HeaderMap;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use super::errors::ApiError;
use super::types::PaginationMeta;
use crate::http::HttpClient;
use crate::observability::{log_metric, CatalogMetrics};

/// Settings for [`PaginatedFetcher`].
#[derive(Debug, Clone)]
pub struct PaginationSettings {
    pub page_size: u32,
    pub max_pages: u32,
    pub header: String,
    pub request_timeout: Duration,
}

impl PaginationSettings {
    pub fn from_config(config: &CatalogApiConfig) -> Self {
        Self {
            page_size: config.page_size,
            max_pages: config.max_pages,
            header: config.pagination_header.clone(),
            request_timeout: config.timeout(),
        }
    }
}

impl Default for PaginationSettings {
    fn default() -> Self {
        Self::from_config(&CatalogApiConfig::default())
    }
}

pub struct PaginatedFetcher {
    http: HttpClient,
    limiter: Arc<dyn RateLimiter>,
    metrics: Arc<CatalogMetrics>,
    settings: PaginationSettings,
}

impl PaginatedFetcher {
    pub fn new(
        http: HttpClient,
        limiter: Arc<dyn RateLimiter>,
        metrics: Arc<CatalogMetrics>,
        settings: PaginationSettings,
    ) -> Self {
        Self { http, limiter, metrics, settings }
    }

    /// Fetch every page of `url` and concatenate the decoded elements.
    ///
    /// Only a failure of the first page is an error. Elements that do not
    /// decode as `T` are skipped.
    pub async fn fetch_all<T: DeserializeOwned>(
        &self,
        url: &str,
        params: &[(&str, String)],
        token: &str,
    ) -> Result<Vec<T>, ApiError> {
        let (headers, first) = self.fetch_page(url, params, token, 1).await?;

        let Value::Array(first) = first else {
            warn!(url, "first page payload is not a list");
            return Ok(Vec::new());
        };
        let mut items = decode_items(first, url);

        let Some(meta) = self.pagination_meta(&headers) else {
            warn!(url, header = %self.settings.header, "pagination metadata missing or invalid; using first page only");
            return Ok(items);
        };

        let total_pages = meta.total_pages.min(self.settings.max_pages);
        if meta.total_pages > self.settings.max_pages {
            warn!(url, reported = meta.total_pages, max = self.settings.max_pages, "clamping page count");
        }
        debug!(url, total = meta.total, total_pages, "paginated fetch");

        for page in 2..=total_pages {
            match self.fetch_page(url, params, token, page).await {
                Ok((_, Value::Array(values))) => items.extend(decode_items(values, url)),
                Ok(_) => {
                    warn!(url, page, "page payload is not a list; skipping");
                }
                Err(err) => {
                    warn!(url, page, error = %err, "page fetch failed; skipping");
                }
            }
        }

        Ok(items)
    }

    async fn fetch_page(
        &self,
        url: &str,
        params: &[(&str, String)],
        token: &str,
        page: u32,
    ) -> Result<(HeaderMap, Value), ApiError> {
        self.limiter.acquire().await;

        let result = tokio::time::timeout(self.settings.request_timeout, async {
            let request = self
                .http
                .request(Method::GET, url)
                .bearer_auth(token)
                .query(params)
                .query(&[("page", page), ("page_size", self.settings.page_size)]);

            let response = self.http.send(request).await.map_err(ApiError::from)?;
            let status = response.status();
            let headers = response.headers().clone();

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(ApiError::from_status(status, &body));
            }

            let body = response.bytes().await.map_err(ApiError::from)?;
            let value = serde_json::from_slice(&body).unwrap_or_else(|err| {
                warn!(url, page, error = %err, "page body is not valid JSON");
                Value::Null
            });
            Ok((headers, value))
        })
        .await
        .unwrap_or(Err(ApiError::Timeout(self.settings.request_timeout)));

        log_metric(self.metrics.record_api_request(result.is_ok()), "catalog.api.requests");
        log_metric(self.metrics.record_page(result.is_ok()), "catalog.pages");
        result
    }

    fn pagination_meta(&self, headers: &HeaderMap) -> Option<PaginationMeta> {
        let raw = headers.get(self.settings.header.as_str())?.to_str().ok()?;
        serde_json::from_str(raw).ok()
    }
}

fn decode_items<T: DeserializeOwned>(values: Vec<Value>, url: &str) -> Vec<T> {
    values
        .into_iter()
        .filter_map(|value| match serde_json::from_value(value) {
            Ok(item) => Some(item),
            Err(err) => {
                warn!(url, error = %err, "skipping undecodable element");
                None
            }
        })
        .collect()
}
