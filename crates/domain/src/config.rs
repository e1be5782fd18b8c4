//! Configuration structures
//!
//! Every field has a serde default so a config file only needs the values it
//! overrides. Loading lives in `carindex-infra::config`.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::{CarIndexError, Result};

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub catalog: CatalogApiConfig,
    pub sync: SyncConfig,
    pub cache: CacheConfig,
    pub database: DatabaseConfig,
}

impl Config {
    /// Check cross-field constraints that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        self.catalog.validate()?;
        self.sync.validate()?;
        if self.cache.max_capacity == 0 {
            return Err(CarIndexError::Config("cache.max_capacity must be greater than 0".into()));
        }
        if self.database.pool_size == 0 {
            return Err(CarIndexError::Config("database.pool_size must be greater than 0".into()));
        }
        Ok(())
    }
}

/// Remote catalog API settings
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogApiConfig {
    pub base_url: String,
    pub auth_base_url: String,
    pub username: String,
    pub password: String,
    pub page_size: u32,
    /// Upper bound on `total_pages` accepted from the pagination header
    pub max_pages: u32,
    /// Courtesy pause between consecutive remote requests
    pub request_interval_ms: u64,
    /// When set, a token bucket of this size replaces the fixed-interval gate
    pub burst_capacity: Option<u64>,
    pub timeout_secs: u64,
    pub access_token_ttl_secs: u64,
    pub refresh_token_ttl_secs: u64,
    pub access_token_margin_secs: u64,
    pub refresh_token_margin_secs: u64,
    pub pagination_header: String,
}

impl Default for CatalogApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.catalog.example/v1".to_string(),
            auth_base_url: "https://api.catalog.example/auth".to_string(),
            username: String::new(),
            password: String::new(),
            page_size: DEFAULT_PAGE_SIZE,
            max_pages: DEFAULT_MAX_PAGES,
            request_interval_ms: DEFAULT_REQUEST_INTERVAL_MS,
            burst_capacity: None,
            timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            access_token_ttl_secs: ACCESS_TOKEN_TTL_SECS,
            refresh_token_ttl_secs: REFRESH_TOKEN_TTL_SECS,
            access_token_margin_secs: ACCESS_TOKEN_MARGIN_SECS,
            refresh_token_margin_secs: REFRESH_TOKEN_MARGIN_SECS,
            pagination_header: PAGINATION_HEADER.to_string(),
        }
    }
}

impl CatalogApiConfig {
    pub fn request_interval(&self) -> Duration {
        Duration::from_millis(self.request_interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Lifetime of an access token after the safety margin is applied.
    pub fn effective_access_ttl(&self) -> Duration {
        Duration::from_secs(self.access_token_ttl_secs.saturating_sub(self.access_token_margin_secs))
    }

    /// Lifetime of a refresh token after the safety margin is applied.
    pub fn effective_refresh_ttl(&self) -> Duration {
        Duration::from_secs(
            self.refresh_token_ttl_secs.saturating_sub(self.refresh_token_margin_secs),
        )
    }

    pub fn has_credentials(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }

    fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(CarIndexError::Config("catalog.base_url must not be empty".into()));
        }
        if self.auth_base_url.trim().is_empty() {
            return Err(CarIndexError::Config("catalog.auth_base_url must not be empty".into()));
        }
        if self.page_size == 0 {
            return Err(CarIndexError::Config("catalog.page_size must be greater than 0".into()));
        }
        if self.max_pages == 0 {
            return Err(CarIndexError::Config("catalog.max_pages must be greater than 0".into()));
        }
        if self.burst_capacity == Some(0) {
            return Err(CarIndexError::Config(
                "catalog.burst_capacity must be greater than 0 when set".into(),
            ));
        }
        Ok(())
    }
}

// Credentials stay out of logs
impl fmt::Debug for CatalogApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CatalogApiConfig")
            .field("base_url", &self.base_url)
            .field("auth_base_url", &self.auth_base_url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("page_size", &self.page_size)
            .field("max_pages", &self.max_pages)
            .field("request_interval_ms", &self.request_interval_ms)
            .field("burst_capacity", &self.burst_capacity)
            .field("timeout_secs", &self.timeout_secs)
            .finish_non_exhaustive()
    }
}

/// Periodic synchronization settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub enabled: bool,
    /// Six-field cron expression (seconds first)
    pub cron_expression: String,
    /// Upper bound for scheduler start/stop operations
    pub job_timeout_secs: u64,
    pub source_tag: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            cron_expression: "0 0 3 * * *".to_string(),
            job_timeout_secs: 5,
            source_tag: DEFAULT_SOURCE_TAG.to_string(),
        }
    }
}

impl SyncConfig {
    pub fn job_timeout(&self) -> Duration {
        Duration::from_secs(self.job_timeout_secs)
    }

    fn validate(&self) -> Result<()> {
        if self.cron_expression.split_whitespace().count() < 6 {
            return Err(CarIndexError::Config(format!(
                "sync.cron_expression needs six fields: '{}'",
                self.cron_expression
            )));
        }
        if self.source_tag.is_empty() {
            return Err(CarIndexError::Config("sync.source_tag must not be empty".into()));
        }
        Ok(())
    }
}

/// Downstream catalog cache settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_secs: u64,
    pub max_capacity: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl_secs: CATALOG_CACHE_TTL_SECS, max_capacity: CATALOG_CACHE_MAX_CAPACITY }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// Database configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
    pub pool_size: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: "carindex.db".to_string(), pool_size: 4 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.catalog.page_size, 100);
        assert_eq!(config.cache.ttl(), Duration::from_secs(1800));
        assert_eq!(config.sync.source_tag, "catalog-api");
    }

    #[test]
    fn effective_ttls_subtract_margins() {
        let catalog = CatalogApiConfig::default();
        assert_eq!(catalog.effective_access_ttl(), Duration::from_secs(55 * 60));
        assert_eq!(catalog.effective_refresh_ttl(), Duration::from_secs(23 * 60 * 60));
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [catalog]
            base_url = "http://localhost:9000"
            page_size = 25

            [database]
            path = "/tmp/catalog.db"
            "#,
        )
        .unwrap();

        assert_eq!(config.catalog.base_url, "http://localhost:9000");
        assert_eq!(config.catalog.page_size, 25);
        assert_eq!(config.catalog.max_pages, 500);
        assert_eq!(config.database.path, "/tmp/catalog.db");
        assert_eq!(config.database.pool_size, 4);
        assert!(config.sync.enabled);
    }

    #[test]
    fn debug_redacts_password() {
        let catalog = CatalogApiConfig { password: "hunter2".into(), ..Default::default() };
        let rendered = format!("{catalog:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn rejects_invalid_values() {
        let mut config = Config::default();
        config.catalog.page_size = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.sync.cron_expression = "0 3 * * *".into();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.catalog.burst_capacity = Some(0);
        assert!(config.validate().is_err());
    }
}
