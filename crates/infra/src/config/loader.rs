//! Configuration loader
//!
//! Loads application configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If incomplete, falls back to loading from file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//! 5. Credentials from the environment always win, then the result is validated
//!
//! ## Environment Variables
//! Required for an environment-only configuration:
//! - `CARINDEX_API_BASE_URL`: Catalog API base URL
//! - `CARINDEX_AUTH_BASE_URL`: Credential endpoint base URL
//! - `CARINDEX_API_USERNAME` / `CARINDEX_API_PASSWORD`: Catalog credentials
//! - `CARINDEX_DB_PATH`: SQLite database file
//!
//! Optional:
//! - `CARINDEX_PAGE_SIZE`, `CARINDEX_MAX_PAGES`, `CARINDEX_REQUEST_INTERVAL_MS`,
//!   `CARINDEX_BURST_CAPACITY`, `CARINDEX_HTTP_TIMEOUT_SECS`
//! - `CARINDEX_DB_POOL_SIZE`
//! - `CARINDEX_SYNC_ENABLED`, `CARINDEX_SYNC_CRON`
//! - `CARINDEX_CACHE_TTL_SECS`
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./config.{toml,json}` or `./carindex.{toml,json}` (current working directory)
//! 2. The same names in the parent and grandparent directories
//! 3. Relative to executable location

use std::path::{Path, PathBuf};
use std::str::FromStr;

use carindex_domain::{CarIndexError, Config, Result};

const CONFIG_STEMS: [&str; 2] = ["config", "carindex"];
const CONFIG_EXTENSIONS: [&str; 2] = ["toml", "json"];

/// Load configuration with automatic fallback strategy.
///
/// # Errors
/// Returns `CarIndexError::Config` if no source yields a valid configuration.
pub fn load() -> Result<Config> {
    let config = match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            config
        }
        Err(e) => {
            tracing::debug!(error = %e, "Failed to load from environment, trying file");
            load_from_file(None)?
        }
    };

    finalize(config)
}

/// Load an explicit config file, then apply environment credential overrides.
///
/// # Errors
/// Returns `CarIndexError::Config` if the file is missing, malformed or invalid.
pub fn load_from_path(path: PathBuf) -> Result<Config> {
    finalize(load_from_file(Some(path))?)
}

/// Load configuration purely from `CARINDEX_*` environment variables.
///
/// # Errors
/// Returns `CarIndexError::Config` if required variables are missing or have
/// invalid values.
pub fn load_from_env() -> Result<Config> {
    let mut config = Config::default();

    config.catalog.base_url = env_var("CARINDEX_API_BASE_URL")?;
    config.catalog.auth_base_url = env_var("CARINDEX_AUTH_BASE_URL")?;
    config.catalog.username = env_var("CARINDEX_API_USERNAME")?;
    config.catalog.password = env_var("CARINDEX_API_PASSWORD")?;
    config.database.path = env_var("CARINDEX_DB_PATH")?;

    if let Some(page_size) = env_parse("CARINDEX_PAGE_SIZE")? {
        config.catalog.page_size = page_size;
    }
    if let Some(max_pages) = env_parse("CARINDEX_MAX_PAGES")? {
        config.catalog.max_pages = max_pages;
    }
    if let Some(interval) = env_parse("CARINDEX_REQUEST_INTERVAL_MS")? {
        config.catalog.request_interval_ms = interval;
    }
    if let Some(capacity) = env_parse("CARINDEX_BURST_CAPACITY")? {
        config.catalog.burst_capacity = Some(capacity);
    }
    if let Some(timeout) = env_parse("CARINDEX_HTTP_TIMEOUT_SECS")? {
        config.catalog.timeout_secs = timeout;
    }
    if let Some(pool_size) = env_parse("CARINDEX_DB_POOL_SIZE")? {
        config.database.pool_size = pool_size;
    }
    if let Ok(cron) = std::env::var("CARINDEX_SYNC_CRON") {
        config.sync.cron_expression = cron;
    }
    config.sync.enabled = env_bool("CARINDEX_SYNC_ENABLED", config.sync.enabled);
    if let Some(ttl) = env_parse("CARINDEX_CACHE_TTL_SECS")? {
        config.cache.ttl_secs = ttl;
    }

    Ok(config)
}

/// Load configuration from a file.
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `CarIndexError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(CarIndexError::Config(format!("Config file not found: {}", p.display())));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            CarIndexError::Config("No config file found in any of the standard locations".to_string())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| CarIndexError::Config(format!("Failed to read config file: {e}")))?;

    parse_config(&contents, &config_path)
}

/// Apply credential overrides from the environment and validate.
fn finalize(mut config: Config) -> Result<Config> {
    if let Ok(username) = std::env::var("CARINDEX_API_USERNAME") {
        config.catalog.username = username;
    }
    if let Ok(password) = std::env::var("CARINDEX_API_PASSWORD") {
        config.catalog.password = password;
    }

    if !config.catalog.has_credentials() {
        tracing::warn!("catalog API credentials are not configured; remote calls will fail");
    }

    config.validate()?;
    Ok(config)
}

/// Parse configuration from string content, detecting the format by extension.
fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| CarIndexError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| CarIndexError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(CarIndexError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// First existing config file among the standard locations.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut roots = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        roots.extend([cwd.clone(), cwd.join(".."), cwd.join("../..")]);
    }

    if let Some(exe_dir) = std::env::current_exe().ok().and_then(|p| p.parent().map(Path::to_path_buf)) {
        roots.extend([exe_dir.clone(), exe_dir.join(".."), exe_dir.join("../..")]);
    }

    candidates_in(&roots).into_iter().find(|path| path.exists())
}

fn candidates_in(roots: &[PathBuf]) -> Vec<PathBuf> {
    roots
        .iter()
        .flat_map(|root| {
            CONFIG_STEMS.iter().flat_map(move |stem| {
                CONFIG_EXTENSIONS.iter().map(move |ext| root.join(format!("{stem}.{ext}")))
            })
        })
        .collect()
}

fn env_var(key: &str) -> Result<String> {
    std::env::var(key)
        .map_err(|_| CarIndexError::Config(format!("Missing required environment variable: {key}")))
}

fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| CarIndexError::Config(format!("Invalid value for {key}: {e}"))),
        Err(_) => Ok(None),
    }
}

/// Accepts `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive).
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}
