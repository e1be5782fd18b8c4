//! Application constants
//!
//! Centralized location for domain-level constants.

/// Source tag written on every record produced by the catalog sync.
pub const DEFAULT_SOURCE_TAG: &str = "catalog-api";

/// Trim labels substituted when a model group has no upstream variants.
pub const FALLBACK_VERSION_NAMES: [&str; 3] = ["Standard", "Premium", "Sport"];

// Credential lifetimes (seconds)
pub const ACCESS_TOKEN_TTL_SECS: u64 = 60 * 60;
pub const REFRESH_TOKEN_TTL_SECS: u64 = 24 * 60 * 60;
pub const ACCESS_TOKEN_MARGIN_SECS: u64 = 5 * 60;
pub const REFRESH_TOKEN_MARGIN_SECS: u64 = 60 * 60;

// Model years outside this window are treated as bad upstream data
pub const MIN_CATALOG_YEAR: i32 = 1900;
pub const MAX_CATALOG_YEAR: i32 = 2100;

// Catalog cache
pub const CATALOG_CACHE_TTL_SECS: u64 = 30 * 60;
pub const CATALOG_CACHE_MAX_CAPACITY: u64 = 10_000;

// Remote API pacing and paging
pub const DEFAULT_PAGE_SIZE: u32 = 100;
pub const DEFAULT_MAX_PAGES: u32 = 500;
pub const DEFAULT_REQUEST_INTERVAL_MS: u64 = 250;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
pub const PAGINATION_HEADER: &str = "x-pagination";
