//! Remote vehicle-catalog integration
//!
//! Credential handling, paginated fetching, the domain-level client and the
//! downstream cache.

pub mod auth;
pub mod cache;
pub mod client;
pub mod errors;
pub mod pagination;
pub mod types;

pub use auth::{AuthTransport, CredentialManager, HttpAuthTransport, TokenGrant, TokenLifetimes};
pub use cache::{CacheKey, CachedCatalog};
pub use client::{rate_limiter_for, CatalogClient};
pub use errors::{ApiError, ApiErrorCategory, AuthError};
pub use pagination::{PaginatedFetcher, PaginationSettings};
