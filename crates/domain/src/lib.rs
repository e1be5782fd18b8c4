//! # CarIndex Domain
//!
//! Business domain types for the vehicle catalog.
//!
//! This crate contains:
//! - Catalog data types (items, brands, models, versions, sync records)
//! - Domain error types and Result definitions
//! - Configuration structures
//! - Domain constants
//!
//! ## Architecture
//! - No dependencies on other CarIndex crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
