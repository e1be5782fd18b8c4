//! Catalog rules shared by every source adapter

pub mod grouping;
pub mod ports;
pub mod year_filter;

pub use grouping::{fallback_versions, group_models, trim_label};
pub use year_filter::{brands_for_year, matches_year, years_from_brands, YearMatch};
