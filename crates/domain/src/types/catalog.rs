//! Catalog hierarchy types
//!
//! Upstream ids are numeric but everything downstream treats them as opaque
//! strings, so ids are normalized to `String` at the infrastructure edge.

use serde::{Deserialize, Serialize};

use crate::constants::{MAX_CATALOG_YEAR, MIN_CATALOG_YEAR};

/// The `{id, name}` pair returned by every consumer-facing catalog operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: String,
    pub name: String,
}

impl CatalogItem {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self { id: id.into(), name: name.into() }
    }
}

/// Inclusive `[from, to]` span of model years with published prices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearRange {
    pub from: i32,
    pub to: i32,
}

impl YearRange {
    /// Build a range from optional bounds. A single bound yields a one-year
    /// range; an inverted pair is normalized. Bounds outside
    /// `MIN_CATALOG_YEAR..=MAX_CATALOG_YEAR` are dropped.
    pub fn from_bounds(from: Option<i32>, to: Option<i32>) -> Option<Self> {
        let (from, to) = (from.filter(|y| is_plausible_year(*y)), to.filter(|y| is_plausible_year(*y)));
        match (from, to) {
            (Some(a), Some(b)) => Some(Self { from: a.min(b), to: a.max(b) }),
            (Some(y), None) | (None, Some(y)) => Some(Self { from: y, to: y }),
            (None, None) => None,
        }
    }

    pub fn contains(&self, year: i32) -> bool {
        (self.from..=self.to).contains(&year)
    }

    /// Every year in the range, limited to the plausible catalog window.
    pub fn years(&self) -> impl Iterator<Item = i32> {
        self.from.max(MIN_CATALOG_YEAR)..=self.to.min(MAX_CATALOG_YEAR)
    }
}

pub fn is_plausible_year(year: i32) -> bool {
    (MIN_CATALOG_YEAR..=MAX_CATALOG_YEAR).contains(&year)
}

/// Vehicle brand with its priced year span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Brand {
    pub id: String,
    pub name: String,
    pub price_years: Option<YearRange>,
}

impl Brand {
    pub fn to_item(&self) -> CatalogItem {
        CatalogItem::new(self.id.clone(), self.name.clone())
    }
}

/// Grouping of trim-level variants under one base model.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelGroup {
    pub id: String,
    pub name: String,
}

/// A model as listed under a brand, with every signal that can place it in a
/// given year.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogModel {
    pub id: String,
    pub description: String,
    /// Explicit list of model years
    pub years: Option<Vec<i32>>,
    pub price_years: Option<YearRange>,
    pub production_years: Option<Vec<i32>>,
    pub group: Option<ModelGroup>,
}

impl CatalogModel {
    /// Key used to collapse trim-level variants into one entry per base model.
    pub fn group_key(&self) -> &str {
        self.group.as_ref().map_or(self.id.as_str(), |group| group.id.as_str())
    }

    /// Consumer-facing entry for the model's group.
    pub fn group_item(&self) -> CatalogItem {
        match &self.group {
            Some(group) => CatalogItem::new(group.id.clone(), group.name.clone()),
            None => CatalogItem::new(self.id.clone(), self.description.clone()),
        }
    }
}

/// A concrete variant (trim) of a model group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleVersion {
    pub id: String,
    /// Human-readable trim label (group prefix removed)
    pub name: String,
    pub description: String,
    pub list_price: Option<f64>,
    pub has_prices: bool,
    /// Alternate catalog code, when the upstream lists one
    pub as_codia: Option<String>,
    pub summary: Option<String>,
}

impl VehicleVersion {
    pub fn to_item(&self) -> CatalogItem {
        CatalogItem::new(self.id.clone(), self.name.clone())
    }
}
