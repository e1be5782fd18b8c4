//! Year membership rules
//!
//! A model can be placed in a year by several independent signals. They are
//! checked in a fixed priority order and the first one that matches wins.

use std::collections::BTreeSet;

use carindex_domain::{Brand, CatalogModel};

/// Which signal placed a model in the requested year.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YearMatch {
    ExplicitYears,
    PriceRange,
    Description,
    ProductionYears,
}

type YearPredicate = fn(&CatalogModel, i32) -> bool;

const YEAR_PREDICATES: [(YearMatch, YearPredicate); 4] = [
    (YearMatch::ExplicitYears, in_explicit_years),
    (YearMatch::PriceRange, in_price_range),
    (YearMatch::Description, in_description),
    (YearMatch::ProductionYears, in_production_years),
];

fn in_explicit_years(model: &CatalogModel, year: i32) -> bool {
    model.years.as_ref().is_some_and(|years| years.contains(&year))
}

fn in_price_range(model: &CatalogModel, year: i32) -> bool {
    model.price_years.is_some_and(|range| range.contains(year))
}

fn in_description(model: &CatalogModel, year: i32) -> bool {
    model.description.contains(&year.to_string())
}

fn in_production_years(model: &CatalogModel, year: i32) -> bool {
    model.production_years.as_ref().is_some_and(|years| years.contains(&year))
}

/// First signal that places `model` in `year`, or `None` when nothing does.
pub fn matches_year(model: &CatalogModel, year: i32) -> Option<YearMatch> {
    YEAR_PREDICATES
        .iter()
        .find(|(_, predicate)| predicate(model, year))
        .map(|(kind, _)| *kind)
}

/// Union of every brand's priced year span, newest first.
pub fn years_from_brands(brands: &[Brand]) -> Vec<i32> {
    let years: BTreeSet<i32> =
        brands.iter().filter_map(|brand| brand.price_years).flat_map(|range| range.years()).collect();
    years.into_iter().rev().collect()
}

/// Brands whose priced span contains `year`, in upstream order.
pub fn brands_for_year(brands: &[Brand], year: i32) -> Vec<&Brand> {
    brands
        .iter()
        .filter(|brand| brand.price_years.is_some_and(|range| range.contains(year)))
        .collect()
}
