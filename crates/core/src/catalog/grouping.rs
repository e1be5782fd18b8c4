//! Model grouping and trim labels

use std::collections::HashSet;

use carindex_domain::constants::FALLBACK_VERSION_NAMES;
use carindex_domain::{CatalogItem, CatalogModel};

/// Collapse trim-level variants into one entry per group, keeping the
/// first-seen order.
pub fn group_models<'a, I>(models: I) -> Vec<CatalogItem>
where
    I: IntoIterator<Item = &'a CatalogModel>,
{
    let mut seen = HashSet::new();
    models
        .into_iter()
        .filter(|model| seen.insert(model.group_key().to_string()))
        .map(CatalogModel::group_item)
        .collect()
}

/// Strip the group name from the front of a variant description.
///
/// Matching is case-insensitive and stops at a word boundary. When stripping
/// leaves nothing (or the description does not start with the group name) the
/// trimmed description is returned unchanged.
pub fn trim_label(group_name: &str, description: &str) -> String {
    let description = description.trim();
    let prefix = group_name.trim();

    if prefix.is_empty() {
        return description.to_string();
    }

    let stripped = description
        .get(..prefix.len())
        .filter(|head| head.eq_ignore_ascii_case(prefix))
        .and_then(|_| description.get(prefix.len()..))
        .filter(|rest| rest.is_empty() || rest.starts_with(|c: char| c.is_whitespace() || c == '-'))
        .map(|rest| rest.trim_start_matches(|c: char| c.is_whitespace() || c == '-').trim_end());

    match stripped {
        Some(rest) if !rest.is_empty() => rest.to_string(),
        _ => description.to_string(),
    }
}

/// Fixed trims substituted when a group has no upstream variants.
pub fn fallback_versions() -> Vec<CatalogItem> {
    FALLBACK_VERSION_NAMES
        .iter()
        .map(|name| CatalogItem::new(name.to_ascii_lowercase(), *name))
        .collect()
}
