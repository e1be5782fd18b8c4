//! Wire types for the remote catalog API

use carindex_domain::{Brand, CatalogModel, ModelGroup, VehicleVersion, YearRange};
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Number(i64),
    Text(String),
}

impl From<RawId> for String {
    fn from(raw: RawId) -> Self {
        match raw {
            RawId::Number(n) => n.to_string(),
            RawId::Text(s) => s,
        }
    }
}

/// Numeric or string identifier, normalized to a string.
fn id_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    RawId::deserialize(deserializer).map(String::from)
}

fn optional_id_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<RawId>::deserialize(deserializer)?.map(String::from))
}

/// Value of the pagination header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PaginationMeta {
    #[serde(default)]
    pub total: u64,
    pub total_pages: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BrandDto {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub prices_from: Option<i32>,
    #[serde(default)]
    pub prices_to: Option<i32>,
}

impl From<BrandDto> for Brand {
    fn from(dto: BrandDto) -> Self {
        Self {
            price_years: YearRange::from_bounds(dto.prices_from, dto.prices_to),
            id: dto.id,
            name: dto.name,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GroupDto {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelDto {
    #[serde(alias = "id", deserialize_with = "id_string")]
    pub codia: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub years: Option<Vec<i32>>,
    #[serde(default)]
    pub production_years: Option<Vec<i32>>,
    #[serde(default)]
    pub prices_from: Option<i32>,
    #[serde(default)]
    pub prices_to: Option<i32>,
    #[serde(default)]
    pub group: Option<GroupDto>,
}

impl From<ModelDto> for CatalogModel {
    fn from(dto: ModelDto) -> Self {
        Self {
            id: dto.codia,
            description: dto.description,
            years: dto.years,
            price_years: YearRange::from_bounds(dto.prices_from, dto.prices_to),
            production_years: dto.production_years,
            group: dto.group.map(|group| ModelGroup { id: group.id, name: group.name }),
        }
    }
}

/// A variant as listed under `/brands/{b}/groups/{g}/models/`.
#[derive(Debug, Clone, Deserialize)]
pub struct VersionDto {
    #[serde(alias = "id", deserialize_with = "id_string")]
    pub codia: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub list_price: Option<f64>,
    #[serde(default)]
    pub prices: Option<bool>,
    #[serde(default, deserialize_with = "optional_id_string")]
    pub as_codia: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub group: Option<GroupDto>,
}

impl VersionDto {
    pub fn into_version(self, group_name: &str) -> VehicleVersion {
        VehicleVersion {
            name: carindex_core::catalog::trim_label(group_name, &self.description),
            id: self.codia,
            description: self.description,
            list_price: self.list_price,
            has_prices: self.prices.unwrap_or(false),
            as_codia: self.as_codia,
            summary: self.summary,
        }
    }
}

/// Credential endpoint payloads.
#[derive(Debug, Clone, Serialize)]
pub struct RefreshRequest<'a> {
    pub refresh_token: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefreshResponse {
    pub access_token: String,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn brand_ids_accept_numbers_and_strings() {
        let numeric: BrandDto = serde_json::from_value(json!({"id": 7, "name": "VW"})).unwrap();
        let text: BrandDto = serde_json::from_value(json!({"id": "7", "name": "VW"})).unwrap();
        assert_eq!(numeric.id, "7");
        assert_eq!(text.id, "7");
    }

    #[test]
    fn zero_price_year_is_ignored() {
        let dto: BrandDto =
            serde_json::from_value(json!({"id": 3, "name": "Fiat", "prices_from": 0, "prices_to": 2024})).unwrap();
        assert_eq!(Brand::from(dto).price_years, Some(YearRange { from: 2024, to: 2024 }));
    }

    #[test]
    fn model_maps_every_year_signal() {
        let dto: ModelDto = serde_json::from_value(json!({
            "codia": 120,
            "description": "Gol 1.6",
            "years": [2019, 2020],
            "prices_from": 2018,
            "prices_to": 2021,
            "group": {"id": 9, "name": "Gol"}
        }))
        .unwrap();

        let model = CatalogModel::from(dto);
        assert_eq!(model.id, "120");
        assert_eq!(model.years, Some(vec![2019, 2020]));
        assert_eq!(model.price_years, Some(YearRange { from: 2018, to: 2021 }));
        assert_eq!(model.group_key(), "9");
    }

    #[test]
    fn version_label_drops_group_prefix() {
        let dto: VersionDto = serde_json::from_value(json!({
            "codia": "0312345",
            "description": "GOL 1.0 Trendline",
            "list_price": 75000.0,
            "prices": true
        }))
        .unwrap();

        let version = dto.into_version("Gol");
        assert_eq!(version.id, "0312345");
        assert_eq!(version.name, "1.0 Trendline");
        assert!(version.has_prices);
        assert_eq!(version.as_codia, None);
    }

    #[test]
    fn version_keeps_alternate_code() {
        let numeric: VersionDto =
            serde_json::from_value(json!({"codia": "0101", "description": "UNO Way", "as_codia": 990101})).unwrap();
        assert_eq!(numeric.into_version("Uno").as_codia.as_deref(), Some("990101"));

        let null: VersionDto =
            serde_json::from_value(json!({"codia": "0102", "description": "UNO Way", "as_codia": null})).unwrap();
        assert_eq!(null.into_version("Uno").as_codia, None);
    }

    #[test]
    fn pagination_meta_parses_header_json() {
        let meta: PaginationMeta = serde_json::from_str(r#"{"total": 250, "total_pages": 3, "page": 1}"#).unwrap();
        assert_eq!(meta, PaginationMeta { total: 250, total_pages: 3 });
    }
}
