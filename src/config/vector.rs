use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use super::point::DEFAULT_DATE_FORMAT;
use super::{ColumnInfo, CommonConfig, json_or_value};

fn default_date_format() -> String {
    DEFAULT_DATE_FORMAT.to_string()
}

/// Vector data (shapefile, zipped shapefile, geopackage, geojson), optionally
/// joined with an attribute CSV.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorConfig {
    #[serde(flatten)]
    pub common: CommonConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layer: Option<String>,
    #[serde(
        default,
        deserialize_with = "json_or_value",
        skip_serializing_if = "Option::is_none"
    )]
    pub column_info: Option<Vec<ColumnInfo>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join_file: Option<String>,
    /// Attribute of the vector file matched against `join_field`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join_attribute_vector: Option<String>,
    /// Column of the join file matched against `join_attribute_vector`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join_field: Option<String>,
    #[serde(
        rename = "join_T_column",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub join_t_column: Option<String>,
    #[serde(
        default,
        deserialize_with = "json_or_value",
        skip_serializing_if = "Option::is_none"
    )]
    pub join_column_info: Option<Vec<ColumnInfo>>,
    #[serde(default = "default_date_format")]
    pub date_format: String,
}

impl VectorConfig {
    pub fn new(common: CommonConfig) -> Self {
        Self {
            common,
            layer: None,
            column_info: None,
            join_file: None,
            join_attribute_vector: None,
            join_field: None,
            join_t_column: None,
            join_column_info: None,
            date_format: default_date_format(),
        }
    }

    pub fn to_properties(&self) -> Map<String, Value> {
        let mut properties = Map::new();
        let mut put = |key: &str, value: Option<Value>| {
            if let Some(value) = value {
                properties.insert(key.to_string(), value);
            }
        };
        put("column_info", self.column_info.as_ref().map(|c| json!(c)));
        put("layer", self.layer.as_ref().map(|l| json!(l)));
        put("join_file", self.join_file.as_ref().map(|f| json!(f)));
        put(
            "join_attribute_vector",
            self.join_attribute_vector.as_ref().map(|a| json!(a)),
        );
        put("join_field", self.join_field.as_ref().map(|f| json!(f)));
        put("join_T_column", self.join_t_column.as_ref().map(|t| json!(t)));
        put(
            "join_column_info",
            self.join_column_info.as_ref().map(|c| json!(c)),
        );
        if self.join_file.is_some() {
            put("date_format", Some(json!(self.date_format)));
        }
        properties
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_fields_deserialize() {
        let config: VectorConfig = serde_json::from_value(serde_json::json!({
            "id": "suburbs",
            "location": "suburbs.shp",
            "join_file": "price.csv",
            "join_attribute_vector": "Suburb_Name",
            "join_field": "Area",
            "join_T_column": "Date",
            "join_column_info": "[{\"name\": \"Sell_Price\"}]"
        }))
        .unwrap();
        assert_eq!(config.join_t_column.as_deref(), Some("Date"));
        assert_eq!(
            config.join_column_info,
            Some(vec![ColumnInfo::named("Sell_Price")])
        );

        let properties = config.to_properties();
        assert_eq!(properties["join_T_column"], "Date");
        assert!(!properties.contains_key("column_info"));
    }
}
