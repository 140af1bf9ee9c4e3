use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use super::{ColumnInfo, CommonConfig, json_or_value};

pub const DEFAULT_DATE_FORMAT: &str = "ISO8601";

fn default_date_format() -> String {
    DEFAULT_DATE_FORMAT.to_string()
}

/// Point data stored as rows of coordinates in a CSV file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointConfig {
    #[serde(flatten)]
    pub common: CommonConfig,
    /// Name of the X coordinate column, e.g. longitude or easting.
    #[serde(rename = "X")]
    pub x: String,
    /// Name of the Y coordinate column, e.g. latitude or northing.
    #[serde(rename = "Y")]
    pub y: String,
    #[serde(rename = "Z", default, skip_serializing_if = "Option::is_none")]
    pub z: Option<String>,
    /// Name of the time column.
    #[serde(rename = "T", default, skip_serializing_if = "Option::is_none")]
    pub t: Option<String>,
    #[serde(default = "default_date_format")]
    pub date_format: String,
    #[serde(
        default,
        deserialize_with = "json_or_value",
        skip_serializing_if = "Option::is_none"
    )]
    pub column_info: Option<Vec<ColumnInfo>>,
    /// Columns whose value combinations split the rows into separate items.
    #[serde(
        default,
        alias = "groupby",
        deserialize_with = "json_or_value",
        skip_serializing_if = "Option::is_none"
    )]
    pub group_by: Option<Vec<String>>,
}

impl PointConfig {
    pub fn new(common: CommonConfig, x: impl Into<String>, y: impl Into<String>) -> Self {
        Self {
            common,
            x: x.into(),
            y: y.into(),
            z: None,
            t: None,
            date_format: default_date_format(),
            column_info: None,
            group_by: None,
        }
    }

    /// Columns to read from the file, or `None` to read them all. Only
    /// restricted when attribute columns are declared.
    pub fn required_columns(&self) -> Option<Vec<String>> {
        let columns = self.column_info.as_ref()?;
        let mut required = ColumnInfo::names(columns);
        required.push(self.x.clone());
        required.push(self.y.clone());
        required.extend(self.z.iter().cloned());
        required.extend(self.t.iter().cloned());
        if let Some(group_by) = &self.group_by {
            required.extend(group_by.iter().cloned());
        }
        let mut seen = std::collections::HashSet::new();
        required.retain(|column| seen.insert(column.clone()));
        Some(required)
    }

    pub fn to_properties(&self) -> Map<String, Value> {
        let mut properties = Map::new();
        properties.insert("X".into(), json!(self.x));
        properties.insert("Y".into(), json!(self.y));
        if let Some(z) = &self.z {
            properties.insert("Z".into(), json!(z));
        }
        if let Some(t) = &self.t {
            properties.insert("T".into(), json!(t));
        }
        properties.insert("date_format".into(), json!(self.date_format));
        if let Some(columns) = &self.column_info {
            properties.insert("column_info".into(), json!(columns));
        }
        if let Some(group_by) = &self.group_by {
            properties.insert("group_by".into(), json!(group_by));
        }
        properties
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_columns_only_when_columns_declared() {
        let mut config = PointConfig::new(CommonConfig::new("a", "a.csv"), "lon", "lat");
        assert!(config.required_columns().is_none());

        config.column_info = Some(vec![ColumnInfo::named("pH"), ColumnInfo::named("lon")]);
        config.t = Some("date".into());
        config.group_by = Some(vec!["site".into()]);
        assert_eq!(
            config.required_columns().unwrap(),
            vec!["pH", "lon", "lat", "date", "site"]
        );
    }

    #[test]
    fn test_date_format_defaults_to_iso8601() {
        let config: PointConfig = serde_json::from_value(serde_json::json!({
            "id": "a",
            "location": "a.csv",
            "X": "lon",
            "Y": "lat"
        }))
        .unwrap();
        assert_eq!(config.date_format, DEFAULT_DATE_FORMAT);
        assert_eq!(config.to_properties()["X"], "lon");
    }

    #[test]
    fn test_groupby_alias() {
        let config: PointConfig = serde_json::from_value(serde_json::json!({
            "id": "a",
            "location": "a.csv",
            "X": "lon",
            "Y": "lat",
            "groupby": ["site", "depth"]
        }))
        .unwrap();
        assert_eq!(
            config.group_by,
            Some(vec!["site".to_string(), "depth".to_string()])
        );
    }
}
