use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;

use crate::stac::Provider;
use crate::temporal::{self, TimeFields};

pub mod collection;
pub mod error;
pub mod loader;
pub mod point;
pub mod raster;
pub mod source_kind;
pub mod vector;

pub use collection::CollectionConfig;
pub use error::ConfigError;
pub use loader::read_source_config;
pub use point::PointConfig;
pub use raster::{BandInfo, RasterConfig};
pub use source_kind::SourceKind;
pub use vector::VectorConfig;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Delete,
    Patch,
}

impl HttpMethod {
    pub fn as_reqwest(self) -> reqwest::Method {
        match self {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
            HttpMethod::Patch => reqwest::Method::PATCH,
        }
    }
}

/// STAC common metadata that cannot be derived from the source file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommonMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    #[serde(
        default,
        deserialize_with = "json_or_value",
        skip_serializing_if = "Option::is_none"
    )]
    pub providers: Option<Vec<Provider>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(
        default,
        deserialize_with = "json_or_value",
        skip_serializing_if = "Option::is_none"
    )]
    pub instruments: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constellation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mission: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gsd: Option<f64>,
}

impl CommonMetadata {
    /// Common metadata as STAC properties, unset fields omitted.
    pub fn to_properties(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }
}

/// Fields shared by every source config: location, access parameters,
/// declared spatial reference and time, and common metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommonConfig {
    pub id: String,
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,

    #[serde(default)]
    pub method: HttpMethod,
    #[serde(
        default,
        deserialize_with = "json_or_value",
        skip_serializing_if = "Option::is_none"
    )]
    pub params: Option<BTreeMap<String, String>>,
    #[serde(
        default,
        deserialize_with = "json_or_value",
        skip_serializing_if = "Option::is_none"
    )]
    pub headers: Option<BTreeMap<String, String>>,
    #[serde(
        default,
        deserialize_with = "json_or_value",
        skip_serializing_if = "Option::is_none"
    )]
    pub cookies: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(
        default,
        deserialize_with = "json_or_value",
        skip_serializing_if = "Option::is_none"
    )]
    pub json_body: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epsg: Option<u32>,
    #[serde(
        default,
        deserialize_with = "temporal::de_opt_datetime",
        skip_serializing_if = "Option::is_none"
    )]
    pub datetime: Option<DateTime<Utc>>,
    #[serde(
        default,
        deserialize_with = "temporal::de_opt_datetime",
        skip_serializing_if = "Option::is_none"
    )]
    pub start_datetime: Option<DateTime<Utc>>,
    #[serde(
        default,
        deserialize_with = "temporal::de_opt_datetime",
        skip_serializing_if = "Option::is_none"
    )]
    pub end_datetime: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_time: Option<NaiveTime>,

    #[serde(flatten)]
    pub metadata: CommonMetadata,
}

impl CommonConfig {
    pub fn new(id: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            location: location.into(),
            extension: None,
            prefix: None,
            method: HttpMethod::default(),
            params: None,
            headers: None,
            cookies: None,
            content: None,
            json_body: None,
            epsg: None,
            datetime: None,
            start_datetime: None,
            end_datetime: None,
            collection_date: None,
            collection_time: None,
            metadata: CommonMetadata::default(),
        }
    }

    pub fn is_remote(&self) -> bool {
        is_http_url(&self.location)
    }

    /// Explicit `extension`, otherwise the suffix of `location`.
    pub fn source_extension(&self) -> Result<String, ConfigError> {
        if let Some(ext) = &self.extension {
            return Ok(ext.trim_start_matches('.').to_ascii_lowercase());
        }
        let path = if self.is_remote() {
            reqwest::Url::parse(&self.location)
                .map(|url| url.path().to_string())
                .unwrap_or_else(|_| self.location.clone())
        } else {
            self.location.clone()
        };
        match Path::new(&path).extension().and_then(|ext| ext.to_str()) {
            Some(ext) => Ok(ext.to_ascii_lowercase()),
            None if self.is_remote() => Err(ConfigError::MissingExtension {
                location: self.location.clone(),
            }),
            None => Err(ConfigError::UnsupportedSourceExtension(String::new())),
        }
    }

    /// Item id prefix used when one source produces several items.
    pub fn item_prefix(&self) -> &str {
        self.prefix.as_deref().unwrap_or(&self.id)
    }

    /// Declared time information. `collection_date`/`collection_time` stand in
    /// for `datetime` when it is absent and are local to `timezone`.
    pub fn time_fields(&self, timezone: Tz) -> TimeFields {
        let collected = self.collection_date.map(|date| {
            let time = self.collection_time.unwrap_or(NaiveTime::MIN);
            temporal::local_to_utc(date, time, timezone)
        });
        TimeFields {
            datetime: self.datetime.or(collected),
            start_datetime: self.start_datetime,
            end_datetime: self.end_datetime,
        }
    }
}

/// Column description for point and vector attributes. Accepts a bare column
/// name or an object with `name`, `description` and `dtype`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ColumnInfoRepr")]
pub struct ColumnInfo {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dtype: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ColumnInfoRepr {
    Name(String),
    Full {
        name: String,
        #[serde(default)]
        description: Option<String>,
        #[serde(default)]
        dtype: Option<String>,
    },
}

impl From<ColumnInfoRepr> for ColumnInfo {
    fn from(repr: ColumnInfoRepr) -> Self {
        match repr {
            ColumnInfoRepr::Name(name) => ColumnInfo {
                name,
                description: None,
                dtype: None,
            },
            ColumnInfoRepr::Full {
                name,
                description,
                dtype,
            } => ColumnInfo {
                name,
                description,
                dtype,
            },
        }
    }
}

impl ColumnInfo {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            dtype: None,
        }
    }

    pub fn names(columns: &[ColumnInfo]) -> Vec<String> {
        columns.iter().map(|column| column.name.clone()).collect()
    }
}

/// A parsed source config, tagged by the family of its file.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SourceConfig {
    Point(PointConfig),
    Vector(VectorConfig),
    Raster(RasterConfig),
}

impl SourceConfig {
    /// Parse one raw config record. The kind is looked up from the explicit
    /// `extension` or the suffix of `location`.
    pub fn from_record(record: Map<String, Value>) -> Result<Self, ConfigError> {
        let kind = SourceKind::of_record(&record)?;
        let value = Value::Object(record);
        let config = match kind {
            SourceKind::Point => SourceConfig::Point(serde_json::from_value(value)?),
            SourceKind::Vector => SourceConfig::Vector(serde_json::from_value(value)?),
            SourceKind::Raster => SourceConfig::Raster(serde_json::from_value(value)?),
        };
        Ok(config)
    }

    pub fn kind(&self) -> SourceKind {
        match self {
            SourceConfig::Point(_) => SourceKind::Point,
            SourceConfig::Vector(_) => SourceKind::Vector,
            SourceConfig::Raster(_) => SourceKind::Raster,
        }
    }

    pub fn common(&self) -> &CommonConfig {
        match self {
            SourceConfig::Point(cfg) => &cfg.common,
            SourceConfig::Vector(cfg) => &cfg.common,
            SourceConfig::Raster(cfg) => &cfg.common,
        }
    }
}

pub fn is_http_url(href: &str) -> bool {
    reqwest::Url::parse(href).is_ok_and(|url| matches!(url.scheme(), "http" | "https"))
}

// Accepts either the structured value or a string holding its JSON encoding,
// which is how CSV configs carry lists and objects.
pub(crate) fn json_or_value<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    use serde::de::Error;

    let value = Option::<Value>::deserialize(deserializer)?;
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(raw)) => match serde_json::from_str::<T>(&raw) {
            Ok(parsed) => Ok(Some(parsed)),
            Err(_) => serde_json::from_value(Value::String(raw))
                .map(Some)
                .map_err(D::Error::custom),
        },
        Some(other) => serde_json::from_value(other)
            .map(Some)
            .map_err(D::Error::custom),
    }
}
