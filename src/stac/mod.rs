//! STAC Item and Collection documents, serialised as STAC 1.1.0 JSON.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;

use crate::bbox::Bbox;
use crate::geometry::Geometry;
use crate::temporal::{ItemTime, TimeRange};

pub mod validate;

pub use validate::{ValidationError, validate_collection, validate_item};

pub const STAC_VERSION: &str = "1.1.0";

pub const PROJECTION_EXTENSION: &str =
    "https://stac-extensions.github.io/projection/v2.0.0/schema.json";
pub const EO_EXTENSION: &str = "https://stac-extensions.github.io/eo/v1.1.0/schema.json";
pub const RASTER_EXTENSION: &str = "https://stac-extensions.github.io/raster/v1.1.0/schema.json";

pub mod media_type {
    pub const GEOTIFF: &str = "image/tiff; application=geotiff";
    pub const GEOJSON: &str = "application/geo+json";
    pub const GEOPACKAGE: &str = "application/geopackage+sqlite3";
    pub const SHAPEFILE: &str = "application/x-shapefile";
    pub const CSV: &str = "text/csv";
    pub const JSON: &str = "application/json";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provider {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub rel: String,
    pub href: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl Link {
    pub fn new(rel: impl Into<String>, href: impl Into<String>) -> Self {
        Link {
            rel: rel.into(),
            href: href.into(),
            media_type: Some(media_type::JSON.to_string()),
            title: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub href: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<String>>,
    /// Extension fields such as `eo:bands`.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Asset {
    /// A `data` role asset.
    pub fn data(href: impl Into<String>, media_type: &str) -> Self {
        Asset {
            href: href.into(),
            media_type: Some(media_type.to_string()),
            title: None,
            description: None,
            roles: Some(vec!["data".to_string()]),
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    #[serde(rename = "type")]
    pub kind: String,
    pub stac_version: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stac_extensions: Vec<String>,
    pub id: String,
    pub geometry: Option<Geometry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<Bbox>,
    pub properties: Map<String, Value>,
    #[serde(default)]
    pub links: Vec<Link>,
    #[serde(default)]
    pub assets: BTreeMap<String, Asset>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
}

impl Item {
    /// An item stamped with `datetime`, `start_datetime` and `end_datetime`.
    /// The bbox is the bounds of `geometry`.
    pub fn new(id: impl Into<String>, geometry: Geometry, time: ItemTime) -> Self {
        let mut properties = Map::new();
        properties.insert("datetime".into(), json!(format_datetime(time.datetime)));
        properties.insert(
            "start_datetime".into(),
            json!(format_datetime(time.range.start)),
        );
        properties.insert("end_datetime".into(), json!(format_datetime(time.range.end)));

        Item {
            kind: "Feature".to_string(),
            stac_version: STAC_VERSION.to_string(),
            stac_extensions: Vec::new(),
            id: id.into(),
            bbox: geometry.bounds(),
            geometry: Some(geometry),
            properties,
            links: Vec::new(),
            assets: BTreeMap::new(),
            collection: None,
        }
    }

    pub fn add_extension(&mut self, url: &str) {
        if !self.stac_extensions.iter().any(|ext| ext == url) {
            self.stac_extensions.push(url.to_string());
        }
    }

    /// Adds properties without replacing the time fields.
    pub fn extend_properties(&mut self, properties: Map<String, Value>) {
        for (key, value) in properties {
            if !matches!(key.as_str(), "datetime" | "start_datetime" | "end_datetime") {
                self.properties.insert(key, value);
            }
        }
    }

    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        self.property_datetime("datetime")
    }

    /// `start_datetime`/`end_datetime` when both are present, otherwise the
    /// instant of `datetime`.
    pub fn time_range(&self) -> Option<TimeRange> {
        match (
            self.property_datetime("start_datetime"),
            self.property_datetime("end_datetime"),
        ) {
            (Some(start), Some(end)) => Some(TimeRange { start, end }),
            _ => self.datetime().map(TimeRange::instant),
        }
    }

    fn property_datetime(&self, key: &str) -> Option<DateTime<Utc>> {
        self.properties
            .get(key)
            .and_then(Value::as_str)
            .and_then(|value| DateTime::parse_from_rfc3339(value).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpatialExtent {
    pub bbox: Vec<Bbox>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemporalExtent {
    pub interval: Vec<[Option<DateTime<Utc>>; 2]>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub spatial: SpatialExtent,
    pub temporal: TemporalExtent,
}

impl Extent {
    pub fn new(bbox: Bbox, range: TimeRange) -> Self {
        Extent {
            spatial: SpatialExtent { bbox: vec![bbox] },
            temporal: TemporalExtent {
                interval: vec![[Some(range.start), Some(range.end)]],
            },
        }
    }

    pub fn bbox(&self) -> Option<&Bbox> {
        self.spatial.bbox.first()
    }

    pub fn interval(&self) -> Option<&[Option<DateTime<Utc>>; 2]> {
        self.temporal.interval.first()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    #[serde(rename = "type")]
    pub kind: String,
    pub stac_version: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stac_extensions: Vec<String>,
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords: Option<Vec<String>>,
    pub license: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub providers: Option<Vec<Provider>>,
    pub extent: Extent,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub summaries: Map<String, Value>,
    #[serde(default)]
    pub links: Vec<Link>,
    /// Child items. Written as separate documents, never inline.
    #[serde(skip)]
    pub items: Vec<Item>,
}

impl Collection {
    pub fn new(
        id: impl Into<String>,
        description: impl Into<String>,
        license: impl Into<String>,
        extent: Extent,
    ) -> Self {
        Collection {
            kind: "Collection".to_string(),
            stac_version: STAC_VERSION.to_string(),
            stac_extensions: Vec::new(),
            id: id.into(),
            title: None,
            description: description.into(),
            keywords: None,
            license: license.into(),
            providers: None,
            extent,
            summaries: Map::new(),
            links: Vec::new(),
            items: Vec::new(),
        }
    }
}

pub fn format_datetime(datetime: DateTime<Utc>) -> String {
    datetime.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}
