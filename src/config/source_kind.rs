use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use super::{CommonConfig, ConfigError};

/// Family of source file handled by one item generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Point,
    Vector,
    Raster,
}

/// Extension registry. Lookups are case-insensitive.
pub const EXTENSIONS: &[(&str, SourceKind)] = &[
    ("csv", SourceKind::Point),
    ("txt", SourceKind::Point),
    ("geotiff", SourceKind::Raster),
    ("tiff", SourceKind::Raster),
    ("tif", SourceKind::Raster),
    ("zip", SourceKind::Vector),
    ("geojson", SourceKind::Vector),
    ("json", SourceKind::Vector),
    ("gpkg", SourceKind::Vector),
    ("shp", SourceKind::Vector),
];

impl SourceKind {
    pub fn from_extension(extension: &str) -> Result<Self, ConfigError> {
        let extension = extension.trim_start_matches('.').to_ascii_lowercase();
        EXTENSIONS
            .iter()
            .find(|(ext, _)| *ext == extension)
            .map(|(_, kind)| *kind)
            .ok_or(ConfigError::UnsupportedSourceExtension(extension))
    }

    /// Kind of a raw config record, from its `extension` or `location`.
    pub fn of_record(record: &Map<String, Value>) -> Result<Self, ConfigError> {
        let location = match record.get("location") {
            Some(Value::String(location)) => location.clone(),
            _ => return Err(ConfigError::MissingLocation),
        };
        let mut probe = CommonConfig::new("", location);
        probe.extension = match record.get("extension") {
            Some(Value::String(ext)) => Some(ext.clone()),
            _ => None,
        };
        Self::from_extension(&probe.source_extension()?)
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Point => write!(f, "point"),
            SourceKind::Vector => write!(f, "vector"),
            SourceKind::Raster => write!(f, "raster"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_lookup() {
        assert_eq!(SourceKind::from_extension("csv").unwrap(), SourceKind::Point);
        assert_eq!(SourceKind::from_extension("TIF").unwrap(), SourceKind::Raster);
        assert_eq!(
            SourceKind::from_extension(".geojson").unwrap(),
            SourceKind::Vector
        );
        assert!(matches!(
            SourceKind::from_extension("nc"),
            Err(ConfigError::UnsupportedSourceExtension(ext)) if ext == "nc"
        ));
    }
}
