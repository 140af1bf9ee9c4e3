use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Failed to parse CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("Failed to fetch config from {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("Config file {0} contains no source entries")]
    Empty(String),
    #[error("Unsupported config file extension: {0}. Expects json, yaml, yml or csv")]
    UnsupportedConfigExtension(String),
    #[error("Config entry is not an object: {0}")]
    NotAnObject(String),
    #[error("Missing location field in a config item")]
    MissingLocation,
    #[error(
        "No source handler matches extension: {0}. Supported: csv, txt, tif, tiff, geotiff, zip, geojson, json, gpkg, shp"
    )]
    UnsupportedSourceExtension(String),
    #[error(
        "Source {location} must be accessed through an endpoint, so the extension field must be specified"
    )]
    MissingExtension { location: String },
    #[error("Invalid value for field {field}: {reason}")]
    InvalidField { field: String, reason: String },
    #[error("Invalid epsg policy: {0}. Expects strict or best-effort")]
    EpsgPolicy(String),
}
