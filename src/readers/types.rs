use gdal::errors::GdalError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReadError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to open {path} with GDAL: {source}")]
    Gdal {
        path: PathBuf,
        #[source]
        source: GdalError,
    },
    #[error("Failed to read CSV {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("Failed to fetch {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{path} does not have column {column}")]
    MissingColumn { path: PathBuf, column: String },
    #[error("{path} does not have layer {layer}")]
    MissingLayer { path: PathBuf, layer: String },
    #[error(
        "{path} contains multiple vector layers ({}). Please specify a layer in the config",
        layers.join(", ")
    )]
    MultipleLayers { path: PathBuf, layers: Vec<String> },
    #[error("{path} contains no vector layer")]
    NoLayers { path: PathBuf },
    #[error("{path}: invalid geometry: {source}")]
    Geometry {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("{path}: row {row} has a non-numeric {column} value {value:?}")]
    InvalidCoordinate {
        path: PathBuf,
        column: String,
        row: usize,
        value: String,
    },
}
