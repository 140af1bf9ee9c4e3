use gdal::Dataset;
use gdal::vector::{Layer, LayerAccess};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::ReadError;
use crate::geometry::{self, Geometry};
use crate::projection::{DetectedEpsg, extract_epsg};

/// Contents of one vector layer.
#[derive(Debug, Clone)]
pub struct VectorLayer {
    pub name: String,
    pub fields: Vec<String>,
    pub geometries: Vec<Geometry>,
    /// Values of the requested attributes, one entry per feature.
    pub attributes: BTreeMap<String, Vec<String>>,
    pub epsg: DetectedEpsg,
}

/// GDAL path of a vector file. Zipped shapefiles are read in place.
pub fn gdal_path(path: &Path) -> PathBuf {
    let is_zip = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"));
    if is_zip {
        PathBuf::from(format!("/vsizip/{}", path.display()))
    } else {
        path.to_path_buf()
    }
}

fn open(path: &Path) -> Result<Dataset, ReadError> {
    Dataset::open(gdal_path(path)).map_err(|source| ReadError::Gdal {
        path: path.to_path_buf(),
        source,
    })
}

fn select_layer<'a>(
    dataset: &'a Dataset,
    path: &Path,
    layer: Option<&str>,
) -> Result<Layer<'a>, ReadError> {
    if let Some(name) = layer {
        return dataset
            .layer_by_name(name)
            .map_err(|_| ReadError::MissingLayer {
                path: path.to_path_buf(),
                layer: name.to_string(),
            });
    }
    match dataset.layer_count() {
        0 => Err(ReadError::NoLayers {
            path: path.to_path_buf(),
        }),
        1 => dataset.layer(0).map_err(|source| ReadError::Gdal {
            path: path.to_path_buf(),
            source,
        }),
        _ => Err(ReadError::MultipleLayers {
            path: path.to_path_buf(),
            layers: dataset.layers().map(|layer| layer.name()).collect(),
        }),
    }
}

/// Field names of a layer, without reading its features.
pub fn layer_fields(path: &Path, layer: Option<&str>) -> Result<Vec<String>, ReadError> {
    let dataset = open(path)?;
    let layer = select_layer(&dataset, path, layer)?;
    Ok(layer.defn().fields().map(|field| field.name()).collect())
}

/// Reads geometries and the values of `attributes`, which must all be fields
/// of the layer.
pub fn read_layer(
    path: &Path,
    layer: Option<&str>,
    attributes: &[String],
) -> Result<VectorLayer, ReadError> {
    let gdal_error = |source| ReadError::Gdal {
        path: path.to_path_buf(),
        source,
    };
    let dataset = open(path)?;
    let mut layer = select_layer(&dataset, path, layer)?;

    let name = layer.name();
    let fields: Vec<String> = layer.defn().fields().map(|field| field.name()).collect();
    if let Some(missing) = attributes.iter().find(|a| !fields.contains(a)) {
        return Err(ReadError::MissingColumn {
            path: path.to_path_buf(),
            column: missing.clone(),
        });
    }
    let epsg = match layer.spatial_ref() {
        Some(srs) => extract_epsg(&srs),
        None => DetectedEpsg {
            code: crate::projection::WGS84,
            reliable: false,
        },
    };

    let mut geometries = Vec::new();
    let mut values: BTreeMap<String, Vec<String>> = attributes
        .iter()
        .map(|attribute| (attribute.clone(), Vec::new()))
        .collect();
    for feature in layer.features() {
        if let Some(geom) = feature.geometry() {
            let text = geom.json().map_err(gdal_error)?;
            let parsed = geometry::parse_geojson(&text).map_err(|source| ReadError::Geometry {
                path: path.to_path_buf(),
                source,
            })?;
            geometries.extend(parsed);
        }
        for (attribute, column) in values.iter_mut() {
            let index = feature.field_index(attribute).map_err(gdal_error)?;
            let value = feature.field_as_string(index).map_err(gdal_error)?;
            column.push(value.unwrap_or_default());
        }
    }
    debug!(
        "Read {} geometries from layer {} of {}",
        geometries.len(),
        name,
        path.display()
    );

    Ok(VectorLayer {
        name,
        fields,
        geometries,
        attributes: values,
        epsg,
    })
}
