use std::collections::HashSet;
use thiserror::Error;

use super::{Collection, Item, STAC_VERSION};
use crate::bbox::Bbox;

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("{kind} has an empty id")]
    EmptyId { kind: &'static str },
    #[error("{id}: unsupported stac_version {version}, expects {STAC_VERSION}")]
    Version { id: String, version: String },
    #[error("{id}: invalid item id, ids must not contain '/', '\\' or '..'")]
    InvalidId { id: String },
    #[error("{id}: bbox is missing")]
    MissingBbox { id: String },
    #[error("{id}: invalid bbox {bbox:?}: {reason}")]
    InvalidBbox {
        id: String,
        bbox: [f64; 4],
        reason: String,
    },
    #[error(
        "Item {id}: either datetime or both start_datetime and end_datetime values must be provided"
    )]
    MissingTemporal { id: String },
    #[error("{id}: start is later than end")]
    InvalidInterval { id: String },
    #[error("Collection {collection}: duplicate item id {item}")]
    DuplicateItem { collection: String, item: String },
    #[error("Collection {collection}: extent does not enclose item {item}")]
    NotEnclosed { collection: String, item: String },
}

// Item ids become directory names and URL path segments.
fn is_path_safe(id: &str) -> bool {
    !id.contains(['/', '\\']) && !id.contains("..")
}

fn check_bbox(id: &str, bbox: &Bbox) -> Result<(), ValidationError> {
    bbox.check_wgs84().map_err(|reason| ValidationError::InvalidBbox {
        id: id.to_string(),
        bbox: bbox.to_array(),
        reason,
    })
}

pub fn validate_item(item: &Item) -> Result<(), ValidationError> {
    if item.id.trim().is_empty() {
        return Err(ValidationError::EmptyId { kind: "Item" });
    }
    if item.stac_version != STAC_VERSION {
        return Err(ValidationError::Version {
            id: item.id.clone(),
            version: item.stac_version.clone(),
        });
    }
    if !is_path_safe(&item.id) {
        return Err(ValidationError::InvalidId {
            id: item.id.clone(),
        });
    }
    match item.bbox {
        Some(bbox) => check_bbox(&item.id, &bbox)?,
        None if item.geometry.is_some() => {
            return Err(ValidationError::MissingBbox {
                id: item.id.clone(),
            });
        }
        None => {}
    }
    let range = item
        .time_range()
        .ok_or_else(|| ValidationError::MissingTemporal {
            id: item.id.clone(),
        })?;
    if range.start > range.end {
        return Err(ValidationError::InvalidInterval {
            id: item.id.clone(),
        });
    }
    Ok(())
}

/// Validates the collection, every child, and that the collection extent
/// encloses each child's bbox and time range.
pub fn validate_collection(collection: &Collection) -> Result<(), ValidationError> {
    if collection.id.trim().is_empty() {
        return Err(ValidationError::EmptyId { kind: "Collection" });
    }
    if collection.stac_version != STAC_VERSION {
        return Err(ValidationError::Version {
            id: collection.id.clone(),
            version: collection.stac_version.clone(),
        });
    }
    if let Some(bbox) = collection.extent.bbox() {
        check_bbox(&collection.id, bbox)?;
    }
    if let Some([Some(start), Some(end)]) = collection.extent.interval()
        && start > end
    {
        return Err(ValidationError::InvalidInterval {
            id: collection.id.clone(),
        });
    }

    let mut seen = HashSet::new();
    for item in &collection.items {
        validate_item(item)?;
        if !seen.insert(item.id.as_str()) {
            return Err(ValidationError::DuplicateItem {
                collection: collection.id.clone(),
                item: item.id.clone(),
            });
        }
        if !encloses(collection, item) {
            return Err(ValidationError::NotEnclosed {
                collection: collection.id.clone(),
                item: item.id.clone(),
            });
        }
    }
    Ok(())
}

fn encloses(collection: &Collection, item: &Item) -> bool {
    let spatial = match (collection.extent.bbox(), item.bbox) {
        (Some(extent), Some(bbox)) => extent.contains(&bbox),
        (None, Some(_)) => false,
        _ => true,
    };
    let temporal = match (collection.extent.interval(), item.time_range()) {
        (Some([start, end]), Some(range)) => {
            start.is_none_or(|start| start <= range.start) && end.is_none_or(|end| end >= range.end)
        }
        _ => true,
    };
    spatial && temporal
}
