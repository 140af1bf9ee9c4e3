use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

use crate::bbox::Bbox;

/// Above this many distinct parts an item falls back to its bounding
/// rectangle.
pub const MAX_MULTI_PARTS: usize = 10;

pub type Position = Vec<f64>;

/// GeoJSON geometry. Positions are `[x, y]` or `[x, y, z]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    Point(Position),
    MultiPoint(Vec<Position>),
    LineString(Vec<Position>),
    MultiLineString(Vec<Vec<Position>>),
    Polygon(Vec<Vec<Position>>),
    MultiPolygon(Vec<Vec<Vec<Position>>>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Family {
    Point,
    Line,
    Polygon,
}

impl Geometry {
    fn family(&self) -> Family {
        match self {
            Geometry::Point(_) | Geometry::MultiPoint(_) => Family::Point,
            Geometry::LineString(_) | Geometry::MultiLineString(_) => Family::Line,
            Geometry::Polygon(_) | Geometry::MultiPolygon(_) => Family::Polygon,
        }
    }

    /// Single-part geometries making up this geometry.
    pub fn parts(&self) -> Vec<Geometry> {
        match self {
            Geometry::MultiPoint(points) => points.iter().cloned().map(Geometry::Point).collect(),
            Geometry::MultiLineString(lines) => {
                lines.iter().cloned().map(Geometry::LineString).collect()
            }
            Geometry::MultiPolygon(polygons) => {
                polygons.iter().cloned().map(Geometry::Polygon).collect()
            }
            single => vec![single.clone()],
        }
    }

    pub fn positions(&self) -> Vec<&Position> {
        match self {
            Geometry::Point(p) => vec![p],
            Geometry::MultiPoint(ps) | Geometry::LineString(ps) => ps.iter().collect(),
            Geometry::MultiLineString(rings) | Geometry::Polygon(rings) => {
                rings.iter().flatten().collect()
            }
            Geometry::MultiPolygon(polygons) => polygons.iter().flatten().flatten().collect(),
        }
    }

    pub fn positions_mut(&mut self) -> Vec<&mut Position> {
        match self {
            Geometry::Point(p) => vec![p],
            Geometry::MultiPoint(ps) | Geometry::LineString(ps) => ps.iter_mut().collect(),
            Geometry::MultiLineString(rings) | Geometry::Polygon(rings) => {
                rings.iter_mut().flatten().collect()
            }
            Geometry::MultiPolygon(polygons) => {
                polygons.iter_mut().flatten().flatten().collect()
            }
        }
    }

    pub fn bounds(&self) -> Option<Bbox> {
        Bbox::from_positions(self.positions())
    }

    // Debug output of f64 round-trips, so equal keys mean equal coordinates.
    fn key(&self) -> String {
        format!("{self:?}")
    }
}

/// Parses GeoJSON geometry text, flattening geometry collections into their
/// members.
pub fn parse_geojson(text: &str) -> Result<Vec<Geometry>, serde_json::Error> {
    let value: Value = serde_json::from_str(text)?;
    let mut geometries = Vec::new();
    flatten_into(value, &mut geometries)?;
    Ok(geometries)
}

fn flatten_into(value: Value, out: &mut Vec<Geometry>) -> Result<(), serde_json::Error> {
    let is_collection = value.get("type").and_then(Value::as_str) == Some("GeometryCollection");
    if !is_collection {
        out.push(serde_json::from_value(value)?);
        return Ok(());
    }
    if let Some(Value::Array(members)) = value.get("geometries") {
        for member in members {
            flatten_into(member.clone(), out)?;
        }
    }
    Ok(())
}

/// Combines the geometries of one item into a single geometry.
///
/// Multi geometries are unpacked into their parts first and repeated parts
/// are dropped. One part is returned as is. Up to [`MAX_MULTI_PARTS`] parts
/// of one family become the matching multi geometry. Anything else becomes
/// the bounding rectangle of the whole set.
pub fn unify(geometries: &[Geometry]) -> Option<Geometry> {
    let mut seen = HashSet::new();
    let parts: Vec<Geometry> = geometries
        .iter()
        .flat_map(Geometry::parts)
        .filter(|part| seen.insert(part.key()))
        .collect();

    let first = parts.first()?;
    if parts.len() == 1 {
        return Some(first.clone());
    }

    let family = first.family();
    if parts.len() > MAX_MULTI_PARTS || parts.iter().any(|part| part.family() != family) {
        return bounding_polygon(&parts);
    }

    let multi = match family {
        Family::Point => Geometry::MultiPoint(
            parts
                .into_iter()
                .filter_map(|part| match part {
                    Geometry::Point(p) => Some(p),
                    _ => None,
                })
                .collect(),
        ),
        Family::Line => Geometry::MultiLineString(
            parts
                .into_iter()
                .filter_map(|part| match part {
                    Geometry::LineString(line) => Some(line),
                    _ => None,
                })
                .collect(),
        ),
        Family::Polygon => Geometry::MultiPolygon(
            parts
                .into_iter()
                .filter_map(|part| match part {
                    Geometry::Polygon(rings) => Some(rings),
                    _ => None,
                })
                .collect(),
        ),
    };
    Some(multi)
}

fn bounding_polygon(geometries: &[Geometry]) -> Option<Geometry> {
    let bbox = Bbox::from_positions(geometries.iter().flat_map(|g| g.positions()))?;
    Some(bbox.to_polygon())
}
