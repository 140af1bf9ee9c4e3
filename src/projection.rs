use gdal::errors::GdalError;
use gdal::spatial_ref::{AxisMappingStrategy, CoordTransform, SpatialRef};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use thiserror::Error;
use tracing::warn;

use crate::config::ConfigError;
use crate::geometry::Geometry;

pub const WGS84: u32 = 4326;

/// WKT2 `ID` then WKT1 `AUTHORITY` identifiers.
static EPSG_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [r#"ID\["EPSG",(\d+)\]"#, r#"AUTHORITY\["EPSG","(\d+)"\]"#]
        .iter()
        .filter_map(|pattern| Regex::new(pattern).ok())
        .collect()
});

#[derive(Debug, Error)]
pub enum ProjectionError {
    #[error("Source crs EPSG:{detected} does not match config epsg: {declared}")]
    Mismatch { declared: u32, detected: u32 },
    #[error(
        "Cannot determine epsg of {id}. Provide it in the config or use the best-effort epsg policy"
    )]
    Undetermined { id: String },
    #[error("Reprojection failed: {0}")]
    Gdal(#[from] GdalError),
}

/// EPSG code read from a spatial reference. `reliable` is false when the code
/// is a 4326 guess.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectedEpsg {
    pub code: u32,
    pub reliable: bool,
}

/// How an EPSG code that cannot be read from the file is handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EpsgPolicy {
    /// Undetermined codes are an error unless the config declares one.
    #[default]
    Strict,
    /// Undetermined codes fall back to the declared code or 4326.
    BestEffort,
}

impl FromStr for EpsgPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "strict" => Ok(EpsgPolicy::Strict),
            "best-effort" => Ok(EpsgPolicy::BestEffort),
            _ => Err(ConfigError::EpsgPolicy(s.to_string())),
        }
    }
}

impl fmt::Display for EpsgPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EpsgPolicy::Strict => write!(f, "strict"),
            EpsgPolicy::BestEffort => write!(f, "best-effort"),
        }
    }
}

/// Reads the EPSG code from the authority of `srs`, then from the WKT, and
/// otherwise guesses 4326.
pub fn extract_epsg(srs: &SpatialRef) -> DetectedEpsg {
    let authority = srs.auth_name();
    if authority.as_deref().is_some_and(|name| name.eq_ignore_ascii_case("EPSG"))
        && let Ok(code) = srs.auth_code()
        && let Ok(code) = u32::try_from(code)
    {
        return DetectedEpsg {
            code,
            reliable: true,
        };
    }
    if let Some(code) = srs.to_wkt().ok().as_deref().and_then(epsg_from_wkt) {
        return DetectedEpsg {
            code,
            reliable: true,
        };
    }
    warn!("Cannot determine epsg from source. Defaults to 4326 but can be incorrect");
    DetectedEpsg {
        code: WGS84,
        reliable: false,
    }
}

/// EPSG code of the outermost CRS in a WKT1 or WKT2 string. Nested objects
/// carry their own identifiers first, so the last match wins.
pub fn epsg_from_wkt(wkt: &str) -> Option<u32> {
    EPSG_PATTERNS.iter().find_map(|re| {
        re.captures_iter(wkt)
            .last()
            .and_then(|caps| caps.get(1))
            .and_then(|code| code.as_str().parse().ok())
    })
}

/// Settles the EPSG code of a source from what the config declares and what
/// the file says. A reliable detection that disagrees with the config is
/// always an error.
pub fn reconcile_epsg(
    id: &str,
    declared: Option<u32>,
    detected: DetectedEpsg,
    policy: EpsgPolicy,
) -> Result<u32, ProjectionError> {
    if detected.reliable {
        return match declared {
            Some(declared) if declared != detected.code => Err(ProjectionError::Mismatch {
                declared,
                detected: detected.code,
            }),
            _ => Ok(detected.code),
        };
    }
    match (declared, policy) {
        (Some(declared), _) => Ok(declared),
        (None, EpsgPolicy::BestEffort) => {
            warn!("{}: epsg undetermined, using EPSG:{}", id, WGS84);
            Ok(WGS84)
        }
        (None, EpsgPolicy::Strict) => Err(ProjectionError::Undetermined { id: id.to_string() }),
    }
}

/// Transforms native coordinates to EPSG:4326 in longitude/latitude order.
pub struct Reprojector {
    transform: Option<CoordTransform>,
}

impl Reprojector {
    pub fn from_epsg(epsg: u32) -> Result<Self, ProjectionError> {
        if epsg == WGS84 {
            return Ok(Reprojector { transform: None });
        }
        let source = SpatialRef::from_epsg(epsg)?;
        Self::from_spatial_ref(&source)
    }

    pub fn from_spatial_ref(source: &SpatialRef) -> Result<Self, ProjectionError> {
        let mut source = source.clone();
        source.set_axis_mapping_strategy(AxisMappingStrategy::TraditionalGisOrder);

        let mut target = SpatialRef::from_epsg(WGS84)?;
        target.set_axis_mapping_strategy(AxisMappingStrategy::TraditionalGisOrder);

        let transform = CoordTransform::new(&source, &target)?;
        Ok(Reprojector {
            transform: Some(transform),
        })
    }

    pub fn transform_xy(&self, xs: &mut [f64], ys: &mut [f64]) -> Result<(), ProjectionError> {
        if let Some(transform) = &self.transform {
            let mut zs = vec![0.0; xs.len()];
            transform.transform_coords(xs, ys, &mut zs)?;
        }
        Ok(())
    }

    pub fn transform_geometry(&self, geometry: &mut Geometry) -> Result<(), ProjectionError> {
        if self.transform.is_none() {
            return Ok(());
        }
        let mut positions = geometry.positions_mut();
        let mut xs: Vec<f64> = positions.iter().map(|p| p[0]).collect();
        let mut ys: Vec<f64> = positions.iter().map(|p| p[1]).collect();
        self.transform_xy(&mut xs, &mut ys)?;
        for (position, (x, y)) in positions.iter_mut().zip(xs.into_iter().zip(ys)) {
            position[0] = x;
            position[1] = y;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epsg_from_wkt2() {
        let wkt = r#"PROJCRS["WGS 84 / Pseudo-Mercator",BASEGEOGCRS["WGS 84",ID["EPSG",4326]],CONVERSION["Popular Visualisation Pseudo-Mercator",ID["EPSG",3856]],ID["EPSG",3857]]"#;
        assert_eq!(epsg_from_wkt(wkt), Some(3857));
    }

    #[test]
    fn test_epsg_from_wkt1() {
        let wkt = r#"PROJCS["GDA94 / MGA zone 55",GEOGCS["GDA94",AUTHORITY["EPSG","4283"]],AUTHORITY["EPSG","28355"]]"#;
        assert_eq!(epsg_from_wkt(wkt), Some(28355));
        assert_eq!(epsg_from_wkt(r#"LOCAL_CS["unknown"]"#), None);
        assert_eq!(EPSG_PATTERNS.len(), 2);
    }

    #[test]
    fn test_reconcile_reliable() {
        let detected = DetectedEpsg {
            code: 3857,
            reliable: true,
        };
        assert_eq!(
            reconcile_epsg("a", None, detected, EpsgPolicy::Strict).unwrap(),
            3857
        );
        assert_eq!(
            reconcile_epsg("a", Some(3857), detected, EpsgPolicy::Strict).unwrap(),
            3857
        );
        for policy in [EpsgPolicy::Strict, EpsgPolicy::BestEffort] {
            assert!(matches!(
                reconcile_epsg("a", Some(4326), detected, policy),
                Err(ProjectionError::Mismatch {
                    declared: 4326,
                    detected: 3857
                })
            ));
        }
    }

    #[test]
    fn test_reconcile_unreliable() {
        let guessed = DetectedEpsg {
            code: WGS84,
            reliable: false,
        };
        assert_eq!(
            reconcile_epsg("a", Some(28355), guessed, EpsgPolicy::Strict).unwrap(),
            28355
        );
        assert!(matches!(
            reconcile_epsg("a", None, guessed, EpsgPolicy::Strict),
            Err(ProjectionError::Undetermined { .. })
        ));
        assert_eq!(
            reconcile_epsg("a", None, guessed, EpsgPolicy::BestEffort).unwrap(),
            WGS84
        );
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!("strict".parse::<EpsgPolicy>().unwrap(), EpsgPolicy::Strict);
        assert_eq!(
            "best_effort".parse::<EpsgPolicy>().unwrap(),
            EpsgPolicy::BestEffort
        );
        assert!("lenient".parse::<EpsgPolicy>().is_err());
    }

    #[test]
    fn test_extract_epsg_from_spatial_ref() {
        let srs = SpatialRef::from_epsg(28355).unwrap();
        assert_eq!(
            extract_epsg(&srs),
            DetectedEpsg {
                code: 28355,
                reliable: true
            }
        );
    }

    #[test]
    fn test_reproject_web_mercator_origin() {
        let reprojector = Reprojector::from_epsg(3857).unwrap();
        let mut geometry = Geometry::Point(vec![0.0, 0.0]);
        reprojector.transform_geometry(&mut geometry).unwrap();
        let Geometry::Point(p) = geometry else {
            panic!("expected a point");
        };
        assert!(p[0].abs() < 1e-9 && p[1].abs() < 1e-9);
    }
}
