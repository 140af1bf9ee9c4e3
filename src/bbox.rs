use serde::{Deserialize, Serialize};

use crate::geometry::{Geometry, Position};

/// Axis aligned bounding box. Serialised the STAC way as
/// `[xmin, ymin, xmax, ymax]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(into = "[f64; 4]", try_from = "Vec<f64>")]
pub struct Bbox {
    pub xmin: f64,
    pub xmax: f64,
    pub ymin: f64,
    pub ymax: f64,
}

impl Bbox {
    /// A WGS84 bounding box, rejected when outside longitude/latitude ranges.
    pub fn new(xmin: f64, xmax: f64, ymin: f64, ymax: f64) -> Result<Self, String> {
        let bbox = Bbox {
            xmin,
            xmax,
            ymin,
            ymax,
        };
        bbox.check_wgs84()?;
        Ok(bbox)
    }

    /// Checks longitude/latitude ranges and min <= max ordering.
    pub fn check_wgs84(&self) -> Result<(), String> {
        if !(-180.0..=180.0).contains(&self.xmin) || !(-180.0..=180.0).contains(&self.xmax) {
            return Err("Longitude values must be between -180 and 180".to_string());
        }

        if !(-90.0..=90.0).contains(&self.ymin) || !(-90.0..=90.0).contains(&self.ymax) {
            return Err("Latitude values must be between -90 and 90".to_string());
        }

        if self.xmin > self.xmax || self.ymin > self.ymax {
            return Err("Min values must be <= max values".to_string());
        }
        Ok(())
    }

    pub fn world() -> Self {
        Bbox {
            xmin: -180.0,
            xmax: 180.0,
            ymin: -90.0,
            ymax: 90.0,
        }
    }

    /// Bounds of a set of positions in any reference system. `None` when empty.
    pub fn from_positions<'a, I>(positions: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Position>,
    {
        positions
            .into_iter()
            .filter(|p| p.len() >= 2)
            .map(|p| Bbox {
                xmin: p[0],
                xmax: p[0],
                ymin: p[1],
                ymax: p[1],
            })
            .reduce(|a, b| a.union(&b))
    }

    pub fn union(&self, other: &Bbox) -> Bbox {
        Bbox {
            xmin: self.xmin.min(other.xmin),
            xmax: self.xmax.max(other.xmax),
            ymin: self.ymin.min(other.ymin),
            ymax: self.ymax.max(other.ymax),
        }
    }

    pub fn contains(&self, other: &Bbox) -> bool {
        self.xmin <= other.xmin
            && self.ymin <= other.ymin
            && self.xmax >= other.xmax
            && self.ymax >= other.ymax
    }

    pub fn center(&self) -> (f64, f64) {
        ((self.xmin + self.xmax) / 2.0, (self.ymin + self.ymax) / 2.0)
    }

    /// Counter-clockwise rectangle starting at the lower right corner.
    pub fn to_polygon(&self) -> Geometry {
        Geometry::Polygon(vec![vec![
            vec![self.xmax, self.ymin],
            vec![self.xmax, self.ymax],
            vec![self.xmin, self.ymax],
            vec![self.xmin, self.ymin],
            vec![self.xmax, self.ymin],
        ]])
    }

    pub fn to_array(&self) -> [f64; 4] {
        [self.xmin, self.ymin, self.xmax, self.ymax]
    }
}

impl From<Bbox> for [f64; 4] {
    fn from(bbox: Bbox) -> Self {
        bbox.to_array()
    }
}

// 3D boxes are `[xmin, ymin, zmin, xmax, ymax, zmax]`; the z range is dropped.
impl TryFrom<Vec<f64>> for Bbox {
    type Error = String;

    fn try_from(values: Vec<f64>) -> Result<Self, Self::Error> {
        let (xmin, ymin, xmax, ymax) = match values.as_slice() {
            [xmin, ymin, xmax, ymax] => (*xmin, *ymin, *xmax, *ymax),
            [xmin, ymin, _, xmax, ymax, _] => (*xmin, *ymin, *xmax, *ymax),
            _ => return Err(format!("bbox must have 4 or 6 values, got {}", values.len())),
        };
        Ok(Bbox {
            xmin,
            xmax,
            ymin,
            ymax,
        })
    }
}

#[cfg(test)]
mod test {
    use crate::bbox::Bbox;
    use crate::geometry::Geometry;

    #[test]
    fn test_bbox_coords_are_within_ranges() {
        let valid_bbox = Bbox::new(-67.2, -58.7, 70.9, 73.3);
        assert!(valid_bbox.is_ok());

        // Longitude out of range
        assert!(Bbox::new(-200.0, 0.0, 0.0, 10.0).is_err());
        assert!(Bbox::new(0.0, 200.0, 0.0, 10.0).is_err());

        // Latitude out of range
        assert!(Bbox::new(0.0, 10.0, -100.0, 0.0).is_err());
        assert!(Bbox::new(0.0, 10.0, 0.0, 100.0).is_err());

        // min > max
        assert!(Bbox::new(10.0, 0.0, 0.0, 10.0).is_err());
        assert!(Bbox::new(0.0, 10.0, 10.0, 0.0).is_err());
    }

    #[test]
    fn test_union_and_contains() {
        let a = Bbox::new(150.5471916, 150.5505183, -24.34031206, -24.33986861).unwrap();
        let b = Bbox::new(150.5515183, 150.5571916, -24.34986861, -24.34131206).unwrap();
        let union = a.union(&b);
        assert_eq!(
            union.to_array(),
            [150.5471916, -24.34986861, 150.5571916, -24.33986861]
        );
        assert!(union.contains(&a));
        assert!(union.contains(&b));
        assert!(!a.contains(&union));
    }

    #[test]
    fn test_from_positions() {
        let positions = [vec![1.0, 5.0], vec![-2.0, 3.0, 10.0], vec![4.0, -1.0]];
        let bbox = Bbox::from_positions(&positions).unwrap();
        assert_eq!(bbox.to_array(), [-2.0, -1.0, 4.0, 5.0]);
        assert!(Bbox::from_positions(Vec::new()).is_none());
    }

    #[test]
    fn test_to_polygon_ring_order() {
        let bbox = Bbox::new(0.0, 2.0, 0.0, 1.0).unwrap();
        assert_eq!(
            bbox.to_polygon(),
            Geometry::Polygon(vec![vec![
                vec![2.0, 0.0],
                vec![2.0, 1.0],
                vec![0.0, 1.0],
                vec![0.0, 0.0],
                vec![2.0, 0.0],
            ]])
        );
    }

    #[test]
    fn test_serde_array_form() {
        let bbox: Bbox = serde_json::from_str("[1.0, 2.0, 3.0, 4.0]").unwrap();
        assert_eq!(bbox.xmax, 3.0);
        assert_eq!(serde_json::to_string(&bbox).unwrap(), "[1.0,2.0,3.0,4.0]");
        assert!(serde_json::from_str::<Bbox>("[1.0, 2.0]").is_err());
    }
}
