use chrono_tz::Tz;
use serde_json::{Map, Value, json};

use super::GenerationError;
use crate::bbox::Bbox;
use crate::config::CommonConfig;
use crate::geometry::{self, Geometry};
use crate::projection::Reprojector;
use crate::stac::{Asset, Item, PROJECTION_EXTENSION, media_type};
use crate::temporal::{ItemTime, TimeFields, timezone_at};

pub fn media_type_for(extension: &str) -> &'static str {
    match extension.to_ascii_lowercase().as_str() {
        "tif" | "tiff" | "geotiff" => media_type::GEOTIFF,
        "geojson" | "json" => media_type::GEOJSON,
        "gpkg" => media_type::GEOPACKAGE,
        "shp" | "zip" => media_type::SHAPEFILE,
        _ => media_type::CSV,
    }
}

/// Reprojects native geometries of a source to EPSG:4326 in place.
pub fn reproject(id: &str, epsg: u32, geometries: &mut [Geometry]) -> Result<(), GenerationError> {
    let reprojector = Reprojector::from_epsg(epsg).map_err(GenerationError::projection(id))?;
    for geometry in geometries.iter_mut() {
        reprojector
            .transform_geometry(geometry)
            .map_err(GenerationError::projection(id))?;
    }
    Ok(())
}

/// Declared time of a source. `collection_date` and `collection_time` are read
/// in the timezone at the centre of its EPSG:4326 geometries.
pub fn declared_time(common: &CommonConfig, geometries: &[Geometry]) -> TimeFields {
    let timezone = match common.collection_date {
        Some(_) if common.datetime.is_none() => {
            Bbox::from_positions(geometries.iter().flat_map(Geometry::positions))
                .map(|bbox| {
                    let (lon, lat) = bbox.center();
                    timezone_at(lon, lat)
                })
                .unwrap_or(Tz::UTC)
        }
        _ => Tz::UTC,
    };
    common.time_fields(timezone)
}

/// Assembles an item from EPSG:4326 geometries. Config metadata comes first,
/// then `properties`, then the projection code.
pub fn build_item(
    common: &CommonConfig,
    id: String,
    geometries: &[Geometry],
    time: ItemTime,
    epsg: u32,
    properties: Map<String, Value>,
    asset: Asset,
) -> Result<Item, GenerationError> {
    let geometry =
        geometry::unify(geometries).ok_or_else(|| GenerationError::NoGeometry { id: id.clone() })?;

    let mut item = Item::new(id, geometry, time);
    item.extend_properties(common.metadata.to_properties());
    item.extend_properties(properties);
    item.properties.insert("proj:code".into(), json!(format!("EPSG:{epsg}")));
    item.add_extension(PROJECTION_EXTENSION);
    item.assets.insert("data".into(), asset);
    Ok(item)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::temporal::TimeRange;

    #[test]
    fn test_build_item() {
        let mut common = CommonConfig::new("a", "a.csv");
        common.metadata.platform = Some("drone".into());
        let at = "2020-01-01T00:00:00Z".parse().unwrap();
        let time = ItemTime {
            datetime: at,
            range: TimeRange::instant(at),
        };
        let geometries = vec![
            Geometry::Point(vec![1.0, 1.0]),
            Geometry::Point(vec![2.0, 3.0]),
        ];
        let item = build_item(
            &common,
            "a".into(),
            &geometries,
            time,
            4326,
            Map::new(),
            Asset::data("a.csv", media_type::CSV),
        )
        .unwrap();

        assert!(matches!(item.geometry, Some(Geometry::MultiPoint(_))));
        assert_eq!(item.bbox.unwrap().to_array(), [1.0, 1.0, 2.0, 3.0]);
        assert_eq!(item.properties["proj:code"], "EPSG:4326");
        assert_eq!(item.properties["platform"], "drone");
        assert_eq!(item.stac_extensions, vec![PROJECTION_EXTENSION.to_string()]);
    }

    #[test]
    fn test_no_geometry() {
        let common = CommonConfig::new("a", "a.csv");
        let at = "2020-01-01T00:00:00Z".parse().unwrap();
        let time = ItemTime {
            datetime: at,
            range: TimeRange::instant(at),
        };
        let err = build_item(
            &common,
            "a".into(),
            &[],
            time,
            4326,
            Map::new(),
            Asset::data("a.csv", media_type::CSV),
        )
        .unwrap_err();
        assert!(matches!(err, GenerationError::NoGeometry { .. }));
    }

    #[test]
    fn test_collection_date_is_local_to_the_geometry() {
        let mut common = CommonConfig::new("flight", "flight.tif");
        common.collection_date = chrono::NaiveDate::from_ymd_opt(2021, 2, 21);
        common.collection_time = chrono::NaiveTime::from_hms_opt(10, 0, 0);

        let queensland = [Geometry::Point(vec![150.55, -24.34])];
        let fields = declared_time(&common, &queensland);
        assert_eq!(fields.datetime, Some("2021-02-21T00:00:00Z".parse().unwrap()));

        let fields = declared_time(&common, &[]);
        assert_eq!(fields.datetime, Some("2021-02-21T10:00:00Z".parse().unwrap()));
    }

    #[test]
    fn test_media_types() {
        assert_eq!(media_type_for("TIF"), media_type::GEOTIFF);
        assert_eq!(media_type_for("zip"), media_type::SHAPEFILE);
        assert_eq!(media_type_for("csv"), media_type::CSV);
    }
}
