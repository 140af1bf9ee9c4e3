use tracing::{debug, info};

use super::item::{build_item, declared_time, reproject};
use super::{GenerationError, GenerationOptions, ItemGenerator};
use crate::config::{PointConfig, SourceKind};
use crate::geometry::Geometry;
use crate::projection::WGS84;
use crate::readers::{Table, resolve_source};
use crate::stac::{Asset, Item, media_type};
use crate::temporal::{self, resolve_item_time};

/// One item per CSV file, or one per `group_by` value combination.
pub struct PointGenerator {
    config: PointConfig,
}

impl PointGenerator {
    pub fn new(config: PointConfig) -> Self {
        Self { config }
    }

    fn item_from_table(
        &self,
        id: String,
        table: &Table,
        epsg: u32,
    ) -> Result<Item, GenerationError> {
        let config = &self.config;
        let xs = table.numeric_values(&config.x)?;
        let ys = table.numeric_values(&config.y)?;
        let zs = match &config.z {
            Some(z) => Some(table.numeric_values(z)?),
            None => None,
        };

        let mut geometries: Vec<Geometry> = xs
            .iter()
            .zip(&ys)
            .enumerate()
            .map(|(row, (x, y))| {
                let mut position = vec![*x, *y];
                if let Some(zs) = &zs {
                    position.push(zs[row]);
                }
                Geometry::Point(position)
            })
            .collect();
        reproject(&id, epsg, &mut geometries)?;

        let column_range = match &config.t {
            Some(t) => temporal::column_range(t, table.values(t)?, &config.date_format)?,
            None => None,
        };
        let fields = declared_time(&config.common, &geometries);
        let time = resolve_item_time(&id, &fields, column_range)?;

        let mut asset = Asset::data(&config.common.location, media_type::CSV);
        asset.description = Some("Raw point data".to_string());

        debug!("{}: {} points", id, geometries.len());
        build_item(
            &config.common,
            id,
            &geometries,
            time,
            epsg,
            config.to_properties(),
            asset,
        )
    }
}

impl ItemGenerator for PointGenerator {
    fn source_id(&self) -> &str {
        &self.config.common.id
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Point
    }

    fn create_items(&self, _options: &GenerationOptions) -> Result<Vec<Item>, GenerationError> {
        let common = &self.config.common;
        let extension = common.source_extension()?;
        let source = resolve_source(common, &extension)?;
        let columns = self.config.required_columns();
        let table = Table::read(source.path(), columns.as_deref())?;

        // CSV carries no reference system, the declared one is authoritative.
        let epsg = common.epsg.unwrap_or(WGS84);

        let items = match self.config.group_by.as_deref() {
            Some(group_by) if !group_by.is_empty() => table
                .group_by(group_by)?
                .into_iter()
                .map(|(key, rows)| {
                    let id = format!("{}_{}", common.item_prefix(), key.join("_"));
                    self.item_from_table(id, &rows, epsg)
                })
                .collect::<Result<Vec<_>, _>>()?,
            _ => vec![self.item_from_table(common.id.clone(), &table, epsg)?],
        };
        info!("Generated {} point item(s) from {}", items.len(), common.id);
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ColumnInfo, CommonConfig};
    use serde_json::{Value, json};
    use std::io::Write;
    use std::path::Path;
    use tempfile::tempdir;

    fn write_csv(dir: &Path) -> String {
        let path = dir.join("soil.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "site,lon,lat,pH,date").unwrap();
        writeln!(file, "north,150.10,-24.10,6.5,2020-01-02").unwrap();
        writeln!(file, "south,150.20,-24.20,7.0,2020-01-01").unwrap();
        writeln!(file, "north,150.30,-24.30,7.5,2020-01-05").unwrap();
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn test_single_item_with_time_column() {
        let dir = tempdir().unwrap();
        let common = CommonConfig::new("soil", write_csv(dir.path()));
        let mut config = PointConfig::new(common, "lon", "lat");
        config.t = Some("date".into());
        config.column_info = Some(vec![ColumnInfo::named("pH")]);

        let items = PointGenerator::new(config)
            .create_items(&GenerationOptions::default())
            .unwrap();
        assert_eq!(items.len(), 1);
        let item = &items[0];
        assert_eq!(item.id, "soil");
        assert!(matches!(&item.geometry, Some(Geometry::MultiPoint(ps)) if ps.len() == 3));
        assert_eq!(item.properties["start_datetime"], "2020-01-01T00:00:00Z");
        assert_eq!(item.properties["end_datetime"], "2020-01-05T00:00:00Z");
        assert_eq!(item.properties["proj:code"], "EPSG:4326");
        assert_eq!(item.properties["X"], "lon");
    }

    #[test]
    fn test_group_by_names_items() {
        let dir = tempdir().unwrap();
        let mut common = CommonConfig::new("soil", write_csv(dir.path()));
        common.prefix = Some("site".into());
        common.datetime = Some("2021-01-01T00:00:00Z".parse().unwrap());
        let mut config = PointConfig::new(common, "lon", "lat");
        config.group_by = Some(vec!["site".into()]);

        let items = PointGenerator::new(config)
            .create_items(&GenerationOptions::default())
            .unwrap();
        let ids: Vec<&str> = items.iter().map(|item| item.id.as_str()).collect();
        assert_eq!(ids, vec!["site_north", "site_south"]);
        assert!(matches!(&items[1].geometry, Some(Geometry::Point(p)) if p == &vec![150.2, -24.2]));
        assert_eq!(items[0].properties["datetime"], "2021-01-01T00:00:00Z");
    }

    #[test]
    fn test_missing_time_information() {
        let dir = tempdir().unwrap();
        let common = CommonConfig::new("soil", write_csv(dir.path()));
        let config = PointConfig::new(common, "lon", "lat");
        let err = PointGenerator::new(config)
            .create_items(&GenerationOptions::default())
            .unwrap_err();
        assert!(matches!(err, GenerationError::Temporal(_)));
    }

    #[test]
    fn test_non_datetime_time_column() {
        let dir = tempdir().unwrap();
        let common = CommonConfig::new("soil", write_csv(dir.path()));
        let mut config = PointConfig::new(common, "lon", "lat");
        config.t = Some("site".into());
        let err = PointGenerator::new(config)
            .create_items(&GenerationOptions::default())
            .unwrap_err();
        assert!(matches!(
            err,
            GenerationError::Temporal(temporal::TemporalError::TimeColumnType { .. })
        ));
    }

    #[test]
    fn test_each_group_gets_its_own_time_range() {
        let dir = tempdir().unwrap();
        let common = CommonConfig::new("soil", write_csv(dir.path()));
        let mut config = PointConfig::new(common, "lon", "lat");
        config.t = Some("date".into());
        config.group_by = Some(vec!["site".into()]);

        let items = PointGenerator::new(config)
            .create_items(&GenerationOptions::default())
            .unwrap();
        let ranges: Vec<(&str, &Value, &Value)> = items
            .iter()
            .map(|item| {
                (
                    item.id.as_str(),
                    &item.properties["start_datetime"],
                    &item.properties["end_datetime"],
                )
            })
            .collect();
        assert_eq!(
            ranges,
            vec![
                ("soil_north", &json!("2020-01-02T00:00:00Z"), &json!("2020-01-05T00:00:00Z")),
                ("soil_south", &json!("2020-01-01T00:00:00Z"), &json!("2020-01-01T00:00:00Z")),
            ]
        );
    }

    #[test]
    fn test_declared_epsg_is_reprojected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mga.csv");
        std::fs::write(&path, "easting,northing\n500000,10000000\n500000,7300000\n").unwrap();
        let mut common = CommonConfig::new("mga", path.to_string_lossy());
        common.epsg = Some(28355);
        common.datetime = Some("2020-01-01T00:00:00Z".parse().unwrap());
        let config = PointConfig::new(common, "easting", "northing");

        let items = PointGenerator::new(config)
            .create_items(&GenerationOptions::default())
            .unwrap();
        let item = &items[0];
        assert_eq!(item.properties["proj:code"], "EPSG:28355");

        // Zone 55 is centred on 147E and false northing is the equator.
        let bbox = item.bbox.unwrap();
        assert!((bbox.xmin - 147.0).abs() < 1e-4, "{bbox:?}");
        assert!((bbox.xmax - 147.0).abs() < 1e-4, "{bbox:?}");
        assert!(bbox.ymax.abs() < 1e-4, "{bbox:?}");
        assert!(bbox.ymin < -24.0 && bbox.ymin > -25.0, "{bbox:?}");
    }
}
