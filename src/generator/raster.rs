use serde_json::{Map, Value, json};
use tracing::info;

use super::item::{build_item, declared_time, media_type_for};
use super::{GenerationError, GenerationOptions, ItemGenerator};
use crate::bands::{EoBand, RasterBand};
use crate::bbox::Bbox;
use crate::config::{RasterConfig, SourceKind};
use crate::projection::{Reprojector, reconcile_epsg};
use crate::readers::{RasterInfo, resolve_source};
use crate::stac::{Asset, EO_EXTENSION, Item, RASTER_EXTENSION};
use crate::temporal::resolve_item_time;

/// One item per raster file, footprint taken from the raster's georeferencing.
pub struct RasterGenerator {
    config: RasterConfig,
}

impl RasterGenerator {
    pub fn new(config: RasterConfig) -> Self {
        Self { config }
    }

    /// Reprojects the four native corners and returns their bounds.
    fn wgs84_bounds(&self, raster: &RasterInfo, epsg: u32) -> Result<Bbox, GenerationError> {
        let id = &self.config.common.id;
        let native = raster.native_bounds();
        let mut xs = [native.xmin, native.xmax, native.xmax, native.xmin];
        let mut ys = [native.ymin, native.ymin, native.ymax, native.ymax];
        Reprojector::from_epsg(epsg)
            .and_then(|reprojector| reprojector.transform_xy(&mut xs, &mut ys))
            .map_err(GenerationError::projection(id))?;
        Ok(Bbox {
            xmin: xs.iter().cloned().fold(f64::INFINITY, f64::min),
            xmax: xs.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
            ymin: ys.iter().cloned().fold(f64::INFINITY, f64::min),
            ymax: ys.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
        })
    }

    fn bands(
        &self,
        raster: &RasterInfo,
    ) -> Result<(Vec<EoBand>, Vec<RasterBand>), GenerationError> {
        let id = &self.config.common.id;
        let eo_bands = self.config.band_info.iter().map(EoBand::from_info).collect();
        let raster_bands = self
            .config
            .band_info
            .iter()
            .enumerate()
            .map(|(index, info)| RasterBand::resolve(info, raster.bands.get(index)))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|reason| GenerationError::Band {
                id: id.clone(),
                reason,
            })?;
        Ok((eo_bands, raster_bands))
    }
}

impl ItemGenerator for RasterGenerator {
    fn source_id(&self) -> &str {
        &self.config.common.id
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Raster
    }

    fn create_items(&self, options: &GenerationOptions) -> Result<Vec<Item>, GenerationError> {
        let common = &self.config.common;
        let extension = common.source_extension()?;
        let source = resolve_source(common, &extension)?;
        let raster = RasterInfo::read(source.path())?;

        let epsg = reconcile_epsg(&common.id, common.epsg, raster.epsg, options.epsg_policy)
            .map_err(GenerationError::projection(&common.id))?;
        let footprint = self.wgs84_bounds(&raster, epsg)?.to_polygon();
        let fields = declared_time(common, std::slice::from_ref(&footprint));
        let time = resolve_item_time(&common.id, &fields, None)?;
        let (eo_bands, raster_bands) = self.bands(&raster)?;

        let mut properties = Map::new();
        if let Some(wkt) = &raster.wkt {
            properties.insert("proj:wkt2".into(), json!(wkt));
        }
        properties.insert("proj:shape".into(), json!(raster.shape()));
        properties.insert("proj:transform".into(), json!(raster.affine()));
        properties.insert("eo:bands".into(), json!(eo_bands));
        properties.insert("eo:cloud_cover".into(), json!(0.0));
        properties.insert("eo:snow_cover".into(), json!(0.0));

        let mut asset = Asset::data(&common.location, media_type_for(&extension));
        asset.title = Some("Raster Data".to_string());
        asset.extra.insert("eo:bands".into(), json!(eo_bands));
        let raster_bands = raster_bands.iter().map(|band| json!(band)).collect();
        asset
            .extra
            .insert("raster:bands".into(), Value::Array(raster_bands));

        let mut item = build_item(
            common,
            common.id.clone(),
            &[footprint],
            time,
            epsg,
            properties,
            asset,
        )?;
        item.add_extension(EO_EXTENSION);
        item.add_extension(RASTER_EXTENSION);
        info!("Generated raster item {}", item.id);
        Ok(vec![item])
    }
}
