use gdal::Dataset;
use std::path::Path;
use tracing::debug;

use super::ReadError;
use crate::bands::{FileBand, stac_data_type};
use crate::bbox::Bbox;
use crate::projection::{DetectedEpsg, WGS84, extract_epsg};

/// Georeferencing and band metadata of a raster. No pixels are read.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterInfo {
    pub width: usize,
    pub height: usize,
    /// GDAL geotransform: origin x, pixel width, row rotation, origin y,
    /// column rotation, pixel height.
    pub geo_transform: [f64; 6],
    pub epsg: DetectedEpsg,
    pub wkt: Option<String>,
    pub bands: Vec<FileBand>,
}

impl RasterInfo {
    pub fn read(path: &Path) -> Result<RasterInfo, ReadError> {
        let gdal_error = |source| ReadError::Gdal {
            path: path.to_path_buf(),
            source,
        };
        let dataset = Dataset::open(path).map_err(gdal_error)?;
        let (width, height) = dataset.raster_size();
        let geo_transform = dataset.geo_transform().map_err(gdal_error)?;

        let (epsg, wkt) = match dataset.spatial_ref() {
            Ok(srs) => (extract_epsg(&srs), srs.to_wkt().ok()),
            Err(_) => (
                DetectedEpsg {
                    code: WGS84,
                    reliable: false,
                },
                None,
            ),
        };

        let mut bands = Vec::with_capacity(dataset.raster_count());
        for index in 1..=dataset.raster_count() {
            let band = dataset.rasterband(index).map_err(gdal_error)?;
            bands.push(FileBand {
                nodata: band.no_data_value(),
                data_type: stac_data_type(&band.band_type().name()),
            });
        }
        debug!(
            "Read raster {} ({}x{}, {} bands)",
            path.display(),
            width,
            height,
            bands.len()
        );

        Ok(RasterInfo {
            width,
            height,
            geo_transform,
            epsg,
            wkt,
            bands,
        })
    }

    /// Bounds in the raster's own reference system.
    pub fn native_bounds(&self) -> Bbox {
        let gt = &self.geo_transform;
        let x0 = gt[0];
        let y0 = gt[3];
        let x1 = x0 + self.width as f64 * gt[1];
        let y1 = y0 + self.height as f64 * gt[5];
        Bbox {
            xmin: x0.min(x1),
            xmax: x0.max(x1),
            ymin: y0.min(y1),
            ymax: y0.max(y1),
        }
    }

    /// `[height, width]`, row-major like the projection extension expects.
    pub fn shape(&self) -> [usize; 2] {
        [self.height, self.width]
    }

    /// Affine transform as the projection extension's nine coefficients.
    pub fn affine(&self) -> [f64; 9] {
        let gt = &self.geo_transform;
        [gt[1], gt[2], gt[0], gt[4], gt[5], gt[3], 0.0, 0.0, 1.0]
    }
}
