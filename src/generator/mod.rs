pub mod collection;
pub mod error;
pub mod item;
pub mod point;
pub mod raster;
pub mod vector;

pub use collection::CollectionGenerator;
pub use error::GenerationError;
pub use point::PointGenerator;
pub use raster::RasterGenerator;
pub use vector::VectorGenerator;

use crate::config::{SourceConfig, SourceKind};
use crate::projection::EpsgPolicy;
use crate::stac::Item;

/// Settings shared by every item generator in a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenerationOptions {
    pub epsg_policy: EpsgPolicy,
}

/// Turns one source config into STAC items.
pub trait ItemGenerator {
    fn source_id(&self) -> &str;

    fn kind(&self) -> SourceKind;

    fn create_items(&self, options: &GenerationOptions) -> Result<Vec<Item>, GenerationError>;
}

pub fn create_generator(config: SourceConfig) -> Box<dyn ItemGenerator> {
    match config {
        SourceConfig::Point(config) => Box::new(PointGenerator::new(config)),
        SourceConfig::Vector(config) => Box::new(VectorGenerator::new(config)),
        SourceConfig::Raster(config) => Box::new(RasterGenerator::new(config)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BandInfo, CommonConfig, PointConfig, RasterConfig, VectorConfig};

    #[test]
    fn test_create_generator_matches_kind() {
        let point = SourceConfig::Point(PointConfig::new(
            CommonConfig::new("p", "p.csv"),
            "lon",
            "lat",
        ));
        let vector = SourceConfig::Vector(VectorConfig::new(CommonConfig::new("v", "v.shp")));
        let raster = SourceConfig::Raster(RasterConfig {
            common: CommonConfig::new("r", "r.tif"),
            band_info: vec![BandInfo::named("red")],
        });

        for (config, kind, id) in [
            (point, SourceKind::Point, "p"),
            (vector, SourceKind::Vector, "v"),
            (raster, SourceKind::Raster, "r"),
        ] {
            let generator = create_generator(config);
            assert_eq!(generator.kind(), kind);
            assert_eq!(generator.source_id(), id);
        }
    }
}
