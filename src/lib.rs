//! Generates STAC items and collections from point CSVs, vector files and
//! rasters described by source configs, and writes them to disk or a STAC API.

pub mod bands;
pub mod bbox;
pub mod config;
pub mod error;
pub mod generator;
pub mod geometry;
pub mod logging;
pub mod projection;
pub mod readers;
pub mod serialiser;
pub mod stac;
pub mod temporal;
pub mod template;

pub use error::{Error, Result};

use config::{CollectionConfig, SourceConfig, read_source_config};
use generator::{CollectionGenerator, GenerationOptions};
use serialiser::StacSerialiser;
use tracing::info;

/// Reads every source config file, in order.
pub fn read_source_configs(sources: &[String]) -> Result<Vec<SourceConfig>> {
    let mut configs = Vec::new();
    for src in sources {
        configs.extend(read_source_config(src)?);
    }
    info!("Loaded {} source config(s)", configs.len());
    Ok(configs)
}

/// Generates the collection and validates it against its destination.
/// Nothing is written yet.
pub fn prepare(
    sources: &[String],
    collection: CollectionConfig,
    options: GenerationOptions,
    dst: &str,
) -> Result<StacSerialiser> {
    let configs = read_source_configs(sources)?;
    let generator = CollectionGenerator::from_configs(collection, configs, options);
    let collection = generator.create_collection()?;
    Ok(StacSerialiser::new(collection, dst)?)
}

/// Full run: read configs, generate, validate, then write or upload.
pub fn generate(
    sources: &[String],
    collection: CollectionConfig,
    options: GenerationOptions,
    dst: &str,
) -> Result<()> {
    prepare(sources, collection, options, dst)?.write()?;
    Ok(())
}
