use thiserror::Error;

use crate::config::ConfigError;
use crate::generator::GenerationError;
use crate::serialiser::SerialiseError;
use crate::template::TemplateError;

/// Any failure of a generation or template run.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error(transparent)]
    Serialise(#[from] SerialiseError),
    #[error(transparent)]
    Template(#[from] TemplateError),
}

pub type Result<T> = std::result::Result<T, Error>;
