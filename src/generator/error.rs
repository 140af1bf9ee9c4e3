use thiserror::Error;

use crate::config::ConfigError;
use crate::projection::ProjectionError;
use crate::readers::ReadError;
use crate::temporal::TemporalError;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Read(#[from] ReadError),
    #[error("{id}: {source}")]
    Projection {
        id: String,
        #[source]
        source: ProjectionError,
    },
    #[error(transparent)]
    Temporal(#[from] TemporalError),
    #[error(
        "{id}: a join file is provided, so join_attribute_vector and join_field must both be set"
    )]
    IncompleteJoin { id: String },
    #[error(
        "{id}: join attribute vector {attribute} is not a valid attribute of the vector file"
    )]
    MissingJoinAttribute { id: String, attribute: String },
    #[error("{id}: join file may not have the specified column: {source}")]
    JoinFile {
        id: String,
        #[source]
        source: ReadError,
    },
    #[error("{id}: source contains no geometry")]
    NoGeometry { id: String },
    #[error("{id}: {reason}")]
    Band { id: String, reason: String },
}

impl GenerationError {
    pub(crate) fn projection(id: &str) -> impl FnOnce(ProjectionError) -> GenerationError + '_ {
        move |source| GenerationError::Projection {
            id: id.to_string(),
            source,
        }
    }
}
