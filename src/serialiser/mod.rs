//! Persists a generated collection and its items, either as a JSON tree on
//! disk or by upserting them to a STAC API.

pub mod api;
pub mod local;

pub use api::{
    ApiError, AsyncHttpTransport, AsyncStacTransport, HttpTransport, StacTransport, parse_href,
};
pub use local::{read_collection, write_collection};

use std::path::PathBuf;
use thiserror::Error;
use tracing::info;

use crate::config::is_http_url;
use crate::stac::Collection;
use crate::stac::validate::{ValidationError, validate_collection};

#[derive(Debug, Error)]
pub enum SerialiseError {
    #[error("Invalid STAC output: {0}")]
    Validation(#[from] ValidationError),
    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to encode or decode {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Where the output goes, decided by the scheme of the destination string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    Local(PathBuf),
    Api(String),
}

impl Destination {
    pub fn parse(dst: &str) -> Destination {
        if is_http_url(dst) {
            Destination::Api(dst.to_string())
        } else {
            Destination::Local(PathBuf::from(dst))
        }
    }
}

/// A validated collection bound to its destination. Nothing is written when
/// validation fails.
#[derive(Debug)]
pub struct StacSerialiser {
    collection: Collection,
    destination: Destination,
}

impl StacSerialiser {
    pub fn new(collection: Collection, dst: &str) -> Result<Self, SerialiseError> {
        validate_collection(&collection)?;
        Ok(Self {
            collection,
            destination: Destination::parse(dst),
        })
    }

    pub fn collection(&self) -> &Collection {
        &self.collection
    }

    pub fn write(&self) -> Result<(), SerialiseError> {
        match &self.destination {
            Destination::Local(root) => {
                let path = write_collection(&self.collection, root)?;
                info!("Wrote collection {} to {}", self.collection.id, path.display());
            }
            Destination::Api(base) => {
                let transport = HttpTransport::new()?;
                api::upsert_collection(&transport, base, &self.collection)?;
            }
        }
        Ok(())
    }

    /// Like [`StacSerialiser::write`], but uploads items concurrently.
    pub async fn write_concurrent(&self) -> Result<(), SerialiseError> {
        match &self.destination {
            Destination::Local(_) => self.write(),
            Destination::Api(base) => {
                let transport = AsyncHttpTransport::new()?;
                api::upsert_collection_async(&transport, base, &self.collection).await?;
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bbox::Bbox;
    use crate::geometry::Geometry;
    use crate::stac::{Extent, Item};
    use crate::temporal::{ItemTime, TimeRange};

    #[test]
    fn test_destination_from_scheme() {
        assert_eq!(
            Destination::parse("http://localhost:8082"),
            Destination::Api("http://localhost:8082".into())
        );
        assert_eq!(
            Destination::parse("output/stac"),
            Destination::Local(PathBuf::from("output/stac"))
        );
    }

    #[test]
    fn test_invalid_collection_is_rejected() {
        let at = "2020-01-01T00:00:00Z".parse().unwrap();
        let collection = Collection::new(
            " ",
            "d",
            "proprietary",
            Extent::new(Bbox::world(), TimeRange::instant(at)),
        );
        let dir = tempfile::tempdir().unwrap();
        let err = StacSerialiser::new(collection, &dir.path().to_string_lossy()).unwrap_err();
        assert!(matches!(err, SerialiseError::Validation(_)));
        assert!(!dir.path().join("collection.json").exists());
    }

    #[test]
    fn test_item_id_escaping_the_destination_is_rejected() {
        let at = "2020-01-01T00:00:00Z".parse().unwrap();
        let mut collection = Collection::new(
            "soil",
            "d",
            "proprietary",
            Extent::new(Bbox::world(), TimeRange::instant(at)),
        );
        let time = ItemTime {
            datetime: at,
            range: TimeRange::instant(at),
        };
        collection.items = vec![Item::new(
            "soil_../../evil",
            Geometry::Point(vec![150.0, -24.0]),
            time,
        )];

        let dir = tempfile::tempdir().unwrap();
        let dst = dir.path().join("stac");
        let err = StacSerialiser::new(collection, &dst.to_string_lossy()).unwrap_err();
        assert!(matches!(
            err,
            SerialiseError::Validation(ValidationError::InvalidId { .. })
        ));
        assert!(!dst.exists());
        assert!(!dir.path().join("evil").exists());
    }
}
