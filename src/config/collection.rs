use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use super::{CommonMetadata, ConfigError, json_or_value};
use crate::temporal::{self, TimeFields};

pub const DEFAULT_LICENSE: &str = "proprietary";

/// Collection level metadata. Spatial and temporal extent are derived from the
/// generated items unless an explicit interval is given here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollectionConfig {
    #[serde(default)]
    pub id: String,
    #[serde(flatten)]
    pub metadata: CommonMetadata,
    #[serde(
        default,
        deserialize_with = "json_or_value",
        skip_serializing_if = "Option::is_none"
    )]
    pub keywords: Option<Vec<String>>,
    #[serde(
        default,
        deserialize_with = "temporal::de_opt_datetime",
        skip_serializing_if = "Option::is_none"
    )]
    pub datetime: Option<DateTime<Utc>>,
    #[serde(
        default,
        deserialize_with = "temporal::de_opt_datetime",
        skip_serializing_if = "Option::is_none"
    )]
    pub start_datetime: Option<DateTime<Utc>>,
    #[serde(
        default,
        deserialize_with = "temporal::de_opt_datetime",
        skip_serializing_if = "Option::is_none"
    )]
    pub end_datetime: Option<DateTime<Utc>>,
}

impl CollectionConfig {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Reads a collection metadata JSON file. The `id` may be left out and
    /// supplied on the command line.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<CollectionConfig, ConfigError> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);

        let config: CollectionConfig = serde_json::from_reader(reader)?;

        Ok(config)
    }

    /// Fills every unset field from `fallback`. Values already set on `self`
    /// take precedence.
    pub fn or(self, fallback: CollectionConfig) -> CollectionConfig {
        let metadata = CommonMetadata {
            title: self.metadata.title.or(fallback.metadata.title),
            description: self.metadata.description.or(fallback.metadata.description),
            license: self.metadata.license.or(fallback.metadata.license),
            providers: self.metadata.providers.or(fallback.metadata.providers),
            platform: self.metadata.platform.or(fallback.metadata.platform),
            instruments: self.metadata.instruments.or(fallback.metadata.instruments),
            constellation: self
                .metadata
                .constellation
                .or(fallback.metadata.constellation),
            mission: self.metadata.mission.or(fallback.metadata.mission),
            gsd: self.metadata.gsd.or(fallback.metadata.gsd),
        };
        CollectionConfig {
            id: if self.id.is_empty() { fallback.id } else { self.id },
            metadata,
            keywords: self.keywords.or(fallback.keywords),
            datetime: self.datetime.or(fallback.datetime),
            start_datetime: self.start_datetime.or(fallback.start_datetime),
            end_datetime: self.end_datetime.or(fallback.end_datetime),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.id.trim().is_empty() {
            return Err(ConfigError::InvalidField {
                field: "id".into(),
                reason: "collection id is required".into(),
            });
        }
        if let (Some(start), Some(end)) = (self.start_datetime, self.end_datetime)
            && start > end
        {
            return Err(ConfigError::InvalidField {
                field: "end_datetime".into(),
                reason: "end_datetime cannot be earlier than start_datetime".into(),
            });
        }
        Ok(())
    }

    pub fn time_fields(&self) -> TimeFields {
        TimeFields {
            datetime: self.datetime,
            start_datetime: self.start_datetime,
            end_datetime: self.end_datetime,
        }
    }

    pub fn license(&self) -> &str {
        self.metadata.license.as_deref().unwrap_or(DEFAULT_LICENSE)
    }

    pub fn description(&self) -> String {
        self.metadata.description.clone().unwrap_or_else(|| {
            format!(
                "Auto-generated collection {} with stac_generator",
                self.id
            )
        })
    }
}
