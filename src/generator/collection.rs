use serde_json::{Map, Value, json};
use tracing::info;

use super::{GenerationError, GenerationOptions, ItemGenerator, create_generator};
use crate::bbox::Bbox;
use crate::config::{CollectionConfig, SourceConfig};
use crate::stac::{Collection, Extent, Item};
use crate::temporal::resolve_collection_range;

/// Runs item generators in order and aggregates their items into one collection.
pub struct CollectionGenerator {
    config: CollectionConfig,
    generators: Vec<Box<dyn ItemGenerator>>,
    options: GenerationOptions,
}

impl CollectionGenerator {
    pub fn new(
        config: CollectionConfig,
        generators: Vec<Box<dyn ItemGenerator>>,
        options: GenerationOptions,
    ) -> Self {
        Self {
            config,
            generators,
            options,
        }
    }

    pub fn from_configs(
        config: CollectionConfig,
        sources: Vec<SourceConfig>,
        options: GenerationOptions,
    ) -> Self {
        let generators = sources.into_iter().map(create_generator).collect();
        Self::new(config, generators, options)
    }

    pub fn create_items(&self) -> Result<Vec<Item>, GenerationError> {
        let mut items = Vec::new();
        for generator in &self.generators {
            info!(
                "Processing {} source {}",
                generator.kind(),
                generator.source_id()
            );
            items.extend(generator.create_items(&self.options)?);
        }
        Ok(items)
    }

    pub fn create_collection(&self) -> Result<Collection, GenerationError> {
        self.config.validate()?;
        let items = self.create_items()?;
        Ok(self.collection_from_items(items))
    }

    /// Builds the collection around `items`. The spatial extent is the union
    /// of the item bboxes, the whole world when there are none.
    pub fn collection_from_items(&self, mut items: Vec<Item>) -> Collection {
        let config = &self.config;
        let bbox = items
            .iter()
            .filter_map(|item| item.bbox)
            .reduce(|a, b| a.union(&b))
            .unwrap_or_else(Bbox::world);
        let range = resolve_collection_range(
            &config.time_fields(),
            items.iter().filter_map(Item::time_range),
        );

        let mut collection = Collection::new(
            config.id.clone(),
            config.description(),
            config.license(),
            Extent::new(bbox, range),
        );
        collection.title = config.metadata.title.clone();
        collection.keywords = config.keywords.clone();
        collection.providers = config.metadata.providers.clone();
        collection.summaries = self.summaries();

        for item in &mut items {
            item.collection = Some(collection.id.clone());
        }
        info!(
            "Collection {} holds {} item(s)",
            collection.id,
            items.len()
        );
        collection.items = items;
        collection
    }

    fn summaries(&self) -> Map<String, Value> {
        let metadata = &self.config.metadata;
        let mut summaries = Map::new();
        if let Some(platform) = &metadata.platform {
            summaries.insert("platform".into(), json!([platform]));
        }
        if let Some(instruments) = &metadata.instruments {
            summaries.insert("instruments".into(), json!(instruments));
        }
        if let Some(constellation) = &metadata.constellation {
            summaries.insert("constellation".into(), json!([constellation]));
        }
        if let Some(mission) = &metadata.mission {
            summaries.insert("mission".into(), json!([mission]));
        }
        if let Some(gsd) = metadata.gsd {
            summaries.insert("gsd".into(), json!([gsd]));
        }
        summaries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SourceKind;
    use crate::geometry::Geometry;
    use crate::temporal::{ItemTime, TimeRange};
    use chrono::{DateTime, Utc};

    struct FixedItems(Vec<Item>);

    impl ItemGenerator for FixedItems {
        fn source_id(&self) -> &str {
            "fixed"
        }

        fn kind(&self) -> SourceKind {
            SourceKind::Vector
        }

        fn create_items(&self, _: &GenerationOptions) -> Result<Vec<Item>, GenerationError> {
            Ok(self.0.clone())
        }
    }

    fn item(id: &str, bbox: [f64; 4], datetime: &str) -> Item {
        let at: DateTime<Utc> = datetime.parse().unwrap();
        let bbox = Bbox::new(bbox[0], bbox[2], bbox[1], bbox[3]).unwrap();
        Item::new(
            id,
            bbox.to_polygon(),
            ItemTime {
                datetime: at,
                range: TimeRange::instant(at),
            },
        )
    }

    fn generator(config: CollectionConfig) -> CollectionGenerator {
        let items = vec![
            item(
                "a",
                [150.5471916, -24.34031206, 150.5505183, -24.33986861],
                "2017-01-01T00:00:00Z",
            ),
            item(
                "b",
                [150.5515183, -24.34986861, 150.5571916, -24.34131206],
                "2017-01-02T00:00:00Z",
            ),
        ];
        CollectionGenerator::new(
            config,
            vec![Box::new(FixedItems(items))],
            GenerationOptions::default(),
        )
    }

    #[test]
    fn test_extent_encloses_items() {
        let collection = generator(CollectionConfig::new("farm"))
            .create_collection()
            .unwrap();

        assert_eq!(
            collection.extent.bbox().unwrap().to_array(),
            [150.5471916, -24.34986861, 150.5571916, -24.33986861]
        );
        let interval = collection.extent.interval().unwrap();
        assert_eq!(interval[0], Some("2017-01-01T00:00:00Z".parse().unwrap()));
        assert_eq!(interval[1], Some("2017-01-02T00:00:00Z".parse().unwrap()));
        assert_eq!(collection.license, "proprietary");
        assert_eq!(
            collection.description,
            "Auto-generated collection farm with stac_generator"
        );
        assert!(
            collection
                .items
                .iter()
                .all(|item| item.collection.as_deref() == Some("farm"))
        );
    }

    #[test]
    fn test_explicit_interval_wins() {
        let mut config = CollectionConfig::new("farm");
        config.start_datetime = Some("2010-01-01T00:00:00Z".parse().unwrap());
        config.end_datetime = Some("2011-01-01T00:00:00Z".parse().unwrap());
        config.metadata.platform = Some("drone".into());

        let collection = generator(config).create_collection().unwrap();
        let interval = collection.extent.interval().unwrap();
        assert_eq!(interval[0], Some("2010-01-01T00:00:00Z".parse().unwrap()));
        assert_eq!(interval[1], Some("2011-01-01T00:00:00Z".parse().unwrap()));
        assert_eq!(collection.summaries["platform"], json!(["drone"]));
    }

    #[test]
    fn test_empty_collection_covers_world() {
        let generator = CollectionGenerator::new(
            CollectionConfig::new("empty"),
            Vec::new(),
            GenerationOptions::default(),
        );
        let collection = generator.create_collection().unwrap();
        assert_eq!(
            collection.extent.bbox().unwrap().to_array(),
            [-180.0, -90.0, 180.0, 90.0]
        );
        assert!(collection.items.is_empty());
    }

    #[test]
    fn test_collection_id_required() {
        let err = generator(CollectionConfig::default())
            .create_collection()
            .unwrap_err();
        assert!(matches!(err, GenerationError::Config(_)));
    }
}
