use std::collections::HashSet;
use tracing::{debug, info};

use super::item::{build_item, declared_time, media_type_for, reproject};
use super::{GenerationError, GenerationOptions, ItemGenerator};
use crate::config::{ColumnInfo, SourceKind, VectorConfig};
use crate::projection::reconcile_epsg;
use crate::readers::{
    Table, VectorLayer, layer_fields, read_layer, resolve_location, resolve_source,
};
use crate::stac::{Asset, Item};
use crate::temporal::{self, TimeRange, resolve_item_time};

/// One item per vector file, optionally timed by a joined attribute table.
pub struct VectorGenerator {
    config: VectorConfig,
}

impl VectorGenerator {
    pub fn new(config: VectorConfig) -> Self {
        Self { config }
    }

    fn join_attribute(&self) -> Result<Option<(&str, &str, &str)>, GenerationError> {
        let config = &self.config;
        let Some(join_file) = config.join_file.as_deref() else {
            return Ok(None);
        };
        match (
            config.join_attribute_vector.as_deref(),
            config.join_field.as_deref(),
        ) {
            (Some(attribute), Some(field)) => Ok(Some((join_file, attribute, field))),
            _ => Err(GenerationError::IncompleteJoin {
                id: config.common.id.clone(),
            }),
        }
    }

    /// Time range of the join rows matching the layer's join attribute values.
    fn joined_range(
        &self,
        layer: &VectorLayer,
        join_file: &str,
        attribute: &str,
        field: &str,
    ) -> Result<Option<TimeRange>, GenerationError> {
        let config = &self.config;
        let id = &config.common.id;
        let join_error = |source| GenerationError::JoinFile {
            id: id.clone(),
            source,
        };

        let mut columns = vec![field.to_string()];
        columns.extend(config.join_t_column.iter().cloned());
        if let Some(join_columns) = &config.join_column_info {
            columns.extend(ColumnInfo::names(join_columns));
        }
        let mut seen = HashSet::new();
        columns.retain(|column| seen.insert(column.clone()));

        let source = resolve_location(join_file)?;
        let table = Table::read(source.path(), Some(&columns)).map_err(join_error)?;

        let keys: HashSet<&str> = layer
            .attributes
            .get(attribute)
            .map(|values| values.iter().map(String::as_str).collect())
            .unwrap_or_default();
        let joined = table
            .filter(field, |value| keys.contains(value))
            .map_err(join_error)?;
        debug!(
            "{}: {} of {} join rows match {}",
            id,
            joined.rows.len(),
            table.rows.len(),
            attribute
        );

        match &config.join_t_column {
            Some(t) => Ok(temporal::column_range(
                t,
                joined.values(t).map_err(join_error)?,
                &config.date_format,
            )?),
            None => Ok(None),
        }
    }
}

impl ItemGenerator for VectorGenerator {
    fn source_id(&self) -> &str {
        &self.config.common.id
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Vector
    }

    fn create_items(&self, options: &GenerationOptions) -> Result<Vec<Item>, GenerationError> {
        let config = &self.config;
        let common = &config.common;
        let extension = common.source_extension()?;
        let source = resolve_source(common, &extension)?;
        let join = self.join_attribute()?;

        let mut attributes = config
            .column_info
            .as_deref()
            .map(ColumnInfo::names)
            .unwrap_or_default();
        if let Some((_, attribute, _)) = join {
            let fields = layer_fields(source.path(), config.layer.as_deref())?;
            if !fields.iter().any(|f| f == attribute) {
                return Err(GenerationError::MissingJoinAttribute {
                    id: common.id.clone(),
                    attribute: attribute.to_string(),
                });
            }
            if !attributes.iter().any(|a| a == attribute) {
                attributes.push(attribute.to_string());
            }
        }

        let mut layer = read_layer(source.path(), config.layer.as_deref(), &attributes)?;
        let epsg = reconcile_epsg(&common.id, common.epsg, layer.epsg, options.epsg_policy)
            .map_err(GenerationError::projection(&common.id))?;
        reproject(&common.id, epsg, &mut layer.geometries)?;

        let column_range = match join {
            Some((join_file, attribute, field)) => {
                self.joined_range(&layer, join_file, attribute, field)?
            }
            None => None,
        };
        let fields = declared_time(common, &layer.geometries);
        let time = resolve_item_time(&common.id, &fields, column_range)?;

        let mut asset = Asset::data(&common.location, media_type_for(&extension));
        asset.description = Some("Raw vector data".to_string());

        let item = build_item(
            common,
            common.id.clone(),
            &layer.geometries,
            time,
            epsg,
            config.to_properties(),
            asset,
        )?;
        info!("Generated vector item {} from layer {}", item.id, layer.name);
        Ok(vec![item])
    }
}
