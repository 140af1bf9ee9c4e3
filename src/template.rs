//! Config templates: source entries with `column_info` or `band_info`
//! pre-filled from the files they point to.

use serde_json::{Map, Value, json};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

use crate::config::loader::{STRUCTURED_FIELDS, read_source_records};
use crate::config::{CommonConfig, ConfigError, SourceKind};
use crate::readers::{RasterInfo, ReadError, Table, layer_fields, resolve_source};

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Read(#[from] ReadError),
    #[error("Expects csv or json template, got {0}")]
    UnsupportedFormat(String),
    #[error("Failed to write template {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to encode template: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Failed to write template: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateFormat {
    Json,
    Csv,
}

impl TemplateFormat {
    pub fn from_path(path: &Path) -> Result<Self, TemplateError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match extension.as_str() {
            "json" => Ok(TemplateFormat::Json),
            "csv" => Ok(TemplateFormat::Csv),
            _ => Err(TemplateError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// Fills `column_info` or `band_info` of one raw config entry from its file.
pub fn template_record(
    mut record: Map<String, Value>,
) -> Result<Map<String, Value>, TemplateError> {
    let kind = SourceKind::of_record(&record)?;
    let common: CommonConfig = serde_json::from_value(Value::Object(record.clone()))
        .map_err(ConfigError::from)?;
    let source = resolve_source(&common, &common.source_extension()?)?;

    match kind {
        SourceKind::Point => {
            let table = Table::read(source.path(), None)?;
            let reserved: Vec<&str> = ["X", "Y", "Z", "T"]
                .iter()
                .filter_map(|key| record.get(*key).and_then(Value::as_str))
                .collect();
            let columns: Vec<Value> = table
                .headers
                .iter()
                .filter(|header| !reserved.contains(&header.as_str()))
                .map(|name| json!({ "name": name, "description": format!("{name}_description") }))
                .collect();
            record.insert("column_info".into(), Value::Array(columns));
        }
        SourceKind::Vector => {
            let layer = record.get("layer").and_then(Value::as_str);
            let columns: Vec<Value> = layer_fields(source.path(), layer)?
                .iter()
                .map(|name| json!({ "name": name, "description": format!("{name}_description") }))
                .collect();
            record.insert("column_info".into(), Value::Array(columns));
        }
        SourceKind::Raster => {
            let raster = RasterInfo::read(source.path())?;
            let bands: Vec<Value> = (0..raster.bands.len())
                .map(|i| json!({ "name": format!("Band{i}"), "common_name": format!("Band{i}") }))
                .collect();
            record.insert("band_info".into(), Value::Array(bands));
        }
    }
    Ok(record)
}

/// Builds templates for every entry of `sources` and writes them to `dst`,
/// as a JSON array or a CSV with JSON encoded structured cells.
pub fn generate_template(sources: &[String], dst: &Path) -> Result<usize, TemplateError> {
    let format = TemplateFormat::from_path(dst)?;
    let mut records = Vec::new();
    for src in sources {
        for record in read_source_records(src)? {
            records.push(template_record(record)?);
        }
    }
    match format {
        TemplateFormat::Json => write_json(&records, dst)?,
        TemplateFormat::Csv => write_csv(&records, dst)?,
    }
    info!("Wrote {} template entries to {}", records.len(), dst.display());
    Ok(records.len())
}

fn write_json(records: &[Map<String, Value>], dst: &Path) -> Result<(), TemplateError> {
    let io_error = |source| TemplateError::Io {
        path: dst.to_path_buf(),
        source,
    };
    let file = File::create(dst).map_err(io_error)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, records)?;
    writer.flush().map_err(io_error)?;
    Ok(())
}

fn write_csv(records: &[Map<String, Value>], dst: &Path) -> Result<(), TemplateError> {
    let mut headers: Vec<&str> = Vec::new();
    for record in records {
        for key in record.keys() {
            if !headers.contains(&key.as_str()) {
                headers.push(key);
            }
        }
    }

    let mut writer = csv::Writer::from_path(dst)?;
    writer.write_record(&headers)?;
    for record in records {
        let row = headers
            .iter()
            .map(|header| cell(header, record.get(*header)))
            .collect::<Result<Vec<_>, _>>()?;
        writer.write_record(&row)?;
    }
    writer.flush().map_err(|source| TemplateError::Io {
        path: dst.to_path_buf(),
        source,
    })?;
    Ok(())
}

fn cell(field: &str, value: Option<&Value>) -> Result<String, serde_json::Error> {
    match value {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(text)) if !STRUCTURED_FIELDS.contains(&field) => Ok(text.clone()),
        Some(Value::Number(number)) => Ok(number.to_string()),
        Some(Value::Bool(flag)) => Ok(flag.to_string()),
        Some(other) => serde_json::to_string(other),
    }
}
