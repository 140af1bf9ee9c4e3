use serde_json::{Map, Value};
use std::fs;
use std::path::Path;
use tracing::debug;

use super::{ConfigError, SourceConfig, is_http_url};

/// CSV cells holding lists or objects, stored as JSON text.
pub const STRUCTURED_FIELDS: &[&str] = &[
    "column_info",
    "band_info",
    "join_column_info",
    "group_by",
    "groupby",
    "instruments",
    "providers",
    "keywords",
    "params",
    "headers",
    "cookies",
    "json_body",
];

const NUMERIC_FIELDS: &[&str] = &["epsg", "gsd"];

/// Reads every source entry from a JSON, YAML or CSV config, local or remote.
pub fn read_source_config(src: &str) -> Result<Vec<SourceConfig>, ConfigError> {
    read_source_records(src)?
        .into_iter()
        .map(SourceConfig::from_record)
        .collect()
}

/// Raw entries of a source config, before they are typed.
pub fn read_source_records(src: &str) -> Result<Vec<Map<String, Value>>, ConfigError> {
    let extension = config_extension(src);
    let text = read_text(src)?;
    if text.trim().is_empty() {
        return Err(ConfigError::Empty(src.to_string()));
    }

    let records = match extension.as_str() {
        "json" => records_from_value(serde_json::from_str(&text)?, src)?,
        "yaml" | "yml" => records_from_value(serde_yaml::from_str(&text)?, src)?,
        "csv" => records_from_csv(&text)?,
        _ => return Err(ConfigError::UnsupportedConfigExtension(extension)),
    };
    if records.is_empty() {
        return Err(ConfigError::Empty(src.to_string()));
    }
    debug!("Read {} source entries from {}", records.len(), src);
    Ok(records)
}

fn config_extension(src: &str) -> String {
    let path = if is_http_url(src) {
        reqwest::Url::parse(src)
            .map(|url| url.path().to_string())
            .unwrap_or_else(|_| src.to_string())
    } else {
        src.to_string()
    };
    Path::new(&path)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default()
}

fn read_text(src: &str) -> Result<String, ConfigError> {
    if !is_http_url(src) {
        return Ok(fs::read_to_string(src)?);
    }
    debug!("Fetching config from {}", src);
    reqwest::blocking::get(src)
        .and_then(|response| response.error_for_status())
        .and_then(|response| response.text())
        .map_err(|source| ConfigError::Fetch {
            url: src.to_string(),
            source,
        })
}

// A single object is accepted as a one-entry list.
fn records_from_value(value: Value, src: &str) -> Result<Vec<Map<String, Value>>, ConfigError> {
    let entries = match value {
        Value::Array(entries) => entries,
        Value::Null => Vec::new(),
        other => vec![other],
    };
    entries
        .into_iter()
        .map(|entry| match entry {
            Value::Object(map) => Ok(map),
            _ => Err(ConfigError::NotAnObject(src.to_string())),
        })
        .collect()
}

fn records_from_csv(text: &str) -> Result<Vec<Map<String, Value>>, ConfigError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());
    let headers = reader.headers()?.clone();

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        let mut record = Map::new();
        for (field, cell) in headers.iter().zip(row.iter()) {
            if cell.is_empty() {
                continue;
            }
            record.insert(field.to_string(), coerce_cell(field, cell)?);
        }
        records.push(record);
    }
    Ok(records)
}

fn coerce_cell(field: &str, cell: &str) -> Result<Value, ConfigError> {
    if NUMERIC_FIELDS.contains(&field) {
        let number: f64 = cell.parse().map_err(|_| ConfigError::InvalidField {
            field: field.to_string(),
            reason: format!("{cell} is not a number"),
        })?;
        return Ok(if number.fract() == 0.0 && number >= 0.0 {
            Value::from(number as u64)
        } else {
            Value::from(number)
        });
    }
    if STRUCTURED_FIELDS.contains(&field) {
        return serde_json::from_str(cell).map_err(|err| ConfigError::InvalidField {
            field: field.to_string(),
            reason: format!("expected a JSON encoded value: {err}"),
        });
    }
    Ok(Value::String(cell.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SourceKind;
    use std::io::Write;
    use tempfile::tempdir;

    fn write(dir: &Path, name: &str, contents: &str) -> String {
        let path = dir.join(name);
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn test_read_json_config() {
        let dir = tempdir().unwrap();
        let path = write(
            dir.path(),
            "config.json",
            r#"[
                {"id": "soil", "location": "soil.csv", "X": "lon", "Y": "lat", "epsg": 4326},
                {"id": "ortho", "location": "ortho.tif", "band_info": [{"name": "red"}]}
            ]"#,
        );
        let configs = read_source_config(&path).unwrap();
        assert_eq!(configs.len(), 2);
        assert_eq!(configs[0].kind(), SourceKind::Point);
        assert_eq!(configs[0].common().epsg, Some(4326));
        assert_eq!(configs[1].kind(), SourceKind::Raster);
    }

    #[test]
    fn test_read_yaml_config() {
        let dir = tempdir().unwrap();
        let path = write(
            dir.path(),
            "config.yaml",
            "- id: suburbs\n  location: suburbs.geojson\n  column_info:\n    - name\n",
        );
        let configs = read_source_config(&path).unwrap();
        assert_eq!(configs.len(), 1);
        assert_eq!(configs[0].kind(), SourceKind::Vector);
    }

    #[test]
    fn test_read_csv_config_coerces_cells() {
        let dir = tempdir().unwrap();
        let path = write(
            dir.path(),
            "config.csv",
            "id,location,X,Y,epsg,gsd,column_info,group_by,T\n\
             soil,soil.csv,lon,lat,28355,0.5,\"[\"\"pH\"\"]\",\"[\"\"site\"\"]\",\n",
        );
        let configs = read_source_config(&path).unwrap();
        let SourceConfig::Point(point) = &configs[0] else {
            panic!("expected a point config");
        };
        assert_eq!(point.common.epsg, Some(28355));
        assert_eq!(point.common.metadata.gsd, Some(0.5));
        assert_eq!(point.group_by, Some(vec!["site".to_string()]));
        assert!(point.t.is_none());
    }

    #[test]
    fn test_empty_and_unsupported_configs() {
        let dir = tempdir().unwrap();
        let empty = write(dir.path(), "empty.json", "  \n");
        assert!(matches!(
            read_source_config(&empty),
            Err(ConfigError::Empty(_))
        ));

        let toml = write(dir.path(), "config.toml", "id = 1");
        assert!(matches!(
            read_source_config(&toml),
            Err(ConfigError::UnsupportedConfigExtension(ext)) if ext == "toml"
        ));
    }

    #[test]
    fn test_entry_must_be_object() {
        let dir = tempdir().unwrap();
        let path = write(dir.path(), "config.json", "[1, 2]");
        assert!(matches!(
            read_source_config(&path),
            Err(ConfigError::NotAnObject(_))
        ));
    }
}
