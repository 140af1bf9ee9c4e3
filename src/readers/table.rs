use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::ReadError;

/// In-memory CSV table of string cells.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    path: PathBuf,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Reads a CSV file. With `columns`, only those columns are kept, in that
    /// order, and a missing one is an error.
    pub fn read(path: &Path, columns: Option<&[String]>) -> Result<Table, ReadError> {
        let csv_error = |source| ReadError::Csv {
            path: path.to_path_buf(),
            source,
        };
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(csv_error)?;
        let file_headers: Vec<String> = reader
            .headers()
            .map_err(csv_error)?
            .iter()
            .map(str::to_string)
            .collect();

        let (headers, indices) = match columns {
            Some(columns) => {
                let mut indices = Vec::with_capacity(columns.len());
                for column in columns {
                    let index = file_headers
                        .iter()
                        .position(|header| header == column)
                        .ok_or_else(|| ReadError::MissingColumn {
                            path: path.to_path_buf(),
                            column: column.clone(),
                        })?;
                    indices.push(index);
                }
                (columns.to_vec(), indices)
            }
            None => (file_headers.clone(), (0..file_headers.len()).collect()),
        };

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(csv_error)?;
            rows.push(
                indices
                    .iter()
                    .map(|&i| record.get(i).unwrap_or_default().to_string())
                    .collect(),
            );
        }
        debug!("Read {} rows from {}", rows.len(), path.display());

        Ok(Table {
            path: path.to_path_buf(),
            headers,
            rows,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn column_index(&self, name: &str) -> Result<usize, ReadError> {
        self.headers
            .iter()
            .position(|header| header == name)
            .ok_or_else(|| ReadError::MissingColumn {
                path: self.path.clone(),
                column: name.to_string(),
            })
    }

    pub fn values(&self, name: &str) -> Result<impl Iterator<Item = &str>, ReadError> {
        let index = self.column_index(name)?;
        Ok(self.rows.iter().map(move |row| row[index].as_str()))
    }

    pub fn numeric_values(&self, name: &str) -> Result<Vec<f64>, ReadError> {
        self.values(name)?
            .enumerate()
            .map(|(row, value)| {
                value.parse().map_err(|_| ReadError::InvalidCoordinate {
                    path: self.path.clone(),
                    column: name.to_string(),
                    row: row + 1,
                    value: value.to_string(),
                })
            })
            .collect()
    }

    /// Rows whose `column` value passes `keep`.
    pub fn filter<F>(&self, column: &str, keep: F) -> Result<Table, ReadError>
    where
        F: Fn(&str) -> bool,
    {
        let index = self.column_index(column)?;
        Ok(Table {
            path: self.path.clone(),
            headers: self.headers.clone(),
            rows: self
                .rows
                .iter()
                .filter(|row| keep(&row[index]))
                .cloned()
                .collect(),
        })
    }

    /// Splits rows by their values in `columns`, ordered by key.
    pub fn group_by(&self, columns: &[String]) -> Result<BTreeMap<Vec<String>, Table>, ReadError> {
        let indices = columns
            .iter()
            .map(|column| self.column_index(column))
            .collect::<Result<Vec<_>, _>>()?;

        let mut groups: BTreeMap<Vec<String>, Table> = BTreeMap::new();
        for row in &self.rows {
            let key: Vec<String> = indices.iter().map(|&i| row[i].clone()).collect();
            groups
                .entry(key)
                .or_insert_with(|| Table {
                    path: self.path.clone(),
                    headers: self.headers.clone(),
                    rows: Vec::new(),
                })
                .rows
                .push(row.clone());
        }
        Ok(groups)
    }
}
