use reqwest::blocking::{Client, RequestBuilder};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::debug;

use super::ReadError;
use crate::config::{CommonConfig, is_http_url};

/// Local path of a source. Remote files are downloaded into a temporary
/// directory that lives as long as this value.
#[derive(Debug)]
pub struct LocalSource {
    path: PathBuf,
    _download: Option<TempDir>,
}

impl LocalSource {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Resolves the `location` of a source, fetching it with the config's request
/// parameters when it is an http(s) URL.
pub fn resolve_source(common: &CommonConfig, extension: &str) -> Result<LocalSource, ReadError> {
    if !common.is_remote() {
        return Ok(LocalSource {
            path: PathBuf::from(&common.location),
            _download: None,
        });
    }
    let client = Client::new();
    let mut request = client.request(common.method.as_reqwest(), &common.location);
    if let Some(params) = &common.params {
        request = request.query(params);
    }
    if let Some(headers) = &common.headers {
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }
    }
    if let Some(cookies) = &common.cookies {
        let cookie = cookies
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ");
        request = request.header(reqwest::header::COOKIE, cookie);
    }
    if let Some(body) = &common.json_body {
        request = request.json(body);
    } else if let Some(content) = &common.content {
        request = request.body(content.clone());
    }
    download(&common.location, request, extension)
}

/// Resolves a plain location such as a join file, fetching it with GET when
/// remote.
pub fn resolve_location(location: &str) -> Result<LocalSource, ReadError> {
    if !is_http_url(location) {
        return Ok(LocalSource {
            path: PathBuf::from(location),
            _download: None,
        });
    }
    let extension = reqwest::Url::parse(location)
        .ok()
        .and_then(|url| {
            Path::new(url.path())
                .extension()
                .and_then(|ext| ext.to_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| "csv".to_string());
    download(location, Client::new().get(location), &extension)
}

fn download(url: &str, request: RequestBuilder, extension: &str) -> Result<LocalSource, ReadError> {
    debug!("Fetching {}", url);
    let bytes = request
        .send()
        .and_then(|response| response.error_for_status())
        .and_then(|response| response.bytes())
        .map_err(|source| ReadError::Fetch {
            url: url.to_string(),
            source,
        })?;

    let dir = tempfile::tempdir()?;
    let path = dir.path().join(format!("source.{extension}"));
    let mut file = File::create(&path)?;
    file.write_all(&bytes)?;
    debug!("Downloaded {} bytes to {}", bytes.len(), path.display());

    Ok(LocalSource {
        path,
        _download: Some(dir),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_source_is_used_in_place() {
        let common = CommonConfig::new("a", "data/points.csv");
        let source = resolve_source(&common, "csv").unwrap();
        assert_eq!(source.path(), Path::new("data/points.csv"));

        let join = resolve_location("data/join.csv").unwrap();
        assert_eq!(join.path(), Path::new("data/join.csv"));
    }
}
