use serde::de::Error;
use serde::{Deserialize, Deserializer, Serialize};

use super::{CommonConfig, json_or_value};

/// Band information for raster data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandInfo {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub common_name: Option<String>,
    /// Centre wavelength in micrometres.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wavelength: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nodata: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl BandInfo {
    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            common_name: Some(name.clone()),
            name,
            wavelength: None,
            nodata: None,
            data_type: None,
            description: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RasterConfig {
    #[serde(flatten)]
    pub common: CommonConfig,
    #[serde(deserialize_with = "required_bands")]
    pub band_info: Vec<BandInfo>,
}

fn required_bands<'de, D>(deserializer: D) -> Result<Vec<BandInfo>, D::Error>
where
    D: Deserializer<'de>,
{
    let bands: Option<Vec<BandInfo>> = json_or_value(deserializer)?;
    match bands {
        Some(bands) if !bands.is_empty() => Ok(bands),
        _ => Err(D::Error::custom("band_info must list at least one band")),
    }
}
