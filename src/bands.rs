use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::config::BandInfo;

/// Recognised band names and their EO common name.
pub const BAND_MAPPING: &[(&str, &str)] = &[
    ("red", "red"),
    ("green", "green"),
    ("blue", "blue"),
    ("nir", "nir"),
    ("ms_red", "ms_red"),
    ("ms_green", "ms_green"),
    ("red_edge", "rededge"),
    ("rededge", "rededge"),
    ("ndvi", "ndvi"),
    ("ndvi2", "ndvi2"),
];

/// Pixel types accepted by the raster extension.
pub const DATA_TYPES: &[&str] = &[
    "int8", "int16", "int32", "int64", "uint8", "uint16", "uint32", "uint64", "float16",
    "float32", "float64", "cint16", "cint32", "cfloat32", "cfloat64", "other",
];

pub const DEFAULT_NODATA: f64 = 0.0;
pub const DEFAULT_DATA_TYPE: &str = "uint16";

pub fn common_name(name: &str) -> Option<&'static str> {
    let name = name.to_ascii_lowercase();
    BAND_MAPPING
        .iter()
        .find(|(band, _)| *band == name)
        .map(|(_, common)| *common)
}

/// Raster extension type for a GDAL pixel type name, e.g. `Byte` or `Float32`.
pub fn stac_data_type(gdal_name: &str) -> String {
    match gdal_name {
        "Byte" => "uint8".to_string(),
        other => {
            let lower = other.to_ascii_lowercase();
            if DATA_TYPES.contains(&lower.as_str()) {
                lower
            } else {
                "other".to_string()
            }
        }
    }
}

/// Band as stored in the file.
#[derive(Debug, Clone, PartialEq)]
pub struct FileBand {
    pub nodata: Option<f64>,
    pub data_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EoBand {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub common_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub center_wavelength: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl EoBand {
    pub fn from_info(info: &BandInfo) -> Self {
        let common = info.common_name.as_deref().and_then(common_name);
        let description = info
            .description
            .clone()
            .unwrap_or_else(|| format!("Common name: {}", common.unwrap_or("unknown")));
        EoBand {
            name: info.name.to_lowercase(),
            common_name: common.map(str::to_string),
            center_wavelength: info.wavelength,
            description: Some(description),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RasterBand {
    pub nodata: Value,
    pub data_type: String,
}

impl RasterBand {
    /// Config values win over the file's, then the defaults apply.
    pub fn resolve(info: &BandInfo, file: Option<&FileBand>) -> Result<Self, String> {
        let nodata = info
            .nodata
            .or_else(|| file.and_then(|band| band.nodata))
            .unwrap_or(DEFAULT_NODATA);
        let data_type = info
            .data_type
            .clone()
            .or_else(|| file.map(|band| band.data_type.clone()))
            .unwrap_or_else(|| DEFAULT_DATA_TYPE.to_string())
            .to_ascii_lowercase();
        if !DATA_TYPES.contains(&data_type.as_str()) {
            return Err(format!(
                "band {}: unsupported data_type {}",
                info.name, data_type
            ));
        }
        Ok(RasterBand {
            nodata: nodata_value(nodata),
            data_type,
        })
    }
}

// JSON has no NaN or infinity, the raster extension spells them as strings.
fn nodata_value(nodata: f64) -> Value {
    if nodata.is_nan() {
        json!("nan")
    } else if nodata.is_infinite() {
        json!(if nodata > 0.0 { "inf" } else { "-inf" })
    } else {
        json!(nodata)
    }
}
