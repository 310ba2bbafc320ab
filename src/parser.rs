//! Metric and parameter file decoding
//!
//! Metrics files hold `{"metrics": [MetricPoint, ...]}` and parameter files
//! hold `{"parameters": {key: scalar}}`, as JSON or YAML. The format is picked
//! from the file extension.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::Deserialize;

use crate::experiment::ParamRecord;
use crate::timeseries::MetricPoint;
use crate::{Error, Result};

/// Input file encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// `.json`
    Json,
    /// `.yaml` or `.yml`
    Yaml,
}

impl FileFormat {
    /// Detect the format from the extension (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedFormat`] for any other extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "json" => Ok(Self::Json),
            "yaml" | "yml" => Ok(Self::Yaml),
            _ if ext.is_empty() => Err(Error::UnsupportedFormat("(no extension)".to_string())),
            _ => Err(Error::UnsupportedFormat(format!(".{ext}"))),
        }
    }
}

#[derive(Debug, Deserialize)]
struct MetricsFile {
    #[serde(default)]
    metrics: Vec<MetricPoint>,
}

#[derive(Debug, Deserialize)]
struct ParamsFile {
    #[serde(default)]
    parameters: BTreeMap<String, ParamValue>,
}

/// Parameter values are logged as strings whatever their scalar type.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ParamValue {
    String(String),
    Bool(bool),
    Integer(i64),
    Float(f64),
}

impl ParamValue {
    fn into_string(self) -> String {
        match self {
            Self::String(s) => s,
            Self::Bool(b) => b.to_string(),
            Self::Integer(i) => i.to_string(),
            Self::Float(f) => f.to_string(),
        }
    }
}

fn into_params(file: ParamsFile) -> Vec<ParamRecord> {
    file.parameters
        .into_iter()
        .map(|(key, value)| ParamRecord::new(key, value.into_string()))
        .collect()
}

/// Decode a JSON metrics document.
///
/// # Errors
///
/// Returns [`Error::Json`] on malformed input.
pub fn metrics_from_json<R: Read>(reader: R) -> Result<Vec<MetricPoint>> {
    let file: MetricsFile = serde_json::from_reader(reader)?;
    Ok(file.metrics)
}

/// Decode a YAML metrics document.
///
/// # Errors
///
/// Returns [`Error::Yaml`] on malformed input.
pub fn metrics_from_yaml<R: Read>(reader: R) -> Result<Vec<MetricPoint>> {
    let file: MetricsFile = serde_yaml::from_reader(reader)?;
    Ok(file.metrics)
}

/// Decode a JSON parameters document, sorted by key.
///
/// # Errors
///
/// Returns [`Error::Json`] on malformed input.
pub fn params_from_json<R: Read>(reader: R) -> Result<Vec<ParamRecord>> {
    Ok(into_params(serde_json::from_reader(reader)?))
}

/// Decode a YAML parameters document, sorted by key.
///
/// # Errors
///
/// Returns [`Error::Yaml`] on malformed input.
pub fn params_from_yaml<R: Read>(reader: R) -> Result<Vec<ParamRecord>> {
    Ok(into_params(serde_yaml::from_reader(reader)?))
}

fn open(path: &Path) -> Result<BufReader<File>> {
    match File::open(path) {
        Ok(file) => Ok(BufReader::new(file)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(Error::NotFound {
            path: path.to_path_buf(),
        }),
        Err(e) => Err(e.into()),
    }
}

/// Read a metrics file (`.json`, `.yaml`, `.yml`).
///
/// # Errors
///
/// - [`Error::UnsupportedFormat`] for other extensions (checked before opening)
/// - [`Error::NotFound`] if the file does not exist
/// - decode errors
pub fn parse_metrics_file(path: impl AsRef<Path>) -> Result<Vec<MetricPoint>> {
    let path = path.as_ref();
    match FileFormat::from_path(path)? {
        FileFormat::Json => metrics_from_json(open(path)?),
        FileFormat::Yaml => metrics_from_yaml(open(path)?),
    }
}

/// Read a parameters file (`.json`, `.yaml`, `.yml`).
///
/// # Errors
///
/// As [`parse_metrics_file`].
pub fn parse_params_file(path: impl AsRef<Path>) -> Result<Vec<ParamRecord>> {
    let path = path.as_ref();
    match FileFormat::from_path(path)? {
        FileFormat::Json => params_from_json(open(path)?),
        FileFormat::Yaml => params_from_yaml(open(path)?),
    }
}

/// Split `key=value` on the first `=`.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] if there is no `=` or the key is empty.
pub fn parse_key_value(pair: &str) -> Result<(String, String)> {
    let param: ParamRecord = pair.parse()?;
    Ok((param.key().to_string(), param.value().to_string()))
}
