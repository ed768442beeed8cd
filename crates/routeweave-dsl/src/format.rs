use std::path::Path;

use serde_json::Value;

use routeweave_types::{Result, RouteweaveError};

use crate::case::normalize_keys;

/// On-disk encodings of a raw document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Yaml,
}

impl Format {
    /// Pick the format from a file extension; anything that is not
    /// `.yaml`/`.yml` is treated as JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
                Format::Yaml
            }
            _ => Format::Json,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Format::Json => "JSON",
            Format::Yaml => "YAML",
        }
    }
}

/// Parse JSON text into the raw shape with normalized keys.
pub fn parse_json(input: &str) -> Result<Value> {
    parse_str(input, Format::Json)
}

/// Parse YAML text into the raw shape with normalized keys.
pub fn parse_yaml(input: &str) -> Result<Value> {
    parse_str(input, Format::Yaml)
}

pub fn parse_str(input: &str, format: Format) -> Result<Value> {
    let value: Value = match format {
        Format::Json => serde_json::from_str(input).map_err(|e| parse_error(format, e))?,
        Format::Yaml => serde_yaml::from_str(input).map_err(|e| parse_error(format, e))?,
    };
    Ok(normalize_keys(value))
}

fn parse_error(format: Format, err: impl std::fmt::Display) -> RouteweaveError {
    RouteweaveError::ParseError {
        format: format.label().to_string(),
        message: err.to_string(),
    }
}

pub fn to_json_string(value: &Value) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

pub fn to_yaml_string(value: &Value) -> Result<String> {
    Ok(serde_yaml::to_string(value)?)
}

pub fn to_string(value: &Value, format: Format) -> Result<String> {
    match format {
        Format::Json => to_json_string(value),
        Format::Yaml => to_yaml_string(value),
    }
}

/// Read and parse a document file, choosing the format by extension.
pub fn load_document(path: &Path) -> Result<Value> {
    let source = std::fs::read_to_string(path)?;
    let value = parse_str(&source, Format::from_path(path))?;
    tracing::debug!(path = %path.display(), "Document loaded");
    Ok(value)
}

/// Serialize a raw document and write it to `path`, choosing the format by extension.
pub fn save_document(path: &Path, value: &Value) -> Result<()> {
    let text = to_string(value, Format::from_path(path))?;
    std::fs::write(path, text)?;
    tracing::debug!(path = %path.display(), "Document saved");
    Ok(())
}
