//! Parsing boundary: JSON and YAML text into [`ConfigValue`].
//!
//! Empty text (or a YAML document holding only comments and markers) parses
//! to [`ConfigValue::Null`]; deciding whether that is acceptable belongs to
//! the rule set.

use crate::core::error::ParseError;
use crate::core::value::ConfigValue;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Supported input formats. Terraform-JSON is plain JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// JSON, including Terraform-JSON (`.tf.json`)
    Json,
    /// YAML 1.2 (single document)
    Yaml,
}

impl Format {
    /// Format implied by a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "json" => Some(Format::Json),
            "yaml" | "yml" => Some(Format::Yaml),
            _ => None,
        }
    }

    /// Guess the format from content: JSON documents start with `{` or `[`.
    pub fn detect(text: &str) -> Self {
        match text.trim_start().chars().next() {
            Some('{') | Some('[') => Format::Json,
            _ => Format::Yaml,
        }
    }

    /// Display name used in error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Format::Json => "JSON",
            Format::Yaml => "YAML",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" | "terraform" | "tf.json" => Ok(Format::Json),
            "yaml" | "yml" => Ok(Format::Yaml),
            other => Err(format!("unknown input format '{}' (expected json or yaml)", other)),
        }
    }
}

/// Parse JSON text.
pub fn parse_json(text: &str) -> Result<ConfigValue, ParseError> {
    if text.trim().is_empty() {
        return Ok(ConfigValue::Null);
    }
    let value: serde_json::Value = serde_json::from_str(text).map_err(|e| {
        let error = ParseError::new(Format::Json.name(), strip_position(&e.to_string()));
        if e.line() > 0 {
            error.at(e.line(), e.column())
        } else {
            error
        }
    })?;
    Ok(ConfigValue::from(value))
}

/// Parse YAML text (one document).
pub fn parse_yaml(text: &str) -> Result<ConfigValue, ParseError> {
    if is_blank_yaml(text) {
        return Ok(ConfigValue::Null);
    }
    let value: serde_yaml::Value = serde_yaml::from_str(text).map_err(|e| {
        let error = ParseError::new(Format::Yaml.name(), strip_position(&e.to_string()));
        match e.location() {
            Some(location) => error.at(location.line(), location.column()),
            None => error,
        }
    })?;
    ConfigValue::try_from(value).map_err(|message| ParseError::new(Format::Yaml.name(), message))
}

/// Parse text in the given format.
pub fn parse_str(text: &str, format: Format) -> Result<ConfigValue, ParseError> {
    match format {
        Format::Json => parse_json(text),
        Format::Yaml => parse_yaml(text),
    }
}

fn is_blank_yaml(text: &str) -> bool {
    text.lines().map(str::trim).all(|line| {
        line.is_empty() || line.starts_with('#') || line == "---" || line == "..."
    })
}

/// Drop the parser's own " at line N column M" suffix; the position is kept
/// in structured form instead.
fn strip_position(message: &str) -> String {
    match message.rfind(" at line ") {
        Some(i) => message[..i].to_string(),
        None => message.to_string(),
    }
}
