//! Error types for confguard.
//!
//! Two families live here:
//! - failures that stop work on one input (parse, file access, substitution,
//!   rule-set construction), which are `Err` values built with thiserror;
//! - validation findings ([`ValidationError`]), which are collected into a
//!   [`ValidationResult`] and never raised.

use crate::core::path::FieldPath;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Top-level error type for confguard.
///
/// This enum encompasses all error categories and enables automatic
/// conversion between specific error types.
#[derive(Error, Debug)]
pub enum ConfguardError {
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("{0}")]
    File(#[from] FileError),

    #[error("Substitution error: {0}")]
    Substitution(#[from] SubstitutionError),

    #[error("Rule set error: {0}")]
    RuleSet(#[from] RuleSetError),

    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Settings error: {0}")]
    Settings(#[from] toml::de::Error),

    #[error("Invalid glob pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("{0}")]
    Other(String),
}

/// Malformed input text. Carries a 1-based position hint when the parser
/// reports one.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("invalid {format}{}: {message}", position_hint(.line, .column))]
pub struct ParseError {
    /// Input format name (`JSON`, `YAML`)
    pub format: String,
    /// 1-based line of the failure
    pub line: Option<usize>,
    /// 1-based column of the failure
    pub column: Option<usize>,
    /// Parser message without the position suffix
    pub message: String,
}

impl ParseError {
    /// Create a parse error for the given format.
    pub fn new(format: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            format: format.into(),
            line: None,
            column: None,
            message: message.into(),
        }
    }

    /// Attach a position hint.
    pub fn at(mut self, line: usize, column: usize) -> Self {
        self.line = Some(line);
        self.column = Some(column);
        self
    }
}

fn position_hint(line: &Option<usize>, column: &Option<usize>) -> String {
    match (line, column) {
        (Some(line), Some(column)) => format!(" at line {}, column {}", line, column),
        (Some(line), None) => format!(" at line {}", line),
        _ => String::new(),
    }
}

/// Environment-variable substitution failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubstitutionError {
    #[error("unresolved environment variable '{name}' at {path} (no value and no default)")]
    Unresolved { name: String, path: FieldPath },
}

impl SubstitutionError {
    /// Name of the variable that could not be resolved.
    pub fn variable(&self) -> &str {
        match self {
            SubstitutionError::Unresolved { name, .. } => name,
        }
    }
}

/// Problems found while constructing a [`RuleSet`](crate::schema::RuleSet).
#[derive(Error, Debug, Clone)]
pub enum RuleSetError {
    #[error("Invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("Invalid regular expression '{pattern}': {reason}")]
    InvalidRegex { pattern: String, reason: String },

    #[error("Invalid range at '{path}': minimum {min} is greater than maximum {max}")]
    InvalidRange { path: String, min: f64, max: f64 },

    #[error("Default values need a literal path, '{path}' contains a wildcard")]
    NonLiteralDefault { path: String },

    #[error("Unknown preset '{name}'")]
    UnknownPreset { name: String },
}

/// Problems found while translating a JSON-Schema document into a rule set.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Schema at '{path}' must be a mapping")]
    NotAMapping { path: String },

    #[error("Unsupported type '{name}' at '{path}'")]
    UnsupportedType { path: String, name: String },

    #[error("Unsupported format '{name}' at '{path}'")]
    UnsupportedFormat { path: String, name: String },

    #[error("Invalid '{keyword}' at '{path}': {reason}")]
    InvalidKeyword {
        path: String,
        keyword: String,
        reason: String,
    },

    #[error(transparent)]
    RuleSet(#[from] RuleSetError),

    #[error(transparent)]
    File(#[from] FileError),
}

/// Failures that stop a single file before or during parsing.
///
/// These are never folded into a [`ValidationResult`]; batch entry points
/// report them per file.
#[derive(Error, Debug)]
pub enum FileError {
    #[error("{}: file not found", path.display())]
    NotFound { path: PathBuf },

    #[error("{}: permission denied", path.display())]
    PermissionDenied { path: PathBuf },

    #[error("{}: file is {size} bytes, limit is {limit} bytes", path.display())]
    TooLarge { path: PathBuf, size: u64, limit: u64 },

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },

    #[error("{}: {source}", path.display())]
    Substitution {
        path: PathBuf,
        #[source]
        source: SubstitutionError,
    },
}

impl FileError {
    /// Translate an I/O error, keeping not-found and permission failures
    /// distinguishable.
    pub fn from_io(path: &Path, error: io::Error) -> Self {
        let path = path.to_path_buf();
        match error.kind() {
            io::ErrorKind::NotFound => FileError::NotFound { path },
            io::ErrorKind::PermissionDenied => FileError::PermissionDenied { path },
            _ => FileError::Io {
                path,
                source: error,
            },
        }
    }

    /// The file this error refers to.
    pub fn path(&self) -> &Path {
        match self {
            FileError::NotFound { path }
            | FileError::PermissionDenied { path }
            | FileError::TooLarge { path, .. }
            | FileError::Io { path, .. }
            | FileError::Parse { path, .. }
            | FileError::Substitution { path, .. } => path,
        }
    }

    /// Short machine-readable category.
    pub fn kind_name(&self) -> &'static str {
        match self {
            FileError::NotFound { .. } => "not_found",
            FileError::PermissionDenied { .. } => "permission_denied",
            FileError::TooLarge { .. } => "too_large",
            FileError::Io { .. } => "io",
            FileError::Parse { .. } => "parse_error",
            FileError::Substitution { .. } => "substitution_error",
        }
    }

    /// Whether the file was read but its text could not be parsed.
    pub fn is_parse_error(&self) -> bool {
        matches!(self, FileError::Parse { .. })
    }
}

/// Result type alias for confguard operations.
pub type ConfguardResult<T> = Result<T, ConfguardError>;

/// Result type alias for file-level operations.
pub type FileResult<T> = Result<T, FileError>;

// ============================================================================
// Validation findings
// ============================================================================

/// Category of a validation finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// A required path is absent
    MissingRequiredField,
    /// A presence-and-non-null rule saw an explicit null
    NullValue,
    /// The value has the wrong tag
    TypeMismatch,
    /// A numeric value is outside the declared bounds (or not finite)
    OutOfRange,
    /// A string does not follow its declared format or pattern
    InvalidFormat,
    /// Enum membership, length or emptiness check failed
    InvalidValue,
    /// A caller-supplied predicate rejected the value
    CustomRule,
    /// A rule spanning several fields failed
    CrossField,
    /// The dependency graph contains a cycle
    CircularDependency,
    /// A dependency names a node that is not declared
    UnresolvedReference,
    /// A field with no matching rule
    UnknownField,
    /// The document is null or an empty mapping
    EmptyConfiguration,
}

impl ErrorKind {
    /// snake_case name, as used in JSON reports.
    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::MissingRequiredField => "missing_required_field",
            ErrorKind::NullValue => "null_value",
            ErrorKind::TypeMismatch => "type_mismatch",
            ErrorKind::OutOfRange => "out_of_range",
            ErrorKind::InvalidFormat => "invalid_format",
            ErrorKind::InvalidValue => "invalid_value",
            ErrorKind::CustomRule => "custom_rule",
            ErrorKind::CrossField => "cross_field",
            ErrorKind::CircularDependency => "circular_dependency",
            ErrorKind::UnresolvedReference => "unresolved_reference",
            ErrorKind::UnknownField => "unknown_field",
            ErrorKind::EmptyConfiguration => "empty_configuration",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One validation finding, attributed to a path.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[error("{path}: {message}")]
pub struct ValidationError {
    /// Where the problem is
    pub path: FieldPath,
    /// What kind of problem it is
    pub kind: ErrorKind,
    /// Human-readable description
    pub message: String,
    /// Other paths or node ids involved (cycle members, cross-field operands)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub related: Vec<String>,
}

impl ValidationError {
    /// Create a finding with no related entries.
    pub fn new(path: FieldPath, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            path,
            kind,
            message: message.into(),
            related: Vec::new(),
        }
    }

    /// Attach related paths or identifiers.
    pub fn with_related<I, S>(mut self, related: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.related = related.into_iter().map(Into::into).collect();
        self
    }

    /// Get suggestion for fixing this error.
    pub fn suggestion(&self) -> Option<String> {
        match self.kind {
            ErrorKind::MissingRequiredField => Some(format!("Add a value for '{}'", self.path)),
            ErrorKind::NullValue => Some(format!("Replace null at '{}' with a value", self.path)),
            ErrorKind::UnknownField => Some(format!(
                "Remove '{}' or check it for a typo",
                self.path
            )),
            ErrorKind::CircularDependency => {
                Some("Remove one of the dependencies to break the cycle".to_string())
            }
            ErrorKind::UnresolvedReference => {
                Some("Declare the referenced item or fix the reference".to_string())
            }
            ErrorKind::EmptyConfiguration => {
                Some("Add at least one top-level section".to_string())
            }
            _ => None,
        }
    }
}

/// Outcome of one validation call.
///
/// `is_valid()` is derived from `errors`, so it cannot drift from the error
/// list. Warnings never affect validity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationResult {
    /// Findings that make the configuration invalid, in traversal order.
    pub errors: Vec<ValidationError>,
    /// Non-fatal findings, in traversal order.
    pub warnings: Vec<ValidationError>,
}

impl ValidationResult {
    /// Create a new empty result (valid).
    pub fn new() -> Self {
        Self::default()
    }

    /// True iff there are no errors.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Add an error to the result.
    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    /// Add a warning to the result.
    pub fn add_warning(&mut self, warning: ValidationError) {
        self.warnings.push(warning);
    }

    /// Errors of the given kind.
    pub fn errors_of(&self, kind: ErrorKind) -> impl Iterator<Item = &ValidationError> {
        self.errors.iter().filter(move |e| e.kind == kind)
    }

    /// Whether any error has the given kind.
    pub fn has_error(&self, kind: ErrorKind) -> bool {
        self.errors_of(kind).next().is_some()
    }

    /// Get a human-readable summary.
    pub fn summary(&self) -> String {
        if self.is_valid() {
            if self.warnings.is_empty() {
                "✓ Configuration is valid".to_string()
            } else {
                format!(
                    "✓ Configuration is valid with {} warning(s)",
                    self.warnings.len()
                )
            }
        } else {
            format!("✗ Validation failed with {} error(s)", self.errors.len())
        }
    }

    /// Get detailed error messages with suggestions.
    pub fn detailed_errors(&self) -> Vec<String> {
        self.errors
            .iter()
            .enumerate()
            .map(|(i, error)| {
                let mut msg = format!("{}. [{}] {}", i + 1, error.kind, error);
                if let Some(fix) = error.suggestion() {
                    msg.push_str(&format!("\n   → Suggestion: {}", fix));
                }
                msg
            })
            .collect()
    }
}

impl Serialize for ValidationResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ValidationResult", 3)?;
        state.serialize_field("is_valid", &self.is_valid())?;
        state.serialize_field("errors", &self.errors)?;
        state.serialize_field("warnings", &self.warnings)?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(path: &str) -> FieldPath {
        FieldPath::parse(path).unwrap()
    }

    #[test]
    fn test_validation_error_display() {
        let error = ValidationError::new(
            at("database.port"),
            ErrorKind::TypeMismatch,
            "expected integer, found string",
        );
        assert_eq!(error.to_string(), "database.port: expected integer, found string");
    }

    #[test]
    fn test_validation_error_suggestions() {
        let error = ValidationError::new(
            at("database.host"),
            ErrorKind::MissingRequiredField,
            "missing required field",
        );
        assert!(error.suggestion().unwrap().contains("database.host"));
    }

    #[test]
    fn test_validation_result_validity_follows_errors() {
        let mut result = ValidationResult::new();
        assert!(result.is_valid());

        result.add_warning(ValidationError::new(
            at("extra"),
            ErrorKind::UnknownField,
            "unknown field",
        ));
        assert!(result.is_valid());

        result.add_error(ValidationError::new(
            at("port"),
            ErrorKind::OutOfRange,
            "out of range",
        ));
        assert!(!result.is_valid());
        assert!(result.has_error(ErrorKind::OutOfRange));
        assert!(result.summary().contains("1 error"));
    }

    #[test]
    fn test_validation_result_serializes_is_valid() {
        let result = ValidationResult::new();
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["is_valid"], serde_json::json!(true));
        assert_eq!(json["errors"], serde_json::json!([]));
    }

    #[test]
    fn test_parse_error_position_hint() {
        let error = ParseError::new("JSON", "EOF while parsing an object").at(3, 1);
        assert_eq!(
            error.to_string(),
            "invalid JSON at line 3, column 1: EOF while parsing an object"
        );
        let error = ParseError::new("YAML", "did not find expected key");
        assert_eq!(error.to_string(), "invalid YAML: did not find expected key");
        let error = ParseError {
            column: None,
            ..ParseError::new("YAML", "bad indentation").at(7, 2)
        };
        assert_eq!(error.to_string(), "invalid YAML at line 7: bad indentation");
    }

    #[test]
    fn test_file_error_from_io() {
        let path = Path::new("missing.json");
        let error = FileError::from_io(path, io::Error::from(io::ErrorKind::NotFound));
        assert!(matches!(error, FileError::NotFound { .. }));
        assert_eq!(error.path(), path);

        let error = FileError::from_io(path, io::Error::from(io::ErrorKind::PermissionDenied));
        assert_eq!(error.kind_name(), "permission_denied");
    }
}
