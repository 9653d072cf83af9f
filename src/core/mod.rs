//! Core types for the confguard validation engine.
//!
//! This module contains the foundational types every other layer builds on:
//! - The configuration value model
//! - Field paths and path patterns
//! - Field rules and format grammars
//! - Error types and the validation result

pub mod value;
pub mod path;
pub mod rule;
pub mod format;
pub mod error;

// Re-export commonly used types
pub use value::{ConfigValue, Mapping, ValueKind};
pub use path::{FieldPath, PathPattern, PatternSegment, Segment};
pub use rule::{evaluate_all, is_interpolation, CustomCheck, Rule};
pub use format::FormatKind;
pub use error::{
    ConfguardError, ConfguardResult, ErrorKind, FileError, FileResult, ParseError, RuleSetError,
    SchemaError, SubstitutionError, ValidationError, ValidationResult,
};
