//! # confguard - Structured Configuration Validation
//!
//! confguard validates parsed configuration documents (JSON, YAML,
//! Terraform-JSON) against rule sets and reports every problem it finds, each
//! attributed to a path inside the document.
//!
//! ## Features
//!
//! - **Path-based rules**: type, range, format, enum, length and pattern checks
//!   attached to path patterns such as `servers[*].port`
//! - **Presence that tells null from missing**: `Required` vs `RequiredNonNull`
//! - **Cross-field rules**: ordering, conditional presence, at-least-one-of,
//!   mutual exclusion and custom closures, evaluated after field rules
//! - **Dependency cycles**: `depends_on` / `needs` graphs checked with a
//!   three-colour depth-first search
//! - **Strict mode**: unknown fields become errors instead of warnings
//! - **Batch validation**: files validated in parallel, results in input order,
//!   one bad file never stops the others
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use confguard::prelude::*;
//!
//! let rules = RuleSet::builder()
//!     .field("database.port", [
//!         Rule::required(),
//!         Rule::of_type(ValueKind::Integer),
//!         Rule::range(1.0, 65535.0),
//!     ])
//!     .build()?;
//!
//! let value = parse_json(r#"{"database": {"port": "5432"}}"#)?;
//! let result = validate(&value, &rules);
//! assert!(!result.is_valid());
//! assert_eq!(result.errors[0].kind, ErrorKind::TypeMismatch);
//! ```
//!
//! ## Architecture
//!
//! - [`core`]: values, paths, rules, format grammars and error types
//! - [`schema`]: rule sets, cross-field rules and the JSON-Schema loader
//! - [`graph`]: dependency graph and cycle detection
//! - [`validation`]: the staged engine plus file and batch entry points
//! - [`input`]: parsing, environment substitution, normalization, discovery
//! - [`presets`]: built-in rule sets for Terraform-JSON and workflows
//! - [`report`]: human and JSON reports
//! - [`settings`]: the `confguard.toml` settings file

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod core;
pub mod graph;
pub mod input;
pub mod presets;
pub mod report;
pub mod schema;
pub mod settings;
pub mod validation;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::core::{
        ConfguardError, ConfguardResult, ConfigValue, ErrorKind, FieldPath, FileError, FormatKind,
        Mapping, ParseError, PathPattern, Rule, RuleSetError, SchemaError, SubstitutionError,
        ValidationError, ValidationResult, ValueKind,
    };
    pub use crate::input::{
        discover, normalize, parse_json, parse_str, parse_yaml, substitute, Environment, Format,
        NormalizeOptions,
    };
    pub use crate::schema::{
        from_schema, load_schema_file, CrossFieldRule, RuleSet, RuleSetBuilder,
    };
    pub use crate::settings::Settings;
    pub use crate::validation::{
        validate, validate_file, validate_files, BatchOptions, CancellationToken, FileOptions,
        FileOutcome, FileReport, FileStatus, ProgressUpdate, ValidationEngine, ValidationStage,
    };
}

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
