//! Validation of configuration values against rule sets.
//!
//! The [`ValidationEngine`] runs a fixed sequence of stages over one value.
//! File and batch entry points layer loading and error translation around it.

pub mod batch;
pub mod engine;
pub mod progress;
pub mod stages;

pub use batch::{
    load_file, validate_file, validate_files, BatchOptions, CancellationToken, FileOptions,
    FileOutcome, FileReport, FileStatus,
};
pub use engine::{validate, ValidationEngine};
pub use progress::{ProgressCallback, ProgressTracker, ProgressUpdate};
pub use stages::{CrossFieldRules, DependencyRules, FieldRules, ValidationStage};
