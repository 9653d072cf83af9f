//! Rule sets and the ways to build them.
//!
//! Rule sets are assembled in code with [`RuleSetBuilder`] or loaded from a
//! JSON-Schema document with [`from_schema`] / [`load_schema_file`].

pub mod cross;
pub mod json_schema;
pub mod ruleset;

pub use cross::{CrossFieldCheck, CrossFieldFn, CrossFieldRule};
pub use json_schema::{from_schema, load_schema_file};
pub use ruleset::{DependencySpec, FieldDeclaration, RuleSet, RuleSetBuilder};
