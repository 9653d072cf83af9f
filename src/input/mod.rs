//! Input handling that runs before validation.
//!
//! Parsing turns text into a [`ConfigValue`](crate::core::ConfigValue);
//! substitution and normalization each return a new value; discovery turns
//! command-line targets into file paths.

pub mod parse;
pub mod substitute;
pub mod normalize;
pub mod discover;

pub use parse::{parse_json, parse_str, parse_yaml, Format};
pub use substitute::{substitute, substitute_str, Environment};
pub use normalize::{normalize, NormalizeOptions};
pub use discover::{discover, is_config_file};
