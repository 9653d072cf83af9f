//! Built-in rule sets.
//!
//! Presets are looked up by name from the command line or a settings file.

mod terraform;
mod workflow;

pub use terraform::{terraform, TOP_LEVEL_KEYS};
pub use workflow::workflow;

use crate::core::error::RuleSetError;
use crate::schema::RuleSet;

/// A named, built-in rule set.
#[derive(Debug, Clone, Copy)]
pub struct Preset {
    /// Lookup name
    pub name: &'static str,
    /// One-line description
    pub description: &'static str,
    build: fn(bool) -> Result<RuleSet, RuleSetError>,
}

impl Preset {
    /// Build the rule set, strict or lenient about unknown fields.
    pub fn build(&self, strict: bool) -> Result<RuleSet, RuleSetError> {
        (self.build)(strict)
    }
}

static PRESETS: &[Preset] = &[
    Preset {
        name: "terraform",
        description: "Terraform-JSON documents (.tf.json)",
        build: terraform,
    },
    Preset {
        name: "workflow",
        description: "GitHub-Actions-shaped workflow files",
        build: workflow,
    },
];

/// All presets in listing order.
pub fn all() -> &'static [Preset] {
    PRESETS
}

/// Names of all presets.
pub fn names() -> Vec<&'static str> {
    PRESETS.iter().map(|p| p.name).collect()
}

/// Find a preset by name (case-insensitive).
pub fn find(name: &str) -> Option<&'static Preset> {
    PRESETS.iter().find(|p| p.name.eq_ignore_ascii_case(name))
}

/// Build a preset by name.
pub fn by_name(name: &str, strict: bool) -> Result<RuleSet, RuleSetError> {
    find(name)
        .ok_or_else(|| RuleSetError::UnknownPreset {
            name: name.to_string(),
        })?
        .build(strict)
}
