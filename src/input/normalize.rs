//! Opt-in value normalization.
//!
//! Validation never coerces; callers that want `"42"` to satisfy an integer
//! rule run [`normalize`] first and validate the returned copy.

use crate::core::value::{ConfigValue, Mapping};
use serde::{Deserialize, Serialize};

/// Which coercions [`normalize`] applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeOptions {
    /// Strip surrounding whitespace from strings
    pub trim_strings: bool,
    /// `"true"` / `"false"` (any case) become booleans
    pub parse_booleans: bool,
    /// Integer-looking strings become integers, other finite numerals floats
    pub parse_numbers: bool,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            trim_strings: true,
            parse_booleans: true,
            parse_numbers: true,
        }
    }
}

/// Return a normalized copy of `value`. Mapping keys are never changed.
pub fn normalize(value: &ConfigValue, options: &NormalizeOptions) -> ConfigValue {
    match value {
        ConfigValue::String(s) => normalize_str(s, options),
        ConfigValue::Sequence(items) => {
            ConfigValue::Sequence(items.iter().map(|item| normalize(item, options)).collect())
        }
        ConfigValue::Mapping(map) => ConfigValue::Mapping(
            map.iter()
                .map(|(key, item)| (key.clone(), normalize(item, options)))
                .collect::<Mapping>(),
        ),
        other => other.clone(),
    }
}

fn normalize_str(text: &str, options: &NormalizeOptions) -> ConfigValue {
    let text = if options.trim_strings { text.trim() } else { text };

    if options.parse_booleans {
        if text.eq_ignore_ascii_case("true") {
            return ConfigValue::Bool(true);
        }
        if text.eq_ignore_ascii_case("false") {
            return ConfigValue::Bool(false);
        }
    }

    if options.parse_numbers && looks_numeric(text) {
        if let Ok(i) = text.parse::<i64>() {
            return ConfigValue::Integer(i);
        }
        if let Ok(f) = text.parse::<f64>() {
            if f.is_finite() {
                return ConfigValue::Float(f);
            }
        }
    }

    ConfigValue::String(text.to_string())
}

/// Digits with optional sign, decimal point and exponent. Rejects the
/// `inf`/`nan` spellings `f64::from_str` would otherwise accept.
fn looks_numeric(text: &str) -> bool {
    let body = text.strip_prefix(|c: char| c == '+' || c == '-').unwrap_or(text);
    body.chars().any(|c| c.is_ascii_digit())
        && body
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'))
}
