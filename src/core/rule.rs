//! Field rules.
//!
//! A [`Rule`] is a predicate over the value at one path. Rules form a closed
//! set of kinds plus one [`Rule::Custom`] escape hatch carrying a caller
//! function. Each rule only judges values of a kind it understands (a range
//! ignores strings, a pattern ignores numbers); tag checks belong to
//! [`Rule::Type`].

use crate::core::error::{ErrorKind, RuleSetError, ValidationError};
use crate::core::format::FormatKind;
use crate::core::path::FieldPath;
use crate::core::value::{ConfigValue, ValueKind};
use regex::Regex;
use std::fmt;
use std::sync::Arc;

/// Signature of a caller-supplied rule.
pub type CustomCheck = dyn Fn(&ConfigValue) -> Result<(), String> + Send + Sync;

/// A validation rule attached to a path pattern.
#[derive(Clone)]
pub enum Rule {
    /// The path must exist. An explicit null counts as present.
    Required,
    /// The path must exist and must not be null.
    RequiredNonNull,
    /// The path must exist whenever its enclosing mapping does. An absent
    /// ancestor is not reported.
    RequiredInParent,
    /// The value's tag must be one of these kinds.
    Type(Vec<ValueKind>),
    /// Numeric value must lie in `[min, max]`; either bound may be open.
    /// NaN and infinities never satisfy a range.
    Range { min: Option<f64>, max: Option<f64> },
    /// String must follow a fixed grammar.
    Format {
        kind: FormatKind,
        /// Accept `${...}` interpolations in place of a literal
        allow_interpolation: bool,
    },
    /// Value must equal one of these (numbers compare loosely).
    OneOf(Vec<ConfigValue>),
    /// String (chars), sequence or mapping length must be >= n.
    MinLength(usize),
    /// String (chars), sequence or mapping length must be <= n.
    MaxLength(usize),
    /// String must not be blank; sequence or mapping must not be empty.
    NotEmpty,
    /// String must match the regular expression.
    Pattern(Regex),
    /// Every key of a mapping must match the regular expression.
    KeyPattern(Regex),
    /// Caller-supplied check
    Custom {
        name: String,
        description: String,
        check: Arc<CustomCheck>,
    },
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::Required => write!(f, "Required"),
            Rule::RequiredNonNull => write!(f, "RequiredNonNull"),
            Rule::RequiredInParent => write!(f, "RequiredInParent"),
            Rule::Type(kinds) => f.debug_tuple("Type").field(kinds).finish(),
            Rule::Range { min, max } => f
                .debug_struct("Range")
                .field("min", min)
                .field("max", max)
                .finish(),
            Rule::Format {
                kind,
                allow_interpolation,
            } => f
                .debug_struct("Format")
                .field("kind", kind)
                .field("allow_interpolation", allow_interpolation)
                .finish(),
            Rule::OneOf(values) => f.debug_tuple("OneOf").field(values).finish(),
            Rule::MinLength(n) => f.debug_tuple("MinLength").field(n).finish(),
            Rule::MaxLength(n) => f.debug_tuple("MaxLength").field(n).finish(),
            Rule::NotEmpty => write!(f, "NotEmpty"),
            Rule::Pattern(re) => f.debug_tuple("Pattern").field(&re.as_str()).finish(),
            Rule::KeyPattern(re) => f.debug_tuple("KeyPattern").field(&re.as_str()).finish(),
            Rule::Custom {
                name, description, ..
            } => f
                .debug_struct("Custom")
                .field("name", name)
                .field("description", description)
                .field("check", &"<closure>")
                .finish(),
        }
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl Rule {
    /// Presence only.
    pub fn required() -> Self {
        Rule::Required
    }

    /// Presence and non-null.
    pub fn required_non_null() -> Self {
        Rule::RequiredNonNull
    }

    /// Presence, checked only when the parent mapping exists.
    pub fn required_in_parent() -> Self {
        Rule::RequiredInParent
    }

    /// Exactly one accepted kind.
    pub fn of_type(kind: ValueKind) -> Self {
        Rule::Type(vec![kind])
    }

    /// Any of several kinds.
    pub fn one_of_types(kinds: impl IntoIterator<Item = ValueKind>) -> Self {
        Rule::Type(kinds.into_iter().collect())
    }

    /// Integer or float.
    pub fn number() -> Self {
        Rule::Type(vec![ValueKind::Integer, ValueKind::Float])
    }

    /// Closed range `[min, max]`.
    pub fn range(min: f64, max: f64) -> Self {
        Rule::Range {
            min: Some(min),
            max: Some(max),
        }
    }

    /// Lower bound only.
    pub fn min(min: f64) -> Self {
        Rule::Range {
            min: Some(min),
            max: None,
        }
    }

    /// Upper bound only.
    pub fn max(max: f64) -> Self {
        Rule::Range {
            min: None,
            max: Some(max),
        }
    }

    /// Strict format.
    pub fn format(kind: FormatKind) -> Self {
        Rule::Format {
            kind,
            allow_interpolation: false,
        }
    }

    /// Format that also accepts a `${...}` interpolation.
    pub fn format_or_interpolation(kind: FormatKind) -> Self {
        Rule::Format {
            kind,
            allow_interpolation: true,
        }
    }

    /// Enum membership.
    pub fn one_of<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<ConfigValue>,
    {
        Rule::OneOf(values.into_iter().map(Into::into).collect())
    }

    /// Minimum length.
    pub fn min_length(n: usize) -> Self {
        Rule::MinLength(n)
    }

    /// Maximum length.
    pub fn max_length(n: usize) -> Self {
        Rule::MaxLength(n)
    }

    /// Non-blank string, non-empty collection.
    pub fn not_empty() -> Self {
        Rule::NotEmpty
    }

    /// String must match `pattern` (compiled once here).
    pub fn pattern(pattern: &str) -> Result<Self, RuleSetError> {
        compile(pattern).map(Rule::Pattern)
    }

    /// Mapping keys must match `pattern`.
    pub fn key_pattern(pattern: &str) -> Result<Self, RuleSetError> {
        compile(pattern).map(Rule::KeyPattern)
    }

    /// Caller-supplied check returning a failure message.
    pub fn custom<F>(name: impl Into<String>, description: impl Into<String>, check: F) -> Self
    where
        F: Fn(&ConfigValue) -> Result<(), String> + Send + Sync + 'static,
    {
        Rule::Custom {
            name: name.into(),
            description: description.into(),
            check: Arc::new(check),
        }
    }

    /// Caller-supplied boolean predicate with a fixed failure message.
    pub fn predicate<F>(name: impl Into<String>, message: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&ConfigValue) -> bool + Send + Sync + 'static,
    {
        let message = message.into();
        let description = message.clone();
        Rule::custom(name, description, move |value| {
            if predicate(value) {
                Ok(())
            } else {
                Err(message.clone())
            }
        })
    }

    /// Whether this is a presence rule.
    pub fn is_required(&self) -> bool {
        matches!(self, Rule::Required | Rule::RequiredNonNull | Rule::RequiredInParent)
    }

    /// Whether a missing ancestor also makes this path missing.
    pub fn requires_ancestors(&self) -> bool {
        matches!(self, Rule::Required | Rule::RequiredNonNull)
    }

    /// One-line description for listings.
    pub fn description(&self) -> String {
        match self {
            Rule::Required => "required".to_string(),
            Rule::RequiredNonNull => "required, not null".to_string(),
            Rule::RequiredInParent => "required in parent".to_string(),
            Rule::Type(kinds) => format!("type {}", kind_list(kinds)),
            Rule::Range { min, max } => match (min, max) {
                (Some(lo), Some(hi)) => format!("range [{}, {}]", lo, hi),
                (Some(lo), None) => format!("minimum {}", lo),
                (None, Some(hi)) => format!("maximum {}", hi),
                (None, None) => "finite number".to_string(),
            },
            Rule::Format {
                kind,
                allow_interpolation: true,
            } => format!("format {} or interpolation", kind),
            Rule::Format { kind, .. } => format!("format {}", kind),
            Rule::OneOf(values) => format!("one of {}", value_list(values)),
            Rule::MinLength(n) => format!("length >= {}", n),
            Rule::MaxLength(n) => format!("length <= {}", n),
            Rule::NotEmpty => "not empty".to_string(),
            Rule::Pattern(re) => format!("matches /{}/", re.as_str()),
            Rule::KeyPattern(re) => format!("keys match /{}/", re.as_str()),
            Rule::Custom {
                name, description, ..
            } => format!("{}: {}", name, description),
        }
    }
}

fn compile(pattern: &str) -> Result<Regex, RuleSetError> {
    Regex::new(pattern).map_err(|e| RuleSetError::InvalidRegex {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}

fn kind_list(kinds: &[ValueKind]) -> String {
    kinds
        .iter()
        .map(ValueKind::name)
        .collect::<Vec<_>>()
        .join(" or ")
}

fn value_list(values: &[ConfigValue]) -> String {
    let items: Vec<String> = values.iter().map(ConfigValue::preview).collect();
    format!("[{}]", items.join(", "))
}

/// Whether a string is a whole `${...}` interpolation.
pub fn is_interpolation(text: &str) -> bool {
    text.len() > 3 && text.starts_with("${") && text.ends_with('}')
}

// ============================================================================
// Evaluation
// ============================================================================

impl Rule {
    /// Evaluate this rule against a present value, appending any findings.
    ///
    /// Absence is not visible here; missing required paths are detected by the
    /// traversal that owns the parent mapping.
    pub fn evaluate(&self, value: &ConfigValue, path: &FieldPath, out: &mut Vec<ValidationError>) {
        let fail = |kind: ErrorKind, message: String| ValidationError::new(path.clone(), kind, message);

        match self {
            Rule::Required | Rule::RequiredInParent => {}

            Rule::RequiredNonNull => {
                if value.is_null() {
                    out.push(fail(ErrorKind::NullValue, "value must not be null".to_string()));
                }
            }

            Rule::Type(kinds) => {
                let actual = value.kind();
                if !kinds.contains(&actual) {
                    out.push(fail(
                        ErrorKind::TypeMismatch,
                        format!("expected {}, found {}", kind_list(kinds), actual),
                    ));
                }
            }

            Rule::Range { min, max } => {
                if let Some(num) = value.as_float() {
                    if !num.is_finite() {
                        out.push(fail(
                            ErrorKind::OutOfRange,
                            format!("value {} is not a finite number", num),
                        ));
                    } else if min.is_some_and(|lo| num < lo) || max.is_some_and(|hi| num > hi) {
                        out.push(fail(
                            ErrorKind::OutOfRange,
                            format!("value {} is outside {}", num, self.description()),
                        ));
                    }
                }
            }

            Rule::Format {
                kind,
                allow_interpolation,
            } => {
                if let Some(text) = value.as_str() {
                    if *allow_interpolation && is_interpolation(text) {
                        return;
                    }
                    if let Err(reason) = kind.check(text) {
                        out.push(fail(
                            ErrorKind::InvalidFormat,
                            format!("\"{}\" is not a valid {}: {}", text, kind, reason),
                        ));
                    }
                }
            }

            Rule::OneOf(allowed) => {
                if !allowed.iter().any(|candidate| candidate.loosely_equals(value)) {
                    out.push(fail(
                        ErrorKind::InvalidValue,
                        format!("{} is not one of {}", value.preview(), value_list(allowed)),
                    ));
                }
            }

            Rule::MinLength(n) => {
                if let Some(len) = value.length() {
                    if len < *n {
                        out.push(fail(
                            ErrorKind::InvalidValue,
                            format!("length {} is below minimum {}", len, n),
                        ));
                    }
                }
            }

            Rule::MaxLength(n) => {
                if let Some(len) = value.length() {
                    if len > *n {
                        out.push(fail(
                            ErrorKind::InvalidValue,
                            format!("length {} is above maximum {}", len, n),
                        ));
                    }
                }
            }

            Rule::NotEmpty => {
                let empty = match value {
                    ConfigValue::String(s) => s.trim().is_empty(),
                    ConfigValue::Sequence(items) => items.is_empty(),
                    ConfigValue::Mapping(map) => map.is_empty(),
                    _ => false,
                };
                if empty {
                    out.push(fail(ErrorKind::InvalidValue, "value must not be empty".to_string()));
                }
            }

            Rule::Pattern(re) => {
                if let Some(text) = value.as_str() {
                    if !re.is_match(text) {
                        out.push(fail(
                            ErrorKind::InvalidFormat,
                            format!("\"{}\" does not match /{}/", text, re.as_str()),
                        ));
                    }
                }
            }

            Rule::KeyPattern(re) => {
                if let Some(map) = value.as_mapping() {
                    for key in map.keys().filter(|key| !re.is_match(key)) {
                        out.push(ValidationError::new(
                            path.child_key(key.clone()),
                            ErrorKind::InvalidFormat,
                            format!("key \"{}\" does not match /{}/", key, re.as_str()),
                        ));
                    }
                }
            }

            Rule::Custom { name, check, .. } => {
                if let Err(message) = check(value) {
                    out.push(fail(ErrorKind::CustomRule, format!("{}: {}", name, message)));
                }
            }
        }
    }
}

/// Evaluate rules in declaration order, without short-circuiting.
///
/// Every rule sees an explicit null. Repeated [`Rule::RequiredNonNull`]
/// declarations at one path report it once.
pub fn evaluate_all<'a, I>(rules: I, value: &ConfigValue, path: &FieldPath, out: &mut Vec<ValidationError>)
where
    I: IntoIterator<Item = &'a Rule>,
{
    let mut null_checked = false;
    for rule in rules {
        if matches!(rule, Rule::RequiredNonNull) {
            if null_checked {
                continue;
            }
            null_checked = true;
        }
        rule.evaluate(value, path, out);
    }
}
