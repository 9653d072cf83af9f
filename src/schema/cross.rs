//! Cross-field rules.
//!
//! A cross-field rule is scoped to a path pattern and runs once per matching
//! subtree, after every field rule. Field references inside a rule are
//! literal paths relative to the scope.

use crate::core::error::{ErrorKind, RuleSetError, ValidationError};
use crate::core::path::{FieldPath, PathPattern};
use crate::core::value::ConfigValue;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// Signature of a caller-supplied cross-field check. Receives the scope
/// subtree.
pub type CrossFieldFn = dyn Fn(&ConfigValue) -> Result<(), String> + Send + Sync;

/// What a cross-field rule checks.
#[derive(Clone)]
pub enum CrossFieldCheck {
    /// `lower <= upper` when both are set (numbers, or strings compared
    /// lexically so ISO dates order correctly).
    Ordered { lower: String, upper: String },
    /// When `field` equals `equals`, every path in `then` must be present.
    RequiredIf {
        field: String,
        equals: ConfigValue,
        then: Vec<String>,
    },
    /// At least one of the fields must be set.
    AtLeastOneOf(Vec<String>),
    /// At most one of the fields may be set.
    MutuallyExclusive(Vec<String>),
    /// Caller-supplied check over the whole scope.
    Custom(Arc<CrossFieldFn>),
}

impl fmt::Debug for CrossFieldCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CrossFieldCheck::Ordered { lower, upper } => f
                .debug_struct("Ordered")
                .field("lower", lower)
                .field("upper", upper)
                .finish(),
            CrossFieldCheck::RequiredIf {
                field,
                equals,
                then,
            } => f
                .debug_struct("RequiredIf")
                .field("field", field)
                .field("equals", equals)
                .field("then", then)
                .finish(),
            CrossFieldCheck::AtLeastOneOf(fields) => {
                f.debug_tuple("AtLeastOneOf").field(fields).finish()
            }
            CrossFieldCheck::MutuallyExclusive(fields) => {
                f.debug_tuple("MutuallyExclusive").field(fields).finish()
            }
            CrossFieldCheck::Custom(_) => f.debug_tuple("Custom").field(&"<closure>").finish(),
        }
    }
}

/// A named cross-field rule bound to a scope pattern.
#[derive(Debug, Clone)]
pub struct CrossFieldRule {
    /// Name used in messages
    pub name: String,
    /// Pattern selecting the subtrees the rule runs on (`""` for the root)
    pub scope: String,
    /// The check itself
    pub check: CrossFieldCheck,
}

impl CrossFieldRule {
    /// `lower <= upper` within `scope`.
    pub fn ordered(scope: &str, lower: &str, upper: &str) -> Self {
        Self {
            name: format!("{} <= {}", lower, upper),
            scope: scope.to_string(),
            check: CrossFieldCheck::Ordered {
                lower: lower.to_string(),
                upper: upper.to_string(),
            },
        }
    }

    /// Conditional presence: `then` is required when `field == equals`.
    pub fn required_if<I, S>(scope: &str, field: &str, equals: impl Into<ConfigValue>, then: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: format!("required if {}", field),
            scope: scope.to_string(),
            check: CrossFieldCheck::RequiredIf {
                field: field.to_string(),
                equals: equals.into(),
                then: then.into_iter().map(Into::into).collect(),
            },
        }
    }

    /// At least one of `fields` is set within `scope`.
    pub fn at_least_one_of<I, S>(scope: &str, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: "at least one of".to_string(),
            scope: scope.to_string(),
            check: CrossFieldCheck::AtLeastOneOf(fields.into_iter().map(Into::into).collect()),
        }
    }

    /// At most one of `fields` is set within `scope`.
    pub fn mutually_exclusive<I, S>(scope: &str, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: "mutually exclusive".to_string(),
            scope: scope.to_string(),
            check: CrossFieldCheck::MutuallyExclusive(fields.into_iter().map(Into::into).collect()),
        }
    }

    /// Caller-supplied check over each scope subtree.
    pub fn custom<F>(name: &str, scope: &str, check: F) -> Self
    where
        F: Fn(&ConfigValue) -> Result<(), String> + Send + Sync + 'static,
    {
        Self {
            name: name.to_string(),
            scope: scope.to_string(),
            check: CrossFieldCheck::Custom(Arc::new(check)),
        }
    }

    /// Replace the rule name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Resolve the scope and field references.
    pub(crate) fn compile(&self) -> Result<CompiledCrossField, RuleSetError> {
        let fields = |names: &[String]| -> Result<Vec<FieldPath>, RuleSetError> {
            names.iter().map(|name| FieldPath::parse(name)).collect()
        };

        let check = match &self.check {
            CrossFieldCheck::Ordered { lower, upper } => CompiledCheck::Ordered {
                lower: FieldPath::parse(lower)?,
                upper: FieldPath::parse(upper)?,
            },
            CrossFieldCheck::RequiredIf {
                field,
                equals,
                then,
            } => CompiledCheck::RequiredIf {
                field: FieldPath::parse(field)?,
                equals: equals.clone(),
                then: fields(then)?,
            },
            CrossFieldCheck::AtLeastOneOf(names) => CompiledCheck::AtLeastOneOf(fields(names)?),
            CrossFieldCheck::MutuallyExclusive(names) => {
                CompiledCheck::MutuallyExclusive(fields(names)?)
            }
            CrossFieldCheck::Custom(check) => CompiledCheck::Custom(Arc::clone(check)),
        };

        Ok(CompiledCrossField {
            name: self.name.clone(),
            scope: PathPattern::parse(&self.scope)?,
            check,
        })
    }
}

#[derive(Clone)]
pub(crate) enum CompiledCheck {
    Ordered { lower: FieldPath, upper: FieldPath },
    RequiredIf {
        field: FieldPath,
        equals: ConfigValue,
        then: Vec<FieldPath>,
    },
    AtLeastOneOf(Vec<FieldPath>),
    MutuallyExclusive(Vec<FieldPath>),
    Custom(Arc<CrossFieldFn>),
}

/// A cross-field rule with parsed paths, ready to evaluate.
#[derive(Clone)]
pub(crate) struct CompiledCrossField {
    pub(crate) name: String,
    pub(crate) scope: PathPattern,
    pub(crate) check: CompiledCheck,
}

impl fmt::Debug for CompiledCrossField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledCrossField")
            .field("name", &self.name)
            .field("scope", &self.scope.to_string())
            .finish()
    }
}

/// Present and not null.
fn is_set(scope: &ConfigValue, field: &FieldPath) -> bool {
    scope.get_path(field).is_some_and(|value| !value.is_null())
}

fn compare(a: &ConfigValue, b: &ConfigValue) -> Option<Ordering> {
    match (a, b) {
        (ConfigValue::String(x), ConfigValue::String(y)) => Some(x.cmp(y)),
        _ => a.as_float()?.partial_cmp(&b.as_float()?),
    }
}

impl CompiledCrossField {
    /// Patterns of every field this rule reads, for known-field bookkeeping.
    pub(crate) fn referenced_patterns(&self) -> Vec<PathPattern> {
        let fields: Vec<&FieldPath> = match &self.check {
            CompiledCheck::Ordered { lower, upper } => vec![lower, upper],
            CompiledCheck::RequiredIf { field, then, .. } => {
                std::iter::once(field).chain(then.iter()).collect()
            }
            CompiledCheck::AtLeastOneOf(fields) | CompiledCheck::MutuallyExclusive(fields) => {
                fields.iter().collect()
            }
            CompiledCheck::Custom(_) => Vec::new(),
        };
        fields.into_iter().map(|f| self.scope.join(f)).collect()
    }

    /// Evaluate against one scope subtree located at `at`.
    pub(crate) fn evaluate(&self, scope: &ConfigValue, at: &FieldPath, out: &mut Vec<ValidationError>) {
        if let CompiledCheck::Custom(check) = &self.check {
            if let Err(message) = check(scope) {
                out.push(ValidationError::new(
                    at.clone(),
                    ErrorKind::CrossField,
                    format!("{}: {}", self.name, message),
                ));
            }
            return;
        }

        // Field checks only make sense inside a mapping.
        if scope.as_mapping().is_none() {
            return;
        }

        match &self.check {
            CompiledCheck::Ordered { lower, upper } => {
                let (Some(lo), Some(hi)) = (scope.get_path(lower), scope.get_path(upper)) else {
                    return;
                };
                if compare(lo, hi) == Some(Ordering::Greater) {
                    out.push(
                        ValidationError::new(
                            at.join(upper),
                            ErrorKind::CrossField,
                            format!(
                                "{} ({}) must not be greater than {} ({})",
                                lower,
                                lo.preview(),
                                upper,
                                hi.preview()
                            ),
                        )
                        .with_related([at.join(lower).to_string(), at.join(upper).to_string()]),
                    );
                }
            }

            CompiledCheck::RequiredIf {
                field,
                equals,
                then,
            } => {
                let triggered = scope
                    .get_path(field)
                    .is_some_and(|value| value.loosely_equals(equals));
                if !triggered {
                    return;
                }
                for required in then.iter().filter(|path| !scope.contains_path(path)) {
                    out.push(
                        ValidationError::new(
                            at.join(required),
                            ErrorKind::MissingRequiredField,
                            format!(
                                "missing required field (required when {} is {})",
                                field,
                                equals.preview()
                            ),
                        )
                        .with_related([at.join(field).to_string()]),
                    );
                }
            }

            CompiledCheck::AtLeastOneOf(fields) => {
                if !fields.iter().any(|field| is_set(scope, field)) {
                    out.push(
                        ValidationError::new(
                            at.clone(),
                            ErrorKind::MissingRequiredField,
                            format!("at least one of {} is required", join_names(fields)),
                        )
                        .with_related(fields.iter().map(|f| at.join(f).to_string())),
                    );
                }
            }

            CompiledCheck::MutuallyExclusive(fields) => {
                let set: Vec<&FieldPath> = fields.iter().filter(|f| is_set(scope, f)).collect();
                if set.len() > 1 {
                    out.push(
                        ValidationError::new(
                            at.clone(),
                            ErrorKind::CrossField,
                            format!(
                                "only one of {} may be set, found {}",
                                join_names(fields),
                                set.len()
                            ),
                        )
                        .with_related(set.iter().map(|f| at.join(f).to_string())),
                    );
                }
            }

            CompiledCheck::Custom(_) => {}
        }
    }
}

fn join_names(fields: &[FieldPath]) -> String {
    fields
        .iter()
        .map(FieldPath::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
