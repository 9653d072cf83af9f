//! JSON-Schema subset loader.
//!
//! Supported keywords: `type`, `properties`, `required`, `items`, `minimum`,
//! `maximum`, `minLength`, `maxLength`, `minItems`, `maxItems`, `pattern`,
//! `format`, `enum`, `default` and `additionalProperties`. Annotation keywords
//! (`$schema`, `title`, `description`, ...) are ignored.
//!
//! Schema `type` never coerces: `"5432"` against `integer` is a type mismatch
//! here just as it is for hand-built rule sets.

use crate::core::error::{FileError, SchemaError};
use crate::core::format::FormatKind;
use crate::core::rule::Rule;
use crate::core::value::{ConfigValue, Mapping, ValueKind};
use crate::input::parse::{parse_str, Format};
use crate::schema::ruleset::{RuleSet, RuleSetBuilder};
use std::path::Path;

/// Build a rule set from a parsed schema document.
///
/// `additionalProperties: false` on the root schema makes the rule set strict
/// regardless of `strict`; on nested schemas it is accepted and ignored.
pub fn from_schema(schema: &ConfigValue, strict: bool) -> Result<RuleSet, SchemaError> {
    let root = schema.as_mapping().ok_or_else(|| SchemaError::NotAMapping {
        path: "$".to_string(),
    })?;

    let root_closed = matches!(root.get("additionalProperties"), Some(ConfigValue::Bool(false)));
    let mut walker = SchemaWalker {
        builder: RuleSet::builder().strict(strict || root_closed),
    };
    walker.walk(root, "", true, Vec::new())?;
    Ok(walker.builder.build()?)
}

/// Read a JSON or YAML schema file and build a rule set from it.
pub fn load_schema_file(path: &Path, strict: bool) -> Result<RuleSet, SchemaError> {
    let text = std::fs::read_to_string(path).map_err(|e| FileError::from_io(path, e))?;
    let format = Format::from_path(path).unwrap_or_else(|| Format::detect(&text));
    let schema = parse_str(&text, format).map_err(|source| FileError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    log::debug!("Loaded {} schema from {}", format, path.display());
    from_schema(&schema, strict)
}

struct SchemaWalker {
    builder: RuleSetBuilder,
}

impl SchemaWalker {
    /// Translate one schema node at `pattern`. `literal` is false once a
    /// wildcard has been passed; defaults are only recorded for literal paths.
    /// `leading` holds rules contributed by the parent (presence rules).
    fn walk(
        &mut self,
        schema: &Mapping,
        pattern: &str,
        literal: bool,
        leading: Vec<Rule>,
    ) -> Result<(), SchemaError> {
        let mut rules = leading;
        let at = display(pattern);

        if let Some(kinds) = schema.get("type") {
            rules.push(Rule::one_of_types(type_kinds(kinds, &at)?));
        }

        let minimum = number_keyword(schema, "minimum", &at)?;
        let maximum = number_keyword(schema, "maximum", &at)?;
        if minimum.is_some() || maximum.is_some() {
            rules.push(Rule::Range {
                min: minimum,
                max: maximum,
            });
        }

        for keyword in ["minLength", "minItems"] {
            if let Some(n) = count_keyword(schema, keyword, &at)? {
                rules.push(Rule::min_length(n));
            }
        }
        for keyword in ["maxLength", "maxItems"] {
            if let Some(n) = count_keyword(schema, keyword, &at)? {
                rules.push(Rule::max_length(n));
            }
        }

        if let Some(pattern_value) = schema.get("pattern") {
            let regex = pattern_value
                .as_str()
                .ok_or_else(|| invalid(&at, "pattern", "expected a string"))?;
            rules.push(Rule::pattern(regex)?);
        }

        if let Some(format) = schema.get("format") {
            let name = format
                .as_str()
                .ok_or_else(|| invalid(&at, "format", "expected a string"))?;
            let kind = FormatKind::from_name(name).ok_or_else(|| SchemaError::UnsupportedFormat {
                path: at.clone(),
                name: name.to_string(),
            })?;
            rules.push(Rule::format(kind));
        }

        if let Some(values) = schema.get("enum") {
            let values = values
                .as_sequence()
                .ok_or_else(|| invalid(&at, "enum", "expected a sequence"))?;
            rules.push(Rule::OneOf(values.to_vec()));
        }

        if !rules.is_empty() {
            self.push(|b| b.field(pattern, rules));
        }

        if let Some(default) = schema.get("default") {
            if literal && !pattern.is_empty() {
                let default = default.clone();
                self.push(|b| b.default_value(pattern, default));
            }
        }

        let required = required_names(schema, &at)?;
        let properties = match schema.get("properties") {
            Some(ConfigValue::Mapping(properties)) => Some(properties),
            Some(_) => return Err(invalid(&at, "properties", "expected a mapping")),
            None => None,
        };

        if let Some(properties) = properties {
            for (name, property) in properties {
                check_property_name(name, &at)?;
                let property = property.as_mapping().ok_or_else(|| SchemaError::NotAMapping {
                    path: display(&child(pattern, name)),
                })?;
                let leading = if required.contains(name) {
                    vec![Rule::required_in_parent()]
                } else {
                    Vec::new()
                };
                self.walk(property, &child(pattern, name), literal, leading)?;
            }
        }

        // Required names without a property schema still need a presence rule.
        for name in &required {
            if properties.is_some_and(|p| p.contains_key(name)) {
                continue;
            }
            check_property_name(name, &at)?;
            let target = child(pattern, name);
            self.push(|b| b.rule(&target, Rule::required_in_parent()));
        }

        match schema.get("additionalProperties") {
            Some(ConfigValue::Bool(true)) => self.push(|b| b.open(pattern)),
            Some(ConfigValue::Mapping(extra)) => {
                let declared: Vec<&str> = properties
                    .map(|p| p.keys().map(String::as_str).collect())
                    .unwrap_or_default();
                let others = if declared.is_empty() {
                    "*".to_string()
                } else {
                    format!("*!({})", declared.join("|"))
                };
                self.walk(extra, &child(pattern, &others), false, Vec::new())?;
            }
            Some(ConfigValue::Bool(false)) | None => {}
            Some(_) => {
                return Err(invalid(&at, "additionalProperties", "expected a bool or a schema"));
            }
        }

        match schema.get("items") {
            Some(ConfigValue::Mapping(items)) => {
                self.walk(items, &format!("{}[*]", pattern), false, Vec::new())?;
            }
            Some(_) => return Err(invalid(&at, "items", "expected a single schema")),
            None => {}
        }

        Ok(())
    }

    fn push(&mut self, f: impl FnOnce(RuleSetBuilder) -> RuleSetBuilder) {
        let builder = std::mem::take(&mut self.builder);
        self.builder = f(builder);
    }
}

fn child(pattern: &str, name: &str) -> String {
    if pattern.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", pattern, name)
    }
}

fn display(pattern: &str) -> String {
    if pattern.is_empty() {
        "$".to_string()
    } else {
        pattern.to_string()
    }
}

fn invalid(path: &str, keyword: &str, reason: &str) -> SchemaError {
    SchemaError::InvalidKeyword {
        path: path.to_string(),
        keyword: keyword.to_string(),
        reason: reason.to_string(),
    }
}

fn check_property_name(name: &str, at: &str) -> Result<(), SchemaError> {
    if name.is_empty() || name.contains(|c: char| matches!(c, '.' | '*' | '[' | ']' | '(' | ')' | '|')) {
        return Err(invalid(
            at,
            "properties",
            &format!("property name '{}' cannot be expressed as a path segment", name),
        ));
    }
    Ok(())
}

fn type_kinds(value: &ConfigValue, at: &str) -> Result<Vec<ValueKind>, SchemaError> {
    let names: Vec<&str> = match value {
        ConfigValue::String(name) => vec![name.as_str()],
        ConfigValue::Sequence(items) => items
            .iter()
            .map(|item| item.as_str().ok_or_else(|| invalid(at, "type", "expected type names")))
            .collect::<Result<_, _>>()?,
        _ => return Err(invalid(at, "type", "expected a string or a sequence")),
    };

    let mut kinds = Vec::new();
    for name in names {
        match name {
            "number" => kinds.extend([ValueKind::Integer, ValueKind::Float]),
            other => kinds.push(ValueKind::from_name(other).ok_or_else(|| SchemaError::UnsupportedType {
                path: at.to_string(),
                name: other.to_string(),
            })?),
        }
    }
    Ok(kinds)
}

fn number_keyword(schema: &Mapping, keyword: &str, at: &str) -> Result<Option<f64>, SchemaError> {
    match schema.get(keyword) {
        None => Ok(None),
        Some(value) => value
            .as_float()
            .map(Some)
            .ok_or_else(|| invalid(at, keyword, "expected a number")),
    }
}

fn count_keyword(schema: &Mapping, keyword: &str, at: &str) -> Result<Option<usize>, SchemaError> {
    match schema.get(keyword) {
        None => Ok(None),
        Some(value) => value
            .as_integer()
            .and_then(|n| usize::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| invalid(at, keyword, "expected a non-negative integer")),
    }
}

fn required_names(schema: &Mapping, at: &str) -> Result<Vec<String>, SchemaError> {
    match schema.get("required") {
        None => Ok(Vec::new()),
        Some(ConfigValue::Sequence(items)) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| invalid(at, "required", "expected property names"))
            })
            .collect(),
        Some(_) => Err(invalid(at, "required", "expected a sequence")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ErrorKind;
    use crate::validation::validate;
    use serde_json::json;

    fn schema(value: serde_json::Value) -> ConfigValue {
        ConfigValue::from(value)
    }

    fn database_schema() -> ConfigValue {
        schema(json!({
            "type": "object",
            "required": ["database"],
            "properties": {
                "database": {
                    "type": "object",
                    "required": ["port"],
                    "properties": {
                        "host": {"type": "string", "default": "localhost"},
                        "port": {"type": "integer", "minimum": 1, "maximum": 65535}
                    }
                }
            }
        }))
    }

    #[test]
    fn test_type_and_range() {
        let rules = from_schema(&database_schema(), false).unwrap();

        let bad = ConfigValue::from(json!({"database": {"port": "5432"}}));
        let result = validate(&bad, &rules);
        assert!(!result.is_valid());
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].kind, ErrorKind::TypeMismatch);
        assert_eq!(result.errors[0].path.to_string(), "database.port");

        let good = ConfigValue::from(json!({"database": {"port": 5432}}));
        assert!(validate(&good, &rules).is_valid());
    }

    #[test]
    fn test_required_and_defaults() {
        let rules = from_schema(&database_schema(), false).unwrap();
        let result = validate(&ConfigValue::from(json!({})), &rules);
        assert!(result.has_error(ErrorKind::MissingRequiredField));

        let filled = rules.apply_defaults(&ConfigValue::from(json!({"database": {"port": 1}})));
        assert_eq!(
            filled.get_path(&crate::core::path::FieldPath::parse("database.host").unwrap()),
            Some(&ConfigValue::from("localhost"))
        );
    }

    #[test]
    fn test_items_enum_and_format() {
        let rules = from_schema(
            &schema(json!({
                "properties": {
                    "admins": {"type": "array", "minItems": 1, "items": {"type": "string", "format": "email"}},
                    "level": {"enum": ["debug", "info", "warn"]}
                }
            })),
            false,
        )
        .unwrap();

        let value = ConfigValue::from(json!({
            "admins": ["ops@example.com", "not-an-email"],
            "level": "verbose"
        }));
        let result = validate(&value, &rules);
        let kinds: Vec<ErrorKind> = result.errors.iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![ErrorKind::InvalidFormat, ErrorKind::InvalidValue]);
        assert_eq!(result.errors[0].path.to_string(), "admins[1]");
    }

    #[test]
    fn test_additional_properties() {
        let closed = from_schema(
            &schema(json!({
                "additionalProperties": false,
                "properties": {"name": {"type": "string"}, "labels": {"additionalProperties": true}}
            })),
            false,
        )
        .unwrap();
        assert!(closed.is_strict());

        let value = ConfigValue::from(json!({"name": "x", "labels": {"team": "a"}, "extra": 1}));
        let result = validate(&value, &closed);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].kind, ErrorKind::UnknownField);
        assert_eq!(result.errors[0].path.to_string(), "extra");
    }

    #[test]
    fn test_nested_required_under_optional_parent() {
        let rules = from_schema(
            &schema(json!({
                "required": ["name"],
                "properties": {
                    "name": {"type": "string"},
                    "tls": {
                        "type": "object",
                        "required": ["cert"],
                        "properties": {"cert": {"type": "string"}, "key": {"type": "string"}}
                    }
                }
            })),
            false,
        )
        .unwrap();

        assert!(validate(&ConfigValue::from(json!({"name": "svc"})), &rules).is_valid());

        let result = validate(&ConfigValue::from(json!({"name": "svc", "tls": {"key": "k"}})), &rules);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].kind, ErrorKind::MissingRequiredField);
        assert_eq!(result.errors[0].path.to_string(), "tls.cert");

        let result = validate(&ConfigValue::from(json!({})), &rules);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].path.to_string(), "name");
    }

    #[test]
    fn test_additional_properties_schema_skips_declared_keys() {
        let rules = from_schema(
            &schema(json!({
                "properties": {"name": {"type": "string"}},
                "additionalProperties": {"type": "integer"}
            })),
            true,
        )
        .unwrap();

        let value = ConfigValue::from(json!({"name": "svc", "replicas": 3}));
        let result = validate(&value, &rules);
        assert!(result.is_valid(), "{:?}", result.errors);
        assert!(result.warnings.is_empty());

        let value = ConfigValue::from(json!({"name": "svc", "replicas": "three"}));
        let result = validate(&value, &rules);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].kind, ErrorKind::TypeMismatch);
        assert_eq!(result.errors[0].path.to_string(), "replicas");

        let bare = from_schema(&schema(json!({"additionalProperties": {"type": "integer"}})), false).unwrap();
        let result = validate(&ConfigValue::from(json!({"a": 1, "b": "x"})), &bare);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].path.to_string(), "b");
    }

    #[test]
    fn test_unsupported_keywords_fail() {
        let bad_type = from_schema(&schema(json!({"type": "decimal"})), false);
        assert!(matches!(bad_type, Err(SchemaError::UnsupportedType { .. })));

        let bad_format = from_schema(&schema(json!({"format": "hostname"})), false);
        assert!(matches!(bad_format, Err(SchemaError::UnsupportedFormat { .. })));

        let bad_name = from_schema(&schema(json!({"properties": {"a.b": {}}})), false);
        assert!(matches!(bad_name, Err(SchemaError::InvalidKeyword { .. })));

        assert!(matches!(
            from_schema(&ConfigValue::from(1), false),
            Err(SchemaError::NotAMapping { .. })
        ));
    }

    #[test]
    fn test_load_yaml_schema_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schema.yaml");
        std::fs::write(
            &path,
            "type: object\nrequired: [name]\nproperties:\n  name:\n    type: string\n    minLength: 2\n",
        )
        .unwrap();

        let rules = load_schema_file(&path, true).unwrap();
        assert!(rules.is_strict());
        let result = validate(&ConfigValue::from(json!({"name": "a"})), &rules);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].kind, ErrorKind::InvalidValue);

        let missing = load_schema_file(&dir.path().join("absent.json"), false);
        assert!(matches!(missing, Err(SchemaError::File(FileError::NotFound { .. }))));
    }
}
