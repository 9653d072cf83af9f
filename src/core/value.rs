//! The configuration value model.
//!
//! Every input format (JSON, YAML, Terraform-JSON) is normalized into one
//! recursive [`ConfigValue`] before validation. Mappings keep document order so
//! that traversal, and therefore error ordering, is deterministic.

use crate::core::path::{FieldPath, PathPattern, PatternSegment, Segment};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordered mapping used for configuration objects.
pub type Mapping = IndexMap<String, ConfigValue>;

/// A parsed configuration document or any node inside one.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ConfigValue {
    /// Explicit null (also the result of parsing empty text)
    #[default]
    Null,
    /// Boolean
    Bool(bool),
    /// 64-bit signed integer
    Integer(i64),
    /// 64-bit float, including non-finite values from YAML (`.inf`, `.nan`)
    Float(f64),
    /// UTF-8 string
    String(String),
    /// Ordered sequence
    Sequence(Vec<ConfigValue>),
    /// String-keyed mapping in document order
    Mapping(Mapping),
}

/// The tag of a [`ConfigValue`], used by type-match rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Null,
    Bool,
    Integer,
    Float,
    String,
    Sequence,
    Mapping,
}

impl ValueKind {
    /// Lower-case name used in messages.
    pub fn name(&self) -> &'static str {
        match self {
            ValueKind::Null => "null",
            ValueKind::Bool => "bool",
            ValueKind::Integer => "integer",
            ValueKind::Float => "float",
            ValueKind::String => "string",
            ValueKind::Sequence => "sequence",
            ValueKind::Mapping => "mapping",
        }
    }

    /// Resolve a kind from its name or a common alias
    /// (`boolean`, `int`, `array`, `list`, `object`, `map`).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "null" => Some(ValueKind::Null),
            "bool" | "boolean" => Some(ValueKind::Bool),
            "integer" | "int" => Some(ValueKind::Integer),
            "float" | "double" => Some(ValueKind::Float),
            "string" | "str" => Some(ValueKind::String),
            "sequence" | "array" | "list" => Some(ValueKind::Sequence),
            "mapping" | "object" | "map" => Some(ValueKind::Mapping),
            _ => None,
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl ConfigValue {
    /// The tag of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            ConfigValue::Null => ValueKind::Null,
            ConfigValue::Bool(_) => ValueKind::Bool,
            ConfigValue::Integer(_) => ValueKind::Integer,
            ConfigValue::Float(_) => ValueKind::Float,
            ConfigValue::String(_) => ValueKind::String,
            ConfigValue::Sequence(_) => ValueKind::Sequence,
            ConfigValue::Mapping(_) => ValueKind::Mapping,
        }
    }

    /// Whether this is an explicit null.
    pub fn is_null(&self) -> bool {
        matches!(self, ConfigValue::Null)
    }

    /// Try to get this value as a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        if let ConfigValue::Bool(b) = self {
            Some(*b)
        } else {
            None
        }
    }

    /// Try to get this value as an integer.
    pub fn as_integer(&self) -> Option<i64> {
        if let ConfigValue::Integer(i) = self {
            Some(*i)
        } else {
            None
        }
    }

    /// Numeric view of integers and floats.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            ConfigValue::Integer(i) => Some(*i as f64),
            ConfigValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Try to get this value as a string slice.
    pub fn as_str(&self) -> Option<&str> {
        if let ConfigValue::String(s) = self {
            Some(s)
        } else {
            None
        }
    }

    /// Try to get this value as a sequence.
    pub fn as_sequence(&self) -> Option<&[ConfigValue]> {
        if let ConfigValue::Sequence(items) = self {
            Some(items)
        } else {
            None
        }
    }

    /// Try to get this value as a mapping.
    pub fn as_mapping(&self) -> Option<&Mapping> {
        if let ConfigValue::Mapping(map) = self {
            Some(map)
        } else {
            None
        }
    }

    /// Mapping entry by key. `None` for missing keys and non-mappings.
    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.as_mapping().and_then(|map| map.get(key))
    }

    /// Child addressed by one path segment.
    pub fn child(&self, segment: &Segment) -> Option<&ConfigValue> {
        match (segment, self) {
            (Segment::Key(_), ConfigValue::Mapping(map)) => {
                segment.lookup_key().and_then(|key| map.get(key))
            }
            (Segment::Index(i), ConfigValue::Sequence(items)) => items.get(*i),
            _ => None,
        }
    }

    /// Value at `path`, or `None` when any step is absent.
    ///
    /// A key that is present with a null value yields `Some(&ConfigValue::Null)`.
    pub fn get_path(&self, path: &FieldPath) -> Option<&ConfigValue> {
        path.segments()
            .iter()
            .try_fold(self, |node, segment| node.child(segment))
    }

    /// Whether `path` exists (explicit null counts as present).
    pub fn contains_path(&self, path: &FieldPath) -> bool {
        self.get_path(path).is_some()
    }

    /// Number of characters, elements or entries for strings, sequences and
    /// mappings.
    pub fn length(&self) -> Option<usize> {
        match self {
            ConfigValue::String(s) => Some(s.chars().count()),
            ConfigValue::Sequence(items) => Some(items.len()),
            ConfigValue::Mapping(map) => Some(map.len()),
            _ => None,
        }
    }

    /// All nodes matching `pattern`, in document order.
    pub fn select(&self, pattern: &PathPattern) -> Vec<(FieldPath, &ConfigValue)> {
        let mut found = Vec::new();
        select_into(self, pattern.segments(), FieldPath::root(), &mut found);
        found
    }

    /// Equality that treats `1` and `1.0` as the same number.
    pub fn loosely_equals(&self, other: &ConfigValue) -> bool {
        match (self.as_float(), other.as_float()) {
            (Some(a), Some(b)) => a == b,
            _ => self == other,
        }
    }

    /// Short rendering for messages; long strings are truncated.
    pub fn preview(&self) -> String {
        const LIMIT: usize = 40;
        match self {
            ConfigValue::Null => "null".to_string(),
            ConfigValue::Bool(b) => b.to_string(),
            ConfigValue::Integer(i) => i.to_string(),
            ConfigValue::Float(f) => f.to_string(),
            ConfigValue::String(s) if s.chars().count() > LIMIT => {
                let head: String = s.chars().take(LIMIT).collect();
                format!("\"{}...\"", head)
            }
            ConfigValue::String(s) => format!("\"{}\"", s),
            ConfigValue::Sequence(items) => format!("[{} item(s)]", items.len()),
            ConfigValue::Mapping(map) => format!("{{{} field(s)}}", map.len()),
        }
    }
}

fn select_into<'a>(
    value: &'a ConfigValue,
    rest: &[PatternSegment],
    path: FieldPath,
    found: &mut Vec<(FieldPath, &'a ConfigValue)>,
) {
    let Some((head, tail)) = rest.split_first() else {
        found.push((path, value));
        return;
    };

    match (head, value) {
        (PatternSegment::Key(key), ConfigValue::Mapping(map)) => {
            if let Some(child) = map.get(key) {
                select_into(child, tail, path.child_key(key.clone()), found);
            }
        }
        (PatternSegment::AnyKey, ConfigValue::Mapping(map)) => {
            for (key, child) in map {
                select_into(child, tail, path.child_key(key.clone()), found);
            }
        }
        (PatternSegment::AnyKeyExcept(excluded), ConfigValue::Mapping(map)) => {
            for (key, child) in map.iter().filter(|(key, _)| !excluded.contains(*key)) {
                select_into(child, tail, path.child_key(key.clone()), found);
            }
        }
        (PatternSegment::Index(i), ConfigValue::Sequence(items)) => {
            if let Some(child) = items.get(*i) {
                select_into(child, tail, path.child_index(*i), found);
            }
        }
        (PatternSegment::AnyIndex, ConfigValue::Sequence(items)) => {
            for (i, child) in items.iter().enumerate() {
                select_into(child, tail, path.child_index(i), found);
            }
        }
        _ => {}
    }
}

// ============================================================================
// Conversions
// ============================================================================

impl From<serde_json::Value> for ConfigValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => ConfigValue::Null,
            serde_json::Value::Bool(b) => ConfigValue::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => ConfigValue::Integer(i),
                None => ConfigValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => ConfigValue::String(s),
            serde_json::Value::Array(items) => {
                ConfigValue::Sequence(items.into_iter().map(ConfigValue::from).collect())
            }
            serde_json::Value::Object(map) => ConfigValue::Mapping(
                map.into_iter()
                    .map(|(k, v)| (k, ConfigValue::from(v)))
                    .collect(),
            ),
        }
    }
}

impl TryFrom<serde_yaml::Value> for ConfigValue {
    type Error = String;

    fn try_from(value: serde_yaml::Value) -> Result<Self, Self::Error> {
        use serde_yaml::Value as Yaml;

        Ok(match value {
            Yaml::Null => ConfigValue::Null,
            Yaml::Bool(b) => ConfigValue::Bool(b),
            Yaml::Number(n) => match n.as_i64() {
                Some(i) => ConfigValue::Integer(i),
                None => ConfigValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Yaml::String(s) => ConfigValue::String(s),
            Yaml::Sequence(items) => ConfigValue::Sequence(
                items
                    .into_iter()
                    .map(ConfigValue::try_from)
                    .collect::<Result<_, _>>()?,
            ),
            Yaml::Mapping(map) => {
                let mut out = Mapping::with_capacity(map.len());
                for (key, value) in map {
                    out.insert(yaml_key(key)?, ConfigValue::try_from(value)?);
                }
                ConfigValue::Mapping(out)
            }
            Yaml::Tagged(tagged) => ConfigValue::try_from(tagged.value)?,
        })
    }
}

fn yaml_key(key: serde_yaml::Value) -> Result<String, String> {
    use serde_yaml::Value as Yaml;

    match key {
        Yaml::String(s) => Ok(s),
        Yaml::Bool(b) => Ok(b.to_string()),
        Yaml::Number(n) => Ok(n.to_string()),
        Yaml::Null => Ok("null".to_string()),
        Yaml::Tagged(tagged) => yaml_key(tagged.value),
        Yaml::Sequence(_) | Yaml::Mapping(_) => {
            Err("mapping keys must be scalars, found a collection".to_string())
        }
    }
}

impl From<bool> for ConfigValue {
    fn from(b: bool) -> Self {
        ConfigValue::Bool(b)
    }
}

impl From<i64> for ConfigValue {
    fn from(i: i64) -> Self {
        ConfigValue::Integer(i)
    }
}

impl From<i32> for ConfigValue {
    fn from(i: i32) -> Self {
        ConfigValue::Integer(i64::from(i))
    }
}

impl From<f64> for ConfigValue {
    fn from(f: f64) -> Self {
        ConfigValue::Float(f)
    }
}

impl From<&str> for ConfigValue {
    fn from(s: &str) -> Self {
        ConfigValue::String(s.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(s: String) -> Self {
        ConfigValue::String(s)
    }
}

impl From<Vec<ConfigValue>> for ConfigValue {
    fn from(items: Vec<ConfigValue>) -> Self {
        ConfigValue::Sequence(items)
    }
}

impl From<Mapping> for ConfigValue {
    fn from(map: Mapping) -> Self {
        ConfigValue::Mapping(map)
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.preview())
    }
}
