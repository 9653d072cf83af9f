//! Environment-variable substitution.
//!
//! String values containing `${NAME}` or `${NAME:default}` are resolved
//! against an [`Environment`] before validation. Only identifier names are
//! substituted, so Terraform interpolations such as `${aws_vpc.main.id}` and
//! Actions expressions such as `${{ github.sha }}` pass through untouched.
//! `$${` escapes a literal `${`. A default may itself contain references
//! (`${A:${B}}`); it is only resolved when `A` is unset.

use crate::core::error::{FileError, ParseError, SubstitutionError};
use crate::core::path::FieldPath;
use crate::core::value::{ConfigValue, Mapping};
use std::collections::HashMap;
use std::path::Path;

/// Variables available to substitution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    vars: HashMap<String, String>,
}

impl Environment {
    /// Create an empty environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the current process environment.
    pub fn from_process() -> Self {
        std::env::vars().collect()
    }

    /// Read a `.env` file.
    pub fn from_env_file(path: &Path) -> Result<Self, FileError> {
        let entries = dotenvy::from_path_iter(path).map_err(|e| dotenv_error(path, e))?;
        let mut env = Self::new();
        for entry in entries {
            let (key, value) = entry.map_err(|e| dotenv_error(path, e))?;
            env.set(key, value);
        }
        Ok(env)
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    /// Insert or replace a variable.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(name.into(), value.into());
    }

    /// Look up a variable.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// Overlay `other` on top of this environment.
    pub fn merged(mut self, other: Environment) -> Self {
        self.vars.extend(other.vars);
        self
    }

    /// Number of variables.
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// Whether no variables are defined.
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Environment {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

fn dotenv_error(path: &Path, error: dotenvy::Error) -> FileError {
    match error {
        dotenvy::Error::Io(io) => FileError::from_io(path, io),
        other => FileError::Parse {
            path: path.to_path_buf(),
            source: ParseError::new("dotenv", other.to_string()),
        },
    }
}

/// Return a copy of `value` with every substitutable reference resolved.
///
/// Mapping keys are left as they are.
pub fn substitute(value: &ConfigValue, env: &Environment) -> Result<ConfigValue, SubstitutionError> {
    substitute_at(value, env, &FieldPath::root())
}

fn substitute_at(
    value: &ConfigValue,
    env: &Environment,
    path: &FieldPath,
) -> Result<ConfigValue, SubstitutionError> {
    Ok(match value {
        ConfigValue::String(text) => ConfigValue::String(substitute_str(text, env, path)?),
        ConfigValue::Sequence(items) => ConfigValue::Sequence(
            items
                .iter()
                .enumerate()
                .map(|(i, item)| substitute_at(item, env, &path.child_index(i)))
                .collect::<Result<_, _>>()?,
        ),
        ConfigValue::Mapping(map) => {
            let mut out = Mapping::with_capacity(map.len());
            for (key, item) in map {
                out.insert(key.clone(), substitute_at(item, env, &path.child_key(key.clone()))?);
            }
            ConfigValue::Mapping(out)
        }
        other => other.clone(),
    })
}

/// Resolve references inside one string.
pub fn substitute_str(
    text: &str,
    env: &Environment,
    path: &FieldPath,
) -> Result<String, SubstitutionError> {
    if !text.contains("${") {
        return Ok(text.to_string());
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find('$') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];

        if let Some(after) = tail.strip_prefix("$${") {
            out.push_str("${");
            rest = after;
            continue;
        }
        let Some(body) = tail.strip_prefix("${") else {
            out.push('$');
            rest = &tail[1..];
            continue;
        };
        let Some(close) = closing_brace(body) else {
            out.push_str(tail);
            rest = "";
            break;
        };

        let inner = &body[..close];
        let (name, default) = match inner.split_once(':') {
            Some((name, default)) => (name, Some(default)),
            None => (inner, None),
        };

        if is_identifier(name) {
            match (env.get(name), default) {
                (Some(value), _) => out.push_str(value),
                (None, Some(default)) => out.push_str(&substitute_str(default, env, path)?),
                (None, None) => {
                    return Err(SubstitutionError::Unresolved {
                        name: name.to_string(),
                        path: path.clone(),
                    })
                }
            }
        } else {
            out.push_str(&tail[..close + 3]);
        }
        rest = &body[close + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

/// Byte offset of the `}` closing a reference whose `${` was just consumed.
/// Braces inside a default nest.
fn closing_brace(body: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in body.char_indices() {
        match c {
            '{' => depth += 1,
            '}' if depth == 0 => return Some(i),
            '}' => depth -= 1,
            _ => {}
        }
    }
    None
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn env() -> Environment {
        Environment::new()
            .with("DB_HOST", "db.internal")
            .with("DB_PORT", "5432")
    }

    fn sub(text: &str) -> Result<String, SubstitutionError> {
        substitute_str(text, &env(), &FieldPath::root())
    }

    #[test]
    fn test_simple_and_default() {
        assert_eq!(sub("${DB_HOST}:${DB_PORT}").unwrap(), "db.internal:5432");
        assert_eq!(sub("${DB_USER:admin}").unwrap(), "admin");
        assert_eq!(sub("${DB_HOST:ignored}").unwrap(), "db.internal");
        assert_eq!(sub("${EMPTY_DEFAULT:}").unwrap(), "");
    }

    #[test]
    fn test_unresolved_names_the_variable() {
        let error = substitute(
            &ConfigValue::from(json!({"db": {"password": "${DB_PASSWORD}"}})),
            &env(),
        )
        .unwrap_err();
        assert_eq!(error.variable(), "DB_PASSWORD");
        assert!(error.to_string().contains("db.password"));
    }

    #[test]
    fn test_non_identifier_references_pass_through() {
        for text in [
            "${aws_vpc.main.id}",
            "${{ github.sha }}",
            "prefix-${var.name}-suffix",
            "cost: $5",
            "${unclosed",
        ] {
            assert_eq!(sub(text).unwrap(), text);
        }
    }

    #[test]
    fn test_nested_default() {
        assert_eq!(sub("${DB_USER:${DB_HOST}}").unwrap(), "db.internal");
        assert_eq!(sub("${DB_PORT:${MISSING}}").unwrap(), "5432");
        assert_eq!(sub("${A:${B:fallback}}-x").unwrap(), "fallback-x");
        assert_eq!(sub("${A:{literal}}").unwrap(), "{literal}");

        let error = sub("${A:${B}}").unwrap_err();
        assert_eq!(error.variable(), "B");
    }

    #[test]
    fn test_escape() {
        assert_eq!(sub("$${DB_HOST}").unwrap(), "${DB_HOST}");
    }

    #[test]
    fn test_substitution_returns_new_value() {
        let original = ConfigValue::from(json!({"host": "${DB_HOST}", "ports": ["${DB_PORT}", 1]}));
        let resolved = substitute(&original, &env()).unwrap();
        assert_eq!(resolved, ConfigValue::from(json!({"host": "db.internal", "ports": ["5432", 1]})));
        assert_eq!(original.get("host").unwrap().as_str(), Some("${DB_HOST}"));
    }

    #[test]
    fn test_env_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# comment\nAPI_URL=https://api.example.com\nQUOTED=\"two words\"").unwrap();
        let env = Environment::from_env_file(file.path()).unwrap();
        assert_eq!(env.get("API_URL"), Some("https://api.example.com"));
        assert_eq!(env.get("QUOTED"), Some("two words"));
    }
}
