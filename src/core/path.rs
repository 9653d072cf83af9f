//! Field paths and path patterns.
//!
//! A [`FieldPath`] names one concrete location inside a configuration tree and
//! is only used for error attribution. A [`PathPattern`] is the rule-set side of
//! the same idea: the same dotted shape, but any segment may be a wildcard
//! (`*` for any mapping key, `[*]` for any sequence index).

use crate::core::error::RuleSetError;
use serde::{Serialize, Serializer};
use std::fmt;

/// Stand-in segment text for an empty mapping key, so that path segments are
/// never empty strings.
const EMPTY_KEY: &str = "\"\"";

/// One step into a configuration tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Segment {
    /// Mapping key
    Key(String),
    /// Sequence index
    Index(usize),
}

impl Segment {
    /// Create a key segment. An empty key is stored as `""` (quoted).
    pub fn key(name: impl Into<String>) -> Self {
        let name = name.into();
        if name.is_empty() {
            Segment::Key(EMPTY_KEY.to_string())
        } else {
            Segment::Key(name)
        }
    }

    /// The mapping key this segment refers to, undoing the empty-key quoting.
    pub fn lookup_key(&self) -> Option<&str> {
        match self {
            Segment::Key(k) if k == EMPTY_KEY => Some(""),
            Segment::Key(k) => Some(k),
            Segment::Index(_) => None,
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Key(k) => write!(f, "{}", k),
            Segment::Index(i) => write!(f, "[{}]", i),
        }
    }
}

/// Location of a value inside a configuration tree, e.g.
/// `database.connections.primary.port` or `servers[2].host`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldPath {
    segments: Vec<Segment>,
}

impl FieldPath {
    /// The document root.
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse a literal dotted path such as `a.b[0].c`.
    ///
    /// Wildcards are rejected; use [`PathPattern::parse`] for those.
    pub fn parse(text: &str) -> Result<Self, RuleSetError> {
        let pattern = PathPattern::parse(text)?;
        pattern.to_field_path().ok_or_else(|| RuleSetError::InvalidPath {
            path: text.to_string(),
            reason: "wildcards are not allowed in a field reference".to_string(),
        })
    }

    /// Build a path from segments.
    pub fn from_segments(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    /// Path of a mapping entry below this path.
    pub fn child_key(&self, key: impl Into<String>) -> Self {
        self.child(Segment::key(key))
    }

    /// Path of a sequence element below this path.
    pub fn child_index(&self, index: usize) -> Self {
        self.child(Segment::Index(index))
    }

    /// Path extended by one segment.
    pub fn child(&self, segment: Segment) -> Self {
        let mut segments = Vec::with_capacity(self.segments.len() + 1);
        segments.extend(self.segments.iter().cloned());
        segments.push(segment);
        Self { segments }
    }

    /// Concatenate a relative path onto this one.
    pub fn join(&self, relative: &FieldPath) -> Self {
        let mut segments = self.segments.clone();
        segments.extend(relative.segments.iter().cloned());
        Self { segments }
    }

    /// Parent path, or `None` at the root.
    pub fn parent(&self) -> Option<Self> {
        if self.segments.is_empty() {
            None
        } else {
            Some(Self {
                segments: self.segments[..self.segments.len() - 1].to_vec(),
            })
        }
    }

    /// All segments in order.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Last segment, if any.
    pub fn last(&self) -> Option<&Segment> {
        self.segments.last()
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Whether this is the document root.
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return write!(f, "<root>");
        }
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Key(k) if i == 0 => write!(f, "{}", k)?,
                Segment::Key(k) => write!(f, ".{}", k)?,
                Segment::Index(idx) => write!(f, "[{}]", idx)?,
            }
        }
        Ok(())
    }
}

impl Serialize for FieldPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One step of a [`PathPattern`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PatternSegment {
    /// Exactly this mapping key
    Key(String),
    /// Any mapping key (`*`)
    AnyKey,
    /// Any mapping key except the listed ones (`*!(a|b)`)
    AnyKeyExcept(Vec<String>),
    /// Exactly this sequence index (`[n]`)
    Index(usize),
    /// Any sequence index (`[*]` or `[]`)
    AnyIndex,
}

impl PatternSegment {
    /// Whether this pattern segment accepts the given concrete segment.
    pub fn matches(&self, segment: &Segment) -> bool {
        match (self, segment) {
            (PatternSegment::Key(expected), Segment::Key(actual)) => expected == actual,
            (PatternSegment::AnyKey, Segment::Key(_)) => true,
            (PatternSegment::AnyKeyExcept(excluded), Segment::Key(actual)) => {
                !excluded.iter().any(|key| key == actual)
            }
            (PatternSegment::Index(expected), Segment::Index(actual)) => expected == actual,
            (PatternSegment::AnyIndex, Segment::Index(_)) => true,
            _ => false,
        }
    }

    /// Whether this segment is a wildcard.
    pub fn is_wildcard(&self) -> bool {
        matches!(
            self,
            PatternSegment::AnyKey | PatternSegment::AnyKeyExcept(_) | PatternSegment::AnyIndex
        )
    }

    /// The concrete segment for a literal pattern segment.
    pub fn to_segment(&self) -> Option<Segment> {
        match self {
            PatternSegment::Key(k) => Some(Segment::key(k.clone())),
            PatternSegment::Index(i) => Some(Segment::Index(*i)),
            _ => None,
        }
    }
}

/// A path with optional wildcards, used to attach rules to locations.
///
/// Syntax: dot-separated keys, `*` for any key, `*!(a|b)` for any key other
/// than `a` and `b`, `[n]` / `[*]` suffixes for sequence elements. The empty
/// string or `$` denotes the root.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathPattern {
    segments: Vec<PatternSegment>,
}

impl PathPattern {
    /// Pattern matching only the document root.
    pub fn root() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    /// Parse a pattern such as `resource.*.*.depends_on[*]`.
    pub fn parse(text: &str) -> Result<Self, RuleSetError> {
        let trimmed = text.trim();
        if trimmed.is_empty() || trimmed == "$" {
            return Ok(Self::root());
        }
        let body = trimmed.strip_prefix("$.").unwrap_or(trimmed);
        let invalid = |reason: &str| RuleSetError::InvalidPath {
            path: text.to_string(),
            reason: reason.to_string(),
        };

        let mut segments = Vec::new();
        for (position, part) in body.split('.').enumerate() {
            let (name, mut rest) = match part.find('[') {
                Some(i) => (&part[..i], &part[i..]),
                None => (part, ""),
            };

            if name.is_empty() {
                if rest.is_empty() || position > 0 {
                    return Err(invalid("empty segment"));
                }
            } else if name == "*" {
                segments.push(PatternSegment::AnyKey);
            } else if let Some(list) = name.strip_prefix("*!(") {
                let list = list
                    .strip_suffix(')')
                    .ok_or_else(|| invalid("unclosed '(' in key exclusion"))?;
                let mut excluded: Vec<String> = list.split('|').map(str::to_string).collect();
                if excluded.iter().any(String::is_empty) {
                    return Err(invalid("empty key in exclusion"));
                }
                excluded.sort();
                excluded.dedup();
                segments.push(PatternSegment::AnyKeyExcept(excluded));
            } else if name.contains(']') {
                return Err(invalid("unexpected ']'"));
            } else {
                segments.push(PatternSegment::Key(name.to_string()));
            }

            while !rest.is_empty() {
                let close = rest.find(']').ok_or_else(|| invalid("unclosed '['"))?;
                let inner = rest[1..close].trim();
                let segment = match inner {
                    "" | "*" => PatternSegment::AnyIndex,
                    n => PatternSegment::Index(
                        n.parse()
                            .map_err(|_| invalid(&format!("invalid index '{}'", n)))?,
                    ),
                };
                segments.push(segment);
                rest = &rest[close + 1..];
                if !rest.is_empty() && !rest.starts_with('[') {
                    return Err(invalid("unexpected characters after ']'"));
                }
            }
        }

        Ok(Self { segments })
    }

    /// All segments in order.
    pub fn segments(&self) -> &[PatternSegment] {
        &self.segments
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Whether this pattern is the root pattern.
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Whether the pattern has no wildcards.
    pub fn is_literal(&self) -> bool {
        !self.segments.iter().any(PatternSegment::is_wildcard)
    }

    /// The concrete path for a literal pattern.
    pub fn to_field_path(&self) -> Option<FieldPath> {
        self.segments
            .iter()
            .map(PatternSegment::to_segment)
            .collect::<Option<Vec<_>>>()
            .map(FieldPath::from_segments)
    }

    /// Pattern extended by a literal relative path.
    pub fn join(&self, relative: &FieldPath) -> Self {
        let mut segments = self.segments.clone();
        segments.extend(relative.segments().iter().map(|segment| match segment {
            Segment::Key(k) => PatternSegment::Key(k.clone()),
            Segment::Index(i) => PatternSegment::Index(*i),
        }));
        Self { segments }
    }

    /// Whether the pattern matches `path` exactly.
    pub fn matches(&self, path: &FieldPath) -> bool {
        self.segments.len() == path.len() && self.prefix_matches(path)
    }

    /// Whether the first `path.len()` segments of this pattern match `path`.
    ///
    /// Returns false when the pattern is shorter than the path.
    pub fn prefix_matches(&self, path: &FieldPath) -> bool {
        self.segments.len() >= path.len()
            && self
                .segments
                .iter()
                .zip(path.segments())
                .all(|(pattern, segment)| pattern.matches(segment))
    }

    /// Whether the pattern reaches strictly below `path`.
    pub fn descends_from(&self, path: &FieldPath) -> bool {
        self.segments.len() > path.len() && self.prefix_matches(path)
    }

    /// Text of the path segments matched by wildcards, in order.
    pub fn captures(&self, path: &FieldPath) -> Vec<String> {
        self.segments
            .iter()
            .zip(path.segments())
            .filter(|(pattern, _)| pattern.is_wildcard())
            .map(|(_, segment)| match segment {
                Segment::Key(_) => segment.lookup_key().unwrap_or_default().to_string(),
                Segment::Index(i) => i.to_string(),
            })
            .collect()
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return write!(f, "$");
        }
        for (i, segment) in self.segments.iter().enumerate() {
            let dot = if i == 0 { "" } else { "." };
            match segment {
                PatternSegment::Key(k) => write!(f, "{}{}", dot, k)?,
                PatternSegment::AnyKey => write!(f, "{}*", dot)?,
                PatternSegment::AnyKeyExcept(excluded) => write!(f, "{}*!({})", dot, excluded.join("|"))?,
                PatternSegment::Index(idx) => write!(f, "[{}]", idx)?,
                PatternSegment::AnyIndex => write!(f, "[*]")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_path_display() {
        let path = FieldPath::root()
            .child_key("database")
            .child_key("replicas")
            .child_index(2)
            .child_key("port");
        assert_eq!(path.to_string(), "database.replicas[2].port");
        assert_eq!(FieldPath::root().to_string(), "<root>");
    }

    #[test]
    fn test_empty_key_is_never_an_empty_segment() {
        let path = FieldPath::root().child_key("");
        assert_eq!(path.segments()[0], Segment::Key("\"\"".to_string()));
        assert_eq!(path.segments()[0].lookup_key(), Some(""));
    }

    #[test]
    fn test_pattern_parse() {
        let pattern = PathPattern::parse("resource.*.*.depends_on[*]").unwrap();
        assert_eq!(
            pattern.segments(),
            &[
                PatternSegment::Key("resource".to_string()),
                PatternSegment::AnyKey,
                PatternSegment::AnyKey,
                PatternSegment::Key("depends_on".to_string()),
                PatternSegment::AnyIndex,
            ]
        );
        assert_eq!(pattern.to_string(), "resource.*.*.depends_on[*]");
    }

    #[test]
    fn test_key_exclusion() {
        let pattern = PathPattern::parse("labels.*!(team|name)").unwrap();
        assert_eq!(pattern.to_string(), "labels.*!(name|team)");
        assert!(!pattern.is_literal());
        assert!(pattern.matches(&FieldPath::parse("labels.owner").unwrap()));
        assert!(!pattern.matches(&FieldPath::parse("labels.team").unwrap()));
        assert!(!pattern.matches(&FieldPath::parse("labels[0]").unwrap()));

        assert!(PathPattern::parse("labels.*!(team").is_err());
        assert!(PathPattern::parse("labels.*!(team||name)").is_err());
    }

    #[test]
    fn test_pattern_parse_root_forms() {
        assert!(PathPattern::parse("").unwrap().is_root());
        assert!(PathPattern::parse("$").unwrap().is_root());
        assert_eq!(PathPattern::parse("$.a.b").unwrap().len(), 2);
        assert_eq!(PathPattern::parse("[0].name").unwrap().len(), 2);
    }

    #[test]
    fn test_pattern_parse_rejects_malformed() {
        assert!(PathPattern::parse("a..b").is_err());
        assert!(PathPattern::parse("a.").is_err());
        assert!(PathPattern::parse("a[1").is_err());
        assert!(PathPattern::parse("a[x]").is_err());
        assert!(PathPattern::parse("a[0]b").is_err());
        assert!(FieldPath::parse("a.*").is_err());
    }

    #[test]
    fn test_pattern_matching() {
        let pattern = PathPattern::parse("servers[*].host").unwrap();
        let hit = FieldPath::root().child_key("servers").child_index(3).child_key("host");
        let miss = FieldPath::root().child_key("servers").child_key("host");

        assert!(pattern.matches(&hit));
        assert!(!pattern.matches(&miss));
        assert!(pattern.descends_from(&FieldPath::root().child_key("servers")));
        assert!(!pattern.descends_from(&hit));
    }

    #[test]
    fn test_captures() {
        let pattern = PathPattern::parse("resource.*.*").unwrap();
        let path = FieldPath::root()
            .child_key("resource")
            .child_key("aws_instance")
            .child_key("web");
        assert_eq!(pattern.captures(&path), vec!["aws_instance", "web"]);
    }
}
