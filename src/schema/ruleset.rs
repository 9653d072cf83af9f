//! Rule sets.
//!
//! A [`RuleSet`] maps path patterns to field rules and carries the
//! cross-field rules, dependency specs, open subtrees, defaults and policy
//! flags that together describe one kind of configuration. It is immutable once
//! built and is shared read-only across concurrent validations.

use crate::core::error::RuleSetError;
use crate::core::path::{FieldPath, PathPattern, Segment};
use crate::core::rule::Rule;
use crate::core::value::{ConfigValue, Mapping};
use crate::schema::cross::{CompiledCrossField, CrossFieldRule};
use indexmap::IndexMap;

/// Rules attached to one path pattern.
#[derive(Debug, Clone)]
pub struct FieldDeclaration {
    /// Where the rules apply
    pub pattern: PathPattern,
    /// Rules in declaration order
    pub rules: Vec<Rule>,
}

impl FieldDeclaration {
    /// Whether any rule is a presence rule.
    pub fn is_required(&self) -> bool {
        self.rules.iter().any(Rule::is_required)
    }

    /// Whether a missing ancestor also makes this path missing.
    pub fn requires_ancestors(&self) -> bool {
        self.rules.iter().any(Rule::requires_ancestors)
    }
}

/// Declares which subtrees are dependency-graph nodes and where their edges
/// live.
///
/// A node's id is `id_prefix` followed by the wildcard captures of `nodes`
/// joined with `.`; for `resource.*.*` with an empty prefix the node at
/// `resource.aws_vpc.main` is `aws_vpc.main`.
#[derive(Debug, Clone)]
pub struct DependencySpec {
    /// Pattern selecting node subtrees
    pub nodes: PathPattern,
    /// Prefix prepended to node ids
    pub id_prefix: String,
    /// Key inside each node holding a string or a sequence of strings
    pub edges_key: String,
}

impl DependencySpec {
    /// Node id for a subtree matched by `nodes`.
    pub fn node_id(&self, path: &FieldPath) -> String {
        format!("{}{}", self.id_prefix, self.nodes.captures(path).join("."))
    }
}

/// Immutable collection of validation rules keyed by path pattern.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    fields: IndexMap<String, FieldDeclaration>,
    cross_fields: Vec<CompiledCrossField>,
    dependencies: Vec<DependencySpec>,
    open: Vec<PathPattern>,
    known: Vec<PathPattern>,
    defaults: Vec<(FieldPath, ConfigValue)>,
    strict: bool,
    reject_empty: bool,
}

impl RuleSet {
    /// Start building a rule set.
    pub fn builder() -> RuleSetBuilder {
        RuleSetBuilder::new()
    }

    /// Whether unknown fields are errors rather than warnings.
    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Whether a null or empty top-level document is an error.
    pub fn rejects_empty(&self) -> bool {
        self.reject_empty
    }

    /// All field declarations in declaration order.
    pub fn declarations(&self) -> impl Iterator<Item = &FieldDeclaration> {
        self.fields.values()
    }

    /// Number of distinct patterns.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether no field rules are declared.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Rules of every declaration matching `path`, in declaration order.
    pub fn rules_at<'a>(&'a self, path: &'a FieldPath) -> impl Iterator<Item = &'a Rule> + Clone + 'a {
        self.fields
            .values()
            .filter(move |decl| decl.pattern.matches(path))
            .flat_map(|decl| decl.rules.iter())
    }

    /// Required declarations reaching strictly below `path` whose remaining
    /// segments are all literal, i.e. those that can be found missing from
    /// the node at `path`. Declarations that are only required in their
    /// parent are returned for direct children alone.
    pub fn required_below<'a>(
        &'a self,
        path: &'a FieldPath,
    ) -> impl Iterator<Item = &'a FieldDeclaration> + 'a {
        self.fields.values().filter(move |decl| {
            let depth = decl.pattern.segments().len();
            decl.is_required()
                && decl.pattern.descends_from(path)
                && (depth == path.len() + 1 || decl.requires_ancestors())
                && decl.pattern.segments()[path.len()..]
                    .iter()
                    .all(|segment| !segment.is_wildcard())
        })
    }

    /// Whether anything in this rule set refers to `path` or below it.
    pub fn is_known(&self, path: &FieldPath) -> bool {
        self.known.iter().any(|pattern| pattern.prefix_matches(path))
    }

    /// Whether the mapping at `path` accepts arbitrary extra keys.
    pub fn is_open(&self, path: &FieldPath) -> bool {
        self.open.iter().any(|pattern| pattern.matches(path))
    }

    /// Cross-field rules in declaration order.
    pub(crate) fn cross_fields(&self) -> &[CompiledCrossField] {
        &self.cross_fields
    }

    /// Dependency specs in declaration order.
    pub fn dependencies(&self) -> &[DependencySpec] {
        &self.dependencies
    }

    /// Declared default values.
    pub fn defaults(&self) -> &[(FieldPath, ConfigValue)] {
        &self.defaults
    }

    /// Return a copy of `value` with absent defaulted keys filled in.
    ///
    /// Missing intermediate mappings are created; a default is skipped when a
    /// step on the way is present but not a mapping.
    pub fn apply_defaults(&self, value: &ConfigValue) -> ConfigValue {
        let mut out = value.clone();
        for (path, default) in &self.defaults {
            insert_default(&mut out, path.segments(), default);
        }
        out
    }
}

fn insert_default(node: &mut ConfigValue, path: &[Segment], default: &ConfigValue) {
    let Some((head, rest)) = path.split_first() else {
        return;
    };
    let (ConfigValue::Mapping(map), Some(key)) = (node, head.lookup_key()) else {
        return;
    };

    if rest.is_empty() {
        if !map.contains_key(key) {
            map.insert(key.to_string(), default.clone());
        }
        return;
    }
    let child = map
        .entry(key.to_string())
        .or_insert_with(|| ConfigValue::Mapping(Mapping::new()));
    insert_default(child, rest, default);
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`RuleSet`]. Paths are parsed and checked in [`build`](Self::build).
#[derive(Debug, Default)]
pub struct RuleSetBuilder {
    fields: Vec<(String, Vec<Rule>)>,
    cross_fields: Vec<CrossFieldRule>,
    dependencies: Vec<(String, String, String)>,
    open: Vec<String>,
    defaults: Vec<(String, ConfigValue)>,
    strict: bool,
    reject_empty: bool,
}

impl RuleSetBuilder {
    /// Create a new empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach rules to a pattern. Repeated patterns accumulate rules.
    pub fn field(mut self, pattern: &str, rules: impl IntoIterator<Item = Rule>) -> Self {
        self.fields.push((pattern.to_string(), rules.into_iter().collect()));
        self
    }

    /// Attach a single rule to a pattern.
    pub fn rule(self, pattern: &str, rule: Rule) -> Self {
        self.field(pattern, [rule])
    }

    /// Add a cross-field rule.
    pub fn cross_field(mut self, rule: CrossFieldRule) -> Self {
        self.cross_fields.push(rule);
        self
    }

    /// Declare dependency-graph nodes and their edge key.
    pub fn dependency(mut self, nodes: &str, id_prefix: &str, edges_key: &str) -> Self {
        self.dependencies
            .push((nodes.to_string(), id_prefix.to_string(), edges_key.to_string()));
        self
    }

    /// Mark mappings at `pattern` as accepting arbitrary keys.
    pub fn open(mut self, pattern: &str) -> Self {
        self.open.push(pattern.to_string());
        self
    }

    /// Declare a default for a literal path.
    pub fn default_value(mut self, path: &str, value: impl Into<ConfigValue>) -> Self {
        self.defaults.push((path.to_string(), value.into()));
        self
    }

    /// Report unknown fields as errors.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Reject a null or empty top-level document.
    pub fn reject_empty(mut self, reject: bool) -> Self {
        self.reject_empty = reject;
        self
    }

    /// Parse every path and produce the rule set.
    pub fn build(self) -> Result<RuleSet, RuleSetError> {
        let mut fields: IndexMap<String, FieldDeclaration> = IndexMap::new();
        for (text, rules) in self.fields {
            let pattern = PathPattern::parse(&text)?;
            for rule in &rules {
                if let Rule::Range {
                    min: Some(min),
                    max: Some(max),
                } = rule
                {
                    if min > max {
                        return Err(RuleSetError::InvalidRange {
                            path: text.clone(),
                            min: *min,
                            max: *max,
                        });
                    }
                }
            }
            fields
                .entry(pattern.to_string())
                .or_insert_with(|| FieldDeclaration {
                    pattern,
                    rules: Vec::new(),
                })
                .rules
                .extend(rules);
        }

        let cross_fields = self
            .cross_fields
            .iter()
            .map(CrossFieldRule::compile)
            .collect::<Result<Vec<_>, _>>()?;

        let mut dependencies = Vec::with_capacity(self.dependencies.len());
        for (nodes, id_prefix, edges_key) in self.dependencies {
            if edges_key.is_empty() {
                return Err(RuleSetError::InvalidPath {
                    path: nodes,
                    reason: "dependency edge key must not be empty".to_string(),
                });
            }
            dependencies.push(DependencySpec {
                nodes: PathPattern::parse(&nodes)?,
                id_prefix,
                edges_key,
            });
        }

        let open = self
            .open
            .iter()
            .map(|text| PathPattern::parse(text))
            .collect::<Result<Vec<_>, _>>()?;

        let mut defaults = Vec::with_capacity(self.defaults.len());
        for (text, value) in self.defaults {
            let pattern = PathPattern::parse(&text)?;
            let path = pattern
                .to_field_path()
                .ok_or_else(|| RuleSetError::NonLiteralDefault { path: text.clone() })?;
            defaults.push((path, value));
        }

        let mut known: Vec<PathPattern> = fields.values().map(|d| d.pattern.clone()).collect();
        known.extend(cross_fields.iter().flat_map(CompiledCrossField::referenced_patterns));
        for spec in &dependencies {
            known.push(spec.nodes.join(&FieldPath::root().child_key(spec.edges_key.clone())));
        }
        known.extend(open.iter().cloned());
        known.extend(defaults.iter().map(|(path, _)| PathPattern::root().join(path)));

        Ok(RuleSet {
            fields,
            cross_fields,
            dependencies,
            open,
            known,
            defaults,
            strict: self.strict,
            reject_empty: self.reject_empty,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::value::ValueKind;
    use serde_json::json;

    fn path(text: &str) -> FieldPath {
        FieldPath::parse(text).unwrap()
    }

    #[test]
    fn test_duplicate_patterns_merge() {
        let rules = RuleSet::builder()
            .rule("database.port", Rule::required())
            .rule("$.database.port", Rule::of_type(ValueKind::Integer))
            .build()
            .unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules.rules_at(&path("database.port")).count(), 2);
    }

    #[test]
    fn test_rules_at_wildcards() {
        let rules = RuleSet::builder()
            .rule("servers[*].port", Rule::range(1.0, 65535.0))
            .rule("servers[0].port", Rule::required())
            .build()
            .unwrap();
        assert_eq!(rules.rules_at(&path("servers[0].port")).count(), 2);
        assert_eq!(rules.rules_at(&path("servers[3].port")).count(), 1);
        assert_eq!(rules.rules_at(&path("servers")).count(), 0);
    }

    #[test]
    fn test_required_below_needs_literal_tail() {
        let rules = RuleSet::builder()
            .rule("resource.*.*.ami", Rule::required())
            .rule("database.host", Rule::required())
            .build()
            .unwrap();
        let root = FieldPath::root();
        let names: Vec<String> = rules
            .required_below(&root)
            .map(|d| d.pattern.to_string())
            .collect();
        assert_eq!(names, vec!["database.host"]);

        let instance = path("resource.aws_instance.web");
        assert_eq!(rules.required_below(&instance).count(), 1);
    }

    #[test]
    fn test_required_in_parent_stops_at_the_parent() {
        let rules = RuleSet::builder()
            .rule("tls.cert", Rule::required_in_parent())
            .rule("tls.key", Rule::required())
            .build()
            .unwrap();
        let names: Vec<String> = rules
            .required_below(&FieldPath::root())
            .map(|d| d.pattern.to_string())
            .collect();
        assert_eq!(names, vec!["tls.key"]);
        assert_eq!(rules.required_below(&path("tls")).count(), 2);
    }

    #[test]
    fn test_known_and_open() {
        let rules = RuleSet::builder()
            .rule("database.port", Rule::required())
            .open("labels")
            .dependency("jobs.*", "", "needs")
            .build()
            .unwrap();
        assert!(rules.is_known(&path("database")));
        assert!(rules.is_known(&path("jobs.build.needs")));
        assert!(!rules.is_known(&path("database.user")));
        assert!(rules.is_open(&path("labels")));
    }

    #[test]
    fn test_invalid_range_is_rejected() {
        let result = RuleSet::builder()
            .rule("port", Rule::range(10.0, 1.0))
            .build();
        assert!(matches!(result, Err(RuleSetError::InvalidRange { .. })));
    }

    #[test]
    fn test_defaults() {
        let rules = RuleSet::builder()
            .default_value("server.port", 8080)
            .default_value("server.host", "localhost")
            .default_value("log.level", "info")
            .build()
            .unwrap();
        let value = ConfigValue::from(json!({"server": {"port": 9000}, "name": 1}));
        let filled = rules.apply_defaults(&value);
        assert_eq!(
            filled,
            ConfigValue::from(json!({
                "server": {"port": 9000, "host": "localhost"},
                "name": 1,
                "log": {"level": "info"}
            }))
        );
        // The input is untouched.
        assert!(value.get("log").is_none());
    }

    #[test]
    fn test_wildcard_default_is_rejected() {
        let result = RuleSet::builder().default_value("jobs.*.timeout", 10).build();
        assert!(matches!(result, Err(RuleSetError::NonLiteralDefault { .. })));
    }

    #[test]
    fn test_dependency_node_id() {
        let spec = DependencySpec {
            nodes: PathPattern::parse("module.*").unwrap(),
            id_prefix: "module.".to_string(),
            edges_key: "depends_on".to_string(),
        };
        assert_eq!(spec.node_id(&path("module.vpc")), "module.vpc");
    }
}
