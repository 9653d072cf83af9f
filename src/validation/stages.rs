//! Individual validation stages.
//!
//! Each stage checks one category of rules and appends its findings to the
//! shared result. Stages run in a fixed order, so cross-field findings always
//! follow the field findings they may depend on.

use crate::core::error::{ErrorKind, ValidationError, ValidationResult};
use crate::core::path::{FieldPath, Segment};
use crate::core::rule::evaluate_all;
use crate::core::value::ConfigValue;
use crate::graph::DependencyGraph;
use crate::schema::RuleSet;
use std::collections::HashSet;

/// Trait for validation stages.
pub trait ValidationStage: Send + Sync {
    /// Name of this validation stage.
    fn name(&self) -> &str;

    /// Validate `value` against `rules`, appending errors and warnings.
    fn validate(&self, value: &ConfigValue, rules: &RuleSet, result: &mut ValidationResult);
}

/// Field rules - per-path checks during a depth-first, pre-order walk.
///
/// Verifies:
/// - Every rule attached to a visited path (no short-circuit within a field)
/// - Required paths below each visited node
/// - Unknown mapping keys (warnings, or errors in strict mode)
/// - The empty-configuration policy at the root
pub struct FieldRules;

impl ValidationStage for FieldRules {
    fn name(&self) -> &str {
        "Field Rules"
    }

    fn validate(&self, value: &ConfigValue, rules: &RuleSet, result: &mut ValidationResult) {
        if rules.rejects_empty() {
            let root = FieldPath::root();
            match value {
                ConfigValue::Null => result.add_error(ValidationError::new(
                    root,
                    ErrorKind::EmptyConfiguration,
                    "configuration is null",
                )),
                other if other.length() == Some(0) && !matches!(other, ConfigValue::String(_)) => {
                    result.add_error(ValidationError::new(
                        root,
                        ErrorKind::EmptyConfiguration,
                        "configuration is empty",
                    ))
                }
                _ => {}
            }
        }

        visit(value, &FieldPath::root(), rules, result);
    }
}

fn visit(value: &ConfigValue, path: &FieldPath, rules: &RuleSet, result: &mut ValidationResult) {
    evaluate_all(rules.rules_at(path), value, path, &mut result.errors);
    check_required(value, path, rules, result);

    match value {
        ConfigValue::Mapping(map) => {
            let open = rules.is_open(path);
            for (key, child) in map {
                let child_path = path.child_key(key.clone());
                if rules.is_known(&child_path) {
                    visit(child, &child_path, rules, result);
                } else if !open {
                    let finding = ValidationError::new(
                        child_path,
                        ErrorKind::UnknownField,
                        format!("unknown field '{}'", key),
                    );
                    if rules.is_strict() {
                        result.add_error(finding);
                    } else {
                        result.add_warning(finding);
                    }
                }
            }
        }
        ConfigValue::Sequence(items) => {
            for (i, child) in items.iter().enumerate() {
                let child_path = path.child_index(i);
                if rules.is_known(&child_path) {
                    visit(child, &child_path, rules, result);
                }
            }
        }
        _ => {}
    }
}

/// Report required declarations whose next step below `path` is absent.
///
/// An explicit null child counts as present; [`Rule::RequiredNonNull`]
/// reports it when the child itself is visited.
///
/// [`Rule::RequiredNonNull`]: crate::core::rule::Rule::RequiredNonNull
fn check_required(value: &ConfigValue, path: &FieldPath, rules: &RuleSet, result: &mut ValidationResult) {
    let mut reported: HashSet<FieldPath> = HashSet::new();

    for decl in rules.required_below(path) {
        let tail = &decl.pattern.segments()[path.len()..];
        let Some(next) = tail.first().and_then(|segment| segment.to_segment()) else {
            continue;
        };
        if value.child(&next).is_some() {
            continue;
        }

        let missing = tail
            .iter()
            .filter_map(|segment| segment.to_segment())
            .fold(path.clone(), |acc, segment| acc.child(segment));
        if !reported.insert(missing.clone()) {
            continue;
        }

        let message = if tail.len() > 1 {
            format!("missing required field (parent '{}' is absent)", path.child(next))
        } else {
            "missing required field".to_string()
        };
        result.add_error(ValidationError::new(
            missing,
            ErrorKind::MissingRequiredField,
            message,
        ));
    }
}

/// Cross-field rules - run once per matching scope, after all field rules.
pub struct CrossFieldRules;

impl ValidationStage for CrossFieldRules {
    fn name(&self) -> &str {
        "Cross-Field Rules"
    }

    fn validate(&self, value: &ConfigValue, rules: &RuleSet, result: &mut ValidationResult) {
        for rule in rules.cross_fields() {
            for (path, scope) in value.select(&rule.scope) {
                rule.evaluate(scope, &path, &mut result.errors);
            }
        }
    }
}

/// Dependency rules - builds the declared dependency graph and reports cycles.
///
/// Verifies:
/// - The graph formed by edge keys (`depends_on`, `needs`) is acyclic
/// - Every edge target is a declared node (warning otherwise)
pub struct DependencyRules;

struct GraphNode<'a> {
    idx: usize,
    path: FieldPath,
    edges_key: &'a str,
    value: &'a ConfigValue,
}

impl ValidationStage for DependencyRules {
    fn name(&self) -> &str {
        "Dependency Rules"
    }

    fn validate(&self, value: &ConfigValue, rules: &RuleSet, result: &mut ValidationResult) {
        if rules.dependencies().is_empty() {
            return;
        }

        let mut graph = DependencyGraph::new();
        let mut nodes: Vec<GraphNode<'_>> = Vec::new();
        for spec in rules.dependencies() {
            for (path, node) in value.select(&spec.nodes) {
                if node.as_mapping().is_none() {
                    continue;
                }
                let idx = graph.add_node(spec.node_id(&path));
                nodes.push(GraphNode {
                    idx,
                    path,
                    edges_key: &spec.edges_key,
                    value: node,
                });
            }
        }

        for node in &nodes {
            let edges_path = node.path.child_key(node.edges_key);
            let targets: Vec<(FieldPath, &str)> = match node.value.get(node.edges_key) {
                Some(ConfigValue::String(target)) => vec![(edges_path.clone(), target.as_str())],
                Some(ConfigValue::Sequence(items)) => items
                    .iter()
                    .enumerate()
                    .filter_map(|(i, item)| item.as_str().map(|t| (edges_path.child_index(i), t)))
                    .collect(),
                _ => Vec::new(),
            };

            for (at, target) in targets {
                match graph.lookup(target) {
                    Some(to) => graph.add_edge(node.idx, to),
                    None => result.add_warning(ValidationError::new(
                        at,
                        ErrorKind::UnresolvedReference,
                        format!("dependency '{}' does not refer to a declared item", target),
                    )),
                }
            }
        }

        let node_at = |idx: usize| nodes.iter().find(|n| n.idx == idx);
        for cycle in graph.find_cycles() {
            let members: Vec<String> = cycle
                .iter()
                .filter_map(|&i| graph.node_id(i).map(str::to_string))
                .collect();
            let at = cycle
                .first()
                .and_then(|&i| node_at(i))
                .map(|n| n.path.child(Segment::key(n.edges_key)))
                .unwrap_or_default();
            result.add_error(
                ValidationError::new(
                    at,
                    ErrorKind::CircularDependency,
                    format!("circular dependency: {}", graph.describe_cycle(&cycle)),
                )
                .with_related(members),
            );
        }
    }
}
