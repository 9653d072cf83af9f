//! Validation engine implementation.

use crate::core::error::ValidationResult;
use crate::core::value::ConfigValue;
use crate::schema::RuleSet;
use crate::validation::stages::{CrossFieldRules, DependencyRules, FieldRules, ValidationStage};
use log::debug;
use std::time::Instant;

/// Multi-stage validation engine.
///
/// Runs a series of stages over a configuration value. Every stage runs; no
/// finding stops validation early. The engine holds no per-call state, so one
/// instance can serve any number of concurrent validations.
pub struct ValidationEngine {
    stages: Vec<Box<dyn ValidationStage>>,
}

impl ValidationEngine {
    /// Create an engine with the given stages.
    pub fn new(stages: Vec<Box<dyn ValidationStage>>) -> Self {
        Self { stages }
    }

    /// Create the default engine: field rules, then cross-field rules, then
    /// dependency rules.
    pub fn default_engine() -> Self {
        Self {
            stages: vec![
                Box::new(FieldRules),
                Box::new(CrossFieldRules),
                Box::new(DependencyRules),
            ],
        }
    }

    /// Add a custom validation stage. It runs after the existing ones.
    pub fn add_stage(&mut self, stage: Box<dyn ValidationStage>) {
        self.stages.push(stage);
    }

    /// Names of the stages in run order.
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    /// Validate a configuration value against a rule set.
    ///
    /// Deterministic: equal inputs give structurally equal results, with
    /// errors and warnings in traversal order.
    pub fn validate(&self, value: &ConfigValue, rules: &RuleSet) -> ValidationResult {
        let start = Instant::now();
        let mut result = ValidationResult::new();

        for stage in &self.stages {
            stage.validate(value, rules, &mut result);
        }

        debug!(
            "Validated against {} pattern(s): {} error(s), {} warning(s) in {:?}",
            rules.len(),
            result.errors.len(),
            result.warnings.len(),
            start.elapsed()
        );
        result
    }
}

impl Default for ValidationEngine {
    fn default() -> Self {
        Self::default_engine()
    }
}

/// Validate with the default engine.
pub fn validate(value: &ConfigValue, rules: &RuleSet) -> ValidationResult {
    ValidationEngine::default_engine().validate(value, rules)
}
