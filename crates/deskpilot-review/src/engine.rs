//! Schema-based reviewer for the `reviewer` task.
//!
//! `SchemaReviewer` implements the `Reviewer` trait from `deskpilot-core`.
//! A review runs in two phases:
//!
//! 1. **Structural**: the payload is validated against
//!    `ReviewSchema::json_schema` using the `jsonschema` crate.
//! 2. **Semantic**: each `ReviewRule` in `ReviewSchema::rules` is evaluated
//!    in order. All failures are collected before returning.
//!
//! Custom rules delegate to named functions registered via `register_rule`.

use std::collections::HashMap;

use serde_json::Value;
use tracing::{debug, warn};

use deskpilot_contracts::{
    error::{DeskpilotError, DeskpilotResult},
    review::{ReviewFailure, ReviewReport, ReviewRuleType, ReviewSchema},
};
use deskpilot_core::traits::Reviewer;

use crate::rules::{self, SCORES_NON_INCREASING};

/// A caller-supplied review function.
///
/// Receives the whole payload. Returns `Some(message)` when the check fails,
/// `None` when it passes.
pub type CustomRuleFn = Box<dyn Fn(&Value) -> Option<String> + Send + Sync>;

pub struct SchemaReviewer {
    custom_rules: HashMap<String, CustomRuleFn>,
}

impl SchemaReviewer {
    /// A reviewer with no custom rules registered.
    pub fn new() -> Self {
        Self {
            custom_rules: HashMap::new(),
        }
    }

    /// A reviewer with the built-in retrieval rules registered.
    pub fn with_builtin_rules() -> Self {
        let mut reviewer = Self::new();
        reviewer.register_rule(SCORES_NON_INCREASING, Box::new(rules::scores_non_increasing));
        reviewer
    }

    /// Register `f` under `name`, replacing any previous function of that name.
    pub fn register_rule(&mut self, name: impl Into<String>, f: CustomRuleFn) {
        self.custom_rules.insert(name.into(), f);
    }

    pub fn has_rule(&self, name: &str) -> bool {
        self.custom_rules.contains_key(name)
    }

    // ── Internal helpers ──────────────────────────────────────────────────────

    /// Resolve a dotted path against `value`. Missing segments and JSON
    /// `null` both resolve to `None`.
    fn resolve_path<'v>(value: &'v Value, path: &str) -> Option<&'v Value> {
        let mut current = value;
        for segment in path.split('.') {
            match current.get(segment) {
                Some(v) if !v.is_null() => current = v,
                _ => return None,
            }
        }
        Some(current)
    }

    fn check_rule(&self, payload: &Value, rule_type: &ReviewRuleType) -> Option<String> {
        match rule_type {
            ReviewRuleType::MaxItems { field_path, max } => {
                match Self::resolve_path(payload, field_path) {
                    None => None,
                    Some(Value::Array(items)) if items.len() > *max => Some(format!(
                        "field '{field_path}' holds {} items, more than the maximum of {max}",
                        items.len()
                    )),
                    Some(Value::Array(_)) => None,
                    Some(_) => Some(format!("field '{field_path}' is not an array")),
                }
            }

            // An unregistered name is itself a failure.
            ReviewRuleType::Custom { function_name } => {
                match self.custom_rules.get(function_name.as_str()) {
                    Some(f) => f(payload),
                    None => Some(format!(
                        "no custom rule registered for function name '{function_name}'"
                    )),
                }
            }
        }
    }
}

impl Default for SchemaReviewer {
    fn default() -> Self {
        Self::with_builtin_rules()
    }
}

impl Reviewer for SchemaReviewer {
    fn review(&self, output: &Value, schema: &ReviewSchema) -> DeskpilotResult<ReviewReport> {
        let mut failures: Vec<ReviewFailure> = Vec::new();

        // ── Phase 1: JSON Schema structural validation ────────────────────────
        if !schema.json_schema.is_null() {
            let validator = jsonschema::validator_for(&schema.json_schema).map_err(|e| {
                DeskpilotError::SchemaValidation {
                    reason: format!("invalid JSON Schema in '{}': {e}", schema.schema_id),
                }
            })?;

            for error in validator.iter_errors(output) {
                let message = format!("JSON Schema violation at {}: {}", error.instance_path, error);
                warn!(schema_id = %schema.schema_id, %message, "structural review failure");
                failures.push(ReviewFailure {
                    rule_id: "json-schema".to_string(),
                    message,
                });
            }
        }

        // ── Phase 2: Semantic rule evaluation ────────────────────────────────
        for rule in &schema.rules {
            debug!(rule_id = %rule.rule_id, "evaluating review rule");

            if let Some(message) = self.check_rule(output, &rule.rule_type) {
                warn!(rule_id = %rule.rule_id, %message, "review rule failed");
                failures.push(ReviewFailure {
                    rule_id: rule.rule_id.clone(),
                    message,
                });
            }
        }

        let passed = failures.is_empty();
        debug!(
            schema_id = %schema.schema_id,
            passed,
            failure_count = failures.len(),
            "review complete"
        );

        Ok(ReviewReport { passed, failures })
    }
}
