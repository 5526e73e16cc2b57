//! Review schema and report types.
//!
//! The `reviewer` task checks the retrieval step's output before anything
//! downstream relies on it. A review combines a JSON Schema document with
//! semantic rules JSON Schema cannot express.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// What the reviewer checks a payload against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewSchema {
    /// e.g. "retrieval-review-v1".
    pub schema_id: String,
    /// Structural constraints. `Value::Null` disables the structural phase.
    pub json_schema: Value,
    pub rules: Vec<ReviewRule>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewRule {
    pub rule_id: String,
    pub description: String,
    pub rule_type: ReviewRuleType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ReviewRuleType {
    /// The array at `field_path` must hold at most `max` items. A missing
    /// field passes; the JSON Schema phase owns presence.
    MaxItems {
        /// Dotted path, e.g. "metadata.related".
        field_path: String,
        max: usize,
    },

    /// Delegate to a function registered with the reviewer under this name.
    Custom { function_name: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewReport {
    /// True only if every check passed.
    pub passed: bool,
    pub failures: Vec<ReviewFailure>,
}

impl ReviewReport {
    /// All failures as one `"[rule] message; ..."` line.
    pub fn summary(&self) -> String {
        self.failures
            .iter()
            .map(|f| format!("[{}] {}", f.rule_id, f.message))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewFailure {
    pub rule_id: String,
    pub message: String,
}
