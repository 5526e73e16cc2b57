//! Guard rule types and configuration schema.
//!
//! A `GuardRules` document is deserialized from TOML and holds one section
//! per checkpoint. Each section is an ordered list of named regex detectors;
//! the input section adds a length bound and the output section adds a
//! vocabulary of sensitive field names.

use serde::{Deserialize, Serialize};

use deskpilot_contracts::guard::RiskLevel;

/// Which family of risk a detector belongs to. Used for logging only.
///
/// ```toml
/// family = "injection"
/// family = "pii"
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DetectorFamily {
    Injection,
    Pii,
    Sensitive,
    Custom,
}

impl DetectorFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectorFamily::Injection => "injection",
            DetectorFamily::Pii => "pii",
            DetectorFamily::Sensitive => "sensitive",
            DetectorFamily::Custom => "custom",
        }
    }
}

/// A single named pattern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Detector {
    /// Stable identifier used in logs and compile errors.
    pub id: String,

    pub family: DetectorFamily,

    /// Regular expression in `regex` crate syntax. Use an inline `(?i)` flag
    /// for case-insensitive matching.
    pub pattern: String,

    /// Level the screening escalates to when this pattern matches.
    pub risk: RiskLevel,

    /// Flag text recorded in the `GuardResult`. Several detectors may share one.
    pub flag: String,
}

fn default_input_max_passing() -> RiskLevel {
    RiskLevel::Medium
}

fn default_output_max_passing() -> RiskLevel {
    RiskLevel::Low
}

fn default_length_risk() -> RiskLevel {
    RiskLevel::Medium
}

fn default_length_flag() -> String {
    "Input exceeds length limits".to_string()
}

fn default_sensitive_risk() -> RiskLevel {
    RiskLevel::High
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputRules {
    #[serde(default = "default_input_max_passing")]
    pub max_passing_risk: RiskLevel,

    /// Inputs longer than this many characters are flagged. Unbounded if absent.
    #[serde(default)]
    pub max_chars: Option<usize>,

    #[serde(default = "default_length_risk")]
    pub length_risk: RiskLevel,

    #[serde(default = "default_length_flag")]
    pub length_flag: String,

    #[serde(default)]
    pub detectors: Vec<Detector>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputRules {
    #[serde(default = "default_output_max_passing")]
    pub max_passing_risk: RiskLevel,

    /// Field names whose `name: value` or `name=value` form must never be
    /// delivered. An underscore also matches a space, a hyphen, or nothing,
    /// so `api_key` covers "API key" and "apikey".
    #[serde(default)]
    pub sensitive_fields: Vec<String>,

    #[serde(default = "default_sensitive_risk")]
    pub sensitive_risk: RiskLevel,

    #[serde(default)]
    pub detectors: Vec<Detector>,
}

/// The top-level structure deserialized from a guard rules file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardRules {
    /// Reported as the guard's prompt version in provenance.
    pub version: String,
    pub input: InputRules,
    pub output: OutputRules,
}
