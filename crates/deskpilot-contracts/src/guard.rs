//! Guard verdict types.
//!
//! A guard screens free text at two checkpoints, before processing (input)
//! and before delivery (output), and produces a `GuardResult`. The two
//! checkpoints share the `RiskLevel` scale but apply different pass bars.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Ordered severity scale: `Low < Medium < High < Critical`.
///
/// The derived `Ord` follows declaration order, so `max` is the escalation
/// operator.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    #[default]
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// Escalate from `self` by a newly detected level. Never lowers risk.
    pub fn escalate(self, detected: RiskLevel) -> RiskLevel {
        self.max(detected)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which checkpoint produced a `GuardResult`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScreeningStage {
    Input,
    Output,
}

impl ScreeningStage {
    /// Highest risk level that still passes at this checkpoint by default.
    ///
    /// Input tolerates `Medium`; output only passes `Low`.
    pub fn default_max_passing_risk(&self) -> RiskLevel {
        match self {
            ScreeningStage::Input => RiskLevel::Medium,
            ScreeningStage::Output => RiskLevel::Low,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScreeningStage::Input => "input",
            ScreeningStage::Output => "output",
        }
    }

    fn all_clear_details(&self) -> &'static str {
        match self {
            ScreeningStage::Input => "Input passed all checks",
            ScreeningStage::Output => "Output passed all checks",
        }
    }
}

impl fmt::Display for ScreeningStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one screening pass.
///
/// `blocked_reasons` is `Some` (and non-empty) exactly when `passed` is
/// false. Build values through [`GuardResult::from_findings`] to keep that
/// invariant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuardResult {
    /// Checkpoint that produced this result.
    pub stage: ScreeningStage,
    pub passed: bool,
    pub risk_level: RiskLevel,
    /// One entry per distinct finding, in detection order.
    pub flags: Vec<String>,
    /// Human-readable summary: the flags joined by `"; "`, or an all-clear line.
    pub details: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocked_reasons: Option<Vec<String>>,
    /// Version of the rule set that evaluated the text.
    pub ruleset_version: String,
}

impl GuardResult {
    /// Assemble a result from the accumulated risk and flags.
    ///
    /// `passed` is `risk_level <= max_passing`. Duplicate flags are collapsed
    /// while preserving first-seen order.
    pub fn from_findings(
        stage: ScreeningStage,
        risk_level: RiskLevel,
        flags: Vec<String>,
        max_passing: RiskLevel,
        ruleset_version: impl Into<String>,
    ) -> Self {
        let mut distinct: Vec<String> = Vec::with_capacity(flags.len());
        for flag in flags {
            if !distinct.contains(&flag) {
                distinct.push(flag);
            }
        }

        let passed = risk_level <= max_passing;
        let details = if distinct.is_empty() {
            stage.all_clear_details().to_string()
        } else {
            distinct.join("; ")
        };

        let blocked_reasons = if passed {
            None
        } else if distinct.is_empty() {
            Some(vec![format!("{} risk at {} checkpoint", risk_level, stage)])
        } else {
            Some(distinct.clone())
        };

        Self {
            stage,
            passed,
            risk_level,
            flags: distinct,
            details,
            blocked_reasons,
            ruleset_version: ruleset_version.into(),
        }
    }

    /// A passing, flag-free result.
    pub fn all_clear(stage: ScreeningStage, ruleset_version: impl Into<String>) -> Self {
        Self::from_findings(
            stage,
            RiskLevel::Low,
            Vec::new(),
            stage.default_max_passing_risk(),
            ruleset_version,
        )
    }
}
