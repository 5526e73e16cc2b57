//! Regex guard implementation.
//!
//! `RuleGuard` compiles a `GuardRules` document once and implements the
//! `Guard` trait from deskpilot-core.
//!
//! Screening algorithm, per checkpoint:
//!
//! 1. Start at `low`.
//! 2. For every detector, in declaration order, that matches the text:
//!    record its flag and escalate the risk to `max(current, detector.risk)`.
//! 3. Input only: if the text is longer than `max_chars`, record the length
//!    flag and escalate to `length_risk`.
//! 4. Pass iff the final risk is at or below the checkpoint's
//!    `max_passing_risk`.

use std::path::Path;

use regex::Regex;
use tracing::debug;

use deskpilot_contracts::{
    error::{DeskpilotError, DeskpilotResult},
    guard::{GuardResult, RiskLevel, ScreeningStage},
};
use deskpilot_core::traits::Guard;

use crate::rule::{Detector, DetectorFamily, GuardRules};

/// The rule file shipped with the crate.
pub const DEFAULT_RULES: &str = include_str!("../rules/default.toml");

#[derive(Debug)]
struct CompiledDetector {
    id: String,
    family: DetectorFamily,
    regex: Regex,
    risk: RiskLevel,
    flag: String,
}

#[derive(Debug)]
struct LengthBound {
    max_chars: usize,
    risk: RiskLevel,
    flag: String,
}

#[derive(Debug)]
struct CompiledStage {
    stage: ScreeningStage,
    max_passing: RiskLevel,
    detectors: Vec<CompiledDetector>,
    length: Option<LengthBound>,
}

impl CompiledStage {
    fn screen(&self, text: &str, version: &str) -> GuardResult {
        let mut risk = RiskLevel::Low;
        let mut flags = Vec::new();

        for detector in &self.detectors {
            if detector.regex.is_match(text) {
                debug!(
                    stage = %self.stage,
                    rule_id = %detector.id,
                    family = detector.family.as_str(),
                    risk = %detector.risk,
                    "guard detector matched"
                );
                flags.push(detector.flag.clone());
                risk = risk.escalate(detector.risk);
            }
        }

        if let Some(bound) = &self.length {
            let chars = text.chars().count();
            if chars > bound.max_chars {
                debug!(
                    stage = %self.stage,
                    chars,
                    max_chars = bound.max_chars,
                    "guard length bound exceeded"
                );
                flags.push(bound.flag.clone());
                risk = risk.escalate(bound.risk);
            }
        }

        GuardResult::from_findings(self.stage, risk, flags, self.max_passing, version)
    }
}

/// A `Guard` backed by a compiled, versioned rule set.
///
/// ```rust,ignore
/// use deskpilot_guard::RuleGuard;
///
/// let guard = RuleGuard::from_file(Path::new("rules/servicedesk.toml"))?;
/// ```
#[derive(Debug)]
pub struct RuleGuard {
    version: String,
    input: CompiledStage,
    output: CompiledStage,
}

impl RuleGuard {
    /// Compile `rules`.
    ///
    /// Returns `DeskpilotError::RuleCompilation` naming the first detector
    /// whose pattern does not compile, or `ConfigError` for an empty version.
    pub fn from_rules(rules: GuardRules) -> DeskpilotResult<Self> {
        if rules.version.trim().is_empty() {
            return Err(DeskpilotError::ConfigError {
                reason: "guard rules must declare a non-empty version".to_string(),
            });
        }

        let input = CompiledStage {
            stage: ScreeningStage::Input,
            max_passing: rules.input.max_passing_risk,
            detectors: compile_all(&rules.input.detectors)?,
            length: rules.input.max_chars.map(|max_chars| LengthBound {
                max_chars,
                risk: rules.input.length_risk,
                flag: rules.input.length_flag.clone(),
            }),
        };

        let mut output_detectors = compile_all(&rules.output.detectors)?;
        for field in &rules.output.sensitive_fields {
            output_detectors.push(compile(&sensitive_field_detector(field, rules.output.sensitive_risk))?);
        }
        let output = CompiledStage {
            stage: ScreeningStage::Output,
            max_passing: rules.output.max_passing_risk,
            detectors: output_detectors,
            length: None,
        };

        debug!(
            version = %rules.version,
            input_detectors = input.detectors.len(),
            output_detectors = output.detectors.len(),
            "guard rules compiled"
        );

        Ok(Self {
            version: rules.version,
            input,
            output,
        })
    }

    /// Parse `s` as TOML guard rules and compile them.
    ///
    /// Returns `DeskpilotError::ConfigError` if the TOML is malformed or does
    /// not match the `GuardRules` schema.
    pub fn from_toml_str(s: &str) -> DeskpilotResult<Self> {
        let rules: GuardRules = toml::from_str(s).map_err(|e| DeskpilotError::ConfigError {
            reason: format!("failed to parse guard rules TOML: {}", e),
        })?;
        Self::from_rules(rules)
    }

    /// Read the file at `path` and compile it as guard rules.
    pub fn from_file(path: &Path) -> DeskpilotResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| DeskpilotError::ConfigError {
            reason: format!("failed to read guard rules '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }

    /// Compile the rule file shipped with the crate.
    pub fn with_default_rules() -> DeskpilotResult<Self> {
        Self::from_toml_str(DEFAULT_RULES)
    }
}

impl Guard for RuleGuard {
    fn screen_input(&self, text: &str) -> GuardResult {
        self.input.screen(text, &self.version)
    }

    fn screen_output(&self, text: &str) -> GuardResult {
        self.output.screen(text, &self.version)
    }

    fn ruleset_version(&self) -> &str {
        &self.version
    }
}

fn compile(detector: &Detector) -> DeskpilotResult<CompiledDetector> {
    let regex = Regex::new(&detector.pattern).map_err(|e| DeskpilotError::RuleCompilation {
        rule_id: detector.id.clone(),
        reason: e.to_string(),
    })?;
    Ok(CompiledDetector {
        id: detector.id.clone(),
        family: detector.family,
        regex,
        risk: detector.risk,
        flag: detector.flag.clone(),
    })
}

fn compile_all(detectors: &[Detector]) -> DeskpilotResult<Vec<CompiledDetector>> {
    detectors.iter().map(compile).collect()
}

/// Build the `name[:=]value` detector for one sensitive field name.
fn sensitive_field_detector(field: &str, risk: RiskLevel) -> Detector {
    let name = regex::escape(field).replace('_', "[_ -]?");
    Detector {
        id: format!("sensitive-{}", field),
        family: DetectorFamily::Sensitive,
        pattern: format!(r"(?i){}\s*[:=]\s*\S+", name),
        risk,
        flag: format!("Potential {} exposure in output", field),
    }
}
