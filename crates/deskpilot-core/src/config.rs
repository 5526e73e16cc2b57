//! Runtime configuration for the copilot.
//!
//! `CopilotConfig` is deserialized from TOML. Every section is optional; a
//! missing section or field falls back to the defaults below, which match
//! the reference deployment except for the intent strategy.
//!
//! ```toml
//! [intent]
//! strategy = "most_matches"
//!
//! [costs]
//! base = 0.01
//! policy_qa = 0.03
//! ticket_action = 0.08
//! blocked_floor = 0.001
//!
//! [latency]
//! timeout_multiplier = 10
//! blocked_request_latency_ms = 100
//!
//! [latency.budgets_ms]
//! supervisor = 150
//! retrieval = 400
//! tooling = 300
//! guard = 100
//! reviewer = 200
//! ```

use std::{path::Path, time::Duration};

use serde::{Deserialize, Deserializer, Serialize};

use deskpilot_contracts::{
    agent::{AgentRole, RoleMap},
    error::{DeskpilotError, DeskpilotResult},
    plan::IntentType,
};

/// How a query that hits both vocabularies is resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentStrategy {
    /// Any policy term wins, regardless of action terms.
    #[default]
    PolicyFirst,
    /// The bucket with more distinct term hits wins; ties go to `policy_qa`.
    MostMatches,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntentConfig {
    pub strategy: IntentStrategy,
    /// Lowercase phrases matched as substrings of the lowercased query.
    pub policy_terms: Vec<String>,
    pub action_terms: Vec<String>,
}

impl Default for IntentConfig {
    fn default() -> Self {
        let terms = |list: &[&str]| list.iter().map(|t| t.to_string()).collect();
        Self {
            strategy: IntentStrategy::default(),
            policy_terms: terms(&[
                "policy", "what is", "how do i", "can i", "benefits", "travel", "expense",
            ]),
            action_terms: terms(&["reset", "access", "ticket", "install", "vpn", "password"]),
        }
    }
}

/// Estimated monetary cost per request, in currency units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostConfig {
    /// Cost of a plan with no intent-specific steps.
    pub base: f64,
    pub policy_qa: f64,
    pub ticket_action: f64,
    /// Charged for a request blocked at the input checkpoint.
    pub blocked_floor: f64,
}

impl Default for CostConfig {
    fn default() -> Self {
        Self {
            base: 0.01,
            policy_qa: 0.03,
            ticket_action: 0.08,
            blocked_floor: 0.001,
        }
    }
}

impl CostConfig {
    pub fn estimate(&self, intent: IntentType) -> f64 {
        match intent {
            IntentType::PolicyQa => self.policy_qa,
            IntentType::TicketAction => self.ticket_action,
            IntentType::Unknown => self.base,
        }
    }
}

/// Per-role latency SLOs and the derived hard timeouts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LatencyConfig {
    /// Expected latency for each role. Exceeding it is logged, not fatal.
    #[serde(deserialize_with = "budgets_over_defaults")]
    pub budgets_ms: RoleMap<u64>,
    /// A step is cut off after `budget × timeout_multiplier`.
    pub timeout_multiplier: u32,
    /// Latency reported for a request blocked at the input checkpoint.
    pub blocked_request_latency_ms: u64,
}

impl Default for LatencyConfig {
    fn default() -> Self {
        Self {
            budgets_ms: RoleMap {
                supervisor: 150,
                retrieval: 400,
                tooling: 300,
                guard: 100,
                reviewer: 200,
            },
            timeout_multiplier: 10,
            blocked_request_latency_ms: 100,
        }
    }
}

impl LatencyConfig {
    pub fn budget_ms(&self, role: AgentRole) -> u64 {
        *self.budgets_ms.get(role)
    }

    /// Hard limit for one call made on behalf of `role`.
    pub fn timeout_for(&self, role: AgentRole) -> Duration {
        Duration::from_millis(self.limit_ms(role))
    }

    pub fn limit_ms(&self, role: AgentRole) -> u64 {
        self.budget_ms(role)
            .saturating_mul(u64::from(self.timeout_multiplier))
    }
}

fn default_models() -> RoleMap<String> {
    RoleMap {
        supervisor: "gpt-4-turbo-2024".to_string(),
        retrieval: "text-embedding-3-large".to_string(),
        tooling: "gpt-4-turbo-2024".to_string(),
        guard: "llama-guard-2".to_string(),
        reviewer: "gpt-4-turbo-2024".to_string(),
    }
}

fn default_prompts() -> RoleMap<String> {
    RoleMap {
        supervisor: "v2.1".to_string(),
        retrieval: "v1.5".to_string(),
        tooling: "v2.0".to_string(),
        guard: "v3.2".to_string(),
        reviewer: "v1.8".to_string(),
    }
}

/// A per-role table in which any role may be left out.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct PartialRoleMap<T> {
    supervisor: Option<T>,
    retrieval: Option<T>,
    tooling: Option<T>,
    guard: Option<T>,
    reviewer: Option<T>,
}

impl<T> PartialRoleMap<T> {
    /// Overlay the roles that were given onto `base`.
    fn over(self, mut base: RoleMap<T>) -> RoleMap<T> {
        let given = [
            (AgentRole::Supervisor, self.supervisor),
            (AgentRole::Retrieval, self.retrieval),
            (AgentRole::Tooling, self.tooling),
            (AgentRole::Guard, self.guard),
            (AgentRole::Reviewer, self.reviewer),
        ];
        for (role, value) in given {
            if let Some(value) = value {
                *base.get_mut(role) = value;
            }
        }
        base
    }
}

fn budgets_over_defaults<'de, D: Deserializer<'de>>(d: D) -> Result<RoleMap<u64>, D::Error> {
    Ok(PartialRoleMap::deserialize(d)?.over(LatencyConfig::default().budgets_ms))
}

fn models_over_defaults<'de, D: Deserializer<'de>>(d: D) -> Result<RoleMap<String>, D::Error> {
    Ok(PartialRoleMap::deserialize(d)?.over(default_models()))
}

fn prompts_over_defaults<'de, D: Deserializer<'de>>(d: D) -> Result<RoleMap<String>, D::Error> {
    Ok(PartialRoleMap::deserialize(d)?.over(default_prompts()))
}

/// Top-level copilot configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CopilotConfig {
    #[serde(default)]
    pub intent: IntentConfig,
    #[serde(default)]
    pub costs: CostConfig,
    #[serde(default)]
    pub latency: LatencyConfig,
    /// Model version recorded per role in provenance.
    #[serde(default = "default_models", deserialize_with = "models_over_defaults")]
    pub models: RoleMap<String>,
    /// Prompt version recorded per role. The guard entry is replaced by the
    /// guard's rule-set version at runtime.
    #[serde(default = "default_prompts", deserialize_with = "prompts_over_defaults")]
    pub prompts: RoleMap<String>,
}

impl Default for CopilotConfig {
    fn default() -> Self {
        Self {
            intent: IntentConfig::default(),
            costs: CostConfig::default(),
            latency: LatencyConfig::default(),
            models: default_models(),
            prompts: default_prompts(),
        }
    }
}

impl CopilotConfig {
    /// Parse `s` as TOML and validate the result.
    ///
    /// Returns `DeskpilotError::ConfigError` if the TOML is malformed or a
    /// value is out of range.
    pub fn from_toml_str(s: &str) -> DeskpilotResult<Self> {
        let config: CopilotConfig = toml::from_str(s).map_err(|e| DeskpilotError::ConfigError {
            reason: format!("failed to parse copilot TOML: {}", e),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Read the file at `path` and parse it as copilot configuration.
    pub fn from_file(path: &Path) -> DeskpilotResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| DeskpilotError::ConfigError {
            reason: format!("failed to read copilot config '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> DeskpilotResult<()> {
        if self.latency.timeout_multiplier == 0 {
            return Err(DeskpilotError::ConfigError {
                reason: "latency.timeout_multiplier must be at least 1".to_string(),
            });
        }

        for (role, budget) in self.latency.budgets_ms.iter() {
            if *budget == 0 {
                return Err(DeskpilotError::ConfigError {
                    reason: format!("latency budget for '{}' must be positive", role),
                });
            }
        }

        let costs = [
            ("base", self.costs.base),
            ("policy_qa", self.costs.policy_qa),
            ("ticket_action", self.costs.ticket_action),
            ("blocked_floor", self.costs.blocked_floor),
        ];
        for (name, value) in costs {
            if !value.is_finite() || value < 0.0 {
                return Err(DeskpilotError::ConfigError {
                    reason: format!("costs.{} must be a non-negative number, got {}", name, value),
                });
            }
        }

        let empty_term = self
            .intent
            .policy_terms
            .iter()
            .chain(self.intent.action_terms.iter())
            .any(|t| t.trim().is_empty());
        if empty_term {
            return Err(DeskpilotError::ConfigError {
                reason: "intent terms must not be empty strings".to_string(),
            });
        }

        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
