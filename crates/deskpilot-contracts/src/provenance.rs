//! The provenance record: one immutable audit artifact per request.
//!
//! Every call into the orchestrator produces exactly one `ProvenanceRecord`,
//! including rejected, blocked, degraded, and cancelled requests.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    agent::{AgentStatus, AgentTask, RoleMap},
    guard::GuardResult,
    plan::IntentType,
    retrieval::Citation,
};

/// A recorded call to the ticketing collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolExecution {
    pub id: String,
    pub tool_name: String,
    pub parameters: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    pub approved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub pre_conditions_met: bool,
    pub post_conditions_verified: bool,
}

/// How the request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestOutcome {
    /// All steps completed and the answer was delivered.
    Answered,
    /// Malformed input; nothing was planned.
    Rejected,
    BlockedAtInput,
    BlockedAtOutput,
    /// A step failed; the user got an apology.
    Degraded,
    Cancelled,
}

impl RequestOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestOutcome::Answered => "answered",
            RequestOutcome::Rejected => "rejected",
            RequestOutcome::BlockedAtInput => "blocked_at_input",
            RequestOutcome::BlockedAtOutput => "blocked_at_output",
            RequestOutcome::Degraded => "degraded",
            RequestOutcome::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvenanceRecord {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
    pub user_query: String,
    pub intent: IntentType,
    pub outcome: RequestOutcome,
    /// Plan steps in plan order, each in a terminal state.
    pub agent_tasks: Vec<AgentTask>,
    pub tool_executions: Vec<ToolExecution>,
    /// Guard verdicts in the order they were encountered (input before output).
    pub guard_results: Vec<GuardResult>,
    pub final_response: String,
    pub citations: Vec<Citation>,
    pub model_versions: RoleMap<String>,
    pub prompt_versions: RoleMap<String>,
    pub total_cost: f64,
    pub total_latency_ms: u64,
}

impl ProvenanceRecord {
    pub fn new_request_id() -> String {
        format!("req-{}", uuid::Uuid::new_v4())
    }

    pub fn failed_tasks(&self) -> impl Iterator<Item = &AgentTask> {
        self.agent_tasks
            .iter()
            .filter(|t| t.status == AgentStatus::Failed)
    }

    pub fn has_failures(&self) -> bool {
        self.failed_tasks().next().is_some()
    }
}
