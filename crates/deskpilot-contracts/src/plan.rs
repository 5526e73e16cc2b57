//! Intent and execution plan types.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::agent::{AgentRole, AgentStatus, AgentTask};

/// The classified purpose of a user query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentType {
    PolicyQa,
    TicketAction,
    Unknown,
}

impl IntentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntentType::PolicyQa => "policy_qa",
            IntentType::TicketAction => "ticket_action",
            IntentType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for IntentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An ordered sequence of tasks for one request.
///
/// The sequence is fixed once built; execution mutates each task in place to
/// record progress but never reorders, inserts, or removes steps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentPlan {
    pub steps: Vec<AgentTask>,
    pub intent: IntentType,
    pub requires_approval: bool,
    pub estimated_cost: f64,
}

impl AgentPlan {
    /// The role of each step, in order.
    pub fn roles(&self) -> Vec<AgentRole> {
        self.steps.iter().map(|t| t.agent_role).collect()
    }

    /// True while any step is `processing`.
    pub fn in_flight(&self) -> bool {
        self.steps.iter().any(|t| t.status == AgentStatus::Processing)
    }

    /// True once every step has reached a terminal state.
    pub fn is_done(&self) -> bool {
        self.steps.iter().all(|t| t.status.is_terminal())
    }
}
