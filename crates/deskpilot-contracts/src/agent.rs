//! Agent roles, task lifecycle, and per-task execution metadata.
//!
//! Every step of a plan is an `AgentTask`. A task moves through a small state
//! machine and never reverts:
//!
//! ```text
//! idle ──► processing ──► completed
//!   │          │    └───► failed
//!   └──────────┴────────► aborted
//! ```
//!
//! `aborted` marks tasks that never finished because the request was
//! cancelled or an earlier step failed.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    error::{DeskpilotError, DeskpilotResult},
    guard::ScreeningStage,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    Supervisor,
    Retrieval,
    Tooling,
    Guard,
    Reviewer,
}

impl AgentRole {
    pub const ALL: [AgentRole; 5] = [
        AgentRole::Supervisor,
        AgentRole::Retrieval,
        AgentRole::Tooling,
        AgentRole::Guard,
        AgentRole::Reviewer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentRole::Supervisor => "supervisor",
            AgentRole::Retrieval => "retrieval",
            AgentRole::Tooling => "tooling",
            AgentRole::Guard => "guard",
            AgentRole::Reviewer => "reviewer",
        }
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One value per agent role.
///
/// Used for model/prompt version tables and latency budgets. Serializes as an
/// object keyed by role name.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RoleMap<T> {
    pub supervisor: T,
    pub retrieval: T,
    pub tooling: T,
    pub guard: T,
    pub reviewer: T,
}

impl<T> RoleMap<T> {
    pub fn get(&self, role: AgentRole) -> &T {
        match role {
            AgentRole::Supervisor => &self.supervisor,
            AgentRole::Retrieval => &self.retrieval,
            AgentRole::Tooling => &self.tooling,
            AgentRole::Guard => &self.guard,
            AgentRole::Reviewer => &self.reviewer,
        }
    }

    pub fn get_mut(&mut self, role: AgentRole) -> &mut T {
        match role {
            AgentRole::Supervisor => &mut self.supervisor,
            AgentRole::Retrieval => &mut self.retrieval,
            AgentRole::Tooling => &mut self.tooling,
            AgentRole::Guard => &mut self.guard,
            AgentRole::Reviewer => &mut self.reviewer,
        }
    }

    /// Iterate `(role, value)` pairs in `AgentRole::ALL` order.
    pub fn iter(&self) -> impl Iterator<Item = (AgentRole, &T)> {
        AgentRole::ALL.into_iter().map(move |role| (role, self.get(role)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Idle,
    Processing,
    Completed,
    Failed,
    Aborted,
}

impl AgentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AgentStatus::Completed | AgentStatus::Failed | AgentStatus::Aborted
        )
    }

    /// Return true if the lifecycle permits moving from `self` to `next`.
    pub fn can_transition_to(&self, next: AgentStatus) -> bool {
        matches!(
            (self, next),
            (AgentStatus::Idle, AgentStatus::Processing)
                | (AgentStatus::Processing, AgentStatus::Completed)
                | (AgentStatus::Processing, AgentStatus::Failed)
                | (AgentStatus::Idle, AgentStatus::Aborted)
                | (AgentStatus::Processing, AgentStatus::Aborted)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentStatus::Idle => "idle",
            AgentStatus::Processing => "processing",
            AgentStatus::Completed => "completed",
            AgentStatus::Failed => "failed",
            AgentStatus::Aborted => "aborted",
        }
    }
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a task did not complete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskFailure {
    /// The step exceeded its time limit.
    Timeout { limit_ms: u64 },
    /// A backing service errored.
    Backend { reason: String },
    /// The step ran but refused its input (e.g. a failed review).
    Rejected { reason: String },
    /// The caller cancelled the request.
    Cancelled,
    /// An earlier step failed or blocked, so this one never ran.
    Halted { reason: String },
}

impl fmt::Display for TaskFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskFailure::Timeout { limit_ms } => write!(f, "timed out after {} ms", limit_ms),
            TaskFailure::Backend { reason } => write!(f, "backend error: {}", reason),
            TaskFailure::Rejected { reason } => write!(f, "rejected: {}", reason),
            TaskFailure::Cancelled => f.write_str("cancelled by caller"),
            TaskFailure::Halted { reason } => write!(f, "halted: {}", reason),
        }
    }
}

impl From<&DeskpilotError> for TaskFailure {
    fn from(err: &DeskpilotError) -> Self {
        match err {
            DeskpilotError::StepTimeout { limit_ms, .. } => TaskFailure::Timeout {
                limit_ms: *limit_ms,
            },
            DeskpilotError::SchemaValidation { reason } => TaskFailure::Rejected {
                reason: reason.clone(),
            },
            other => TaskFailure::Backend {
                reason: other.to_string(),
            },
        }
    }
}

/// Execution metadata recorded once a task reaches a terminal state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskMetadata {
    pub model_version: String,
    pub prompt_version: String,
    pub tokens_used: u64,
    pub latency_ms: u64,
    /// The role's expected-latency budget (SLO).
    pub latency_budget_ms: u64,
    pub over_budget: bool,
}

/// One step of an execution plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentTask {
    pub id: String,
    pub agent_role: AgentRole,
    pub description: String,
    pub status: AgentStatus,
    pub input: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<TaskFailure>,
    /// Set on guard tasks: which checkpoint this task screens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkpoint: Option<ScreeningStage>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<TaskMetadata>,
}

impl AgentTask {
    /// Create an `idle` task with a fresh, role-prefixed identifier.
    pub fn new(
        agent_role: AgentRole,
        description: impl Into<String>,
        input: serde_json::Value,
    ) -> Self {
        Self {
            id: format!("task-{}-{}", agent_role, uuid::Uuid::new_v4()),
            agent_role,
            description: description.into(),
            status: AgentStatus::Idle,
            input,
            output: None,
            error: None,
            checkpoint: None,
            created_at: Utc::now(),
            started_at: None,
            ended_at: None,
            metadata: None,
        }
    }

    /// Create an `idle` guard task for the given checkpoint.
    pub fn guard(stage: ScreeningStage, description: impl Into<String>, input: serde_json::Value) -> Self {
        Self {
            checkpoint: Some(stage),
            ..Self::new(AgentRole::Guard, description, input)
        }
    }

    fn transition(&mut self, next: AgentStatus) -> DeskpilotResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(DeskpilotError::IllegalTransition {
                task_id: self.id.clone(),
                from: self.status.to_string(),
                to: next.to_string(),
            });
        }
        self.status = next;
        Ok(())
    }

    /// `idle -> processing`.
    pub fn start(&mut self) -> DeskpilotResult<()> {
        self.transition(AgentStatus::Processing)?;
        self.started_at = Some(Utc::now());
        Ok(())
    }

    /// `processing -> completed`.
    pub fn complete(&mut self, output: serde_json::Value, metadata: TaskMetadata) -> DeskpilotResult<()> {
        self.transition(AgentStatus::Completed)?;
        self.output = Some(output);
        self.metadata = Some(metadata);
        self.ended_at = Some(Utc::now());
        Ok(())
    }

    /// `processing -> failed`.
    pub fn fail(&mut self, failure: TaskFailure, metadata: TaskMetadata) -> DeskpilotResult<()> {
        self.transition(AgentStatus::Failed)?;
        self.error = Some(failure);
        self.metadata = Some(metadata);
        self.ended_at = Some(Utc::now());
        Ok(())
    }

    /// `idle | processing -> aborted`.
    pub fn abort(&mut self, failure: TaskFailure) -> DeskpilotResult<()> {
        self.transition(AgentStatus::Aborted)?;
        self.error = Some(failure);
        self.ended_at = Some(Utc::now());
        Ok(())
    }
}
