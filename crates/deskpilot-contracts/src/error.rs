//! Runtime error types for the DeskPilot pipeline.
//!
//! Collaborators and configuration loaders return `DeskpilotResult<T>`.
//! The orchestrator never lets one of these escape to its caller: a failing
//! collaborator is converted into a `TaskFailure` on the affected task and the
//! request degrades instead of aborting.

use thiserror::Error;

/// The unified error type for the DeskPilot runtime.
#[derive(Debug, Error)]
pub enum DeskpilotError {
    /// The query was empty or whitespace only. Rejected before any plan is built.
    #[error("query is empty")]
    EmptyQuery,

    /// The search backend could not serve the query.
    #[error("retrieval backend unavailable: {reason}")]
    RetrievalUnavailable { reason: String },

    /// A bounded call exceeded its time limit.
    #[error("{role} step timed out after {limit_ms} ms")]
    StepTimeout { role: String, limit_ms: u64 },

    /// The ticketing collaborator rejected or failed an action request.
    #[error("ticketing action failed: {reason}")]
    TicketingFailed { reason: String },

    /// An `AgentTask` was asked to move between two states the lifecycle forbids.
    #[error("illegal transition for task '{task_id}': {from} -> {to}")]
    IllegalTransition {
        task_id: String,
        from: String,
        to: String,
    },

    /// A required configuration value is missing or invalid.
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },

    /// A guard detector pattern failed to compile.
    #[error("guard rule '{rule_id}' failed to compile: {reason}")]
    RuleCompilation { rule_id: String, reason: String },

    /// A review schema could not be applied.
    #[error("schema validation error: {reason}")]
    SchemaValidation { reason: String },

    /// The provenance ledger could not persist a record.
    #[error("provenance ledger write failed: {reason}")]
    LedgerWriteFailed { reason: String },
}

/// Convenience alias used throughout the DeskPilot crates.
pub type DeskpilotResult<T> = Result<T, DeskpilotError>;
