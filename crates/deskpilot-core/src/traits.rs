//! Collaborator trait definitions for the DeskPilot pipeline.
//!
//! These traits are the seams between the orchestration core and everything
//! it talks to:
//!
//! - `Guard`:            screens text at the input and output checkpoints
//! - `Retriever`:        scoped search over the allowlisted knowledge base
//! - `Reviewer`:         validates the retrieval step's output
//! - `TicketingBackend`: files service-desk tickets for the tooling step
//! - `ProvenanceSink`:   persists every provenance record the copilot emits
//!
//! The copilot receives each collaborator as an `Arc<dyn Trait>` at
//! construction time. `Retriever` and `TicketingBackend` stand in for network
//! services and are async; the other three are local and synchronous.

use async_trait::async_trait;
use serde_json::Value;

use deskpilot_contracts::{
    error::DeskpilotResult,
    guard::GuardResult,
    provenance::ProvenanceRecord,
    retrieval::{self, Citation, RetrievalResult},
    review::{ReviewReport, ReviewSchema},
    ticket::{TicketReceipt, TicketRequest},
};

/// Rule-based risk screener.
///
/// Implementations must be pure: the same text always produces the same
/// result and no state carries over between calls. Absence of any finding
/// is the all-clear result, never an error.
pub trait Guard: Send + Sync {
    /// Screen a user query before any processing happens.
    fn screen_input(&self, text: &str) -> GuardResult;

    /// Screen generated text before it is delivered to the user.
    ///
    /// The pass bar here is stricter than for input.
    fn screen_output(&self, text: &str) -> GuardResult;

    /// Version of the rule set in force. Recorded as the guard's prompt version.
    fn ruleset_version(&self) -> &str;
}

/// Scoped search over an allowlisted knowledge collection.
///
/// There is deliberately no parameter through which a caller can name a
/// source or URL: the set of searchable documents is fixed when the
/// implementation is constructed.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Return ranked passages for `query`.
    ///
    /// Zero matches is `Ok` with an empty result. `Err` is reserved for the
    /// backend itself being unavailable.
    async fn retrieve(&self, query: &str) -> DeskpilotResult<RetrievalResult>;

    /// Derive the user-facing citations for a result.
    fn generate_citations(&self, result: &RetrievalResult) -> Vec<Citation> {
        retrieval::generate_citations(result)
    }
}

/// Checks a step's structured output against a `ReviewSchema`.
pub trait Reviewer: Send + Sync {
    /// Return a report with `passed = false` and populated failures when any
    /// check fails. `Err` means the schema itself could not be applied.
    fn review(&self, output: &Value, schema: &ReviewSchema) -> DeskpilotResult<ReviewReport>;
}

/// The service-desk ticketing system.
#[async_trait]
pub trait TicketingBackend: Send + Sync {
    /// Name recorded as `ToolExecution::tool_name`.
    fn tool_name(&self) -> &str {
        "servicedesk.create_ticket"
    }

    /// File an action request and return the backend's receipt.
    async fn submit(&self, request: &TicketRequest) -> DeskpilotResult<TicketReceipt>;
}

/// Destination for completed provenance records.
///
/// Implementations must treat this as append-only.
pub trait ProvenanceSink: Send + Sync {
    fn append(&self, record: &ProvenanceRecord) -> DeskpilotResult<()>;
}
