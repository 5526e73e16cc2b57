//! The copilot: the single entry point for a user query.
//!
//! ```text
//!   guard(input) → classify → plan → retrieve → synthesize → guard(output)
//!     → supervisor.execute → provenance sink → { Message, ProvenanceRecord }
//! ```
//!
//! `process_query` never fails. Blocks, empty retrievals, step failures, and
//! cancellation all come back as natural-language text plus a complete
//! provenance record; which rule fired or which step failed is kept in the
//! record only.

use std::{sync::Arc, time::Instant};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use deskpilot_contracts::{
    agent::{AgentRole, TaskFailure},
    guard::GuardResult,
    message::{Message, MessageMetadata},
    plan::IntentType,
    provenance::{ProvenanceRecord, RequestOutcome},
    retrieval::{Citation, RetrievalResult},
};

use crate::{
    supervisor::{elapsed_ms, RetrievalAttempt, StageEvidence, Supervisor},
    traits::ProvenanceSink,
};

pub const EMPTY_QUERY_RESPONSE: &str =
    "Please enter a question about company policies, IT support, or HR matters.";

pub const POLICY_FALLBACK_RESPONSE: &str = "I couldn't find specific policy information about that. Please contact HR or check the employee handbook for more details.";

pub const PASSWORD_RESET_RESPONSE: &str = "I can help you with a password reset. Here are your options:\n\n1. **Self-Service Portal**: Visit portal.company.com and use your registered mobile device for verification.\n2. **IT Service Desk**: I can create a ticket for manual reset (requires manager approval).";

pub const VPN_ACCESS_RESPONSE: &str = "For VPN or access issues:\n\n1. Verify you're using company-issued device or approved BYOD\n2. Ensure two-factor authentication is set up\n3. Check if you're on the latest VPN client version";

pub const GENERIC_TICKET_RESPONSE: &str = "I've searched our knowledge base for similar issues. To help the service desk with your ticket, please reply with:\n\n- Brief description of the issue\n- Any error messages\n- When did this start?";

pub const CLARIFICATION_RESPONSE: &str = "I'm not sure how to help with that. Could you rephrase your question about company policies, IT support, or HR matters?";

pub const OUTPUT_BLOCKED_RESPONSE: &str = "I generated a response but it contained sensitive information that I cannot share. Please contact IT support directly.";

pub const DEGRADED_RESPONSE: &str = "I'm sorry, something went wrong while handling your request. Please try again, or contact the IT service desk if the problem continues.";

pub const CANCELLED_RESPONSE: &str = "This request was cancelled before it finished.";

/// What the caller gets back for every query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CopilotResponse {
    pub response: Message,
    pub provenance: ProvenanceRecord,
}

/// Composes guard, supervisor, and retriever into the request lifecycle.
///
/// Construct one per deployment and share it; it holds no per-request state.
pub struct Copilot {
    supervisor: Supervisor,
    sink: Option<Arc<dyn ProvenanceSink>>,
}

impl Copilot {
    pub fn new(supervisor: Supervisor) -> Self {
        Self {
            supervisor,
            sink: None,
        }
    }

    /// Append every emitted record to `sink`.
    pub fn with_sink(mut self, sink: Arc<dyn ProvenanceSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn supervisor(&self) -> &Supervisor {
        &self.supervisor
    }

    pub async fn process_query(&self, query: &str) -> CopilotResponse {
        self.process_query_with_cancel(query, &CancellationToken::new())
            .await
    }

    /// Process `query`, stopping early if `cancel` fires.
    ///
    /// A cancelled request still returns a record; tasks that never finished
    /// are `aborted`.
    pub async fn process_query_with_cancel(
        &self,
        query: &str,
        cancel: &CancellationToken,
    ) -> CopilotResponse {
        let started = Instant::now();

        // ── Step 0: Reject malformed input ───────────────────────────────────
        if query.trim().is_empty() {
            debug!("empty query rejected before planning");
            let record = self.short_circuit_record(
                query,
                RequestOutcome::Rejected,
                Vec::new(),
                EMPTY_QUERY_RESPONSE,
                0.0,
                elapsed_ms(started),
            );
            return self.finish(Message::assistant(EMPTY_QUERY_RESPONSE), record);
        }

        // ── Step 1: Input checkpoint ─────────────────────────────────────────
        let input_screen = self.supervisor.guard().screen_input(query);
        if !input_screen.passed {
            warn!(
                risk_level = %input_screen.risk_level,
                flags = %input_screen.details,
                "input blocked by guard"
            );
            let text = format!(
                "I cannot process this request due to security concerns: {}",
                input_screen.details
            );
            let config = self.supervisor.config();
            let record = self.short_circuit_record(
                query,
                RequestOutcome::BlockedAtInput,
                vec![input_screen],
                &text,
                config.costs.blocked_floor,
                config.latency.blocked_request_latency_ms,
            );
            return self.finish(Message::assistant(text), record);
        }

        // ── Steps 2 & 3: Classify and plan ───────────────────────────────────
        let intent = self.supervisor.classify_intent(query);
        let plan = self.supervisor.create_plan(query, intent);

        // ── Step 4: Retrieve, unconditionally ────────────────────────────────
        let retrieval = self.retrieve(query, cancel).await;
        let citations = match &retrieval.outcome {
            Ok(result) => self.supervisor.retriever().generate_citations(result),
            Err(_) => Vec::new(),
        };

        // ── Steps 5 & 6: Synthesize and screen the answer ────────────────────
        let synthesized = match (&retrieval.outcome, intent) {
            (Ok(result), _) => Some(synthesize_response(query, intent, result)),
            // The clarification never depends on retrieval.
            (Err(_), IntentType::Unknown) => Some(CLARIFICATION_RESPONSE.to_string()),
            (Err(_), _) => None,
        };
        let (response_text, output_screen) = match synthesized {
            // Ticket responses gain the filed ticket id during execution, so
            // the plan's output step screens them live.
            Some(text) if intent == IntentType::TicketAction => (text, None),
            Some(text) => {
                let screen = self.supervisor.guard().screen_output(&text);
                if screen.passed {
                    (text, Some(screen))
                } else {
                    warn!(
                        risk_level = %screen.risk_level,
                        flags = %screen.details,
                        "output blocked by guard, response withheld"
                    );
                    (OUTPUT_BLOCKED_RESPONSE.to_string(), Some(screen))
                }
            }
            None => (DEGRADED_RESPONSE.to_string(), None),
        };

        // ── Step 7: Execute the plan for provenance ──────────────────────────
        let evidence = StageEvidence {
            input_screen: Some(input_screen),
            retrieval: Some(retrieval),
            response_text: Some(response_text),
            output_screen,
        };
        let mut record = self
            .supervisor
            .execute_with(plan, query, evidence, cancel)
            .await;

        let delivered = match record.outcome {
            RequestOutcome::Cancelled => CANCELLED_RESPONSE.to_string(),
            RequestOutcome::Degraded => DEGRADED_RESPONSE.to_string(),
            RequestOutcome::BlockedAtOutput => OUTPUT_BLOCKED_RESPONSE.to_string(),
            _ => std::mem::take(&mut record.final_response),
        };
        record.final_response = delivered.clone();
        record.citations = citations.clone();
        record.total_latency_ms = elapsed_ms(started);

        // ── Step 8: Build the user-facing message ────────────────────────────
        let mut message = Message::assistant(delivered).with_metadata(MessageMetadata {
            intent,
            cost: record.total_cost,
            latency_ms: record.total_latency_ms,
        });
        if record.outcome == RequestOutcome::Answered {
            message = message.with_citations(citations);
        }

        self.finish(message, record)
    }

    /// Retrieval under the retrieval role's time limit and the caller's token.
    async fn retrieve(&self, query: &str, cancel: &CancellationToken) -> RetrievalAttempt {
        let latency = &self.supervisor.config().latency;
        let limit_ms = latency.limit_ms(AgentRole::Retrieval);
        let started = Instant::now();

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(TaskFailure::Cancelled),
            result = tokio::time::timeout(
                latency.timeout_for(AgentRole::Retrieval),
                self.supervisor.retriever().retrieve(query),
            ) => match result {
                Ok(Ok(found)) => Ok(found),
                Ok(Err(err)) => Err(TaskFailure::from(&err)),
                Err(_) => Err(TaskFailure::Timeout { limit_ms }),
            },
        };

        if let Err(failure) = &outcome {
            warn!(failure = %failure, "retrieval did not complete");
        }

        RetrievalAttempt {
            outcome,
            latency_ms: elapsed_ms(started),
        }
    }

    /// A record for a request that never reached planning.
    fn short_circuit_record(
        &self,
        query: &str,
        outcome: RequestOutcome,
        guard_results: Vec<GuardResult>,
        final_response: &str,
        total_cost: f64,
        total_latency_ms: u64,
    ) -> ProvenanceRecord {
        ProvenanceRecord {
            request_id: ProvenanceRecord::new_request_id(),
            timestamp: Utc::now(),
            user_query: query.to_string(),
            intent: IntentType::Unknown,
            outcome,
            agent_tasks: Vec::new(),
            tool_executions: Vec::new(),
            guard_results,
            final_response: final_response.to_string(),
            citations: Vec::new(),
            model_versions: self.supervisor.model_versions(),
            prompt_versions: self.supervisor.prompt_versions(),
            total_cost,
            total_latency_ms,
        }
    }

    fn finish(&self, response: Message, provenance: ProvenanceRecord) -> CopilotResponse {
        if let Some(sink) = &self.sink {
            if let Err(err) = sink.append(&provenance) {
                error!(
                    request_id = %provenance.request_id,
                    error = %err,
                    "failed to append provenance record"
                );
            }
        }

        info!(
            request_id = %provenance.request_id,
            intent = %provenance.intent,
            outcome = provenance.outcome.as_str(),
            tasks = provenance.agent_tasks.len(),
            total_latency_ms = provenance.total_latency_ms,
            "request processed"
        );

        CopilotResponse {
            response,
            provenance,
        }
    }
}

/// Answer text for `intent`, built from the retrieval result.
pub fn synthesize_response(query: &str, intent: IntentType, retrieval: &RetrievalResult) -> String {
    match intent {
        IntentType::PolicyQa => match retrieval.top() {
            Some(top) => format!(
                "Based on our company policies:\n\n{}\n\nThis information is from: {}",
                top.content, top.source
            ),
            None => POLICY_FALLBACK_RESPONSE.to_string(),
        },
        IntentType::TicketAction => {
            let q = query.to_lowercase();
            if q.contains("password") && q.contains("reset") {
                PASSWORD_RESET_RESPONSE.to_string()
            } else if q.contains("vpn") || q.contains("access") {
                VPN_ACCESS_RESPONSE.to_string()
            } else {
                GENERIC_TICKET_RESPONSE.to_string()
            }
        }
        IntentType::Unknown => CLARIFICATION_RESPONSE.to_string(),
    }
}

/// Citations for display, or none when the answer was withheld.
pub fn visible_citations(response: &CopilotResponse) -> &[Citation] {
    response.response.citations.as_deref().unwrap_or(&[])
}

// ── Tests ────────────────────────────────────────────────────────────────────
