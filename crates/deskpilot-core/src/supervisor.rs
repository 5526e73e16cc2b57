//! The supervisor: intent classification, planning, and plan execution.
//!
//! ```text
//!   classify → plan → [guard:in] → intent steps → [guard:out] → provenance
//! ```
//!
//! Steps run strictly in plan order. Each live step is bounded by
//! `budget × timeout_multiplier` for its role and races the caller's
//! cancellation token. A step that fails never escapes as an error: the task
//! is marked `failed`, every later task is `aborted`, and a partial
//! `ProvenanceRecord` is still returned.
//!
//! Work the orchestrator has already done (screening, retrieval) can be handed
//! in as `StageEvidence`; the matching steps then record that work instead of
//! repeating it.

use std::{sync::Arc, time::Instant};

use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use deskpilot_contracts::{
    agent::{AgentRole, AgentStatus, AgentTask, RoleMap, TaskFailure, TaskMetadata},
    error::DeskpilotResult,
    guard::{GuardResult, ScreeningStage},
    plan::{AgentPlan, IntentType},
    provenance::{ProvenanceRecord, RequestOutcome, ToolExecution},
    retrieval::RetrievalResult,
    review::ReviewSchema,
    ticket::{TicketCategory, TicketPriority, TicketReceipt, TicketRequest, TicketStatus},
};

use crate::{
    config::{CopilotConfig, IntentStrategy},
    traits::{Guard, Retriever, Reviewer, TicketingBackend},
};

/// Longest ticket title derived from a query, in chars.
const TICKET_TITLE_MAX_CHARS: usize = 80;

/// The services the supervisor drives plan steps through.
#[derive(Clone)]
pub struct Collaborators {
    pub guard: Arc<dyn Guard>,
    pub retriever: Arc<dyn Retriever>,
    pub reviewer: Arc<dyn Reviewer>,
    pub ticketing: Arc<dyn TicketingBackend>,
}

/// A retrieval call that already happened, with its measured latency.
#[derive(Debug, Clone)]
pub struct RetrievalAttempt {
    pub outcome: Result<RetrievalResult, TaskFailure>,
    pub latency_ms: u64,
}

/// Results computed before `execute_with` was called.
///
/// Each populated field is consumed by the first plan step of the matching
/// kind, which records it rather than calling the collaborator again.
#[derive(Debug, Clone, Default)]
pub struct StageEvidence {
    pub input_screen: Option<GuardResult>,
    pub retrieval: Option<RetrievalAttempt>,
    /// The text that will be delivered. Screened by a live output guard step
    /// and copied into `final_response`, followed by a note naming any ticket
    /// the plan filed.
    pub response_text: Option<String>,
    pub output_screen: Option<GuardResult>,
}

/// Mutable state threaded through one plan execution.
struct RunState<'a> {
    query: &'a str,
    requires_approval: bool,
    evidence: StageEvidence,
    retrieval: Option<RetrievalResult>,
    guard_results: Vec<GuardResult>,
    tool_executions: Vec<ToolExecution>,
    ticket_note: Option<String>,
}

impl RunState<'_> {
    fn blocked_at(&self, stage: ScreeningStage) -> bool {
        self.guard_results
            .iter()
            .any(|g| g.stage == stage && !g.passed)
    }

    fn passed_at(&self, stage: ScreeningStage) -> bool {
        self.guard_results.iter().any(|g| g.stage == stage && g.passed)
    }

    /// The supplied response text with the ticket note appended.
    fn response_text(&self) -> Option<String> {
        let text = self.evidence.response_text.as_ref()?;
        Some(match &self.ticket_note {
            Some(note) => format!("{}\n\n{}", text, note),
            None => text.clone(),
        })
    }

    /// What the output checkpoint screens when no screen was supplied.
    fn delivered_text(&self) -> String {
        if let Some(text) = self.response_text() {
            return text;
        }
        self.retrieval
            .as_ref()
            .map(|r| {
                r.passages
                    .iter()
                    .map(|p| p.content.as_str())
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .unwrap_or_default()
    }

    fn record_screen(&mut self, screen: GuardResult) -> Result<Value, TaskFailure> {
        let value = to_json(&screen)?;
        self.guard_results.push(screen);
        Ok(value)
    }

    /// Close out a ticketing call that was cut off before it returned.
    fn interrupt_pending_executions(&mut self, failure: &TaskFailure) {
        for exec in self.tool_executions.iter_mut().filter(|e| e.result.is_none()) {
            exec.result = Some(json!({ "error": failure.to_string() }));
        }
    }
}

/// Classifies, plans, and executes requests.
///
/// Holds no per-request state; one instance serves any number of concurrent
/// requests.
pub struct Supervisor {
    config: CopilotConfig,
    collaborators: Collaborators,
    review_schema: ReviewSchema,
}

impl Supervisor {
    pub fn new(
        config: CopilotConfig,
        collaborators: Collaborators,
        review_schema: ReviewSchema,
    ) -> Self {
        Self {
            config,
            collaborators,
            review_schema,
        }
    }

    pub fn config(&self) -> &CopilotConfig {
        &self.config
    }

    pub fn guard(&self) -> &dyn Guard {
        self.collaborators.guard.as_ref()
    }

    pub fn retriever(&self) -> &dyn Retriever {
        self.collaborators.retriever.as_ref()
    }

    pub fn model_versions(&self) -> RoleMap<String> {
        self.config.models.clone()
    }

    /// Configured prompt versions, with the guard entry taken from the live
    /// rule set.
    pub fn prompt_versions(&self) -> RoleMap<String> {
        let mut versions = self.config.prompts.clone();
        versions.guard = self.collaborators.guard.ruleset_version().to_string();
        versions
    }

    // ── Intent classification ────────────────────────────────────────────────

    /// Rule-based classification into `policy_qa`, `ticket_action`, or `unknown`.
    pub fn classify_intent(&self, query: &str) -> IntentType {
        let q = query.to_lowercase();
        let hits = |terms: &[String]| {
            terms
                .iter()
                .filter(|t| q.contains(t.to_lowercase().as_str()))
                .count()
        };
        let policy_hits = hits(&self.config.intent.policy_terms);
        let action_hits = hits(&self.config.intent.action_terms);

        let intent = match self.config.intent.strategy {
            IntentStrategy::PolicyFirst => {
                if policy_hits > 0 {
                    IntentType::PolicyQa
                } else if action_hits > 0 {
                    IntentType::TicketAction
                } else {
                    IntentType::Unknown
                }
            }
            IntentStrategy::MostMatches => {
                if policy_hits == 0 && action_hits == 0 {
                    IntentType::Unknown
                } else if action_hits > policy_hits {
                    IntentType::TicketAction
                } else {
                    IntentType::PolicyQa
                }
            }
        };

        debug!(
            intent = %intent,
            policy_hits,
            action_hits,
            "classified intent"
        );
        intent
    }

    // ── Planning ─────────────────────────────────────────────────────────────

    /// Build the fixed step sequence for `intent`, bracketed by guard checkpoints.
    pub fn create_plan(&self, query: &str, intent: IntentType) -> AgentPlan {
        let query_input = json!({ "query": query });
        let mut steps = vec![AgentTask::guard(
            ScreeningStage::Input,
            "Screen input for security risks",
            query_input.clone(),
        )];

        let requires_approval = match intent {
            IntentType::PolicyQa => {
                steps.push(AgentTask::new(
                    AgentRole::Retrieval,
                    "Retrieve relevant policy documents",
                    query_input.clone(),
                ));
                steps.push(AgentTask::new(
                    AgentRole::Reviewer,
                    "Validate answer against sources",
                    json!({ "query": query, "schema_id": self.review_schema.schema_id }),
                ));
                false
            }
            IntentType::TicketAction => {
                steps.push(AgentTask::new(
                    AgentRole::Retrieval,
                    "Search knowledge base for solutions",
                    query_input.clone(),
                ));
                steps.push(AgentTask::new(
                    AgentRole::Tooling,
                    "Execute ticket actions",
                    query_input,
                ));
                true
            }
            IntentType::Unknown => false,
        };

        steps.push(AgentTask::guard(
            ScreeningStage::Output,
            "Screen output for sensitive data",
            json!({ "checkpoint": ScreeningStage::Output }),
        ));

        AgentPlan {
            steps,
            intent,
            requires_approval,
            estimated_cost: self.config.costs.estimate(intent),
        }
    }

    // ── Execution ────────────────────────────────────────────────────────────

    /// Run every step of `plan` live and return the provenance record.
    pub async fn execute(&self, plan: AgentPlan, query: &str) -> ProvenanceRecord {
        self.execute_with(plan, query, StageEvidence::default(), &CancellationToken::new())
            .await
    }

    /// Run `plan`, reusing `evidence` where it covers a step, until every task
    /// is terminal or `cancel` fires.
    pub async fn execute_with(
        &self,
        mut plan: AgentPlan,
        query: &str,
        evidence: StageEvidence,
        cancel: &CancellationToken,
    ) -> ProvenanceRecord {
        let started = Instant::now();
        let request_id = ProvenanceRecord::new_request_id();

        let mut run = RunState {
            query,
            requires_approval: plan.requires_approval,
            evidence,
            retrieval: None,
            guard_results: Vec::new(),
            tool_executions: Vec::new(),
            ticket_note: None,
        };
        let mut halted: Option<TaskFailure> = None;

        debug!(
            request_id = %request_id,
            intent = %plan.intent,
            steps = plan.steps.len(),
            "executing plan"
        );

        for idx in 0..plan.steps.len() {
            let role = plan.steps[idx].agent_role;
            let checkpoint = plan.steps[idx].checkpoint;
            let task_id = plan.steps[idx].id.clone();

            if let Some(failure) = &halted {
                settle(&task_id, plan.steps[idx].abort(failure.clone()));
                continue;
            }

            if plan.steps[idx].status != AgentStatus::Idle {
                warn!(
                    request_id = %request_id,
                    task_id = %task_id,
                    status = %plan.steps[idx].status,
                    "skipping task that is not idle"
                );
                continue;
            }

            // ── Step 1: idle → processing ────────────────────────────────────
            settle(&task_id, plan.steps[idx].start());
            let step_started = Instant::now();

            // ── Step 2: replay supplied evidence, or do the work live ────────
            let (result, latency_ms) = match self.replay(role, checkpoint, &mut run) {
                Some(replayed) => replayed,
                None => {
                    let limit_ms = self.config.latency.limit_ms(role);
                    let result = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => Err(TaskFailure::Cancelled),
                        outcome = tokio::time::timeout(
                            self.config.latency.timeout_for(role),
                            self.perform(role, checkpoint, &mut run),
                        ) => outcome.unwrap_or_else(|_| Err(TaskFailure::Timeout { limit_ms })),
                    };
                    if let Err(failure) = &result {
                        run.interrupt_pending_executions(failure);
                    }
                    (result, elapsed_ms(step_started))
                }
            };

            // ── Step 3: processing → terminal ────────────────────────────────
            let task = &mut plan.steps[idx];
            match result {
                Ok(output) => {
                    let metadata = self.task_metadata(role, &task.input, Some(&output), latency_ms);
                    settle(&task_id, task.complete(output, metadata));

                    if checkpoint == Some(ScreeningStage::Input) && run.blocked_at(ScreeningStage::Input) {
                        warn!(
                            request_id = %request_id,
                            task_id = %task_id,
                            "input checkpoint blocked, halting plan"
                        );
                        halted = Some(TaskFailure::Halted {
                            reason: "input blocked by guard".to_string(),
                        });
                    }
                }
                Err(TaskFailure::Cancelled) => {
                    info!(
                        request_id = %request_id,
                        task_id = %task_id,
                        role = %role,
                        "request cancelled, aborting remaining steps"
                    );
                    settle(&task_id, task.abort(TaskFailure::Cancelled));
                    halted = Some(TaskFailure::Cancelled);
                }
                Err(failure) => {
                    warn!(
                        request_id = %request_id,
                        task_id = %task_id,
                        role = %role,
                        failure = %failure,
                        "step failed, halting plan"
                    );
                    let metadata = self.task_metadata(role, &task.input, None, latency_ms);
                    halted = Some(TaskFailure::Halted {
                        reason: format!("{} step failed: {}", role, failure),
                    });
                    settle(&task_id, task.fail(failure, metadata));
                }
            }
        }

        let outcome = outcome_of(&plan.steps, &run.guard_results);
        let final_response = run.response_text().unwrap_or_default();
        let citations = run
            .retrieval
            .as_ref()
            .map(|r| self.collaborators.retriever.generate_citations(r))
            .unwrap_or_default();
        let total_latency_ms = elapsed_ms(started);

        info!(
            request_id = %request_id,
            intent = %plan.intent,
            outcome = outcome.as_str(),
            total_latency_ms,
            "plan execution finished"
        );

        ProvenanceRecord {
            request_id,
            timestamp: Utc::now(),
            user_query: query.to_string(),
            intent: plan.intent,
            outcome,
            agent_tasks: plan.steps,
            tool_executions: run.tool_executions,
            guard_results: run.guard_results,
            final_response,
            citations,
            model_versions: self.model_versions(),
            prompt_versions: self.prompt_versions(),
            total_cost: plan.estimated_cost,
            total_latency_ms,
        }
    }

    /// Consume evidence matching this step, if any was supplied.
    fn replay(
        &self,
        role: AgentRole,
        checkpoint: Option<ScreeningStage>,
        run: &mut RunState<'_>,
    ) -> Option<(Result<Value, TaskFailure>, u64)> {
        match (role, checkpoint) {
            (AgentRole::Guard, Some(ScreeningStage::Input)) => {
                let screen = run.evidence.input_screen.take()?;
                Some((run.record_screen(screen), 0))
            }
            (AgentRole::Guard, Some(ScreeningStage::Output)) => {
                let screen = run.evidence.output_screen.take()?;
                Some((run.record_screen(screen), 0))
            }
            (AgentRole::Retrieval, _) => {
                let attempt = run.evidence.retrieval.take()?;
                let result = attempt.outcome.and_then(|r| {
                    let value = to_json(&r)?;
                    run.retrieval = Some(r);
                    Ok(value)
                });
                Some((result, attempt.latency_ms))
            }
            _ => None,
        }
    }

    async fn perform(
        &self,
        role: AgentRole,
        checkpoint: Option<ScreeningStage>,
        run: &mut RunState<'_>,
    ) -> Result<Value, TaskFailure> {
        match role {
            AgentRole::Guard => {
                let screen = match checkpoint.unwrap_or(ScreeningStage::Output) {
                    ScreeningStage::Input => self.collaborators.guard.screen_input(run.query),
                    ScreeningStage::Output => {
                        let text = run.delivered_text();
                        self.collaborators.guard.screen_output(&text)
                    }
                };
                run.record_screen(screen)
            }
            AgentRole::Retrieval => {
                let result = self
                    .collaborators
                    .retriever
                    .retrieve(run.query)
                    .await
                    .map_err(|e| TaskFailure::from(&e))?;
                let value = to_json(&result)?;
                run.retrieval = Some(result);
                Ok(value)
            }
            AgentRole::Reviewer => self.review(run),
            AgentRole::Tooling => self.file_ticket(run).await,
            AgentRole::Supervisor => Ok(json!({ "query": run.query })),
        }
    }

    fn review(&self, run: &RunState<'_>) -> Result<Value, TaskFailure> {
        let retrieval = run.retrieval.as_ref().ok_or_else(|| TaskFailure::Rejected {
            reason: "no retrieval output to review".to_string(),
        })?;
        let payload = to_json(retrieval)?;

        let report = self
            .collaborators
            .reviewer
            .review(&payload, &self.review_schema)
            .map_err(|e| TaskFailure::from(&e))?;

        if !report.passed {
            return Err(TaskFailure::Rejected {
                reason: report.summary(),
            });
        }
        to_json(&report)
    }

    async fn file_ticket(&self, run: &mut RunState<'_>) -> Result<Value, TaskFailure> {
        let request = TicketRequest {
            category: TicketCategory::infer(run.query),
            priority: TicketPriority::Medium,
            title: ticket_title(run.query),
            description: run.query.to_string(),
            related_articles: run
                .retrieval
                .as_ref()
                .map(|r| r.sources.clone())
                .unwrap_or_default(),
            requires_approval: run.requires_approval,
        };
        let backend = &self.collaborators.ticketing;

        // Recorded before the call so a timeout or cancellation still leaves
        // a trace of it.
        let pending = ToolExecution {
            id: format!("exec-{}", uuid::Uuid::new_v4()),
            tool_name: backend.tool_name().to_string(),
            parameters: to_json(&request)?,
            result: None,
            approved: !request.requires_approval,
            approved_by: None,
            timestamp: Utc::now(),
            pre_conditions_met: run.passed_at(ScreeningStage::Input),
            post_conditions_verified: false,
        };
        let index = run.tool_executions.len();
        run.tool_executions.push(pending);

        let (result, post_conditions_verified, outcome) = match backend.submit(&request).await {
            Ok(receipt) => {
                let verified = receipt.accepted && !receipt.ticket_id.is_empty();
                let value = to_json(&receipt)?;
                let outcome = if receipt.accepted {
                    run.ticket_note = Some(ticket_note(&receipt));
                    Ok(value.clone())
                } else {
                    Err(TaskFailure::Backend {
                        reason: format!("ticket '{}' was not accepted", receipt.ticket_id),
                    })
                };
                (value, verified, outcome)
            }
            Err(err) => (
                json!({ "error": err.to_string() }),
                false,
                Err(TaskFailure::from(&err)),
            ),
        };

        if let Some(exec) = run.tool_executions.get_mut(index) {
            exec.result = Some(result);
            exec.post_conditions_verified = post_conditions_verified;
        }

        outcome
    }

    fn task_metadata(
        &self,
        role: AgentRole,
        input: &Value,
        output: Option<&Value>,
        latency_ms: u64,
    ) -> TaskMetadata {
        let budget_ms = self.config.latency.budget_ms(role);
        let over_budget = latency_ms > budget_ms;
        if over_budget {
            warn!(
                role = %role,
                latency_ms,
                budget_ms,
                "step exceeded latency budget"
            );
        }

        let prompt_version = match role {
            AgentRole::Guard => self.collaborators.guard.ruleset_version().to_string(),
            other => self.config.prompts.get(other).clone(),
        };

        TaskMetadata {
            model_version: self.config.models.get(role).clone(),
            prompt_version,
            tokens_used: estimate_tokens(input, output),
            latency_ms,
            latency_budget_ms: budget_ms,
            over_budget,
        }
    }
}

/// Classify how a finished plan ended.
fn outcome_of(steps: &[AgentTask], guard_results: &[GuardResult]) -> RequestOutcome {
    let blocked = |stage: ScreeningStage| guard_results.iter().any(|g| g.stage == stage && !g.passed);

    if steps.iter().any(|t| t.error == Some(TaskFailure::Cancelled)) {
        RequestOutcome::Cancelled
    } else if steps.iter().any(|t| t.status == AgentStatus::Failed) {
        RequestOutcome::Degraded
    } else if blocked(ScreeningStage::Input) {
        RequestOutcome::BlockedAtInput
    } else if blocked(ScreeningStage::Output) {
        RequestOutcome::BlockedAtOutput
    } else {
        RequestOutcome::Answered
    }
}

/// Log a lifecycle violation. The plan loop only attempts legal transitions,
/// so this firing means a caller handed in a plan it had already mutated.
fn settle(task_id: &str, transition: DeskpilotResult<()>) {
    if let Err(err) = transition {
        error!(task_id = %task_id, error = %err, "task lifecycle violation");
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<Value, TaskFailure> {
    serde_json::to_value(value).map_err(|e| TaskFailure::Backend {
        reason: format!("failed to serialize step output: {}", e),
    })
}

/// Roughly four characters per token over the serialized input and output.
fn estimate_tokens(input: &Value, output: Option<&Value>) -> u64 {
    let chars = input.to_string().chars().count()
        + output.map(|o| o.to_string().chars().count()).unwrap_or(0);
    chars.div_ceil(4) as u64
}

/// The sentence appended to a ticket response once the desk accepted it.
fn ticket_note(receipt: &TicketReceipt) -> String {
    match receipt.status {
        TicketStatus::PendingApproval => format!(
            "I've filed ticket {} for you. It is waiting for manager approval.",
            receipt.ticket_id
        ),
        _ => format!("I've filed ticket {} for you.", receipt.ticket_id),
    }
}

fn ticket_title(query: &str) -> String {
    let collapsed = query.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= TICKET_TITLE_MAX_CHARS {
        return collapsed;
    }
    let mut title: String = collapsed.chars().take(TICKET_TITLE_MAX_CHARS).collect();
    title.push_str("...");
    title
}

pub(crate) fn elapsed_ms(since: Instant) -> u64 {
    u64::try_from(since.elapsed().as_millis()).unwrap_or(u64::MAX)
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use deskpilot_contracts::{
        agent::{AgentRole, AgentStatus, TaskFailure},
        guard::{RiskLevel, ScreeningStage},
        plan::IntentType,
        provenance::RequestOutcome,
        ticket::TicketStatus,
    };
    use tokio_util::sync::CancellationToken;

    use crate::{
        config::{CopilotConfig, IntentStrategy},
        test_support::{retrieval_with, Harness, MockRetriever},
    };

    use super::{RetrievalAttempt, StageEvidence};

    // ── classify_intent ──────────────────────────────────────────────────────

    #[test]
    fn test_policy_first_prefers_policy_vocabulary() {
        let h = Harness::new();
        let sup = h.supervisor();

        assert_eq!(sup.classify_intent("What is the VPN access policy?"), IntentType::PolicyQa);
        assert_eq!(sup.classify_intent("How do I reset my password?"), IntentType::PolicyQa);
        assert_eq!(sup.classify_intent("please install Slack"), IntentType::TicketAction);
        assert_eq!(sup.classify_intent("Tell me a joke"), IntentType::Unknown);
    }

    #[test]
    fn test_most_matches_counts_hits_and_ties_go_to_policy() {
        let mut config = CopilotConfig::default();
        config.intent.strategy = IntentStrategy::MostMatches;
        let h = Harness::with_config(config);
        let sup = h.supervisor();

        // "policy" + "what is" against "vpn" + "access": tie.
        assert_eq!(sup.classify_intent("What is the VPN access policy?"), IntentType::PolicyQa);
        // "how do i" against "reset" + "password".
        assert_eq!(sup.classify_intent("How do I reset my password?"), IntentType::TicketAction);
        assert_eq!(sup.classify_intent("Can I expense travel?"), IntentType::PolicyQa);
        assert_eq!(sup.classify_intent("good morning"), IntentType::Unknown);
    }

    #[test]
    fn test_classification_is_case_insensitive() {
        let h = Harness::new();
        assert_eq!(h.supervisor().classify_intent("PASSWORD RESET"), IntentType::TicketAction);
    }

    // ── create_plan ──────────────────────────────────────────────────────────

    #[test]
    fn test_plan_shape_by_intent() {
        let h = Harness::new();
        let sup = h.supervisor();

        let plan = sup.create_plan("q", IntentType::PolicyQa);
        assert_eq!(
            plan.roles(),
            vec![AgentRole::Guard, AgentRole::Retrieval, AgentRole::Reviewer, AgentRole::Guard]
        );
        assert!(!plan.requires_approval);
        assert_eq!(plan.estimated_cost, 0.03);

        let plan = sup.create_plan("q", IntentType::TicketAction);
        assert_eq!(
            plan.roles(),
            vec![AgentRole::Guard, AgentRole::Retrieval, AgentRole::Tooling, AgentRole::Guard]
        );
        assert!(plan.requires_approval);
        assert_eq!(plan.estimated_cost, 0.08);

        let plan = sup.create_plan("q", IntentType::Unknown);
        assert_eq!(plan.roles(), vec![AgentRole::Guard, AgentRole::Guard]);
        assert!(!plan.requires_approval);
        assert_eq!(plan.estimated_cost, 0.01);
    }

    #[test]
    fn test_plan_tasks_start_idle_with_distinct_ids() {
        let h = Harness::new();
        let plan = h.supervisor().create_plan("q", IntentType::TicketAction);

        assert!(plan.steps.iter().all(|t| t.status == AgentStatus::Idle));
        let ids: std::collections::HashSet<_> = plan.steps.iter().map(|t| t.id.clone()).collect();
        assert_eq!(ids.len(), plan.steps.len());
        assert_eq!(plan.steps[0].checkpoint, Some(ScreeningStage::Input));
        assert_eq!(plan.steps[3].checkpoint, Some(ScreeningStage::Output));
        assert!(!plan.in_flight());
        assert!(!plan.is_done());
    }

    // ── execute ──────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_execute_policy_plan_completes_every_step() {
        let h = Harness::new();
        let sup = h.supervisor();
        let plan = sup.create_plan("vpn policy", IntentType::PolicyQa);

        let record = sup.execute(plan, "vpn policy").await;

        assert_eq!(record.outcome, RequestOutcome::Answered);
        assert_eq!(record.agent_tasks.len(), 4);
        assert!(record
            .agent_tasks
            .iter()
            .all(|t| t.status == AgentStatus::Completed && t.metadata.is_some()));

        // Guard results in encounter order: input before output.
        let stages: Vec<_> = record.guard_results.iter().map(|g| g.stage).collect();
        assert_eq!(stages, vec![ScreeningStage::Input, ScreeningStage::Output]);

        assert_eq!(*h.reviews.lock().unwrap(), 1);
        assert!(record.tool_executions.is_empty());
        assert_eq!(record.total_cost, 0.03);
        assert_eq!(record.citations.len(), 2);
    }

    #[tokio::test]
    async fn test_task_metadata_carries_versions_and_budgets() {
        let h = Harness::new();
        let sup = h.supervisor();
        let plan = sup.create_plan("vpn policy", IntentType::PolicyQa);
        let record = sup.execute(plan, "vpn policy").await;

        let guard_meta = record.agent_tasks[0].metadata.as_ref().unwrap();
        assert_eq!(guard_meta.model_version, "llama-guard-2");
        assert_eq!(guard_meta.prompt_version, "mock-rules-1");
        assert_eq!(guard_meta.latency_budget_ms, 100);
        assert!(guard_meta.tokens_used > 0);

        let retrieval_meta = record.agent_tasks[1].metadata.as_ref().unwrap();
        assert_eq!(retrieval_meta.model_version, "text-embedding-3-large");
        assert_eq!(retrieval_meta.prompt_version, "v1.5");
        assert_eq!(retrieval_meta.latency_budget_ms, 400);

        assert_eq!(record.prompt_versions.guard, "mock-rules-1");
        assert_eq!(record.model_versions.reviewer, "gpt-4-turbo-2024");
    }

    #[tokio::test]
    async fn test_ticket_plan_files_ticket_pending_approval() {
        let h = Harness::new();
        let sup = h.supervisor();
        let query = "reset my password please";
        let plan = sup.create_plan(query, IntentType::TicketAction);

        let record = sup.execute(plan, query).await;

        assert_eq!(record.outcome, RequestOutcome::Answered);
        assert_eq!(record.tool_executions.len(), 1);
        let exec = &record.tool_executions[0];
        assert_eq!(exec.tool_name, "servicedesk.create_ticket");
        assert!(!exec.approved);
        assert!(exec.pre_conditions_met);
        assert!(exec.post_conditions_verified);
        assert_eq!(exec.parameters["category"], "password_reset");
        assert_eq!(exec.parameters["requires_approval"], true);

        let submitted = h.tickets.lock().unwrap();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].related_articles, vec!["Doc 0", "Doc 1"]);

        let receipt = exec.result.as_ref().unwrap();
        assert_eq!(
            receipt["status"],
            serde_json::to_value(TicketStatus::PendingApproval).unwrap()
        );
    }

    #[tokio::test]
    async fn test_retrieval_failure_fails_task_and_halts_rest() {
        let h = Harness::new().retriever(MockRetriever::failing());
        let sup = h.supervisor();
        let plan = sup.create_plan("vpn policy", IntentType::PolicyQa);

        let record = sup.execute(plan, "vpn policy").await;

        assert_eq!(record.outcome, RequestOutcome::Degraded);
        let statuses: Vec<_> = record.agent_tasks.iter().map(|t| t.status).collect();
        assert_eq!(
            statuses,
            vec![AgentStatus::Completed, AgentStatus::Failed, AgentStatus::Aborted, AgentStatus::Aborted]
        );
        assert!(matches!(record.agent_tasks[1].error, Some(TaskFailure::Backend { .. })));
        assert!(matches!(record.agent_tasks[2].error, Some(TaskFailure::Halted { .. })));
        assert_eq!(*h.reviews.lock().unwrap(), 0, "reviewer must not run after a failed retrieval");
        assert!(record.has_failures());
    }

    #[tokio::test]
    async fn test_slow_retrieval_times_out() {
        let mut config = CopilotConfig::default();
        config.latency.budgets_ms.retrieval = 5;
        config.latency.timeout_multiplier = 2;
        let h = Harness::with_config(config).retriever(MockRetriever::slow(Duration::from_millis(500)));
        let sup = h.supervisor();
        let plan = sup.create_plan("vpn policy", IntentType::PolicyQa);

        let record = sup.execute(plan, "vpn policy").await;

        assert_eq!(record.outcome, RequestOutcome::Degraded);
        assert_eq!(record.agent_tasks[1].status, AgentStatus::Failed);
        assert_eq!(record.agent_tasks[1].error, Some(TaskFailure::Timeout { limit_ms: 10 }));
        let meta = record.agent_tasks[1].metadata.as_ref().unwrap();
        assert!(meta.over_budget);
    }

    #[tokio::test]
    async fn test_failing_review_rejects_and_degrades() {
        let h = Harness::new().reviewer_passes(false);
        let sup = h.supervisor();
        let plan = sup.create_plan("vpn policy", IntentType::PolicyQa);

        let record = sup.execute(plan, "vpn policy").await;

        assert_eq!(record.outcome, RequestOutcome::Degraded);
        match &record.agent_tasks[2].error {
            Some(TaskFailure::Rejected { reason }) => assert!(reason.contains("scores-non-increasing")),
            other => panic!("expected Rejected, got {:?}", other),
        }
        assert_eq!(record.agent_tasks[3].status, AgentStatus::Aborted);
    }

    #[tokio::test]
    async fn test_ticketing_failure_is_recorded() {
        let h = Harness::new().ticketing_fails();
        let sup = h.supervisor();
        let plan = sup.create_plan("install visio", IntentType::TicketAction);

        let record = sup.execute(plan, "install visio").await;

        assert_eq!(record.outcome, RequestOutcome::Degraded);
        assert_eq!(record.agent_tasks[2].status, AgentStatus::Failed);
        assert_eq!(record.tool_executions.len(), 1);
        assert!(!record.tool_executions[0].post_conditions_verified);
    }

    #[tokio::test]
    async fn test_slow_desk_times_out_but_call_is_recorded() {
        let mut config = CopilotConfig::default();
        config.latency.budgets_ms.tooling = 5;
        config.latency.timeout_multiplier = 2;
        let h = Harness::with_config(config).ticketing_slow(Duration::from_millis(200));
        let sup = h.supervisor();
        let plan = sup.create_plan("install visio", IntentType::TicketAction);

        let record = sup.execute(plan, "install visio").await;

        assert_eq!(record.outcome, RequestOutcome::Degraded);
        assert_eq!(record.agent_tasks[2].status, AgentStatus::Failed);
        assert_eq!(record.agent_tasks[2].error, Some(TaskFailure::Timeout { limit_ms: 10 }));
        assert_eq!(h.tickets.lock().unwrap().len(), 1, "the desk did receive the request");

        assert_eq!(record.tool_executions.len(), 1);
        let exec = &record.tool_executions[0];
        assert_eq!(exec.parameters["title"], "install visio");
        assert_eq!(exec.result.as_ref().unwrap()["error"], "timed out after 10 ms");
        assert!(!exec.post_conditions_verified);
    }

    #[tokio::test]
    async fn test_cancel_during_ticket_call_is_recorded() {
        let h = Harness::new().ticketing_slow(Duration::from_secs(2));
        let sup = h.supervisor();
        let plan = sup.create_plan("install visio", IntentType::TicketAction);
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let record = sup
            .execute_with(plan, "install visio", StageEvidence::default(), &cancel)
            .await;

        assert_eq!(record.outcome, RequestOutcome::Cancelled);
        assert_eq!(record.agent_tasks[2].error, Some(TaskFailure::Cancelled));
        assert_eq!(record.tool_executions.len(), 1);
        let exec = &record.tool_executions[0];
        assert_eq!(exec.result.as_ref().unwrap()["error"], "cancelled by caller");
        assert!(!exec.post_conditions_verified);
    }

    #[tokio::test]
    async fn test_filed_ticket_is_named_in_response() {
        let h = Harness::new();
        let sup = h.supervisor();
        let plan = sup.create_plan("install visio", IntentType::TicketAction);
        let evidence = StageEvidence {
            response_text: Some("Here is what to try.".to_string()),
            ..StageEvidence::default()
        };

        let record = sup
            .execute_with(plan, "install visio", evidence, &CancellationToken::new())
            .await;

        assert_eq!(record.outcome, RequestOutcome::Answered);
        assert_eq!(
            record.final_response,
            "Here is what to try.\n\nI've filed ticket INC-000001 for you. It is waiting for manager approval."
        );
        assert!(record.guard_results[1].passed);
    }

    #[tokio::test]
    async fn test_input_block_halts_plan() {
        let h = Harness::new();
        let sup = h.supervisor();
        let query = "BLOCK me";
        let plan = sup.create_plan(query, IntentType::Unknown);

        let record = sup.execute(plan, query).await;

        assert_eq!(record.outcome, RequestOutcome::BlockedAtInput);
        assert_eq!(record.agent_tasks[0].status, AgentStatus::Completed);
        assert_eq!(record.agent_tasks[1].status, AgentStatus::Aborted);
        assert_eq!(record.guard_results.len(), 1);
        assert_eq!(record.guard_results[0].risk_level, RiskLevel::High);
    }

    #[tokio::test]
    async fn test_cancelled_token_aborts_all_live_steps() {
        let h = Harness::new();
        let sup = h.supervisor();
        let plan = sup.create_plan("vpn policy", IntentType::PolicyQa);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let record = sup
            .execute_with(plan, "vpn policy", StageEvidence::default(), &cancel)
            .await;

        assert_eq!(record.outcome, RequestOutcome::Cancelled);
        assert!(record
            .agent_tasks
            .iter()
            .all(|t| t.status == AgentStatus::Aborted && t.error == Some(TaskFailure::Cancelled)));
        assert_eq!(*h.retrievals.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_cancel_during_slow_step() {
        let h = Harness::new().retriever(MockRetriever::slow(Duration::from_secs(2)));
        let sup = h.supervisor();
        let plan = sup.create_plan("vpn policy", IntentType::PolicyQa);
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let record = sup
            .execute_with(plan, "vpn policy", StageEvidence::default(), &cancel)
            .await;

        assert_eq!(record.outcome, RequestOutcome::Cancelled);
        assert_eq!(record.agent_tasks[0].status, AgentStatus::Completed);
        assert_eq!(record.agent_tasks[1].status, AgentStatus::Aborted);
        assert_eq!(record.agent_tasks[1].error, Some(TaskFailure::Cancelled));
        assert_eq!(record.agent_tasks[3].error, Some(TaskFailure::Cancelled));
    }

    #[tokio::test]
    async fn test_evidence_is_recorded_not_recomputed() {
        let h = Harness::new();
        let sup = h.supervisor();
        let plan = sup.create_plan("vpn policy", IntentType::PolicyQa);

        let evidence = StageEvidence {
            input_screen: Some(sup.guard().screen_input("vpn policy")),
            retrieval: Some(RetrievalAttempt {
                outcome: Ok(retrieval_with(1)),
                latency_ms: 42,
            }),
            response_text: Some("final text".to_string()),
            output_screen: Some(sup.guard().screen_output("final text")),
        };

        let record = sup
            .execute_with(plan, "vpn policy", evidence, &CancellationToken::new())
            .await;

        assert_eq!(record.outcome, RequestOutcome::Answered);
        assert_eq!(*h.retrievals.lock().unwrap(), 0, "retrieval was supplied");
        assert_eq!(record.agent_tasks[1].metadata.as_ref().unwrap().latency_ms, 42);
        assert_eq!(record.final_response, "final text");
        assert_eq!(record.guard_results.len(), 2);
        assert_eq!(record.citations.len(), 1);
    }

    #[tokio::test]
    async fn test_live_output_guard_screens_response_text() {
        let h = Harness::new();
        let sup = h.supervisor();
        let plan = sup.create_plan("hello", IntentType::Unknown);
        let evidence = StageEvidence {
            response_text: Some("LEAK 123-45-6789".to_string()),
            ..StageEvidence::default()
        };

        let record = sup
            .execute_with(plan, "hello", evidence, &CancellationToken::new())
            .await;

        assert_eq!(record.outcome, RequestOutcome::BlockedAtOutput);
        assert!(!record.guard_results[1].passed);
    }

    #[test]
    fn test_ticket_title_is_bounded() {
        let long = "word ".repeat(50);
        let title = super::ticket_title(&long);
        assert!(title.chars().count() <= super::TICKET_TITLE_MAX_CHARS + 3);
        assert_eq!(super::ticket_title("  reset   my password "), "reset my password");
    }

    #[test]
    fn test_token_estimate_rounds_up() {
        let input = serde_json::json!("abc"); // serializes to 5 chars
        assert_eq!(super::estimate_tokens(&input, None), 2);
    }
}
