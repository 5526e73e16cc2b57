//! # deskpilot-contracts
//!
//! Shared types, schemas, and contracts for the DeskPilot service-desk copilot.
//!
//! All crates in the workspace import from here. No orchestration logic lives
//! in this crate: only data definitions, invariant-preserving constructors,
//! the task state machine, and the error type.

pub mod agent;
pub mod error;
pub mod guard;
pub mod knowledge;
pub mod message;
pub mod plan;
pub mod provenance;
pub mod retrieval;
pub mod review;
pub mod ticket;

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde_json::json;

    use super::*;
    use agent::{AgentRole, AgentStatus, AgentTask, RoleMap, TaskFailure, TaskMetadata};
    use error::DeskpilotError;
    use guard::{GuardResult, RiskLevel, ScreeningStage};
    use retrieval::{
        generate_citations, truncate_excerpt, PassageMetadata, RetrievalResult, RetrievedPassage,
        CITATION_LIMIT, EXCERPT_MAX_CHARS,
    };
    use ticket::TicketCategory;

    fn metadata() -> TaskMetadata {
        TaskMetadata {
            model_version: "m".to_string(),
            prompt_version: "p".to_string(),
            tokens_used: 10,
            latency_ms: 1,
            latency_budget_ms: 100,
            over_budget: false,
        }
    }

    fn passage(idx: usize, content: &str) -> RetrievedPassage {
        RetrievedPassage {
            id: format!("passage-{idx}"),
            content: content.to_string(),
            source: format!("Doc {idx}"),
            score: 0.85 - idx as f64 * 0.05,
            metadata: PassageMetadata {
                title: format!("Doc {idx}"),
                last_updated: Utc::now(),
                section: None,
                url: None,
            },
        }
    }

    fn result_with(n: usize, content: &str) -> RetrievalResult {
        let passages: Vec<_> = (0..n).map(|i| passage(i, content)).collect();
        RetrievalResult {
            sources: passages.iter().map(|p| p.source.clone()).collect(),
            total_results: passages.len(),
            passages,
            query_latency_ms: 0,
        }
    }

    // ── RiskLevel ────────────────────────────────────────────────────────────

    #[test]
    fn risk_escalation_never_decreases() {
        let levels = [
            RiskLevel::Medium,
            RiskLevel::Low,
            RiskLevel::Critical,
            RiskLevel::High,
            RiskLevel::Low,
        ];

        let mut current = RiskLevel::Low;
        let mut highest_seen = RiskLevel::Low;
        for detected in levels {
            let next = current.escalate(detected);
            assert!(next >= current, "escalation lowered {current} to {next}");
            highest_seen = highest_seen.max(detected);
            assert_eq!(next, highest_seen);
            current = next;
        }
        assert_eq!(current, RiskLevel::Critical);
    }

    #[test]
    fn risk_level_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&RiskLevel::High).unwrap(), "\"high\"");
    }

    // ── GuardResult ──────────────────────────────────────────────────────────

    #[test]
    fn blocked_reasons_present_iff_not_passed() {
        let stages = [ScreeningStage::Input, ScreeningStage::Output];
        let levels = [RiskLevel::Low, RiskLevel::Medium, RiskLevel::High, RiskLevel::Critical];

        for stage in stages {
            for level in levels {
                for flags in [vec![], vec!["finding".to_string()]] {
                    let r = GuardResult::from_findings(
                        stage,
                        level,
                        flags,
                        stage.default_max_passing_risk(),
                        "v1",
                    );
                    assert_eq!(r.blocked_reasons.is_some(), !r.passed);
                    if let Some(reasons) = &r.blocked_reasons {
                        assert!(!reasons.is_empty());
                    }
                }
            }
        }
    }

    #[test]
    fn medium_risk_passes_input_but_not_output() {
        let input = GuardResult::from_findings(
            ScreeningStage::Input,
            RiskLevel::Medium,
            vec!["Potential PII detected".to_string()],
            ScreeningStage::Input.default_max_passing_risk(),
            "v1",
        );
        let output = GuardResult::from_findings(
            ScreeningStage::Output,
            RiskLevel::Medium,
            vec!["Potential PII detected".to_string()],
            ScreeningStage::Output.default_max_passing_risk(),
            "v1",
        );
        assert!(input.passed);
        assert!(!output.passed);
    }

    #[test]
    fn duplicate_flags_collapse_and_join_details() {
        let r = GuardResult::from_findings(
            ScreeningStage::Input,
            RiskLevel::High,
            vec!["a".to_string(), "b".to_string(), "a".to_string()],
            RiskLevel::Medium,
            "v1",
        );
        assert_eq!(r.flags, vec!["a", "b"]);
        assert_eq!(r.details, "a; b");
        assert_eq!(r.blocked_reasons, Some(vec!["a".to_string(), "b".to_string()]));
    }

    #[test]
    fn all_clear_details_name_the_checkpoint() {
        assert_eq!(
            GuardResult::all_clear(ScreeningStage::Input, "v1").details,
            "Input passed all checks"
        );
        assert_eq!(
            GuardResult::all_clear(ScreeningStage::Output, "v1").details,
            "Output passed all checks"
        );
    }

    // ── Citations ────────────────────────────────────────────────────────────

    #[test]
    fn citations_bounded_and_rank_ordered() {
        for n in 0..6 {
            let result = result_with(n, "short text");
            let citations = generate_citations(&result);
            assert_eq!(citations.len(), n.min(CITATION_LIMIT));
            for (c, p) in citations.iter().zip(result.passages.iter()) {
                assert_eq!(c.id, p.id);
                assert_eq!(c.confidence, p.score);
            }
        }
    }

    #[test]
    fn excerpt_truncated_with_ellipsis() {
        let long = "x".repeat(400);
        let excerpt = truncate_excerpt(&long);
        assert!(excerpt.ends_with("..."));
        assert_eq!(excerpt.chars().count(), EXCERPT_MAX_CHARS);

        let citations = generate_citations(&result_with(2, &long));
        assert!(citations
            .iter()
            .all(|c| c.excerpt.chars().count() <= EXCERPT_MAX_CHARS));
    }

    #[test]
    fn short_excerpt_kept_verbatim() {
        assert_eq!(truncate_excerpt("VPN is mandatory."), "VPN is mandatory.");
    }

    #[test]
    fn excerpt_truncation_respects_char_boundaries() {
        let text = "é".repeat(200);
        let excerpt = truncate_excerpt(&text);
        assert_eq!(excerpt.chars().count(), EXCERPT_MAX_CHARS);
    }

    // ── AgentTask state machine ──────────────────────────────────────────────

    #[test]
    fn task_happy_path_transitions() {
        let mut task = AgentTask::new(AgentRole::Retrieval, "retrieve", json!({}));
        assert_eq!(task.status, AgentStatus::Idle);
        assert!(task.id.starts_with("task-retrieval-"));

        task.start().unwrap();
        assert_eq!(task.status, AgentStatus::Processing);
        assert!(task.started_at.is_some());

        task.complete(json!({ "ok": true }), metadata()).unwrap();
        assert_eq!(task.status, AgentStatus::Completed);
        assert!(task.ended_at.is_some());
        assert!(task.metadata.is_some());
    }

    #[test]
    fn terminal_task_never_reverts() {
        let mut task = AgentTask::new(AgentRole::Tooling, "file ticket", json!({}));
        task.start().unwrap();
        task.fail(TaskFailure::Timeout { limit_ms: 3000 }, metadata()).unwrap();

        let err = task.start().unwrap_err();
        assert!(matches!(err, DeskpilotError::IllegalTransition { .. }));
        assert!(task.complete(json!({}), metadata()).is_err());
        assert!(task.abort(TaskFailure::Cancelled).is_err());
        assert_eq!(task.status, AgentStatus::Failed);
    }

    #[test]
    fn idle_task_cannot_complete_without_starting() {
        let mut task = AgentTask::new(AgentRole::Reviewer, "review", json!({}));
        assert!(task.complete(json!({}), metadata()).is_err());
        assert_eq!(task.status, AgentStatus::Idle);
    }

    #[test]
    fn idle_task_can_be_aborted() {
        let mut task = AgentTask::new(AgentRole::Reviewer, "review", json!({}));
        task.abort(TaskFailure::Cancelled).unwrap();
        assert_eq!(task.status, AgentStatus::Aborted);
        assert_eq!(task.error, Some(TaskFailure::Cancelled));
    }

    #[test]
    fn task_ids_are_distinct() {
        let ids: std::collections::HashSet<String> = (0..50)
            .map(|_| AgentTask::new(AgentRole::Guard, "g", json!({})).id)
            .collect();
        assert_eq!(ids.len(), 50);
    }

    #[test]
    fn timeout_error_maps_to_timeout_failure() {
        let err = DeskpilotError::StepTimeout {
            role: "retrieval".to_string(),
            limit_ms: 4000,
        };
        assert_eq!(TaskFailure::from(&err), TaskFailure::Timeout { limit_ms: 4000 });

        let err = DeskpilotError::RetrievalUnavailable {
            reason: "503".to_string(),
        };
        assert!(matches!(TaskFailure::from(&err), TaskFailure::Backend { .. }));
    }

    #[test]
    fn task_failure_serializes_with_kind_tag() {
        let json = serde_json::to_value(TaskFailure::Timeout { limit_ms: 10 }).unwrap();
        assert_eq!(json["kind"], "timeout");
        assert_eq!(json["limit_ms"], 10);
    }

    // ── RoleMap ──────────────────────────────────────────────────────────────

    #[test]
    fn role_map_serializes_by_role_name() {
        let mut map: RoleMap<String> = RoleMap::default();
        *map.get_mut(AgentRole::Guard) = "llama-guard-2".to_string();

        let json = serde_json::to_value(&map).unwrap();
        assert_eq!(json["guard"], "llama-guard-2");
        assert_eq!(map.iter().count(), AgentRole::ALL.len());
    }

    // ── TicketCategory ───────────────────────────────────────────────────────

    #[test]
    fn ticket_category_inferred_from_wording() {
        assert_eq!(TicketCategory::infer("How do I reset my password?"), TicketCategory::PasswordReset);
        assert_eq!(TicketCategory::infer("VPN keeps dropping"), TicketCategory::NetworkProblem);
        assert_eq!(TicketCategory::infer("please install Visio"), TicketCategory::SoftwareInstall);
        assert_eq!(TicketCategory::infer("need access to Jira"), TicketCategory::AccessRequest);
        assert_eq!(TicketCategory::infer("hello"), TicketCategory::Other);
    }

    // ── Message ──────────────────────────────────────────────────────────────

    #[test]
    fn assistant_message_omits_absent_fields() {
        let msg = message::Message::assistant("hi");
        assert!(msg.id.starts_with("msg-"));

        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "assistant");
        assert!(json.get("citations").is_none());
        assert!(json.get("metadata").is_none());
    }

    #[test]
    fn user_turn_from_presentation_layer_deserializes() {
        let msg: message::Message = serde_json::from_value(json!({
            "id": "msg-1",
            "role": "user",
            "content": "What is the travel policy?",
            "timestamp": "2024-03-01T09:00:00Z"
        }))
        .unwrap();
        assert_eq!(msg.role, message::MessageRole::User);
        assert!(msg.citations.is_none());
    }

    // ── DeskpilotError display messages ──────────────────────────────────────

    #[test]
    fn error_step_timeout_display() {
        let err = DeskpilotError::StepTimeout {
            role: "tooling".to_string(),
            limit_ms: 3000,
        };
        let msg = err.to_string();
        assert!(msg.contains("tooling"));
        assert!(msg.contains("3000"));
    }

    #[test]
    fn error_rule_compilation_display() {
        let err = DeskpilotError::RuleCompilation {
            rule_id: "pii-ssn".to_string(),
            reason: "unclosed group".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("pii-ssn"));
        assert!(msg.contains("unclosed group"));
    }

    #[test]
    fn error_illegal_transition_display() {
        let err = DeskpilotError::IllegalTransition {
            task_id: "task-1".to_string(),
            from: "completed".to_string(),
            to: "processing".to_string(),
        };
        assert!(err.to_string().contains("completed -> processing"));
    }
}
