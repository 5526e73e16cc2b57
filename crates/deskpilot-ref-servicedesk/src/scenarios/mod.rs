//! Scripted service-desk scenarios.
//!
//! Each scenario builds its own deployment, sends one query, prints what
//! every checkpoint decided, and returns the response for inspection.

pub mod injection_attempt;
pub mod output_leak;
pub mod policy_question;
pub mod ticket_action;

use deskpilot_contracts::agent::AgentStatus;
use deskpilot_core::{copilot::visible_citations, CopilotResponse};

use crate::deployment::Deployment;

/// Print the user-visible answer and the provenance trail.
pub fn print_outcome(response: &CopilotResponse) {
    let record = &response.provenance;

    println!("  Intent:       {}", record.intent);
    println!("  Outcome:      {}", record.outcome.as_str());
    println!("  Plan:");
    if record.agent_tasks.is_empty() {
        println!("    (none)");
    }
    for task in &record.agent_tasks {
        let detail = match (&task.status, &task.error) {
            (AgentStatus::Completed, _) => String::new(),
            (_, Some(failure)) => format!(" ({})", failure),
            _ => String::new(),
        };
        println!("    {:<10} {}{}", task.agent_role.to_string(), task.status, detail);
    }
    for verdict in &record.guard_results {
        println!(
            "  Guard [{}]: {} (risk {}){}",
            verdict.stage,
            if verdict.passed { "PASS" } else { "BLOCK" },
            verdict.risk_level,
            if verdict.flags.is_empty() {
                String::new()
            } else {
                format!(" {}", verdict.flags.join("; "))
            }
        );
    }
    for execution in &record.tool_executions {
        println!(
            "  Tool:         {} -> {}",
            execution.tool_name,
            execution
                .result
                .as_ref()
                .map(|r| r.to_string())
                .unwrap_or_else(|| "no result".to_string())
        );
    }

    println!();
    println!("  Response:");
    for line in response.response.content.lines() {
        println!("    {}", line);
    }
    let citations = visible_citations(response);
    if !citations.is_empty() {
        println!("  Citations:");
        for c in citations {
            println!("    [{:.2}] {}", c.confidence, c.title);
        }
    }
    println!();
    println!(
        "  Cost {:.3}, latency {} ms, request {}",
        record.total_cost, record.total_latency_ms, record.request_id
    );
}

/// Print the ledger state after a scenario.
pub fn print_ledger(deployment: &Deployment) {
    println!(
        "  Provenance ledger: {} ({} record(s))",
        if deployment.ledger.verify_integrity() {
            "VERIFIED"
        } else {
            "BROKEN"
        },
        deployment.ledger.len()
    );
}
