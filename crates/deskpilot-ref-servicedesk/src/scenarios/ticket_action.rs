//! Scenario 4: Ticket Action
//!
//! An employee needs a password reset. The query is classified
//! `ticket_action`, the plan requires approval, and the tooling step files a
//! ticket that the desk parks as `pending_approval`. The user gets the
//! self-service options and the id of the ticket filed for them.

use deskpilot_contracts::error::DeskpilotResult;
use deskpilot_core::CopilotResponse;

use super::{print_ledger, print_outcome};
use crate::deployment::Deployment;

pub const QUERY: &str = "How do I reset my password?";

pub async fn run_scenario() -> DeskpilotResult<CopilotResponse> {
    println!("=== Scenario 4: Ticket Action ===");
    println!();
    println!("  Query: {}", QUERY);
    println!();

    let deployment = Deployment::reference()?;
    let response = deployment.copilot.process_query(QUERY).await;

    print_outcome(&response);
    let summary = deployment.desk.summary();
    println!(
        "  Ticket desk: {} ticket(s), {} pending approval",
        summary.total_tickets, summary.pending_approval
    );
    print_ledger(&deployment);
    println!();
    println!("  Scenario 4 complete.");
    println!();

    Ok(response)
}
