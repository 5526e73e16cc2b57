//! Scenario 1: Policy Question
//!
//! An employee asks about VPN access. The query passes the input guard, is
//! classified `policy_qa`, retrieval finds the remote work policy first, the
//! reviewer checks the retrieval output, and the answer quotes the VPN
//! section with citations.

use deskpilot_contracts::error::DeskpilotResult;
use deskpilot_core::CopilotResponse;

use super::{print_ledger, print_outcome};
use crate::deployment::Deployment;

pub const QUERY: &str = "What is the VPN access policy?";

pub async fn run_scenario() -> DeskpilotResult<CopilotResponse> {
    println!("=== Scenario 1: Policy Question ===");
    println!();
    println!("  Query: {}", QUERY);
    println!();

    let deployment = Deployment::reference()?;
    let response = deployment.copilot.process_query(QUERY).await;

    print_outcome(&response);
    print_ledger(&deployment);
    println!();
    println!("  Scenario 1 complete.");
    println!();

    Ok(response)
}
