//! Scenario 3: Sensitive Data in Generated Output
//!
//! A payroll runbook containing an SSN was indexed by mistake. The answer
//! built from it is caught at the output checkpoint and replaced with a
//! redirect to support; the SSN never reaches the user.

use deskpilot_contracts::error::DeskpilotResult;
use deskpilot_core::CopilotResponse;

use super::{print_ledger, print_outcome};
use crate::deployment::Deployment;

pub const QUERY: &str = "What is the payroll policy for direct deposit?";

pub async fn run_scenario() -> DeskpilotResult<CopilotResponse> {
    println!("=== Scenario 3: Sensitive Data in Generated Output ===");
    println!();
    println!("  Query: {}", QUERY);
    println!("  Corpus: approved policies plus a misfiled payroll runbook");
    println!();

    let deployment = Deployment::with_misfiled_runbook()?;
    let response = deployment.copilot.process_query(QUERY).await;

    print_outcome(&response);
    print_ledger(&deployment);
    println!();
    println!("  Scenario 3 complete.");
    println!();

    Ok(response)
}
