//! DeskPilot Service-Desk Copilot: Demo CLI
//!
//! Runs the scripted service-desk scenarios, or sends one ad-hoc query
//! through the reference deployment.
//!
//! Usage:
//!   cargo run -p demo -- run-all
//!   cargo run -p demo -- policy-question
//!   cargo run -p demo -- injection-attempt
//!   cargo run -p demo -- output-leak
//!   cargo run -p demo -- ticket-action
//!   cargo run -p demo -- ask "Can I expense a client dinner?" --json

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use deskpilot_contracts::error::DeskpilotResult;
use deskpilot_core::CopilotConfig;
use deskpilot_guard::RuleGuard;
use deskpilot_ref_servicedesk::{
    scenarios::{self, injection_attempt, output_leak, policy_question, ticket_action},
    servicedesk_config, Deployment,
};

// ── CLI definition ────────────────────────────────────────────────────────────

/// DeskPilot: a guarded HR/IT service-desk copilot.
#[derive(Parser)]
#[command(
    name = "demo",
    about = "DeskPilot service-desk copilot demo",
    long_about = "Runs DeskPilot service-desk scenarios showing input and output guarding,\n\
                  scoped retrieval, ticket filing, and the provenance ledger."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run all four scenarios in sequence.
    RunAll,
    /// Scenario 1: a policy question answered with citations.
    PolicyQuestion,
    /// Scenario 2: a prompt injection blocked at input.
    InjectionAttempt,
    /// Scenario 3: an SSN withheld at the output checkpoint.
    OutputLeak,
    /// Scenario 4: a password reset that files a ticket.
    TicketAction,
    /// Send one query through the reference deployment.
    Ask {
        query: String,
        /// Print the full response and provenance record as JSON.
        #[arg(long)]
        json: bool,
        /// Copilot configuration TOML (defaults to the embedded service-desk config).
        #[arg(long)]
        config: Option<PathBuf>,
        /// Guard rules TOML (defaults to the embedded rule set).
        #[arg(long)]
        rules: Option<PathBuf>,
    },
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    // Set RUST_LOG=debug for verbose output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::RunAll => {
            print_banner();
            run_all().await
        }
        Command::PolicyQuestion => {
            print_banner();
            policy_question::run_scenario().await.map(drop)
        }
        Command::InjectionAttempt => {
            print_banner();
            injection_attempt::run_scenario().await.map(drop)
        }
        Command::OutputLeak => {
            print_banner();
            output_leak::run_scenario().await.map(drop)
        }
        Command::TicketAction => {
            print_banner();
            ticket_action::run_scenario().await.map(drop)
        }
        Command::Ask {
            query,
            json,
            config,
            rules,
        } => ask(&query, json, config, rules).await,
    };

    if let Err(e) = result {
        eprintln!("Demo error: {}", e);
        std::process::exit(1);
    }
}

// ── Commands ──────────────────────────────────────────────────────────────────

async fn run_all() -> DeskpilotResult<()> {
    policy_question::run_scenario().await?;
    injection_attempt::run_scenario().await?;
    output_leak::run_scenario().await?;
    ticket_action::run_scenario().await?;
    println!("All scenarios completed.");
    Ok(())
}

async fn ask(
    query: &str,
    json: bool,
    config: Option<PathBuf>,
    rules: Option<PathBuf>,
) -> DeskpilotResult<()> {
    let config = match config {
        Some(path) => {
            debug!(path = %path.display(), "loading copilot config");
            CopilotConfig::from_file(&path)?
        }
        None => servicedesk_config()?,
    };
    let guard = match rules {
        Some(path) => {
            debug!(path = %path.display(), "loading guard rules");
            RuleGuard::from_file(&path)?
        }
        None => RuleGuard::with_default_rules()?,
    };

    let deployment = Deployment::customized(config, guard);
    let response = deployment.copilot.process_query(query).await;

    if json {
        match serde_json::to_string_pretty(&response) {
            Ok(rendered) => println!("{}", rendered),
            Err(e) => eprintln!("failed to render response as JSON: {}", e),
        }
    } else {
        println!("  Query: {}", query);
        println!();
        scenarios::print_outcome(&response);
    }
    Ok(())
}

// ── Banner ────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("DeskPilot: Guarded Service-Desk Copilot");
    println!("HR/IT Reference Demo");
    println!("=======================================");
    println!();
    println!("Pipeline per query:");
    println!("  [1] Input guard screens the query; high risk stops here");
    println!("  [2] Supervisor classifies intent and builds a plan");
    println!("  [3] Retrieval searches only allowlisted documents");
    println!("  [4] Reviewer or ticket desk runs, depending on intent");
    println!("  [5] Output guard screens the answer before delivery");
    println!("  [6] Provenance record appended to the SHA-256 ledger");
    println!();
}
