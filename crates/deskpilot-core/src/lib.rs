//! # deskpilot-core
//!
//! The orchestration core of the DeskPilot service-desk copilot.
//!
//! This crate provides:
//! - The collaborator traits (`Guard`, `Retriever`, `Reviewer`,
//!   `TicketingBackend`, `ProvenanceSink`)
//! - The `Supervisor`, which classifies intent, builds plans, and executes them
//! - The `Copilot`, the single entry point that turns a query into a
//!   `Message` plus a `ProvenanceRecord`
//! - `CopilotConfig`, the TOML runtime configuration
//!
//! ## Usage
//!
//! ```rust,ignore
//! use deskpilot_core::{Copilot, Supervisor, supervisor::Collaborators};
//!
//! let supervisor = Supervisor::new(config, collaborators, review_schema);
//! let copilot = Copilot::new(supervisor).with_sink(ledger);
//! let out = copilot.process_query("What is the VPN access policy?").await;
//! ```

pub mod config;
pub mod copilot;
pub mod supervisor;
pub mod traits;

#[cfg(test)]
mod test_support;

pub use config::CopilotConfig;
pub use copilot::{Copilot, CopilotResponse};
pub use supervisor::Supervisor;
