//! # deskpilot-ref-servicedesk
//!
//! HR/IT service-desk reference deployment for the DeskPilot copilot.
//!
//! Wires the real guard, retriever, reviewer, and provenance ledger to a
//! fictional policy corpus and an in-memory ticket desk, then runs four
//! scripted scenarios:
//!
//! 1. **Policy question**: grounded answer with citations.
//! 2. **Injection attempt**: blocked at the input checkpoint.
//! 3. **Output leak**: an answer carrying an SSN is withheld at the output
//!    checkpoint.
//! 4. **Ticket action**: a password reset files a ticket pending approval.
//!
//! All data is hardcoded and fictional. No external calls are made.

pub mod deployment;
pub mod mock_data;
pub mod scenarios;
pub mod ticketing;

pub use deployment::{servicedesk_config, Deployment, SERVICEDESK_CONFIG};
pub use ticketing::{DeskSummary, FiledTicket, InMemoryTicketDesk};

// ── Tests ─────────────────────────────────────────────────────────────────────
