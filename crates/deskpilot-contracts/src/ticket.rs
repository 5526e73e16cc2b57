//! Ticketing collaborator types.
//!
//! The core only files action requests and records that they happened; the
//! ticketing protocol itself belongs to the backend.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketCategory {
    AccessRequest,
    PasswordReset,
    SoftwareInstall,
    HardwareIssue,
    NetworkProblem,
    EmailIssue,
    PolicyQuestion,
    Other,
}

impl TicketCategory {
    /// Pick a category from the wording of a free-text request.
    ///
    /// First keyword match wins; the order puts the most specific cases first.
    pub fn infer(query: &str) -> Self {
        let q = query.to_lowercase();
        if q.contains("password") {
            TicketCategory::PasswordReset
        } else if q.contains("vpn") || q.contains("network") || q.contains("wifi") {
            TicketCategory::NetworkProblem
        } else if q.contains("install") || q.contains("software") {
            TicketCategory::SoftwareInstall
        } else if q.contains("access") || q.contains("permission") {
            TicketCategory::AccessRequest
        } else if q.contains("email") || q.contains("outlook") {
            TicketCategory::EmailIssue
        } else if q.contains("laptop") || q.contains("monitor") || q.contains("keyboard") {
            TicketCategory::HardwareIssue
        } else if q.contains("policy") {
            TicketCategory::PolicyQuestion
        } else {
            TicketCategory::Other
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TicketCategory::AccessRequest => "access_request",
            TicketCategory::PasswordReset => "password_reset",
            TicketCategory::SoftwareInstall => "software_install",
            TicketCategory::HardwareIssue => "hardware_issue",
            TicketCategory::NetworkProblem => "network_problem",
            TicketCategory::EmailIssue => "email_issue",
            TicketCategory::PolicyQuestion => "policy_question",
            TicketCategory::Other => "other",
        }
    }
}

impl fmt::Display for TicketCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketPriority {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    New,
    Assigned,
    InProgress,
    PendingApproval,
    Resolved,
    Closed,
}

/// An action request handed to the ticketing collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketRequest {
    pub category: TicketCategory,
    pub priority: TicketPriority,
    pub title: String,
    pub description: String,
    /// Knowledge articles surfaced by retrieval for the same request.
    pub related_articles: Vec<String>,
    /// When true the ticket is parked in `pending_approval`.
    pub requires_approval: bool,
}

/// The collaborator's answer: success flag plus the ticket identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketReceipt {
    pub ticket_id: String,
    pub accepted: bool,
    pub status: TicketStatus,
}
