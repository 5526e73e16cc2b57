//! In-memory ticket desk.
//!
//! Stands in for the service-desk system a real deployment would call over
//! the network. Tickets get sequential `INC-NNNNNN` ids; a request that
//! needs approval is parked as `pending_approval`, everything else is `new`.

use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Mutex, PoisonError,
    },
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use deskpilot_contracts::{
    error::{DeskpilotError, DeskpilotResult},
    ticket::{TicketReceipt, TicketRequest, TicketStatus},
};
use deskpilot_core::traits::TicketingBackend;

/// A ticket as stored by the desk.
#[derive(Debug, Clone, Serialize)]
pub struct FiledTicket {
    pub id: String,
    pub status: TicketStatus,
    pub request: TicketRequest,
    pub created_at: DateTime<Utc>,
    pub ai_assisted: bool,
}

/// Ticket counts for a dashboard view.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DeskSummary {
    pub total_tickets: usize,
    pub by_status: BTreeMap<String, usize>,
    pub by_category: BTreeMap<String, usize>,
    pub pending_approval: usize,
}

pub struct InMemoryTicketDesk {
    next_number: AtomicU64,
    tickets: Mutex<Vec<FiledTicket>>,
    /// When set, every submission is refused with this reason.
    outage: Option<String>,
}

impl InMemoryTicketDesk {
    pub fn new() -> Self {
        Self {
            next_number: AtomicU64::new(1),
            tickets: Mutex::new(Vec::new()),
            outage: None,
        }
    }

    /// A desk that refuses every submission.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            outage: Some(reason.into()),
            ..Self::new()
        }
    }

    pub fn tickets(&self) -> Vec<FiledTicket> {
        self.tickets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn summary(&self) -> DeskSummary {
        let tickets = self.tickets.lock().unwrap_or_else(PoisonError::into_inner);
        let mut summary = DeskSummary {
            total_tickets: tickets.len(),
            ..DeskSummary::default()
        };
        for ticket in tickets.iter() {
            let status = serde_json::to_value(ticket.status)
                .ok()
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_default();
            *summary.by_status.entry(status).or_default() += 1;
            *summary
                .by_category
                .entry(ticket.request.category.to_string())
                .or_default() += 1;
            if ticket.status == TicketStatus::PendingApproval {
                summary.pending_approval += 1;
            }
        }
        summary
    }
}

impl Default for InMemoryTicketDesk {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TicketingBackend for InMemoryTicketDesk {
    async fn submit(&self, request: &TicketRequest) -> DeskpilotResult<TicketReceipt> {
        if let Some(reason) = &self.outage {
            return Err(DeskpilotError::TicketingFailed {
                reason: reason.clone(),
            });
        }

        let number = self.next_number.fetch_add(1, Ordering::SeqCst);
        let id = format!("INC-{:06}", number);
        let status = if request.requires_approval {
            TicketStatus::PendingApproval
        } else {
            TicketStatus::New
        };

        self.tickets
            .lock()
            .map_err(|e| DeskpilotError::TicketingFailed {
                reason: format!("ticket store lock poisoned: {}", e),
            })?
            .push(FiledTicket {
                id: id.clone(),
                status,
                request: request.clone(),
                created_at: Utc::now(),
                ai_assisted: true,
            });

        info!(
            ticket_id = %id,
            category = %request.category,
            requires_approval = request.requires_approval,
            "ticket filed"
        );

        Ok(TicketReceipt {
            ticket_id: id,
            accepted: true,
            status,
        })
    }
}
