//! In-memory `ProvenanceSink`.
//!
//! Entries live in a `Vec` behind a `Mutex`, so one ledger can be shared by
//! every copilot handling requests concurrently. Use `export()` for a sealed
//! copy and `verify_integrity()` to confirm nothing was altered in place.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use tracing::{debug, warn};

use deskpilot_contracts::{
    error::{DeskpilotError, DeskpilotResult},
    provenance::ProvenanceRecord,
};
use deskpilot_core::traits::ProvenanceSink;

use crate::{
    chain::{find_break, hash_entry},
    entry::{LedgerEntry, LedgerExport},
};

// ── Internal mutable state ────────────────────────────────────────────────────

pub(crate) struct LedgerState {
    pub(crate) entries: Vec<LedgerEntry>,
    /// `this_hash` of the last entry, or `GENESIS_HASH` when empty.
    pub(crate) head_hash: String,
}

// ── Public ledger ─────────────────────────────────────────────────────────────

/// Append-only provenance ledger backed by a SHA-256 hash chain.
#[derive(Clone)]
pub struct InMemoryProvenanceLedger {
    ledger_id: String,
    pub(crate) state: Arc<Mutex<LedgerState>>,
}

impl InMemoryProvenanceLedger {
    pub fn new(ledger_id: impl Into<String>) -> Self {
        Self {
            ledger_id: ledger_id.into(),
            state: Arc::new(Mutex::new(LedgerState {
                entries: Vec::new(),
                head_hash: LedgerEntry::GENESIS_HASH.to_string(),
            })),
        }
    }

    pub fn ledger_id(&self) -> &str {
        &self.ledger_id
    }

    /// Read access for inspection. A poisoned lock still yields the entries:
    /// `append` never leaves the state half-written.
    fn read(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn export(&self) -> LedgerExport {
        let state = self.read();
        LedgerExport {
            ledger_id: self.ledger_id.clone(),
            entries: state.entries.clone(),
            exported_at: Utc::now(),
            head_hash: state
                .entries
                .last()
                .map(|e| e.this_hash.clone())
                .unwrap_or_default(),
        }
    }

    pub fn verify_integrity(&self) -> bool {
        let state = self.read();
        match find_break(&state.entries) {
            None => true,
            Some(sequence) => {
                warn!(ledger_id = %self.ledger_id, sequence, "provenance ledger chain broken");
                false
            }
        }
    }

    /// The most recent record for `request_id`.
    pub fn find(&self, request_id: &str) -> Option<ProvenanceRecord> {
        self.read()
            .entries
            .iter()
            .rev()
            .find(|e| e.record.request_id == request_id)
            .map(|e| e.record.clone())
    }

    pub fn len(&self) -> usize {
        self.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ── ProvenanceSink impl ───────────────────────────────────────────────────────

impl ProvenanceSink for InMemoryProvenanceLedger {
    fn append(&self, record: &ProvenanceRecord) -> DeskpilotResult<()> {
        let mut state = self
            .state
            .lock()
            .map_err(|e| DeskpilotError::LedgerWriteFailed {
                reason: format!("ledger lock poisoned: {}", e),
            })?;

        let sequence = state.entries.len() as u64;
        let prev_hash = state.head_hash.clone();
        let this_hash = hash_entry(&self.ledger_id, sequence, record, &prev_hash)?;

        state.entries.push(LedgerEntry {
            sequence,
            ledger_id: self.ledger_id.clone(),
            record: record.clone(),
            prev_hash,
            this_hash: this_hash.clone(),
        });
        state.head_hash = this_hash;

        debug!(
            ledger_id = %self.ledger_id,
            request_id = %record.request_id,
            sequence,
            head_hash = %state.head_hash,
            "provenance record appended"
        );

        Ok(())
    }
}
