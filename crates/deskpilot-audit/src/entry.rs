//! Ledger entry and export types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use deskpilot_contracts::provenance::ProvenanceRecord;

/// One provenance record in the hash chain.
///
/// Changing any field, including anything inside `record`, invalidates
/// `this_hash` and every later `prev_hash`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Position in the ledger, starting at 0.
    pub sequence: u64,

    pub ledger_id: String,

    pub record: ProvenanceRecord,

    /// `this_hash` of the previous entry, or `GENESIS_HASH` for the first.
    pub prev_hash: String,

    /// Hex SHA-256 over (ledger_id, sequence, prev_hash, record JSON).
    pub this_hash: String,
}

impl LedgerEntry {
    /// `prev_hash` of the first entry in every ledger.
    pub const GENESIS_HASH: &'static str =
        "0000000000000000000000000000000000000000000000000000000000000000";
}

/// A point-in-time copy of the whole ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerExport {
    pub ledger_id: String,
    pub entries: Vec<LedgerEntry>,
    pub exported_at: DateTime<Utc>,
    /// `this_hash` of the last entry; empty when the ledger is empty.
    pub head_hash: String,
}
