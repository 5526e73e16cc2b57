//! Hash-chain primitives.
//!
//! Hash input layout (bytes, in order):
//!   1. ledger_id as UTF-8 bytes
//!   2. sequence as 8-byte little-endian
//!   3. prev_hash as UTF-8 bytes (64 ASCII hex chars)
//!   4. compact JSON of the record

use sha2::{Digest, Sha256};

use deskpilot_contracts::{
    error::{DeskpilotError, DeskpilotResult},
    provenance::ProvenanceRecord,
};

use crate::entry::LedgerEntry;

/// Lowercase hex SHA-256 for one ledger entry.
pub fn hash_entry(
    ledger_id: &str,
    sequence: u64,
    record: &ProvenanceRecord,
    prev_hash: &str,
) -> DeskpilotResult<String> {
    let record_json = serde_json::to_vec(record).map_err(|e| DeskpilotError::LedgerWriteFailed {
        reason: format!("record {} is not serializable: {}", record.request_id, e),
    })?;

    let mut hasher = Sha256::new();
    hasher.update(ledger_id.as_bytes());
    hasher.update(sequence.to_le_bytes());
    hasher.update(prev_hash.as_bytes());
    hasher.update(&record_json);

    Ok(hex::encode(hasher.finalize()))
}

/// Sequence number of the first entry that breaks the chain, if any.
///
/// An entry breaks the chain when its `sequence` is out of place, its
/// `prev_hash` does not match the previous entry's `this_hash` (or
/// `GENESIS_HASH` for the first), or its `this_hash` does not recompute.
pub fn find_break(entries: &[LedgerEntry]) -> Option<u64> {
    let mut expected_prev = LedgerEntry::GENESIS_HASH;

    for (position, entry) in entries.iter().enumerate() {
        if entry.sequence != position as u64 || entry.prev_hash != expected_prev {
            return Some(entry.sequence);
        }

        match hash_entry(&entry.ledger_id, entry.sequence, &entry.record, &entry.prev_hash) {
            Ok(recomputed) if recomputed == entry.this_hash => {}
            _ => return Some(entry.sequence),
        }

        expected_prev = entry.this_hash.as_str();
    }

    None
}

/// True when the chain is intact. An empty chain is intact.
pub fn verify_chain(entries: &[LedgerEntry]) -> bool {
    find_break(entries).is_none()
}
