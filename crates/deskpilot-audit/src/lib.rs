//! # deskpilot-audit
//!
//! Append-only, SHA-256 hash-chained provenance ledger.
//!
//! Every record the copilot returns is appended as a [`LedgerEntry`] that
//! links to the previous entry by hash. Altering any stored record breaks
//! the chain, which [`verify_chain`] detects.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use deskpilot_audit::InMemoryProvenanceLedger;
//!
//! let ledger = Arc::new(InMemoryProvenanceLedger::new("servicedesk"));
//! let copilot = Copilot::new(supervisor).with_sink(ledger.clone());
//! copilot.process_query("What is the VPN access policy?").await;
//! assert!(ledger.verify_integrity());
//! ```

pub mod chain;
pub mod entry;
pub mod memory;

pub use chain::{find_break, hash_entry, verify_chain};
pub use entry::{LedgerEntry, LedgerExport};
pub use memory::InMemoryProvenanceLedger;

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread};

    use chrono::Utc;

    use deskpilot_contracts::{
        agent::RoleMap,
        plan::IntentType,
        provenance::{ProvenanceRecord, RequestOutcome},
    };
    use deskpilot_core::traits::ProvenanceSink;

    use super::{find_break, verify_chain, InMemoryProvenanceLedger, LedgerEntry};

    // ── Helpers ───────────────────────────────────────────────────────────────

    fn record(request_id: &str, response: &str) -> ProvenanceRecord {
        ProvenanceRecord {
            request_id: request_id.to_string(),
            timestamp: Utc::now(),
            user_query: "What is the VPN access policy?".to_string(),
            intent: IntentType::PolicyQa,
            outcome: RequestOutcome::Answered,
            agent_tasks: vec![],
            tool_executions: vec![],
            guard_results: vec![],
            final_response: response.to_string(),
            citations: vec![],
            model_versions: RoleMap::default(),
            prompt_versions: RoleMap::default(),
            total_cost: 0.03,
            total_latency_ms: 12,
        }
    }

    fn ledger_with(n: usize) -> InMemoryProvenanceLedger {
        let ledger = InMemoryProvenanceLedger::new("test-ledger");
        for i in 0..n {
            ledger.append(&record(&format!("req-{i}"), "ok")).unwrap();
        }
        ledger
    }

    // ── Chain ─────────────────────────────────────────────────────────────────

    #[test]
    fn test_chain_intact_after_appends() {
        let ledger = ledger_with(3);
        assert_eq!(ledger.len(), 3);
        assert!(ledger.verify_integrity());
    }

    #[test]
    fn test_genesis_and_linkage() {
        let export = ledger_with(3).export();
        assert_eq!(export.entries[0].prev_hash, LedgerEntry::GENESIS_HASH);
        for pair in export.entries.windows(2) {
            assert_eq!(pair[1].prev_hash, pair[0].this_hash);
        }
        for (i, e) in export.entries.iter().enumerate() {
            assert_eq!(e.sequence, i as u64);
            assert_eq!(e.this_hash.len(), 64);
        }
        assert_eq!(export.head_hash, export.entries[2].this_hash);
    }

    #[test]
    fn test_tampered_record_detected() {
        let ledger = ledger_with(3);
        {
            let mut state = ledger.state.lock().unwrap();
            state.entries[1].record.final_response = "TAMPERED".to_string();
        }
        assert!(!ledger.verify_integrity());
        assert_eq!(find_break(&ledger.export().entries), Some(1));
    }

    #[test]
    fn test_removed_entry_detected() {
        let mut entries = ledger_with(3).export().entries;
        entries.remove(1);
        assert!(!verify_chain(&entries));
    }

    #[test]
    fn test_empty_ledger_is_valid() {
        let ledger = InMemoryProvenanceLedger::new("empty");
        assert!(ledger.is_empty());
        assert!(ledger.verify_integrity());
        assert_eq!(ledger.export().head_hash, "");
        assert!(verify_chain(&[]));
    }

    // ── Lookup and sharing ────────────────────────────────────────────────────

    #[test]
    fn test_find_returns_latest_record() {
        let ledger = ledger_with(2);
        ledger.append(&record("req-0", "second answer")).unwrap();

        assert_eq!(ledger.find("req-0").unwrap().final_response, "second answer");
        assert_eq!(ledger.find("req-1").unwrap().final_response, "ok");
        assert!(ledger.find("req-missing").is_none());
    }

    #[test]
    fn test_concurrent_appends_keep_chain_intact() {
        let ledger = Arc::new(InMemoryProvenanceLedger::new("shared"));
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let ledger = Arc::clone(&ledger);
                thread::spawn(move || {
                    for i in 0..5 {
                        ledger.append(&record(&format!("req-{t}-{i}"), "ok")).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(ledger.len(), 20);
        assert!(ledger.verify_integrity());
    }

    #[test]
    fn test_export_serializes() {
        let export = ledger_with(1).export();
        let json = serde_json::to_value(&export).unwrap();
        assert_eq!(json["ledger_id"], "test-ledger");
        assert_eq!(json["entries"][0]["record"]["outcome"], "answered");
    }
}
