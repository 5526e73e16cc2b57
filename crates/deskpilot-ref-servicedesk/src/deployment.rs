//! Wiring for the service-desk reference deployment.
//!
//! A `Deployment` owns the copilot together with inspectable handles to the
//! pieces a demo or test wants to look at afterwards: the provenance ledger,
//! the ticket desk, and the knowledge base.

use std::sync::Arc;

use deskpilot_audit::InMemoryProvenanceLedger;
use deskpilot_contracts::{
    error::DeskpilotResult,
    knowledge::{KnowledgeSource, PolicyDocument},
};
use deskpilot_core::{supervisor::Collaborators, Copilot, CopilotConfig, Supervisor};
use deskpilot_guard::RuleGuard;
use deskpilot_retrieval::{KnowledgeBase, RetrievalConfig, ScopedRetriever};
use deskpilot_review::{retrieval_review_schema, rules, SchemaReviewer};

use crate::{mock_data, ticketing::InMemoryTicketDesk};

/// Embedded copilot configuration for this deployment.
pub const SERVICEDESK_CONFIG: &str = include_str!("../config/servicedesk.toml");

pub fn servicedesk_config() -> DeskpilotResult<CopilotConfig> {
    CopilotConfig::from_toml_str(SERVICEDESK_CONFIG)
}

pub struct Deployment {
    pub copilot: Copilot,
    pub ledger: Arc<InMemoryProvenanceLedger>,
    pub desk: Arc<InMemoryTicketDesk>,
    pub knowledge: Arc<KnowledgeBase>,
}

impl Deployment {
    /// Assemble a copilot over `knowledge` with the given guard and desk.
    pub fn assemble(
        config: CopilotConfig,
        guard: RuleGuard,
        knowledge: KnowledgeBase,
        desk: InMemoryTicketDesk,
    ) -> Self {
        let retrieval = RetrievalConfig::default();
        let knowledge = Arc::new(knowledge);

        let mut reviewer = SchemaReviewer::with_builtin_rules();
        reviewer.register_rule(
            rules::SOURCES_ALLOWLISTED,
            rules::sources_allowlisted(knowledge.documents().iter().map(|d| d.title.clone())),
        );

        let desk = Arc::new(desk);
        let collaborators = Collaborators {
            guard: Arc::new(guard),
            retriever: Arc::new(ScopedRetriever::keyword(
                Arc::clone(&knowledge),
                retrieval.clone(),
            )),
            reviewer: Arc::new(reviewer),
            ticketing: desk.clone(),
        };

        let supervisor = Supervisor::new(
            config,
            collaborators,
            retrieval_review_schema(retrieval.max_results),
        );

        let ledger = Arc::new(InMemoryProvenanceLedger::new("servicedesk"));
        let copilot = Copilot::new(supervisor).with_sink(ledger.clone());

        Self {
            copilot,
            ledger,
            desk,
            knowledge,
        }
    }

    /// Embedded config, default guard rules, and the approved corpus.
    pub fn reference() -> DeskpilotResult<Self> {
        Self::with_corpus(mock_data::knowledge_sources(), mock_data::policies())
    }

    /// The approved corpus under a caller-supplied config and guard.
    pub fn customized(config: CopilotConfig, guard: RuleGuard) -> Self {
        Self::assemble(
            config,
            guard,
            KnowledgeBase::new(mock_data::knowledge_sources(), mock_data::policies()),
            InMemoryTicketDesk::new(),
        )
    }

    /// Like `reference`, but with the misfiled payroll runbook indexed first.
    pub fn with_misfiled_runbook() -> DeskpilotResult<Self> {
        Self::with_corpus(
            mock_data::knowledge_sources(),
            mock_data::policies_with_misfiled_runbook(),
        )
    }

    fn with_corpus(
        sources: Vec<KnowledgeSource>,
        documents: Vec<PolicyDocument>,
    ) -> DeskpilotResult<Self> {
        Ok(Self::assemble(
            servicedesk_config()?,
            RuleGuard::with_default_rules()?,
            KnowledgeBase::new(sources, documents),
            InMemoryTicketDesk::new(),
        ))
    }
}
