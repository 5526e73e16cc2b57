//! The allowlisted document collection.
//!
//! A `KnowledgeBase` is the only thing a retriever can search. It is built
//! once from registered sources and their documents; anything not
//! allowlisted, or belonging to a source that is not, is dropped at
//! construction and can never be returned.

use tracing::{debug, warn};

use deskpilot_contracts::knowledge::{KnowledgeSource, PolicyDocument};

#[derive(Debug, Clone, Default)]
pub struct KnowledgeBase {
    sources: Vec<KnowledgeSource>,
    documents: Vec<PolicyDocument>,
}

impl KnowledgeBase {
    /// Build the searchable collection, preserving document order.
    pub fn new(sources: Vec<KnowledgeSource>, documents: Vec<PolicyDocument>) -> Self {
        let sources: Vec<KnowledgeSource> = sources.into_iter().filter(|s| s.allowlisted).collect();

        let offered = documents.len();
        let documents: Vec<PolicyDocument> = documents
            .into_iter()
            .filter(|doc| {
                let source_ok = sources.iter().any(|s| s.id == doc.source_id);
                if !doc.allowlisted || !source_ok {
                    warn!(
                        document_id = %doc.id,
                        source_id = %doc.source_id,
                        "document excluded from knowledge base: not allowlisted"
                    );
                    return false;
                }
                true
            })
            .collect();

        debug!(
            sources = sources.len(),
            documents = documents.len(),
            excluded = offered - documents.len(),
            "knowledge base built"
        );

        Self { sources, documents }
    }

    pub fn documents(&self) -> &[PolicyDocument] {
        &self.documents
    }

    pub fn sources(&self) -> &[KnowledgeSource] {
        &self.sources
    }

    /// The allowlisted source that owns `document`.
    pub fn source_for(&self, document: &PolicyDocument) -> Option<&KnowledgeSource> {
        self.sources.iter().find(|s| s.id == document.source_id)
    }

    /// True if a document with this title is searchable.
    pub fn contains_title(&self, title: &str) -> bool {
        self.documents.iter().any(|d| d.title == title)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}
