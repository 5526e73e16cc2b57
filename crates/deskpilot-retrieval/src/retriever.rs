//! `ScopedRetriever`: the `Retriever` implementation over a `KnowledgeBase`.

use std::{sync::Arc, time::Instant};

use async_trait::async_trait;
use tracing::debug;

use deskpilot_contracts::{
    error::DeskpilotResult,
    retrieval::{PassageMetadata, RetrievalResult, RetrievedPassage},
};
use deskpilot_core::traits::Retriever;

use crate::{
    knowledge_base::KnowledgeBase,
    ranker::{KeywordRanker, Ranker, RetrievalConfig},
};

/// Searches one fixed, allowlisted knowledge base.
///
/// Passages are built from each matched document's lead section (or its
/// top-level content when it has none), carry the owning source's URL, and
/// are returned in non-increasing score order.
pub struct ScopedRetriever<R = KeywordRanker> {
    knowledge: Arc<KnowledgeBase>,
    ranker: R,
    config: RetrievalConfig,
}

impl ScopedRetriever<KeywordRanker> {
    /// Keyword ranking with the given knobs.
    pub fn keyword(knowledge: Arc<KnowledgeBase>, config: RetrievalConfig) -> Self {
        Self::new(knowledge, KeywordRanker::new(config.clone()), config)
    }
}

impl<R: Ranker> ScopedRetriever<R> {
    pub fn new(knowledge: Arc<KnowledgeBase>, ranker: R, config: RetrievalConfig) -> Self {
        Self {
            knowledge,
            ranker,
            config,
        }
    }

    pub fn knowledge(&self) -> &KnowledgeBase {
        &self.knowledge
    }

    fn search(&self, query: &str) -> Vec<RetrievedPassage> {
        let documents: Vec<_> = self.knowledge.documents().iter().collect();
        let mut matches = self.ranker.rank(query, &documents);

        // Keep the ranker's order among equal scores, but never let a later
        // passage outrank an earlier one. Out-of-range indices are dropped.
        matches.retain(|m| m.index < documents.len());
        matches.sort_by(|a, b| b.score.total_cmp(&a.score));
        matches.truncate(self.config.max_results);

        matches
            .into_iter()
            .enumerate()
            .map(|(rank, m)| {
                let doc = documents[m.index];
                let (content, section) = doc.lead_passage();
                RetrievedPassage {
                    id: format!("passage-{}", rank),
                    content: content.to_string(),
                    source: doc.title.clone(),
                    score: m.score.clamp(0.0, 1.0),
                    metadata: PassageMetadata {
                        title: doc.title.clone(),
                        last_updated: doc.last_updated,
                        section: section.map(str::to_string),
                        url: self.knowledge.source_for(doc).map(|s| s.url.clone()),
                    },
                }
            })
            .collect()
    }
}

#[async_trait]
impl<R: Ranker> Retriever for ScopedRetriever<R> {
    async fn retrieve(&self, query: &str) -> DeskpilotResult<RetrievalResult> {
        let started = Instant::now();
        let passages = self.search(query);
        let query_latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        debug!(
            matches = passages.len(),
            top_score = passages.first().map(|p| p.score).unwrap_or(0.0),
            query_latency_ms,
            "retrieval finished"
        );

        Ok(RetrievalResult {
            sources: passages.iter().map(|p| p.source.clone()).collect(),
            total_results: passages.len(),
            passages,
            query_latency_ms,
        })
    }
}
