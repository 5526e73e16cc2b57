//! Pluggable relevance ranking.
//!
//! A `Ranker` only orders documents it is handed; it never chooses which
//! documents exist. Swapping the keyword ranker for an embedding-backed one
//! therefore cannot widen what retrieval is allowed to see.

use serde::{Deserialize, Serialize};

use deskpilot_contracts::knowledge::PolicyDocument;

/// Ranking knobs shared by the retriever and the keyword ranker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Passages returned per query.
    pub max_results: usize,
    /// Score of the top-ranked match.
    pub baseline_score: f64,
    /// Score decrement per rank position.
    pub score_step: f64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            max_results: 5,
            baseline_score: 0.85,
            score_step: 0.05,
        }
    }
}

/// One ranked hit: an index into the slice passed to `rank`, and its score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankedMatch {
    pub index: usize,
    pub score: f64,
}

pub trait Ranker: Send + Sync {
    /// Return the matching documents, best first.
    fn rank(&self, query: &str, documents: &[&PolicyDocument]) -> Vec<RankedMatch>;
}

/// Case-insensitive keyword containment.
///
/// A document matches when its title, body, or tags contain any query term.
/// Matches keep collection order and are scored by position:
/// `baseline - step × rank`.
#[derive(Debug, Clone, Default)]
pub struct KeywordRanker {
    config: RetrievalConfig,
}

impl KeywordRanker {
    pub fn new(config: RetrievalConfig) -> Self {
        Self { config }
    }
}

impl Ranker for KeywordRanker {
    fn rank(&self, query: &str, documents: &[&PolicyDocument]) -> Vec<RankedMatch> {
        let terms = tokenize(query);
        if terms.is_empty() {
            return Vec::new();
        }

        documents
            .iter()
            .enumerate()
            .filter(|(_, doc)| {
                let text = doc.search_text().to_lowercase();
                terms.iter().any(|t| text.contains(t.as_str()))
            })
            .enumerate()
            .map(|(rank, (index, _))| RankedMatch {
                index,
                score: (self.config.baseline_score - self.config.score_step * rank as f64)
                    .clamp(0.0, 1.0),
            })
            .collect()
    }
}

/// Lowercase, split on whitespace, trim surrounding punctuation, drop empties.
pub fn tokenize(query: &str) -> Vec<String> {
    query
        .to_lowercase()
        .split_whitespace()
        .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric()).to_string())
        .filter(|t| !t.is_empty())
        .collect()
}
