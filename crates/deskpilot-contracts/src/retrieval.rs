//! Retrieval result and citation types.
//!
//! A `RetrievalResult` is a ranked list of passages. Citations are the
//! user-facing view of its top entries, derived by [`generate_citations`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How many passages are turned into citations.
pub const CITATION_LIMIT: usize = 3;

/// Characters of passage content kept in a citation excerpt.
pub const EXCERPT_BUDGET_CHARS: usize = 150;

/// Marker appended to an excerpt that was cut short.
pub const ELLIPSIS: &str = "...";

/// Upper bound on the length of any excerpt, in chars.
pub const EXCERPT_MAX_CHARS: usize = EXCERPT_BUDGET_CHARS + ELLIPSIS.len();

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassageMetadata {
    pub title: String,
    pub last_updated: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    /// URL of the allowlisted source the document came from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// A scored excerpt of one knowledge document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedPassage {
    pub id: String,
    pub content: String,
    /// Title of the source document.
    pub source: String,
    /// Relevance in `[0, 1]`; non-increasing along the ranked list.
    pub score: f64,
    pub metadata: PassageMetadata,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub passages: Vec<RetrievedPassage>,
    /// Document titles in rank order.
    pub sources: Vec<String>,
    pub total_results: usize,
    pub query_latency_ms: u64,
}

impl RetrievalResult {
    /// Zero passages is a valid outcome, not a failure.
    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }

    pub fn top(&self) -> Option<&RetrievedPassage> {
        self.passages.first()
    }
}

/// User-facing evidence for an answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    pub id: String,
    pub source: String,
    pub title: String,
    /// At most `EXCERPT_MAX_CHARS` chars.
    pub excerpt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Copied from the passage score.
    pub confidence: f64,
}

impl Citation {
    pub fn from_passage(passage: &RetrievedPassage) -> Self {
        Self {
            id: passage.id.clone(),
            source: passage.source.clone(),
            title: passage.metadata.title.clone(),
            excerpt: truncate_excerpt(&passage.content),
            url: passage.metadata.url.clone(),
            confidence: passage.score,
        }
    }
}

/// Build citations from the top `CITATION_LIMIT` passages, keeping rank order.
pub fn generate_citations(result: &RetrievalResult) -> Vec<Citation> {
    result
        .passages
        .iter()
        .take(CITATION_LIMIT)
        .map(Citation::from_passage)
        .collect()
}

/// Cut `text` to `EXCERPT_BUDGET_CHARS` chars, appending `ELLIPSIS` if anything was dropped.
pub fn truncate_excerpt(text: &str) -> String {
    if text.chars().count() <= EXCERPT_BUDGET_CHARS {
        return text.to_string();
    }
    let mut excerpt: String = text.chars().take(EXCERPT_BUDGET_CHARS).collect();
    excerpt.push_str(ELLIPSIS);
    excerpt
}
