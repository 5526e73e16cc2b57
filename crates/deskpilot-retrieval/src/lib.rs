//! # deskpilot-retrieval
//!
//! Scoped retrieval over an allowlisted knowledge base.
//!
//! - [`KnowledgeBase`] holds the only documents retrieval can ever see.
//! - [`Ranker`] orders them for a query; [`KeywordRanker`] is the built-in
//!   case-insensitive keyword ranker.
//! - [`ScopedRetriever`] implements
//!   [`Retriever`](deskpilot_core::traits::Retriever) on top of both.

pub mod knowledge_base;
pub mod ranker;
pub mod retriever;

pub use knowledge_base::KnowledgeBase;
pub use ranker::{tokenize, KeywordRanker, RankedMatch, Ranker, RetrievalConfig};
pub use retriever::ScopedRetriever;

// ── Tests ─────────────────────────────────────────────────────────────────────
