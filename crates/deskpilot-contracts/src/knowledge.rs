//! Knowledge-source collaborator types.
//!
//! The retriever only ever reads documents through an allowlisted
//! collection built from these types; there is no field a caller can use to
//! point retrieval at an arbitrary URL.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyCategory {
    Hr,
    It,
    Security,
    Travel,
    Benefits,
    Compliance,
    General,
}

/// A titled section of a policy document. Sections may nest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicySection {
    pub id: String,
    pub title: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subsections: Vec<PolicySection>,
}

/// One approved HR/IT policy document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyDocument {
    pub id: String,
    pub title: String,
    pub category: PolicyCategory,
    pub version: String,
    pub last_updated: DateTime<Utc>,
    pub approved_by: String,
    /// Top-level summary used when the document has no sections.
    pub content: String,
    /// Ordered sections; the first one is the document's lead passage.
    pub sections: Vec<PolicySection>,
    pub tags: Vec<String>,
    pub allowlisted: bool,
    /// The `KnowledgeSource` this document was indexed from.
    pub source_id: String,
}

impl PolicyDocument {
    /// Text the keyword ranker searches: title, body, and tags.
    pub fn search_text(&self) -> String {
        format!("{} {} {}", self.title, self.content, self.tags.join(" "))
    }

    /// The content and section title of the lead passage.
    ///
    /// Falls back to the top-level content when the document has no sections.
    pub fn lead_passage(&self) -> (&str, Option<&str>) {
        match self.sections.first() {
            Some(section) => (section.content.as_str(), Some(section.title.as_str())),
            None => (self.content.as_str(), None),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Sharepoint,
    Confluence,
    Handbook,
    Sop,
    Faq,
}

/// A registered repository of documents (handbook, wiki space, FAQ, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeSource {
    pub id: String,
    pub name: String,
    pub kind: SourceKind,
    pub url: String,
    pub last_indexed: DateTime<Utc>,
    pub document_count: u32,
    pub allowlisted: bool,
}
