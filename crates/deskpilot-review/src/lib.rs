//! # deskpilot-review
//!
//! The reviewer behind the `reviewer` task of a policy question plan.
//!
//! [`SchemaReviewer`] implements [`Reviewer`](deskpilot_core::traits::Reviewer):
//! a JSON Schema structural pass, then semantic rules (`MaxItems` and named
//! `Custom` functions).
//! [`retrieval_review_schema`] is the schema applied to retrieval output.
//! Its `sources-allowlisted` rule needs the deployment's document titles, so
//! the hosting application registers it:
//!
//! ```rust,ignore
//! use deskpilot_review::{rules, SchemaReviewer};
//!
//! let mut reviewer = SchemaReviewer::with_builtin_rules();
//! reviewer.register_rule(
//!     rules::SOURCES_ALLOWLISTED,
//!     rules::sources_allowlisted(["VPN Access Policy"]),
//! );
//! ```

pub mod engine;
pub mod rules;

pub use engine::{CustomRuleFn, SchemaReviewer};
pub use rules::retrieval_review_schema;

// ── Tests ─────────────────────────────────────────────────────────────────────
