//! The review schema applied to retrieval output, and its semantic rules.

use std::collections::HashSet;

use serde_json::{json, Value};

use deskpilot_contracts::review::{ReviewRule, ReviewRuleType, ReviewSchema};

use crate::engine::CustomRuleFn;

pub const RETRIEVAL_SCHEMA_ID: &str = "retrieval-review-v1";

/// Function name of the built-in score ordering rule.
pub const SCORES_NON_INCREASING: &str = "scores-non-increasing";

/// Function name of the allowlist rule; registered per deployment.
pub const SOURCES_ALLOWLISTED: &str = "sources-allowlisted";

/// Schema for a serialized `RetrievalResult`.
///
/// `max_results` bounds the passage count; it should match the retriever's.
pub fn retrieval_review_schema(max_results: usize) -> ReviewSchema {
    ReviewSchema {
        schema_id: RETRIEVAL_SCHEMA_ID.to_string(),
        json_schema: json!({
            "type": "object",
            "required": ["passages", "sources", "total_results"],
            "properties": {
                "passages": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "required": ["id", "content", "source", "score", "metadata"],
                        "properties": {
                            "id": { "type": "string" },
                            "content": { "type": "string" },
                            "source": { "type": "string" },
                            "score": { "type": "number", "minimum": 0.0, "maximum": 1.0 }
                        }
                    }
                },
                "sources": { "type": "array", "items": { "type": "string" } },
                "total_results": { "type": "integer", "minimum": 0 }
            }
        }),
        rules: vec![
            ReviewRule {
                rule_id: "passages-capped".to_string(),
                description: "no more passages than the retriever may return".to_string(),
                rule_type: ReviewRuleType::MaxItems {
                    field_path: "passages".to_string(),
                    max: max_results,
                },
            },
            ReviewRule {
                rule_id: SCORES_NON_INCREASING.to_string(),
                description: "passage scores never increase along the ranking".to_string(),
                rule_type: ReviewRuleType::Custom {
                    function_name: SCORES_NON_INCREASING.to_string(),
                },
            },
            ReviewRule {
                rule_id: SOURCES_ALLOWLISTED.to_string(),
                description: "every cited source is an allowlisted document".to_string(),
                rule_type: ReviewRuleType::Custom {
                    function_name: SOURCES_ALLOWLISTED.to_string(),
                },
            },
        ],
    }
}

/// Fails when a passage score is higher than the one ranked before it.
pub fn scores_non_increasing(payload: &Value) -> Option<String> {
    let passages = payload.get("passages")?.as_array()?;
    let scores: Vec<f64> = passages
        .iter()
        .filter_map(|p| p.get("score").and_then(Value::as_f64))
        .collect();

    scores.windows(2).enumerate().find_map(|(i, w)| {
        (w[1] > w[0]).then(|| {
            format!(
                "passage {} scores {} above passage {} at {}",
                i + 1,
                w[1],
                i,
                w[0]
            )
        })
    })
}

/// Build the allowlist rule over the given document titles.
pub fn sources_allowlisted<I, S>(titles: I) -> CustomRuleFn
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let allowed: HashSet<String> = titles.into_iter().map(Into::into).collect();
    Box::new(move |payload: &Value| {
        let unknown: Vec<&str> = payload
            .get("sources")
            .and_then(Value::as_array)
            .map(|sources| {
                sources
                    .iter()
                    .filter_map(Value::as_str)
                    .filter(|s| !allowed.contains(*s))
                    .collect()
            })
            .unwrap_or_default();

        (!unknown.is_empty())
            .then(|| format!("sources not in the allowlist: {}", unknown.join(", ")))
    })
}
