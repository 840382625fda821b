//! Grounding context for answer generation

use serde_json::Value;

use crate::search::hybrid::FusedResult;

pub const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

/// Citation label: `recommendation_id`, then `id` metadata, then the result id
pub fn citation(result: &FusedResult) -> String {
    ["recommendation_id", "id"]
        .iter()
        .find_map(|key| match result.metadata.get(*key) {
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        })
        .unwrap_or_else(|| result.id.clone())
}

/// `[cite]\ntext` blocks joined by a horizontal rule
pub fn format_context(results: &[FusedResult]) -> String {
    results
        .iter()
        .map(|r| format!("[{}]\n{}", citation(r), r.text))
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR)
}
