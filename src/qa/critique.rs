//! Critique of a drafted answer
//!
//! The critic is asked for `{"needs_revision": bool, "reasons": string}`.
//! Anything else is accepted as-is (no revision) and reported as defaulted.

use serde::Serialize;
use serde_json::Value;

use crate::core::outcome::ParseOutcome;

pub const PARSE_ERROR_REASON: &str = "parse_error";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Critique {
    pub needs_revision: bool,
    pub reasons: String,
}

impl Critique {
    /// Accept the draft
    pub fn accept(reasons: impl Into<String>) -> Self {
        Self {
            needs_revision: false,
            reasons: reasons.into(),
        }
    }
}

pub fn parse_critique(text: &str) -> ParseOutcome<Critique> {
    match try_parse(text.trim()) {
        Ok(critique) => ParseOutcome::Parsed(critique),
        Err(reason) => {
            tracing::warn!(reason = %reason, "unparseable critique, accepting draft");
            ParseOutcome::Defaulted {
                value: Critique::accept(PARSE_ERROR_REASON),
                reason,
            }
        }
    }
}

fn try_parse(text: &str) -> Result<Critique, String> {
    let value: Value = serde_json::from_str(text).map_err(|e| format!("invalid JSON: {}", e))?;
    let object = value
        .as_object()
        .ok_or_else(|| "critique is not a JSON object".to_string())?;

    let needs_revision = match object.get("needs_revision") {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(other) => return Err(format!("needs_revision is not a boolean: {}", other)),
    };

    let reasons = match object.get("reasons") {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    };

    Ok(Critique {
        needs_revision,
        reasons,
    })
}

/// Revise only while another iteration fits under `max_revisions`
/// (`QaConfig::max_revisions`)
pub fn should_revise(critique: &Critique, iteration: u32, max_revisions: u32) -> bool {
    critique.needs_revision && iteration.saturating_add(1) < max_revisions
}
