//! JSON recovery from free-text model responses.
//!
//! Upstream models routinely wrap their JSON in prose or markdown fences.
//! [`extract_json`] tries three strategies in order and stops at the first
//! one that yields a JSON object:
//!
//! 1. The whole (trimmed) text.
//! 2. The lines between the first fence line and the next fence line.
//! 3. The span from the first `{` to the last `}`.

use serde_json::Value;
use thiserror::Error;

/// Number of characters of the offending input kept for diagnostics.
const SNIPPET_CHARS: usize = 200;

const FENCE: &str = "```";

/// No JSON object could be located in the response text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Could not extract valid JSON from response: {snippet}")]
pub struct ExtractionError {
    /// First 200 characters of the trimmed input
    pub snippet: String,
}

impl ExtractionError {
    fn for_content(content: &str) -> Self {
        Self {
            snippet: content.chars().take(SNIPPET_CHARS).collect(),
        }
    }
}

/// Extract a JSON object from an arbitrarily formatted response.
///
/// The returned value is always a `Value::Object`. Bare scalars or arrays
/// are not accepted as a grading payload.
pub fn extract_json(content: &str) -> Result<Value, ExtractionError> {
    let content = content.trim();

    if let Some(value) = parse_object(content) {
        return Ok(value);
    }

    if content.contains(FENCE) {
        if let Some(value) = fenced_block(content).and_then(|block| parse_object(&block)) {
            return Ok(value);
        }
    }

    if let Some(value) = brace_span(content).and_then(parse_object) {
        return Ok(value);
    }

    Err(ExtractionError::for_content(content))
}

fn parse_object(text: &str) -> Option<Value> {
    match serde_json::from_str::<Value>(text) {
        Ok(value @ Value::Object(_)) => Some(value),
        _ => None,
    }
}

/// Lines strictly between the first fence line and the next one.
///
/// An unterminated fence yields everything after the opening line.
fn fenced_block(content: &str) -> Option<String> {
    let mut inside = false;
    let mut lines = Vec::new();

    for line in content.lines() {
        if line.starts_with(FENCE) {
            if inside {
                break;
            }
            inside = true;
            continue;
        }
        if inside {
            lines.push(line);
        }
    }

    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

/// Greedy span from the first `{` to the last `}`.
fn brace_span(content: &str) -> Option<&str> {
    let start = content.find('{')?;
    let end = content.rfind('}')?;
    (start < end).then(|| &content[start..=end])
}
