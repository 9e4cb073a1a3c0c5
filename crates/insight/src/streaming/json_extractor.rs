//! Incremental JSON extraction from a partially streamed buffer
//!
//! The buffer is re-scanned from scratch after every appended chunk, so the
//! extraction must be pure: it never errors on a structurally incomplete
//! buffer and returns the same structure once the candidate object closes,
//! regardless of trailing text.

use crate::schema::ConversationInsights;
use tracing::trace;

/// Locate the first balanced `{...}` region in the text
///
/// Tracks nested-brace depth while skipping braces inside string literals
/// (including escape sequences). Returns the candidate substring at the first
/// position where depth returns to zero, or `None` while the object is still
/// open. A greedy regex would span past the intended object into unrelated
/// trailing braces, so the depth scan is load-bearing here.
fn find_balanced_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + i + 1]);
                }
            }
            _ => {}
        }
    }

    None
}

/// Try to recover a validated insight structure from the buffer
///
/// Returns `None` while the buffer holds no complete, well-shaped candidate.
/// Only the first balanced object is ever considered; later objects in the
/// same stream are ignored.
pub fn extract_insights(buffer: &str) -> Option<ConversationInsights> {
    let candidate = find_balanced_object(buffer)?;

    // Parse failure means the candidate is not valid JSON despite balanced
    // braces (e.g. truncated string content); not an error, just not ready.
    let value: serde_json::Value = match serde_json::from_str(candidate) {
        Ok(value) => value,
        Err(e) => {
            trace!("Candidate object is not parseable yet: {e}");
            return None;
        }
    };

    // Shape validation: missing required fields, wrong types or invalid enum
    // values disqualify the whole candidate.
    let insights: ConversationInsights = match serde_json::from_value(value) {
        Ok(insights) => insights,
        Err(e) => {
            trace!("Candidate object failed shape validation: {e}");
            return None;
        }
    };

    if !insights.is_well_formed() {
        trace!("Candidate object rejected: empty question text");
        return None;
    }

    Some(insights)
}
