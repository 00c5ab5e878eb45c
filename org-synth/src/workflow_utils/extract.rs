//! JSON extraction from raw model responses
//!
//! Single-shot, no retries. The cleanup steps are idempotent, so running
//! [`clean_response`] on its own output changes nothing.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::SynthError;

/// How much surrounding text to tolerate around the JSON object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExtractMode {
    /// Fence and control-character cleanup only
    #[default]
    Strict,
    /// Additionally keep only the span from the first `{` to the last `}`
    BraceSpan,
}

/// Strip a single leading ```` ```json ```` / ```` ``` ```` fence and a single
/// trailing ```` ``` ````, if present.
pub fn strip_fence(text: &str) -> &str {
    let mut body = text.trim();
    if let Some(rest) = body.strip_prefix("```json") {
        body = rest;
    } else if let Some(rest) = body.strip_prefix("```") {
        body = rest;
    }
    if let Some(rest) = body.strip_suffix("```") {
        body = rest;
    }
    body.trim()
}

/// Remove every ASCII control character (newlines and tabs included).
///
/// Models sometimes emit raw newlines inside string values, which JSON
/// forbids; whitespace between tokens is not needed by the parser.
pub fn strip_control_chars(text: &str) -> String {
    text.chars().filter(|c| !c.is_ascii_control()).collect()
}

/// The span from the first `{` to the last `}` inclusive
pub fn brace_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end >= start).then(|| &text[start..=end])
}

/// Apply the cleanup steps for `mode` without parsing
pub fn clean_response(raw: &str, mode: ExtractMode) -> String {
    let cleaned = strip_control_chars(strip_fence(raw));
    match mode {
        ExtractMode::Strict => cleaned,
        ExtractMode::BraceSpan => brace_span(&cleaned)
            .map(str::to_string)
            .unwrap_or(cleaned),
    }
}

/// Clean and parse into an untyped JSON value
pub fn extract_json(raw: &str, mode: ExtractMode) -> Result<Value, SynthError> {
    let cleaned = clean_response(raw, mode);
    serde_json::from_str(&cleaned).map_err(|e| SynthError::malformed(e.to_string(), &cleaned))
}

/// Clean and parse into `T`; a shape mismatch is reported as malformed
pub fn parse_response<T: DeserializeOwned>(raw: &str, mode: ExtractMode) -> Result<T, SynthError> {
    let value = extract_json(raw, mode)?;
    serde_json::from_value(value).map_err(|e| {
        SynthError::malformed(
            format!("unexpected response shape: {}", e),
            &clean_response(raw, mode),
        )
    })
}
