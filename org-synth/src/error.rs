//! Error taxonomy shared by the generation layer, the validators and the
//! file boundary.

use thiserror::Error;

/// Characters of raw model output kept for diagnostics.
pub const PREVIEW_CHARS: usize = 500;

#[derive(Debug, Error)]
pub enum SynthError {
    /// Network or HTTP failure talking to the generation endpoint.
    #[error("transport error: {0}")]
    Transport(String),

    /// The endpoint answered but the content is not the expected structure.
    #[error("malformed response: {reason}")]
    MalformedResponse { reason: String, preview: String },

    /// Every attempt of a single call failed.
    #[error("exhausted {attempts} attempts, last error: {last}")]
    ExhaustedRetries {
        attempts: usize,
        last: Box<SynthError>,
    },

    /// A file on disk lacks an expected column or key.
    #[error("schema mismatch in {source_name}: {detail}")]
    SchemaMismatch { source_name: String, detail: String },

    /// A validator run under the abort policy found violations.
    #[error("constraint violation in {check}: {}", errors.join("; "))]
    ConstraintViolation { check: String, errors: Vec<String> },
}

impl SynthError {
    pub fn malformed(reason: impl Into<String>, raw: &str) -> Self {
        SynthError::MalformedResponse {
            reason: reason.into(),
            preview: preview(raw),
        }
    }

    pub fn schema(source_name: impl Into<String>, detail: impl Into<String>) -> Self {
        SynthError::SchemaMismatch {
            source_name: source_name.into(),
            detail: detail.into(),
        }
    }

    /// Whether a fresh attempt of the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SynthError::Transport(_) | SynthError::MalformedResponse { .. }
        )
    }
}

/// First [`PREVIEW_CHARS`] characters of `raw`, on a char boundary.
pub fn preview(raw: &str) -> String {
    raw.chars().take(PREVIEW_CHARS).collect()
}
