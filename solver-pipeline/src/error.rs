//! Typed errors for the solver pipeline crate.

use std::time::Duration;
use thiserror::Error;

/// OCR stage failures. These are terminal for the request; the pipeline
/// performs exactly one OCR attempt.
#[derive(Debug, Error)]
pub enum OcrError {
    /// Network or upstream failure while calling the vision model.
    #[error("OCR transport failure: {0}")]
    Transport(String),

    /// The vision call exceeded its per-attempt deadline.
    #[error("OCR timed out after {0:?}")]
    Timeout(Duration),

    /// The model answered, but with empty or whitespace-only text.
    #[error("OCR produced no text")]
    EmptyText,
}

/// Generation stage failures.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// Network or transient upstream failure.
    #[error("generation transport failure: {0}")]
    Transport(String),

    /// The generation call exceeded its per-attempt deadline.
    #[error("generation timed out after {0:?}")]
    Timeout(Duration),

    /// The upstream response could not be used (decode failures, rejected
    /// requests). Not retried.
    #[error("unusable generation response: {0}")]
    Malformed(String),

    /// The model completed but returned an empty answer.
    #[error("model returned an empty answer")]
    EmptyAnswer,
}

impl GenerationError {
    /// Only transient failures qualify for the bounded retry loop.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Timeout(_))
    }
}

/// The reserved prompt sections (problem text plus instruction template)
/// alone exceed the prompt budget. Retrieved passages are already dropped
/// before this is reported.
#[derive(Debug, Error)]
#[error("prompt exceeds budget: reserved sections need {got} bytes, limit is {limit}")]
pub struct PromptTooLongError {
    pub got: usize,
    pub limit: usize,
}

/// Invalid pipeline configuration values.
#[derive(Debug, Error)]
pub enum PipelineConfigError {
    #[error("`{field}` is out of range: {detail}")]
    OutOfRange {
        field: &'static str,
        detail: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transport_and_timeout_are_transient() {
        assert!(GenerationError::Transport("reset".into()).is_transient());
        assert!(GenerationError::Timeout(Duration::from_secs(1)).is_transient());
        assert!(!GenerationError::Malformed("bad json".into()).is_transient());
        assert!(!GenerationError::EmptyAnswer.is_transient());
    }

    #[test]
    fn prompt_too_long_reports_both_sizes() {
        let err = PromptTooLongError { got: 900, limit: 100 };
        let msg = err.to_string();
        assert!(msg.contains("900"));
        assert!(msg.contains("100"));
    }
}
