//! Runtime configuration loaded from environment variables.

use std::time::Duration;

use crate::error::PipelineConfigError;
use crate::retry::RetryPolicy;

/// Knobs for one pipeline instance. All fields have defaults via `from_env`.
#[derive(Clone, Debug, PartialEq)]
pub struct PipelineConfig {
    /// Candidates fetched from the index per query.
    pub top_k: usize,
    /// Relevance floor; weaker hits never reach the prompt.
    pub min_score: f32,
    /// Prompt budget in UTF-8 bytes.
    pub max_prompt_len: usize,
    /// Total generation attempts (first call included).
    pub generation_retry_count: u32,
    /// Per-attempt deadline for the generation call.
    pub generation_timeout_ms: u64,
    /// Deadline for the single OCR call.
    pub ocr_timeout_ms: u64,
    /// First retry delay; doubles per attempt.
    pub backoff_base_ms: u64,
    /// Cap on any single retry delay.
    pub backoff_cap_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            min_score: 0.2,
            max_prompt_len: 12_000,
            generation_retry_count: 3,
            generation_timeout_ms: 60_000,
            ocr_timeout_ms: 30_000,
            backoff_base_ms: 500,
            backoff_cap_ms: 10_000,
        }
    }
}

impl PipelineConfig {
    /// Build from environment variables with sensible defaults. Unparseable
    /// values fall back to the default silently.
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            top_k: parse("TOP_K", d.top_k),
            min_score: parse("MIN_SCORE", d.min_score),
            max_prompt_len: parse("MAX_PROMPT_CHARS", d.max_prompt_len),
            generation_retry_count: parse("GEN_RETRY_COUNT", d.generation_retry_count),
            generation_timeout_ms: parse("GEN_TIMEOUT_MS", d.generation_timeout_ms),
            ocr_timeout_ms: parse("OCR_TIMEOUT_MS", d.ocr_timeout_ms),
            backoff_base_ms: parse("GEN_BACKOFF_BASE_MS", d.backoff_base_ms),
            backoff_cap_ms: parse("GEN_BACKOFF_CAP_MS", d.backoff_cap_ms),
        }
    }

    /// Rejects values the pipeline cannot run with.
    ///
    /// # Errors
    /// Returns `PipelineConfigError::OutOfRange` naming the offending field.
    pub fn validate(&self) -> Result<(), PipelineConfigError> {
        if self.top_k == 0 {
            return Err(out_of_range("top_k", "must be at least 1"));
        }
        if !self.min_score.is_finite() {
            return Err(out_of_range("min_score", "must be a finite number"));
        }
        if self.max_prompt_len == 0 {
            return Err(out_of_range("max_prompt_len", "must be positive"));
        }
        if self.generation_retry_count == 0 {
            return Err(out_of_range(
                "generation_retry_count",
                "must allow at least one attempt",
            ));
        }
        if self.generation_timeout_ms == 0 || self.ocr_timeout_ms == 0 {
            return Err(out_of_range("timeouts", "must be positive milliseconds"));
        }
        Ok(())
    }

    pub fn ocr_timeout(&self) -> Duration {
        Duration::from_millis(self.ocr_timeout_ms)
    }

    pub fn generation_timeout(&self) -> Duration {
        Duration::from_millis(self.generation_timeout_ms)
    }

    /// Retry shape for the generation stage.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.generation_retry_count,
            base_delay: Duration::from_millis(self.backoff_base_ms),
            max_delay: Duration::from_millis(self.backoff_cap_ms),
        }
    }
}

fn out_of_range(field: &'static str, detail: &str) -> PipelineConfigError {
    PipelineConfigError::OutOfRange {
        field,
        detail: detail.to_string(),
    }
}

fn parse<T: std::str::FromStr>(k: &str, dflt: T) -> T {
    std::env::var(k)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(dflt)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_pass_validation() {
        let cfg = PipelineConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.top_k, 5);
        assert_eq!(cfg.retry_policy().max_attempts, 3);
    }

    #[test]
    fn zero_knobs_are_rejected() {
        let mut cfg = PipelineConfig::default();
        cfg.top_k = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = PipelineConfig::default();
        cfg.generation_retry_count = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = PipelineConfig::default();
        cfg.min_score = f32::NAN;
        assert!(cfg.validate().is_err());
    }
}
