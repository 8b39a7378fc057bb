//! Unified error handling for `ai-model-service`.
//!
//! This module exposes a single top-level error type [`AiModelError`] for the
//! whole library, and groups domain-specific errors in nested enums
//! ([`ConfigError`], [`HealthError`], [`ProviderError`]). Small helpers for
//! reading/validating environment variables are provided and return the
//! unified [`Result<T>`] alias.
//!
//! All messages include the prefix `[AI Model Service]` to simplify
//! attribution in logs.

use std::fmt;

use reqwest::StatusCode;
use thiserror::Error;

/* ------------------------------------------------------------------------- */
/* Public result alias                                                       */
/* ------------------------------------------------------------------------- */

/// Unified result alias for the entire crate.
pub type Result<T> = std::result::Result<T, AiModelError>;

/* ------------------------------------------------------------------------- */
/* Top-level error                                                           */
/* ------------------------------------------------------------------------- */

/// Top-level error for the `ai-model-service` crate.
///
/// Variants wrap domain-specific enums (config/health/provider) plus the raw
/// HTTP transport case. Prefer adding new sub-enums for distinct domains
/// instead of growing this type indefinitely.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum AiModelError {
    /// Configuration/validation errors (startup/readiness).
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Health-check/connectivity/decoding errors.
    #[error(transparent)]
    Health(#[from] HealthError),

    /// Underlying HTTP transport error (e.g., `reqwest::Error`).
    #[error("[AI Model Service] transport error: {0}")]
    HttpTransport(#[from] reqwest::Error),

    /// Errors reported by the Ark API surface itself.
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl AiModelError {
    /// Whether a retry of the same request could plausibly succeed.
    ///
    /// Transient: transport failures (timeout/connect), HTTP 408/429 and any
    /// 5xx. Everything else (auth, decode, empty payloads, config) is
    /// considered permanent.
    pub fn is_transient(&self) -> bool {
        match self {
            AiModelError::HttpTransport(e) => e.is_timeout() || e.is_connect(),
            AiModelError::Provider(ProviderError::HttpStatus(http)) => {
                http.status.is_server_error()
                    || http.status == StatusCode::REQUEST_TIMEOUT
                    || http.status == StatusCode::TOO_MANY_REQUESTS
            }
            _ => false,
        }
    }
}

/* ------------------------------------------------------------------------- */
/* Config errors                                                             */
/* ------------------------------------------------------------------------- */

/// Error enum for environment/config-driven setup.
///
/// Keep this focused: only errors that realistically happen at config
/// load/validation time.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable is missing or empty.
    #[error("[AI Model Service] missing required environment variable: {0}")]
    MissingVar(&'static str),

    /// A number failed to parse (like limits or timeouts).
    #[error("[AI Model Service] invalid number in {var}: {reason}")]
    InvalidNumber {
        /// Variable name (e.g., `LLM_MAX_TOKENS`).
        var: &'static str,
        /// Human-readable reason (e.g., `expected u32`).
        reason: &'static str,
    },

    /// Value had the wrong format (e.g., invalid URL).
    #[error("[AI Model Service] invalid format in {var}: {reason}")]
    InvalidFormat {
        /// Variable name (e.g., `ARK_BASE_URL`).
        var: &'static str,
        /// Explanation (e.g., `must start with http:// or https://`).
        reason: &'static str,
    },

    /// A numeric field was outside of the allowed range.
    #[error("[AI Model Service] {field} is out of range: {detail}")]
    OutOfRange {
        /// Field name (e.g., `temperature`).
        field: &'static str,
        /// Description of the expected range (e.g., `expected 0.0..=2.0`).
        detail: &'static str,
    },

    /// Model name was empty or invalid.
    #[error("[AI Model Service] model name must not be empty")]
    EmptyModel,
}

/* ------------------------------------------------------------------------- */
/* Health errors                                                             */
/* ------------------------------------------------------------------------- */

/// Error enum for provider health checks.
///
/// Used by the health service to represent connectivity, protocol, and
/// decoding problems.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum HealthError {
    /// The endpoint is empty or does not start with http/https.
    #[error("[AI Model Service] invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// Upstream returned a non-successful HTTP status.
    #[error("[AI Model Service] {0}")]
    HttpStatus(HttpError),

    /// Response payload could not be decoded as expected.
    #[error("[AI Model Service] decode error: {0}")]
    Decode(String),
}

/* ------------------------------------------------------------------------- */
/* Provider errors                                                           */
/* ------------------------------------------------------------------------- */

/// Errors surfaced by the Ark API endpoints (`/chat/completions`,
/// `/embeddings`).
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The config did not carry an API key.
    #[error("[AI Model Service] missing Ark API key")]
    MissingApiKey,

    /// The endpoint is empty or does not start with http/https.
    #[error("[AI Model Service] invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// Upstream returned a non-successful HTTP status.
    #[error("[AI Model Service] {0}")]
    HttpStatus(HttpError),

    /// Response body could not be decoded into the expected shape.
    #[error("[AI Model Service] decode error: {0}")]
    Decode(String),

    /// Chat response carried no `choices[].message.content`.
    #[error("[AI Model Service] chat response contained no choices")]
    EmptyChoices,

    /// Embeddings response carried no `data[].embedding`.
    #[error("[AI Model Service] embeddings response contained no data")]
    EmptyEmbedding,
}

/// Common HTTP failure details shared by provider and health errors.
#[derive(Debug, Clone)]
pub struct HttpError {
    /// Numeric HTTP status code.
    pub status: StatusCode,
    /// Request URL.
    pub url: String,
    /// Short snippet of the response body (trimmed).
    pub snippet: String,
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP {} from {}: {}", self.status, self.url, self.snippet)
    }
}

/// Trims a response body into a short, single-line snippet for error
/// messages and logs.
pub fn make_snippet(text: &str) -> String {
    const MAX_LEN: usize = 240;
    let mut s = text.trim().replace(['\n', '\r'], " ");
    if s.len() > MAX_LEN {
        let mut cut = MAX_LEN;
        while cut > 0 && !s.is_char_boundary(cut) {
            cut -= 1;
        }
        s.truncate(cut);
        s.push('…');
    }
    s
}

/* ------------------------------------------------------------------------- */
/* Env helpers (return unified `Result<T>`)                                  */
/* ------------------------------------------------------------------------- */

/// Fetches a required, non-empty environment variable.
///
/// # Errors
/// Returns [`AiModelError::Config`] with [`ConfigError::MissingVar`] if the
/// variable is absent or empty.
pub fn must_env(name: &'static str) -> Result<String> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ConfigError::MissingVar(name).into()),
    }
}

/// Parses an optional `u32` from env (`Ok(None)` if unset/empty).
///
/// # Errors
/// Returns [`AiModelError::Config`] with [`ConfigError::InvalidNumber`] if
/// the variable is set but not a valid `u32`.
pub fn env_opt_u32(name: &'static str) -> Result<Option<u32>> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => v.parse::<u32>().map(Some).map_err(|_| {
            AiModelError::from(ConfigError::InvalidNumber {
                var: name,
                reason: "expected u32",
            })
        }),
        _ => Ok(None),
    }
}

/* ------------------------------------------------------------------------- */
/* Validation helpers (return unified `Result<T>`)                           */
/* ------------------------------------------------------------------------- */

/// Validates that an HTTP endpoint starts with `http://` or `https://`.
///
/// # Errors
/// Returns [`AiModelError::Config`] with [`ConfigError::InvalidFormat`] when
/// the string does not start with a valid HTTP scheme.
pub fn validate_http_endpoint(var: &'static str, value: &str) -> Result<()> {
    if value.starts_with("http://") || value.starts_with("https://") {
        Ok(())
    } else {
        Err(ConfigError::InvalidFormat {
            var,
            reason: "must start with http:// or https://",
        }
        .into())
    }
}

/// Validates that a floating-point value lies within an inclusive range.
///
/// Useful for parameters like `temperature` (e.g., `0.0..=2.0`) or `top_p`
/// (`0.0..=1.0`).
///
/// # Errors
/// Returns [`AiModelError::Config`] with [`ConfigError::OutOfRange`] if
/// `value` is not finite or outside `[min, max]`.
pub fn validate_range_f32(field: &'static str, value: f32, min: f32, max: f32) -> Result<()> {
    if value.is_finite() && value >= min && value <= max {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            detail: "expected value in inclusive range",
        }
        .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snippet_collapses_newlines_and_truncates() {
        let s = make_snippet("  line one\nline two\r\nline three  ");
        assert_eq!(s, "line one line two  line three");

        let long = "x".repeat(500);
        let s = make_snippet(&long);
        assert!(s.chars().count() <= 241);
        assert!(s.ends_with('…'));
    }

    #[test]
    fn snippet_respects_char_boundaries() {
        // Multibyte text around the cut point must not split a codepoint.
        let long = "数".repeat(200);
        let s = make_snippet(&long);
        assert!(s.ends_with('…'));
        assert!(s.chars().all(|c| c == '数' || c == '…'));
    }

    #[test]
    fn transient_classification_covers_status_codes() {
        let transient = AiModelError::from(ProviderError::HttpStatus(HttpError {
            status: StatusCode::SERVICE_UNAVAILABLE,
            url: "https://example/chat/completions".into(),
            snippet: String::new(),
        }));
        assert!(transient.is_transient());

        let throttled = AiModelError::from(ProviderError::HttpStatus(HttpError {
            status: StatusCode::TOO_MANY_REQUESTS,
            url: "https://example/chat/completions".into(),
            snippet: String::new(),
        }));
        assert!(throttled.is_transient());

        let auth = AiModelError::from(ProviderError::HttpStatus(HttpError {
            status: StatusCode::UNAUTHORIZED,
            url: "https://example/chat/completions".into(),
            snippet: String::new(),
        }));
        assert!(!auth.is_transient());

        let decode = AiModelError::from(ProviderError::Decode("bad json".into()));
        assert!(!decode.is_transient());
    }

    #[test]
    fn validate_range_rejects_non_finite() {
        assert!(validate_range_f32("temperature", 0.7, 0.0, 2.0).is_ok());
        assert!(validate_range_f32("temperature", f32::NAN, 0.0, 2.0).is_err());
        assert!(validate_range_f32("top_p", 1.5, 0.0, 1.0).is_err());
    }
}
