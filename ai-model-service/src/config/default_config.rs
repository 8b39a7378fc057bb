//! Default Ark configs loaded strictly from environment variables.
//!
//! This module provides convenience constructors for [`ArkModelConfig`],
//! one per profile role:
//!
//! - **Vision**    → image-to-text recognition of problem photos
//! - **Solver**    → step-by-step answer generation
//! - **Embedding** → query embeddings for index retrieval
//!
//! # Environment variables
//!
//! Common:
//! - `ARK_API_KEY`    = Ark console API key (mandatory)
//! - `ARK_BASE_URL`   = API base URL (optional, Beijing region by default)
//! - `LLM_MAX_TOKENS` = optional max tokens (u32)
//!
//! Per profile:
//! - `ARK_VISION_MODEL`    = vision model id (optional)
//! - `ARK_SOLVER_MODEL`    = solver model id (optional)
//! - `ARK_EMBEDDING_MODEL` = embedding model id (optional)

use crate::{
    config::ark_model_config::ArkModelConfig,
    error_handler::{AiModelError, env_opt_u32, must_env},
};

/// Ark API base URL for the Beijing region, used when `ARK_BASE_URL` is unset.
pub const DEFAULT_ARK_BASE_URL: &str = "https://ark.cn-beijing.volces.com/api/v3";

/// Vision model used when `ARK_VISION_MODEL` is unset.
pub const DEFAULT_VISION_MODEL: &str = "doubao-seed-1-6-vision-250815";

/// Solver model used when `ARK_SOLVER_MODEL` is unset. The vision model
/// doubles as the solver; a dedicated text model can be configured instead.
pub const DEFAULT_SOLVER_MODEL: &str = "doubao-seed-1-6-vision-250815";

/// Embedding model used when `ARK_EMBEDDING_MODEL` is unset.
pub const DEFAULT_EMBEDDING_MODEL: &str = "doubao-embedding-text-240715";

/// Resolves the Ark endpoint from `ARK_BASE_URL`, falling back to the
/// Beijing-region default.
fn ark_endpoint() -> String {
    match std::env::var("ARK_BASE_URL") {
        Ok(url) if !url.trim().is_empty() => url,
        _ => DEFAULT_ARK_BASE_URL.to_string(),
    }
}

/// Resolves a model id from env with a fixed fallback.
fn model_or(var: &str, default: &str) -> String {
    match std::env::var(var) {
        Ok(v) if !v.trim().is_empty() => v,
        _ => default.to_string(),
    }
}

/// Constructs a config for the **vision** profile (problem recognition).
///
/// # Env
/// - `ARK_API_KEY` (required)
/// - `ARK_VISION_MODEL` (optional)
///
/// # Defaults
/// - `temperature = Some(0.2)` (faithful transcription, low creativity)
/// - `timeout_secs = Some(60)`
pub fn config_ark_vision() -> Result<ArkModelConfig, AiModelError> {
    let api_key = must_env("ARK_API_KEY")?;
    let max_tokens = env_opt_u32("LLM_MAX_TOKENS")?;

    let cfg = ArkModelConfig {
        model: model_or("ARK_VISION_MODEL", DEFAULT_VISION_MODEL),
        endpoint: ark_endpoint(),
        api_key: Some(api_key),
        max_tokens,
        temperature: Some(0.2),
        top_p: None,
        timeout_secs: Some(60),
    };
    cfg.validate()?;
    Ok(cfg)
}

/// Constructs a config for the **solver** profile (answer generation).
///
/// # Env
/// - `ARK_API_KEY` (required)
/// - `ARK_SOLVER_MODEL` (optional)
///
/// # Defaults
/// - `temperature = Some(0.3)`
/// - `timeout_secs = Some(120)` (long derivations)
pub fn config_ark_solver() -> Result<ArkModelConfig, AiModelError> {
    let api_key = must_env("ARK_API_KEY")?;
    let max_tokens = env_opt_u32("LLM_MAX_TOKENS")?;

    let cfg = ArkModelConfig {
        model: model_or("ARK_SOLVER_MODEL", DEFAULT_SOLVER_MODEL),
        endpoint: ark_endpoint(),
        api_key: Some(api_key),
        max_tokens,
        temperature: Some(0.3),
        top_p: None,
        timeout_secs: Some(120),
    };
    cfg.validate()?;
    Ok(cfg)
}

/// Constructs a config for the **embedding** profile (query vectors).
///
/// # Env
/// - `ARK_API_KEY` (required)
/// - `ARK_EMBEDDING_MODEL` (optional)
///
/// # Defaults
/// - `temperature = Some(0.0)` (deterministic)
/// - `timeout_secs = Some(30)`
pub fn config_ark_embedding() -> Result<ArkModelConfig, AiModelError> {
    let api_key = must_env("ARK_API_KEY")?;

    let cfg = ArkModelConfig {
        model: model_or("ARK_EMBEDDING_MODEL", DEFAULT_EMBEDDING_MODEL),
        endpoint: ark_endpoint(),
        api_key: Some(api_key),
        max_tokens: None,
        temperature: Some(0.0),
        top_p: None,
        timeout_secs: Some(30),
    };
    cfg.validate()?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error_handler::ConfigError;

    fn set(k: &str, v: &str) {
        unsafe { std::env::set_var(k, v) }
    }

    fn unset(k: &str) {
        unsafe { std::env::remove_var(k) }
    }

    // Single test so the process-global env is mutated from one thread only.
    #[test]
    fn profiles_from_env() {
        for var in [
            "ARK_API_KEY",
            "ARK_BASE_URL",
            "ARK_VISION_MODEL",
            "ARK_SOLVER_MODEL",
            "ARK_EMBEDDING_MODEL",
            "LLM_MAX_TOKENS",
        ] {
            unset(var);
        }

        let err = config_ark_solver().unwrap_err();
        assert!(matches!(
            err,
            AiModelError::Config(ConfigError::MissingVar("ARK_API_KEY"))
        ));

        set("ARK_API_KEY", "test-key");

        let vision = config_ark_vision().unwrap();
        assert_eq!(vision.model, DEFAULT_VISION_MODEL);
        assert_eq!(vision.endpoint, DEFAULT_ARK_BASE_URL);
        assert_eq!(vision.timeout_secs, Some(60));

        let embedding = config_ark_embedding().unwrap();
        assert_eq!(embedding.model, DEFAULT_EMBEDDING_MODEL);
        assert_eq!(embedding.temperature, Some(0.0));

        set("ARK_SOLVER_MODEL", "doubao-seed-1-6-250615");
        set("LLM_MAX_TOKENS", "2048");
        let solver = config_ark_solver().unwrap();
        assert_eq!(solver.model, "doubao-seed-1-6-250615");
        assert_eq!(solver.max_tokens, Some(2048));

        set("LLM_MAX_TOKENS", "not-a-number");
        assert!(config_ark_solver().is_err());

        for var in ["ARK_API_KEY", "ARK_SOLVER_MODEL", "LLM_MAX_TOKENS"] {
            unset(var);
        }
    }
}
