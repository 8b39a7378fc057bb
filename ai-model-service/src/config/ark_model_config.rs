use crate::error_handler::{AiModelError, ConfigError, validate_http_endpoint, validate_range_f32};

/// Configuration for a single Ark model invocation profile.
///
/// The same struct is used for the vision, solver, and embedding profiles;
/// only the model identifier and tuning knobs differ.
///
/// # Fields
///
/// - `model`: The model identifier (e.g., `"doubao-seed-1-6-vision-250815"`).
/// - `endpoint`: Base URL of the Ark API (e.g., `https://ark.cn-beijing.volces.com/api/v3`).
/// - `api_key`: API key for the Ark console account.
/// - `max_tokens`: Maximum number of tokens to generate (if supported).
/// - `temperature`: Controls randomness (0.0 = deterministic).
/// - `top_p`: Nucleus sampling cutoff (alternative to temperature).
/// - `timeout_secs`: Optional request timeout in seconds.
#[derive(Debug, Clone, PartialEq)]
pub struct ArkModelConfig {
    /// Model identifier string.
    pub model: String,

    /// Ark API base URL (without the trailing route segments).
    pub endpoint: String,

    /// API key for bearer authentication.
    pub api_key: Option<String>,

    /// Maximum number of tokens to generate.
    pub max_tokens: Option<u32>,

    /// Sampling temperature (controls creativity).
    pub temperature: Option<f32>,

    /// Nucleus sampling parameter.
    pub top_p: Option<f32>,

    /// Optional request timeout (in seconds).
    pub timeout_secs: Option<u64>,
}

impl ArkModelConfig {
    /// Validates the config fields that commonly go wrong.
    ///
    /// # Errors
    /// - [`ConfigError::EmptyModel`] if `model` is empty
    /// - [`ConfigError::InvalidFormat`] if `endpoint` has no http/https scheme
    /// - [`ConfigError::OutOfRange`] if `temperature` is outside `0.0..=2.0`
    ///   or `top_p` outside `0.0..=1.0`
    pub fn validate(&self) -> Result<(), AiModelError> {
        if self.model.trim().is_empty() {
            return Err(ConfigError::EmptyModel.into());
        }
        validate_http_endpoint("ARK_BASE_URL", self.endpoint.trim())?;
        if let Some(t) = self.temperature {
            validate_range_f32("temperature", t, 0.0, 2.0)?;
        }
        if let Some(p) = self.top_p {
            validate_range_f32("top_p", p, 0.0, 1.0)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> ArkModelConfig {
        ArkModelConfig {
            model: "doubao-seed-1-6-vision-250815".into(),
            endpoint: "https://ark.cn-beijing.volces.com/api/v3".into(),
            api_key: Some("test-key".into()),
            max_tokens: None,
            temperature: Some(0.2),
            top_p: None,
            timeout_secs: Some(30),
        }
    }

    #[test]
    fn valid_config_passes() {
        assert!(base().validate().is_ok());
    }

    #[test]
    fn empty_model_is_rejected() {
        let cfg = ArkModelConfig {
            model: "  ".into(),
            ..base()
        };
        assert!(matches!(
            cfg.validate(),
            Err(AiModelError::Config(ConfigError::EmptyModel))
        ));
    }

    #[test]
    fn bad_scheme_is_rejected() {
        let cfg = ArkModelConfig {
            endpoint: "ark.cn-beijing.volces.com".into(),
            ..base()
        };
        assert!(matches!(
            cfg.validate(),
            Err(AiModelError::Config(ConfigError::InvalidFormat { .. }))
        ));
    }

    #[test]
    fn out_of_range_sampling_is_rejected() {
        let cfg = ArkModelConfig {
            temperature: Some(3.0),
            ..base()
        };
        assert!(cfg.validate().is_err());

        let cfg = ArkModelConfig {
            top_p: Some(1.2),
            ..base()
        };
        assert!(cfg.validate().is_err());
    }
}
