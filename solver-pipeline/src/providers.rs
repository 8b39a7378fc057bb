//! Model capabilities consumed by the pipeline, plus their Ark adapters.
//!
//! The pipeline depends on these traits, never on the Ark service directly,
//! so tests substitute in-process fakes.

use std::sync::Arc;
use std::{future::Future, pin::Pin};

use ai_model_service::error_handler::ProviderError;
use ai_model_service::{AiModelError, ArkServiceProfiles};

use crate::api_types::ImageFormat;
use crate::error::{GenerationError, OcrError};
use crate::prompt::OCR_INSTRUCTION;

/// Vision capability: extracts problem text from an image.
pub trait OcrProvider: Send + Sync {
    fn recognize<'a>(
        &'a self,
        image: &'a [u8],
        format: ImageFormat,
    ) -> Pin<Box<dyn Future<Output = Result<String, OcrError>> + Send + 'a>>;
}

/// Text generation capability: produces the final solution.
pub trait GenerationProvider: Send + Sync {
    fn generate<'a>(
        &'a self,
        prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String, GenerationError>> + Send + 'a>>;
}

/// OCR over the Ark vision profile.
#[derive(Clone)]
pub struct ArkOcr {
    svc: Arc<ArkServiceProfiles>,
}

impl ArkOcr {
    pub fn new(svc: Arc<ArkServiceProfiles>) -> Self {
        Self { svc }
    }
}

impl OcrProvider for ArkOcr {
    fn recognize<'a>(
        &'a self,
        image: &'a [u8],
        format: ImageFormat,
    ) -> Pin<Box<dyn Future<Output = Result<String, OcrError>> + Send + 'a>> {
        Box::pin(async move {
            self.svc
                .recognize_image(image, format.as_mime(), OCR_INSTRUCTION)
                .await
                .map_err(|e| OcrError::Transport(e.to_string()))
        })
    }
}

/// Generation over the Ark solver profile.
#[derive(Clone)]
pub struct ArkGeneration {
    svc: Arc<ArkServiceProfiles>,
}

impl ArkGeneration {
    pub fn new(svc: Arc<ArkServiceProfiles>) -> Self {
        Self { svc }
    }
}

impl GenerationProvider for ArkGeneration {
    fn generate<'a>(
        &'a self,
        prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String, GenerationError>> + Send + 'a>> {
        Box::pin(async move {
            self.svc
                .generate(prompt, None)
                .await
                .map_err(map_generation_err)
        })
    }
}

/// Classifies service errors for the retry loop: transient upstream trouble
/// becomes `Transport`, everything else is terminal.
fn map_generation_err(e: AiModelError) -> GenerationError {
    match &e {
        AiModelError::Provider(ProviderError::EmptyChoices) => GenerationError::EmptyAnswer,
        _ if e.is_transient() => GenerationError::Transport(e.to_string()),
        _ => GenerationError::Malformed(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_choices_become_empty_answer() {
        let err = map_generation_err(AiModelError::Provider(ProviderError::EmptyChoices));
        assert!(matches!(err, GenerationError::EmptyAnswer));
        assert!(!err.is_transient());
    }

    #[test]
    fn decode_failures_are_terminal() {
        let err = map_generation_err(AiModelError::Provider(ProviderError::Decode(
            "expected chat completion shape".into(),
        )));
        assert!(matches!(err, GenerationError::Malformed(_)));
        assert!(!err.is_transient());
    }

    #[test]
    fn config_failures_are_terminal() {
        let err = map_generation_err(AiModelError::Provider(ProviderError::MissingApiKey));
        assert!(matches!(err, GenerationError::Malformed(_)));
    }
}
