//! Ark embedding provider implementation.
//!
//! Bridges the shared Ark model service into the retrieval-side
//! [`EmbeddingsProvider`] trait and pins the vector dimension to the
//! loaded index.

use std::sync::Arc;

use crate::embed::EmbeddingsProvider;
use crate::errors::IndexError;
use ai_model_service::service_profiles::ArkServiceProfiles;

/// Configuration for the Ark embedding backend.
#[derive(Clone, Debug)]
pub struct ArkEmbedderConfig {
    pub svc: Arc<ArkServiceProfiles>,
    /// Expected embedding dimension, taken from the loaded index.
    pub dim: usize,
}

/// Ark embedding provider (async).
#[derive(Clone)]
pub struct ArkEmbedder {
    svc: Arc<ArkServiceProfiles>,
    dim: usize,
}

impl ArkEmbedder {
    /// Construct a new embedder from configuration.
    pub fn new(cfg: ArkEmbedderConfig) -> Self {
        Self {
            svc: cfg.svc,
            dim: cfg.dim,
        }
    }
}

impl EmbeddingsProvider for ArkEmbedder {
    fn embed<'a>(
        &'a self,
        text: &'a str,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Vec<f32>, IndexError>> + Send + 'a>,
    > {
        Box::pin(async move {
            let resp = self
                .svc
                .embed(text)
                .await
                .map_err(|e| IndexError::Embedding(e.to_string()))?;

            if resp.len() != self.dim {
                return Err(IndexError::DimensionMismatch {
                    got: resp.len(),
                    want: self.dim,
                });
            }

            Ok(resp)
        })
    }
}
