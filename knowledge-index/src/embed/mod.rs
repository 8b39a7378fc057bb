//! Embedding abstraction used by retrieval.
//!
//! Async is required because real providers perform HTTP requests.

use crate::errors::IndexError;
use std::{future::Future, pin::Pin};

/// Provider interface for query embedding.
///
/// Implement this trait to plug in another embedding backend. The pipeline
/// ships with the Ark adapter in [`ark`]; tests use in-process fakes.
pub trait EmbeddingsProvider: Send + Sync {
    /// Produces an embedding vector for the given text.
    fn embed<'a>(
        &'a self,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<f32>, IndexError>> + Send + 'a>>;
}

pub mod ark;
