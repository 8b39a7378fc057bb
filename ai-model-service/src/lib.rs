//! Shared client layer for the Volcengine Ark model API.
//!
//! The crate manages three logical model profiles used by the solving
//! pipeline:
//! - **vision**    → image-to-text recognition (chat completion with an image part)
//! - **solver**    → answer generation (plain chat completion)
//! - **embedding** → query embeddings for retrieval
//!
//! Construct [`ArkServiceProfiles`] once, wrap it in `Arc`, and pass clones
//! to dependents. HTTP clients are cached per config so repeated calls do not
//! rebuild connections. Errors are normalized through the unified types in
//! [`error_handler`].

pub mod config;
pub mod error_handler;
pub mod health_service;
pub mod service_profiles;
pub mod services;

pub use config::ark_model_config::ArkModelConfig;
pub use error_handler::{AiModelError, ConfigError, HealthError, ProviderError};
pub use health_service::{HealthService, HealthStatus};
pub use service_profiles::ArkServiceProfiles;
pub use services::ark_service::ArkService;
