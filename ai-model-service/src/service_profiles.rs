//! Shared Ark service with three active profiles: `vision`, `solver`, and `embedding`.
//!
//! - Lives in the same Tokio runtime as the application.
//! - Construct once, wrap in `Arc`, and pass clones to dependents.
//! - Caches underlying HTTP clients per config (endpoint+model+key+timeout).
//! - Provides convenience methods for image recognition, generation, and embeddings.
//!
//! # Example
//! ```no_run
//! use std::sync::Arc;
//! use ai_model_service::service_profiles::ArkServiceProfiles;
//! use ai_model_service::config::default_config::{
//!     config_ark_embedding, config_ark_solver, config_ark_vision,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let svc = Arc::new(ArkServiceProfiles::new(
//!         config_ark_vision()?,
//!         config_ark_solver()?,
//!         config_ark_embedding()?,
//!         Some(10),
//!     )?);
//!
//!     let answer = svc.generate("1 + 1 = ?", None).await?;
//!     println!("SOLVER: {}", answer);
//!
//!     let emb = svc.embed("泰勒公式").await?;
//!     println!("Embedding dim = {}", emb.len());
//!
//!     let statuses = svc.health_all().await?;
//!     println!("Health = {:?}", statuses);
//!
//!     Ok(())
//! }
//! ```

use std::{
    collections::HashMap,
    hash::{Hash, Hasher},
    sync::Arc,
};

use tokio::sync::RwLock;

use crate::{
    config::ark_model_config::ArkModelConfig,
    error_handler::AiModelError,
    health_service::{HealthService, HealthStatus},
    services::ark_service::ArkService,
};

/// Shared service that manages three logical Ark profiles: **vision**,
/// **solver**, and **embedding**.
///
/// Internally, it caches [`ArkService`] clients keyed by their configuration
/// to avoid recreating HTTP clients on each call.
#[derive(Debug)]
pub struct ArkServiceProfiles {
    vision: ArkModelConfig,
    solver: ArkModelConfig,
    embedding: ArkModelConfig,

    clients: RwLock<HashMap<ClientKey, Arc<ArkService>>>,

    health: HealthService,
}

impl ArkServiceProfiles {
    /// Creates a new service with three profiles.
    ///
    /// - `vision`: profile for image-to-text recognition.
    /// - `solver`: profile for answer generation.
    /// - `embedding`: profile for query embeddings.
    /// - `health_timeout_secs`: optional timeout for the health checker.
    ///
    /// # Errors
    /// Returns [`AiModelError`] if a profile fails validation or the health
    /// client cannot be built.
    pub fn new(
        vision: ArkModelConfig,
        solver: ArkModelConfig,
        embedding: ArkModelConfig,
        health_timeout_secs: Option<u64>,
    ) -> Result<Self, AiModelError> {
        vision.validate()?;
        solver.validate()?;
        embedding.validate()?;

        Ok(Self {
            vision,
            solver,
            embedding,
            clients: RwLock::new(HashMap::new()),
            health: HealthService::new(health_timeout_secs)?,
        })
    }

    /// Recognizes an image using the **vision** profile.
    ///
    /// # Arguments
    /// - `image`: raw image bytes.
    /// - `mime`: image MIME type (e.g., `image/png`).
    /// - `instruction`: textual instruction sent alongside the image.
    ///
    /// # Errors
    /// Returns [`AiModelError`] if recognition fails.
    pub async fn recognize_image(
        &self,
        image: &[u8],
        mime: &str,
        instruction: &str,
    ) -> Result<String, AiModelError> {
        let cli = self.get_or_init(&self.vision).await?;
        cli.recognize_image(image, mime, instruction).await
    }

    /// Generates text using the **solver** profile.
    ///
    /// # Arguments
    /// - `prompt`: input text prompt.
    /// - `system`: optional system instruction.
    ///
    /// # Errors
    /// Returns [`AiModelError`] if generation fails.
    pub async fn generate(&self, prompt: &str, system: Option<&str>) -> Result<String, AiModelError> {
        let cli = self.get_or_init(&self.solver).await?;
        cli.generate(prompt, system).await
    }

    /// Computes embeddings using the **embedding** profile.
    ///
    /// # Arguments
    /// - `input`: text to embed.
    ///
    /// # Errors
    /// Returns [`AiModelError`] if embedding fails.
    pub async fn embed(&self, input: &str) -> Result<Vec<f32>, AiModelError> {
        let cli = self.get_or_init(&self.embedding).await?;
        cli.embeddings(input).await
    }

    /// Returns a health snapshot for all distinct profiles.
    ///
    /// Profiles sharing the same config are checked only once.
    pub async fn health_all(&self) -> Result<Vec<HealthStatus>, AiModelError> {
        let mut list = Vec::<ArkModelConfig>::with_capacity(3);
        list.push(self.vision.clone());
        if self.solver != self.vision {
            list.push(self.solver.clone());
        }
        if self.embedding != self.vision && self.embedding != self.solver {
            list.push(self.embedding.clone());
        }
        Ok(self.health.check_many(&list).await)
    }

    /// Returns references to the current profiles `(vision, solver, embedding)`.
    pub fn profiles(&self) -> (&ArkModelConfig, &ArkModelConfig, &ArkModelConfig) {
        (&self.vision, &self.solver, &self.embedding)
    }

    /* --------------------- Internals --------------------- */

    /// Returns a cached client for the config, creating it under the write
    /// lock on first use (double-checked so concurrent callers share one).
    async fn get_or_init(&self, cfg: &ArkModelConfig) -> Result<Arc<ArkService>, AiModelError> {
        let key = ClientKey::from(cfg);
        if let Some(cli) = self.clients.read().await.get(&key).cloned() {
            return Ok(cli);
        }
        let mut w = self.clients.write().await;
        if let Some(cli) = w.get(&key).cloned() {
            return Ok(cli);
        }
        let cli = Arc::new(ArkService::new(cfg.clone())?);
        w.insert(key, cli.clone());
        Ok(cli)
    }
}

/// Internal cache key to identify unique client configs.
#[derive(Clone, Debug, Eq)]
struct ClientKey {
    endpoint: String,
    model: String,
    api_key: Option<String>,
    timeout: Option<u64>,
}

impl From<&ArkModelConfig> for ClientKey {
    fn from(cfg: &ArkModelConfig) -> Self {
        Self {
            endpoint: cfg.endpoint.clone(),
            model: cfg.model.clone(),
            api_key: cfg.api_key.clone(),
            timeout: cfg.timeout_secs,
        }
    }
}

impl PartialEq for ClientKey {
    fn eq(&self, other: &Self) -> bool {
        self.endpoint == other.endpoint
            && self.model == other.model
            && self.api_key == other.api_key
            && self.timeout == other.timeout
    }
}

impl Hash for ClientKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.endpoint.hash(state);
        self.model.hash(state);
        if let Some(ref k) = self.api_key {
            k.hash(state);
        } else {
            0usize.hash(state);
        }
        self.timeout.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(model: &str) -> ArkModelConfig {
        ArkModelConfig {
            model: model.into(),
            endpoint: "https://ark.cn-beijing.volces.com/api/v3".into(),
            api_key: Some("test-key".into()),
            max_tokens: None,
            temperature: Some(0.2),
            top_p: None,
            timeout_secs: Some(5),
        }
    }

    #[tokio::test]
    async fn clients_are_cached_per_config() {
        let svc = ArkServiceProfiles::new(
            cfg("doubao-seed-1-6-vision-250815"),
            cfg("doubao-seed-1-6-vision-250815"),
            cfg("doubao-embedding-text-240715"),
            None,
        )
        .unwrap();

        let a = svc.get_or_init(&svc.vision).await.unwrap();
        let b = svc.get_or_init(&svc.solver).await.unwrap();
        // Same config, same underlying client.
        assert!(Arc::ptr_eq(&a, &b));

        let c = svc.get_or_init(&svc.embedding).await.unwrap();
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(svc.clients.read().await.len(), 2);
    }

    #[test]
    fn invalid_profile_fails_construction() {
        let mut bad = cfg("solver");
        bad.model = String::new();
        assert!(ArkServiceProfiles::new(cfg("v"), bad, cfg("e"), None).is_err());
    }
}
