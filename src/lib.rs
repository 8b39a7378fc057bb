//! Backend for solving photographed math problems.
//!
//! The workspace splits the system into three members, and this crate ties
//! them together behind one entry point:
//!
//! - `ai-model-service`  → Ark vision / solver / embedding profiles over HTTP
//! - `knowledge-index`   → file-persisted embedding index with exact top-k search
//! - `solver-pipeline`   → staged solve flow (OCR → retrieval → assembly → generation)
//!
//! [`Solver::from_env`] assembles the full stack from environment variables
//! and the on-disk index; [`Solver::solve`] runs one photographed problem
//! through it.
//!
//! # Environment variables
//!
//! Beyond the Ark credentials read by `ai-model-service` and the pipeline
//! tuning knobs read by `solver-pipeline`:
//! - `INDEX_DIR` = index directory (default `index/math_knowledge`)
//!
//! # Example
//!
//! ```no_run
//! use math_solver_backend::{ImageFormat, SolveRequest, Solver};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let solver = Solver::from_env()?;
//!
//! let image = std::fs::read("problem.png")?;
//! let request = SolveRequest::new("req-1", image, ImageFormat::Png);
//!
//! let outcome = solver.solve(request).await;
//! println!("{:?}", outcome);
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use ai_model_service::config::default_config::{
    config_ark_embedding, config_ark_solver, config_ark_vision,
};
use knowledge_index::embed::ark::{ArkEmbedder, ArkEmbedderConfig};
use solver_pipeline::{ArkGeneration, ArkOcr};
use thiserror::Error;
use tracing::info;

pub use ai_model_service::{AiModelError, ArkModelConfig, ArkServiceProfiles, HealthStatus};
pub use knowledge_index::{IndexError, KnowledgeStore, Passage, ScoredPassage};
pub use solver_pipeline::{
    CancelToken, ConsoleProgress, ImageFormat, NoopProgress, PipelineConfig, PipelineConfigError,
    Progress, SolveOutcome, SolveRequest, SolverPipeline, Stage,
};

/// Index directory used when `INDEX_DIR` is unset.
pub const DEFAULT_INDEX_DIR: &str = "index/math_knowledge";

/// Errors raised while wiring the solver stack together.
///
/// These are startup failures; per-request failures surface through
/// [`SolveOutcome::Failed`] with the stage that produced them.
#[derive(Debug, Error)]
pub enum SolverInitError {
    #[error(transparent)]
    Model(#[from] AiModelError),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Pipeline(#[from] PipelineConfigError),
}

/// Fully wired solving backend.
///
/// Construct once (ideally at process start), wrap in `Arc` if shared, and
/// call [`Solver::solve`] per request. HTTP clients and the loaded index are
/// reused across calls.
pub struct Solver {
    pipeline: SolverPipeline,
    svc: Arc<ArkServiceProfiles>,
}

impl std::fmt::Debug for Solver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Solver").finish_non_exhaustive()
    }
}

impl Solver {
    /// Builds the whole stack from environment variables and the on-disk
    /// index at `INDEX_DIR`.
    ///
    /// # Errors
    /// Returns [`SolverInitError`] if the Ark credentials are missing or
    /// invalid, the index directory cannot be loaded, or the pipeline
    /// configuration fails validation.
    pub fn from_env() -> Result<Self, SolverInitError> {
        let index_dir =
            std::env::var("INDEX_DIR").unwrap_or_else(|_| DEFAULT_INDEX_DIR.to_string());
        Self::from_env_with_index(&index_dir)
    }

    /// Same as [`Solver::from_env`], with an explicit index directory.
    ///
    /// # Errors
    /// See [`Solver::from_env`].
    pub fn from_env_with_index(index_dir: &str) -> Result<Self, SolverInitError> {
        let vision = config_ark_vision()?;
        let solver = config_ark_solver()?;
        let embedding = config_ark_embedding()?;
        let svc = Arc::new(ArkServiceProfiles::new(vision, solver, embedding, Some(10))?);

        let store = Arc::new(KnowledgeStore::open(index_dir)?);
        info!(
            index_dir,
            passages = store.index().len(),
            dimension = store.index().dimension(),
            "knowledge index loaded"
        );

        let embedder = Arc::new(ArkEmbedder::new(ArkEmbedderConfig {
            svc: Arc::clone(&svc),
            dim: store.index().dimension(),
        }));
        let ocr = Arc::new(ArkOcr::new(Arc::clone(&svc)));
        let generator = Arc::new(ArkGeneration::new(Arc::clone(&svc)));

        let cfg = PipelineConfig::from_env();
        let pipeline = SolverPipeline::new(store, embedder, ocr, generator, cfg)?;

        Ok(Self { pipeline, svc })
    }

    /// Wraps an already wired pipeline and service layer.
    pub fn from_parts(pipeline: SolverPipeline, svc: Arc<ArkServiceProfiles>) -> Self {
        Self { pipeline, svc }
    }

    /// Runs one request through the staged pipeline.
    ///
    /// Never returns `Err`; every failure mode is reported through
    /// [`SolveOutcome::Failed`] with the stage that produced it.
    pub async fn solve(&self, request: SolveRequest) -> SolveOutcome {
        self.pipeline.solve(request).await
    }

    /// Probes every Ark profile and reports reachability per model.
    ///
    /// # Errors
    /// Returns [`AiModelError`] if a probe cannot even be issued; individual
    /// unreachable models are reported inside the returned statuses.
    pub async fn health(&self) -> Result<Vec<HealthStatus>, AiModelError> {
        self.svc.health_all().await
    }

    /// Access to the staged pipeline, for callers that need cancellation or
    /// progress reporting via [`SolverPipeline::solve_with`].
    pub fn pipeline(&self) -> &SolverPipeline {
        &self.pipeline
    }
}
