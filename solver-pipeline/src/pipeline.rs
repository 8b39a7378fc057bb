//! The three-stage solving pipeline: recognize, retrieve, generate.
//!
//! One request moves through an explicit state machine. Stage failures fold
//! into [`SolveOutcome::Failed`] with the stage attached; nothing else
//! crosses the pipeline boundary as an error.

use std::sync::Arc;
use std::time::Instant;

use knowledge_index::{
    EmbeddingsProvider, IndexError, KnowledgeStore, RetrievalQuery, ScoredPassage,
};
use tracing::{debug, error, info, warn};

use crate::api_types::{SolveOutcome, SolveRequest, Stage};
use crate::assemble::{assemble, AssembledPrompt};
use crate::cancel::CancelToken;
use crate::cfg::PipelineConfig;
use crate::error::{GenerationError, OcrError, PipelineConfigError};
use crate::progress::{NoopProgress, Progress};
use crate::providers::{GenerationProvider, OcrProvider};
use crate::retry::retry_generation;

/// Orchestrates one request through OCR, retrieval, assembly and generation.
///
/// The index handle is read-only and shared; any number of requests may run
/// concurrently on clones of the same pipeline parts.
pub struct SolverPipeline {
    store: Arc<KnowledgeStore>,
    embedder: Arc<dyn EmbeddingsProvider>,
    ocr: Arc<dyn OcrProvider>,
    generator: Arc<dyn GenerationProvider>,
    cfg: PipelineConfig,
}

/// Request progress through the pipeline. `Failed` is represented by an
/// early return, everything else by the data accumulated so far.
enum State {
    Received,
    Recognized {
        problem: String,
    },
    Retrieved {
        problem: String,
        hits: Vec<ScoredPassage>,
    },
    Assembled {
        problem: String,
        assembled: AssembledPrompt,
    },
    Generated {
        problem: String,
        used: Vec<ScoredPassage>,
        answer: String,
    },
}

/// Stage a state is about to run (or, for `Generated`, just ran).
fn stage_of(state: &State) -> Stage {
    match state {
        State::Received => Stage::Ocr,
        State::Recognized { .. } => Stage::Retrieval,
        State::Retrieved { .. } => Stage::Assembly,
        State::Assembled { .. } | State::Generated { .. } => Stage::Generation,
    }
}

impl SolverPipeline {
    /// Wires the pipeline from its collaborators.
    ///
    /// # Errors
    /// Returns `PipelineConfigError` if `cfg` fails validation.
    pub fn new(
        store: Arc<KnowledgeStore>,
        embedder: Arc<dyn EmbeddingsProvider>,
        ocr: Arc<dyn OcrProvider>,
        generator: Arc<dyn GenerationProvider>,
        cfg: PipelineConfig,
    ) -> Result<Self, PipelineConfigError> {
        cfg.validate()?;
        Ok(Self {
            store,
            embedder,
            ocr,
            generator,
            cfg,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.cfg
    }

    /// Solves one request with no cancellation and no progress UI.
    pub async fn solve(&self, request: SolveRequest) -> SolveOutcome {
        self.solve_with(request, &CancelToken::new(), &NoopProgress)
            .await
    }

    /// Solves one request, checking `cancel` at every stage boundary and
    /// reporting stages through `progress`.
    ///
    /// A cancellation observed between stages yields
    /// `Failed(stage, "cancelled")` for the stage that would have run next;
    /// a model call already in flight completes but its result is discarded.
    pub async fn solve_with(
        &self,
        request: SolveRequest,
        cancel: &CancelToken,
        progress: &dyn Progress,
    ) -> SolveOutcome {
        info!(
            target: "solver_pipeline",
            id = %request.id,
            bytes = request.image.len(),
            format = ?request.format,
            "request received"
        );
        progress.set_total(4);

        let mut state = State::Received;
        loop {
            if cancel.is_cancelled() {
                let stage = stage_of(&state);
                warn!(target: "solver_pipeline", id = %request.id, %stage, "request cancelled");
                return SolveOutcome::Failed {
                    stage,
                    reason: "cancelled".into(),
                };
            }

            state = match state {
                State::Received => {
                    progress.step("recognizing problem text");
                    match self.run_ocr(&request).await {
                        Ok(problem) => State::Recognized { problem },
                        Err(e) => return self.fail(&request.id, Stage::Ocr, e),
                    }
                }
                State::Recognized { problem } => {
                    progress.step("retrieving related knowledge");
                    match self.run_retrieval(&request.id, &problem).await {
                        Ok(hits) => State::Retrieved { problem, hits },
                        Err(e) => return self.fail(&request.id, Stage::Retrieval, e),
                    }
                }
                State::Retrieved { problem, hits } => {
                    progress.step("assembling prompt");
                    match assemble(&problem, &hits, self.cfg.max_prompt_len) {
                        Ok(assembled) => State::Assembled { problem, assembled },
                        Err(e) => return self.fail(&request.id, Stage::Assembly, e),
                    }
                }
                State::Assembled { problem, assembled } => {
                    progress.step("generating solution");
                    match self.run_generation(&request.id, &assembled.prompt).await {
                        Ok(answer) => State::Generated {
                            problem,
                            used: assembled.used,
                            answer,
                        },
                        Err(e) => return self.fail(&request.id, Stage::Generation, e),
                    }
                }
                State::Generated {
                    problem,
                    used,
                    answer,
                } => {
                    progress.finish("done");
                    info!(
                        target: "solver_pipeline",
                        id = %request.id,
                        used = used.len(),
                        "request solved"
                    );
                    return SolveOutcome::Done {
                        problem_text: problem,
                        answer,
                        used,
                    };
                }
            };
        }
    }

    /// Single OCR attempt under the configured deadline. Never retried.
    async fn run_ocr(&self, request: &SolveRequest) -> Result<String, OcrError> {
        let deadline = self.cfg.ocr_timeout();
        let started = Instant::now();

        let fut = self.ocr.recognize(&request.image, request.format);
        let text = match tokio::time::timeout(deadline, fut).await {
            Ok(res) => res?,
            Err(_) => return Err(OcrError::Timeout(deadline)),
        };

        let problem = text.trim().to_string();
        if problem.is_empty() {
            return Err(OcrError::EmptyText);
        }

        debug!(
            target: "solver_pipeline",
            id = %request.id,
            ms = started.elapsed().as_millis() as u64,
            chars = problem.chars().count(),
            "problem text recognized"
        );
        Ok(problem)
    }

    async fn run_retrieval(
        &self,
        id: &str,
        problem: &str,
    ) -> Result<Vec<ScoredPassage>, IndexError> {
        let hits = self
            .store
            .retrieve_context(
                RetrievalQuery {
                    text: problem,
                    top_k: self.cfg.top_k,
                    min_score: self.cfg.min_score,
                },
                self.embedder.as_ref(),
            )
            .await?;

        if hits.is_empty() {
            // Normal outcome; the prompt will say so explicitly.
            debug!(target: "solver_pipeline", id = %id, "no passage cleared the relevance floor");
        }
        Ok(hits)
    }

    /// Generation with per-attempt deadline and transient-only retry.
    async fn run_generation(&self, id: &str, prompt: &str) -> Result<String, GenerationError> {
        let policy = self.cfg.retry_policy();
        let deadline = self.cfg.generation_timeout();
        let generator = self.generator.as_ref();

        retry_generation(&policy, |attempt| {
            let fut = generator.generate(prompt);
            async move {
                if attempt > 0 {
                    debug!(target: "solver_pipeline", id = %id, attempt, "generation retry");
                }
                let text = match tokio::time::timeout(deadline, fut).await {
                    Ok(res) => res?,
                    Err(_) => return Err(GenerationError::Timeout(deadline)),
                };
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    return Err(GenerationError::EmptyAnswer);
                }
                Ok(trimmed.to_string())
            }
        })
        .await
    }

    fn fail(&self, id: &str, stage: Stage, err: impl std::fmt::Display) -> SolveOutcome {
        error!(target: "solver_pipeline", id = %id, %stage, "stage failed: {err}");
        SolveOutcome::Failed {
            stage,
            reason: err.to_string(),
        }
    }
}
