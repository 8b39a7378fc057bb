//! Image-to-answer pipeline for graduate-exam math problems.
//!
//! Public API: [`SolverPipeline`]. It recognizes the problem text from a
//! submitted image via a vision model, retrieves related knowledge from the
//! embedding index, assembles a bounded prompt, and calls the solver model
//! for the final answer. Failures carry the stage they happened in so
//! callers can tell a bad photo from an unavailable model.

mod api_types;
mod assemble;
mod cancel;
mod cfg;
mod error;
mod pipeline;
mod progress;
mod prompt;
mod providers;
mod retry;

pub use api_types::{ImageFormat, SolveOutcome, SolveRequest, Stage};
pub use assemble::{assemble, AssembledPrompt};
pub use cancel::CancelToken;
pub use cfg::PipelineConfig;
pub use error::{GenerationError, OcrError, PipelineConfigError, PromptTooLongError};
pub use pipeline::SolverPipeline;
pub use progress::{ConsoleProgress, NoopProgress, Progress};
pub use providers::{ArkGeneration, ArkOcr, GenerationProvider, OcrProvider};
pub use retry::{retry_generation, RetryPolicy};
