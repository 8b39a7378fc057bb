//! Public API types re-used by callers of the pipeline.

use std::fmt;

use knowledge_index::ScoredPassage;
use serde::Serialize;

/// One submitted problem: the image bytes plus a caller-chosen identifier
/// that is carried through logs and into the outcome.
#[derive(Clone, Debug)]
pub struct SolveRequest {
    pub id: String,
    pub image: Vec<u8>,
    pub format: ImageFormat,
}

impl SolveRequest {
    pub fn new(id: impl Into<String>, image: Vec<u8>, format: ImageFormat) -> Self {
        Self {
            id: id.into(),
            image,
            format,
        }
    }
}

/// Supported input image encodings.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Png,
    #[default]
    Jpeg,
    Webp,
}

impl ImageFormat {
    /// Maps a file extension (with or without a leading dot) onto a format.
    /// Unknown extensions fall back to JPEG.
    pub fn from_extension(ext: &str) -> Self {
        match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "png" => Self::Png,
            "webp" => Self::Webp,
            _ => Self::Jpeg,
        }
    }

    /// MIME type used in the data URL sent to the vision model.
    pub fn as_mime(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Webp => "image/webp",
        }
    }
}

/// Pipeline stages, used to attribute failures to a phase of processing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Ocr,
    Retrieval,
    Assembly,
    Generation,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Ocr => "ocr",
            Stage::Retrieval => "retrieval",
            Stage::Assembly => "assembly",
            Stage::Generation => "generation",
        })
    }
}

/// Terminal result of one request.
///
/// `Failed` is the only failure representation crossing the pipeline
/// boundary. The stage lets a front end distinguish "could not read the
/// photo" from "model unavailable"; an empty `used` list on `Done` means
/// the answer was produced without supplemental knowledge.
#[derive(Clone, Debug, Serialize)]
pub enum SolveOutcome {
    Done {
        /// Problem text recognized from the image.
        problem_text: String,
        /// Final model answer.
        answer: String,
        /// Passages that actually appeared in the generation prompt.
        used: Vec<ScoredPassage>,
    },
    Failed {
        stage: Stage,
        reason: String,
    },
}

impl SolveOutcome {
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done { .. })
    }
}
