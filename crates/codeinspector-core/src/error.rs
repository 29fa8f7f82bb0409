use crate::state::{PipelineState, StageKind, StateField};
use thiserror::Error;

/// Number of characters of the raw response kept for diagnostics.
pub const RESPONSE_EXCERPT_CHARS: usize = 500;

#[derive(Error, Debug)]
pub enum CodeInspectorError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CodeInspectorError>;

/// A model response that never yielded a usable structured payload,
/// even after the single repair attempt.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("malformed response: {reason} (response starts with: {excerpt:?})")]
pub struct MalformedResponse {
    pub reason: String,
    pub excerpt: String,
}

impl MalformedResponse {
    pub fn new(reason: impl Into<String>, raw: &str) -> Self {
        Self {
            reason: reason.into(),
            excerpt: raw.chars().take(RESPONSE_EXCERPT_CHARS).collect(),
        }
    }
}

/// Why a single stage could not complete.
#[derive(Error, Debug)]
pub enum StageError {
    #[error(transparent)]
    MalformedResponse(#[from] MalformedResponse),

    #[error("LLM request failed: {0:#}")]
    Transport(anyhow::Error),

    /// Stage wiring bug: a declared input was not produced by an earlier stage.
    #[error("stage {stage} ran before its inputs were populated: missing {missing:?}")]
    DependencyViolation {
        stage: StageKind,
        missing: Vec<StateField>,
    },

    /// Stage wiring bug: a stage tried to overwrite a field that is already set.
    #[error("state field {0} was already written")]
    AlreadyWritten(StateField),

    #[error("failed to render prompt: {0}")]
    Prompt(#[from] serde_json::Error),
}

impl StageError {
    /// Dependency and overwrite violations indicate a programming error,
    /// not a bad model response or a network problem.
    pub fn is_wiring_bug(&self) -> bool {
        matches!(
            self,
            StageError::DependencyViolation { .. } | StageError::AlreadyWritten(_)
        )
    }
}

/// A stage halted the pipeline. Carries the state as it was when the stage
/// failed so callers can inspect what earlier stages produced.
#[derive(Error, Debug)]
#[error("stage {stage} failed: {cause}")]
pub struct StageFailure {
    pub stage: StageKind,
    #[source]
    pub cause: StageError,
    pub state: PipelineState,
}

impl StageFailure {
    pub fn stage_name(&self) -> &'static str {
        self.stage.name()
    }
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Stage(Box<StageFailure>),
}

impl PipelineError {
    pub fn stage_failure(&self) -> Option<&StageFailure> {
        match self {
            PipelineError::Stage(failure) => Some(failure),
            PipelineError::InvalidInput(_) => None,
        }
    }
}

impl From<StageFailure> for PipelineError {
    fn from(failure: StageFailure) -> Self {
        PipelineError::Stage(Box::new(failure))
    }
}
