//! Stage adapters.
//!
//! A stage declares which state fields it reads and writes, renders its
//! prompt from the accumulated state, and merges a decoded payload back into
//! it. The orchestrator owns the LLM call, extraction and ordering.

use codeinspector_core::{Payload, PipelineState, StageError, StageKind, StateField};

pub mod analyze;
pub mod build_graph;
pub mod explain;
pub mod parse;
pub mod visualize;

pub use analyze::AnalyzeStage;
pub use build_graph::BuildGraphStage;
pub use explain::ExplainStage;
pub use parse::ParseStage;
pub use visualize::VisualizeStage;

pub trait Stage: Send + Sync {
    fn kind(&self) -> StageKind;

    /// Fields that must be populated before this stage may run.
    fn inputs(&self) -> &'static [StateField];

    /// Fields this stage writes.
    fn outputs(&self) -> &'static [StateField];

    fn build_prompt(&self, state: &PipelineState) -> Result<String, StageError>;

    /// Decode the payload and write it into `state`. Returns a one-line
    /// summary for progress logging.
    fn merge(&self, state: &mut PipelineState, payload: Payload) -> Result<String, StageError>;
}

/// The adapter for each stage of the fixed pipeline.
pub fn stage_for(kind: StageKind) -> &'static dyn Stage {
    match kind {
        StageKind::Parse => &ParseStage,
        StageKind::BuildGraph => &BuildGraphStage,
        StageKind::Analyze => &AnalyzeStage,
        StageKind::Visualize => &VisualizeStage,
        StageKind::Explain => &ExplainStage,
    }
}

/// Borrow an input the dependency check should already have guaranteed.
pub(crate) fn require<T>(
    value: Option<T>,
    stage: StageKind,
    field: StateField,
) -> Result<T, StageError> {
    value.ok_or(StageError::DependencyViolation {
        stage,
        missing: vec![field],
    })
}
