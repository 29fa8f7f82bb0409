use codeinspector_core::{
    Explanations, Payload, PipelineState, StageError, StageKind, StagePayload, StateField,
};

use super::{require, Stage};
use crate::prompts;

/// Simple, technical and line-by-line explanations plus a summary.
pub struct ExplainStage;

impl Stage for ExplainStage {
    fn kind(&self) -> StageKind {
        StageKind::Explain
    }

    fn inputs(&self) -> &'static [StateField] {
        &[
            StateField::Language,
            StateField::SourceCode,
            StateField::KnowledgeGraph,
            StateField::Analysis,
        ]
    }

    fn outputs(&self) -> &'static [StateField] {
        &[StateField::Explanations]
    }

    fn build_prompt(&self, state: &PipelineState) -> Result<String, StageError> {
        let graph = require(
            state.knowledge_graph(),
            self.kind(),
            StateField::KnowledgeGraph,
        )?;
        let analysis = require(state.analysis(), self.kind(), StateField::Analysis)?;
        Ok(prompts::explain_prompt(
            state.language(),
            state.source_code(),
            graph,
            analysis,
        )?)
    }

    fn merge(&self, state: &mut PipelineState, payload: Payload) -> Result<String, StageError> {
        let explanations = Explanations::from_payload(payload)?;
        let summary = format!(
            "generated explanations ({} line notes)",
            explanations.line_by_line.len()
        );
        state.set_explanations(explanations)?;
        Ok(summary)
    }
}
