use codeinspector_core::{
    Analysis, Payload, PipelineState, StageError, StageKind, StagePayload, StateField,
};

use super::{require, Stage};
use crate::prompts;

/// Bugs, edge cases, complexity and improvement suggestions.
pub struct AnalyzeStage;

impl Stage for AnalyzeStage {
    fn kind(&self) -> StageKind {
        StageKind::Analyze
    }

    fn inputs(&self) -> &'static [StateField] {
        &[
            StateField::Language,
            StateField::SourceCode,
            StateField::KnowledgeGraph,
        ]
    }

    fn outputs(&self) -> &'static [StateField] {
        &[StateField::Analysis]
    }

    fn build_prompt(&self, state: &PipelineState) -> Result<String, StageError> {
        let graph = require(
            state.knowledge_graph(),
            self.kind(),
            StateField::KnowledgeGraph,
        )?;
        Ok(prompts::analyze_prompt(
            state.language(),
            state.source_code(),
            graph,
        )?)
    }

    fn merge(&self, state: &mut PipelineState, payload: Payload) -> Result<String, StageError> {
        let analysis = Analysis::from_payload(payload)?;
        let summary = format!(
            "found {} potential bugs, {} edge cases, {} suggestions (time {}, space {})",
            analysis.bugs.len(),
            analysis.edge_cases.len(),
            analysis.suggestions.len(),
            analysis.complexity.time,
            analysis.complexity.space
        );
        state.set_analysis(analysis)?;
        Ok(summary)
    }
}
