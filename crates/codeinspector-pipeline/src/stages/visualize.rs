use codeinspector_core::{
    Diagrams, Payload, PipelineState, StageError, StageKind, StagePayload, StateField,
};

use super::{require, Stage};
use crate::prompts;

/// Mermaid flowchart and call graph. Diagram cleanup already happened in
/// the extractor.
pub struct VisualizeStage;

impl Stage for VisualizeStage {
    fn kind(&self) -> StageKind {
        StageKind::Visualize
    }

    fn inputs(&self) -> &'static [StateField] {
        &[
            StateField::Language,
            StateField::SourceCode,
            StateField::ParsedStructure,
            StateField::KnowledgeGraph,
        ]
    }

    fn outputs(&self) -> &'static [StateField] {
        &[StateField::Flowchart, StateField::CallGraph]
    }

    fn build_prompt(&self, state: &PipelineState) -> Result<String, StageError> {
        let parsed = require(
            state.parsed_structure(),
            self.kind(),
            StateField::ParsedStructure,
        )?;
        let graph = require(
            state.knowledge_graph(),
            self.kind(),
            StateField::KnowledgeGraph,
        )?;
        Ok(prompts::visualize_prompt(
            state.language(),
            state.source_code(),
            parsed,
            graph,
        )?)
    }

    fn merge(&self, state: &mut PipelineState, payload: Payload) -> Result<String, StageError> {
        let diagrams = Diagrams::from_payload(payload)?;
        let summary = format!(
            "generated flowchart ({} lines) and call graph ({} lines)",
            diagrams.flowchart.lines().count(),
            diagrams.call_graph.lines().count()
        );
        state.set_diagrams(diagrams.flowchart, diagrams.call_graph)?;
        Ok(summary)
    }
}
