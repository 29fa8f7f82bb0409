use codeinspector_core::{
    KnowledgeGraph, Payload, PipelineState, StageError, StageKind, StagePayload, StateField,
};
use tracing::warn;

use super::{require, Stage};
use crate::prompts;

/// Turns the parsed structure into a nodes/edges knowledge graph.
pub struct BuildGraphStage;

impl Stage for BuildGraphStage {
    fn kind(&self) -> StageKind {
        StageKind::BuildGraph
    }

    fn inputs(&self) -> &'static [StateField] {
        &[
            StateField::Language,
            StateField::SourceCode,
            StateField::ParsedStructure,
        ]
    }

    fn outputs(&self) -> &'static [StateField] {
        &[StateField::KnowledgeGraph]
    }

    fn build_prompt(&self, state: &PipelineState) -> Result<String, StageError> {
        let parsed = require(
            state.parsed_structure(),
            self.kind(),
            StateField::ParsedStructure,
        )?;
        Ok(prompts::build_graph_prompt(
            state.language(),
            state.source_code(),
            parsed,
        )?)
    }

    fn merge(&self, state: &mut PipelineState, payload: Payload) -> Result<String, StageError> {
        // Duplicate node ids are rejected during decoding
        let graph = KnowledgeGraph::from_payload(payload)?;

        for edge in graph.dangling_edges() {
            warn!(
                "Knowledge graph edge {} -[{}]-> {} references an unknown node",
                edge.source, edge.relation, edge.target
            );
        }

        let summary = format!(
            "built graph with {} nodes, {} edges",
            graph.nodes.len(),
            graph.edges.len()
        );
        state.set_knowledge_graph(graph)?;
        Ok(summary)
    }
}
