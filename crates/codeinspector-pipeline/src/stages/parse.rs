use codeinspector_core::{
    ParsedStructure, Payload, PipelineState, StageError, StageKind, StagePayload, StateField,
};

use super::Stage;
use crate::prompts;

/// Extracts functions, loops, conditions and other structural elements.
pub struct ParseStage;

impl Stage for ParseStage {
    fn kind(&self) -> StageKind {
        StageKind::Parse
    }

    fn inputs(&self) -> &'static [StateField] {
        &[StateField::Language, StateField::SourceCode]
    }

    fn outputs(&self) -> &'static [StateField] {
        &[StateField::ParsedStructure]
    }

    fn build_prompt(&self, state: &PipelineState) -> Result<String, StageError> {
        Ok(prompts::parse_prompt(state.language(), state.source_code()))
    }

    fn merge(&self, state: &mut PipelineState, payload: Payload) -> Result<String, StageError> {
        let parsed = ParsedStructure::from_payload(payload)?;
        let summary = format!(
            "extracted {} functions, {} loops, {} conditions",
            parsed.functions.len(),
            parsed.loops.len(),
            parsed.conditions.len()
        );
        state.set_parsed_structure(parsed)?;
        Ok(summary)
    }
}
