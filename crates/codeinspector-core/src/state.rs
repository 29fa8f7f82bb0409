use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{PipelineError, StageError};
use crate::schema::{Analysis, Explanations, KnowledgeGraph, ParsedStructure};

/// Named pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StageKind {
    Parse,
    BuildGraph,
    Analyze,
    Visualize,
    Explain,
}

impl StageKind {
    pub fn name(&self) -> &'static str {
        match self {
            StageKind::Parse => "Parse",
            StageKind::BuildGraph => "BuildGraph",
            StageKind::Analyze => "Analyze",
            StageKind::Visualize => "Visualize",
            StageKind::Explain => "Explain",
        }
    }

    pub fn all() -> [StageKind; 5] {
        [
            StageKind::Parse,
            StageKind::BuildGraph,
            StageKind::Analyze,
            StageKind::Visualize,
            StageKind::Explain,
        ]
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Fields of [`PipelineState`], used by stages to declare inputs and outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateField {
    Language,
    SourceCode,
    ParsedStructure,
    KnowledgeGraph,
    Analysis,
    Flowchart,
    CallGraph,
    Explanations,
}

impl StateField {
    /// Stable key used when the state is serialized.
    pub fn as_str(&self) -> &'static str {
        match self {
            StateField::Language => "language",
            StateField::SourceCode => "code",
            StateField::ParsedStructure => "parsed_structure",
            StateField::KnowledgeGraph => "knowledge_graph",
            StateField::Analysis => "analysis",
            StateField::Flowchart => "flowchart",
            StateField::CallGraph => "call_graph",
            StateField::Explanations => "explanations",
        }
    }
}

impl fmt::Display for StateField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Record threaded through every stage of one pipeline run.
///
/// Starts with only `language` and `source_code`. Each optional field is
/// written exactly once by the stage that owns it; the `set_*` methods
/// refuse a second write so earlier results can never be mutated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineState {
    language: String,
    #[serde(rename = "code")]
    source_code: String,
    parsed_structure: Option<ParsedStructure>,
    knowledge_graph: Option<KnowledgeGraph>,
    analysis: Option<Analysis>,
    flowchart: Option<String>,
    call_graph: Option<String>,
    explanations: Option<Explanations>,
}

fn write_once<T>(slot: &mut Option<T>, value: T, field: StateField) -> Result<(), StageError> {
    if slot.is_some() {
        return Err(StageError::AlreadyWritten(field));
    }
    *slot = Some(value);
    Ok(())
}

impl PipelineState {
    /// Fails with [`PipelineError::InvalidInput`] when either string is blank.
    pub fn new(
        language: impl Into<String>,
        source_code: impl Into<String>,
    ) -> Result<Self, PipelineError> {
        let language = language.into();
        let source_code = source_code.into();

        if language.trim().is_empty() {
            return Err(PipelineError::InvalidInput(
                "language must not be empty".to_string(),
            ));
        }
        if source_code.trim().is_empty() {
            return Err(PipelineError::InvalidInput(
                "source code must not be empty".to_string(),
            ));
        }

        Ok(Self {
            language: language.trim().to_lowercase(),
            source_code,
            parsed_structure: None,
            knowledge_graph: None,
            analysis: None,
            flowchart: None,
            call_graph: None,
            explanations: None,
        })
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn source_code(&self) -> &str {
        &self.source_code
    }

    pub fn parsed_structure(&self) -> Option<&ParsedStructure> {
        self.parsed_structure.as_ref()
    }

    pub fn knowledge_graph(&self) -> Option<&KnowledgeGraph> {
        self.knowledge_graph.as_ref()
    }

    pub fn analysis(&self) -> Option<&Analysis> {
        self.analysis.as_ref()
    }

    pub fn flowchart(&self) -> Option<&str> {
        self.flowchart.as_deref()
    }

    pub fn call_graph(&self) -> Option<&str> {
        self.call_graph.as_deref()
    }

    pub fn explanations(&self) -> Option<&Explanations> {
        self.explanations.as_ref()
    }

    pub fn is_populated(&self, field: StateField) -> bool {
        match field {
            StateField::Language | StateField::SourceCode => true,
            StateField::ParsedStructure => self.parsed_structure.is_some(),
            StateField::KnowledgeGraph => self.knowledge_graph.is_some(),
            StateField::Analysis => self.analysis.is_some(),
            StateField::Flowchart => self.flowchart.is_some(),
            StateField::CallGraph => self.call_graph.is_some(),
            StateField::Explanations => self.explanations.is_some(),
        }
    }

    /// Subset of `fields` that has not been written yet.
    pub fn missing(&self, fields: &[StateField]) -> Vec<StateField> {
        fields
            .iter()
            .copied()
            .filter(|f| !self.is_populated(*f))
            .collect()
    }

    /// True once every stage has written its output.
    pub fn is_complete(&self) -> bool {
        self.missing(&[
            StateField::ParsedStructure,
            StateField::KnowledgeGraph,
            StateField::Analysis,
            StateField::Flowchart,
            StateField::CallGraph,
            StateField::Explanations,
        ])
        .is_empty()
    }

    pub fn set_parsed_structure(&mut self, value: ParsedStructure) -> Result<(), StageError> {
        write_once(&mut self.parsed_structure, value, StateField::ParsedStructure)
    }

    pub fn set_knowledge_graph(&mut self, value: KnowledgeGraph) -> Result<(), StageError> {
        write_once(&mut self.knowledge_graph, value, StateField::KnowledgeGraph)
    }

    pub fn set_analysis(&mut self, value: Analysis) -> Result<(), StageError> {
        write_once(&mut self.analysis, value, StateField::Analysis)
    }

    /// Both diagrams are written together; neither may already be set.
    pub fn set_diagrams(&mut self, flowchart: String, call_graph: String) -> Result<(), StageError> {
        if self.flowchart.is_some() {
            return Err(StageError::AlreadyWritten(StateField::Flowchart));
        }
        if self.call_graph.is_some() {
            return Err(StageError::AlreadyWritten(StateField::CallGraph));
        }
        self.flowchart = Some(flowchart);
        self.call_graph = Some(call_graph);
        Ok(())
    }

    pub fn set_explanations(&mut self, value: Explanations) -> Result<(), StageError> {
        write_once(&mut self.explanations, value, StateField::Explanations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Complexity;

    #[test]
    fn test_new_rejects_blank_inputs() {
        assert!(matches!(
            PipelineState::new("python", ""),
            Err(PipelineError::InvalidInput(_))
        ));
        assert!(matches!(
            PipelineState::new("  ", "x = 1"),
            Err(PipelineError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_new_state_has_only_inputs() {
        let state = PipelineState::new("Python", "x = 1").unwrap();
        assert_eq!(state.language(), "python");
        assert_eq!(state.source_code(), "x = 1");
        assert!(state.is_populated(StateField::Language));
        assert!(!state.is_populated(StateField::ParsedStructure));
        assert!(!state.is_complete());
        assert_eq!(
            state.missing(&[StateField::SourceCode, StateField::KnowledgeGraph]),
            vec![StateField::KnowledgeGraph]
        );
    }

    #[test]
    fn test_fields_are_write_once() {
        let mut state = PipelineState::new("python", "x = 1").unwrap();
        state.set_parsed_structure(ParsedStructure::default()).unwrap();
        let err = state
            .set_parsed_structure(ParsedStructure::default())
            .unwrap_err();
        assert!(matches!(
            err,
            StageError::AlreadyWritten(StateField::ParsedStructure)
        ));

        state.set_diagrams("flowchart TD".into(), String::new()).unwrap();
        assert!(state.set_diagrams("graph LR".into(), String::new()).is_err());
        assert_eq!(state.flowchart(), Some("flowchart TD"));
    }

    #[test]
    fn test_serializes_with_stable_field_names() {
        let mut state = PipelineState::new("python", "x = 1").unwrap();
        state
            .set_analysis(Analysis {
                bugs: vec![],
                edge_cases: vec![],
                complexity: Complexity {
                    time: "O(1)".into(),
                    space: "O(1)".into(),
                },
                suggestions: vec![],
                anti_patterns: vec![],
            })
            .unwrap();

        let value = serde_json::to_value(&state).unwrap();
        assert_eq!(value["code"], "x = 1");
        assert_eq!(value["analysis"]["complexity"]["time"], "O(1)");
        assert!(value["knowledge_graph"].is_null());
        for field in [
            StateField::Language,
            StateField::ParsedStructure,
            StateField::CallGraph,
            StateField::Explanations,
        ] {
            assert!(value.get(field.as_str()).is_some(), "missing {}", field);
        }
    }

    #[test]
    fn test_stage_order() {
        let names: Vec<_> = StageKind::all().iter().map(|s| s.name()).collect();
        assert_eq!(
            names,
            vec!["Parse", "BuildGraph", "Analyze", "Visualize", "Explain"]
        );
    }
}
