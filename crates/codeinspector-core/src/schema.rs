// ABOUTME: Typed payloads produced by each pipeline stage.
// ABOUTME: Decoded from the extractor's JSON object and validated before they reach PipelineState.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;

use crate::error::MalformedResponse;

/// JSON object returned by the response extractor.
pub type Payload = Map<String, Value>;

/// A single list entry reported by the model. Models return either plain
/// strings or small objects (e.g. `{"line": 3, "issue": "..."}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Finding {
    Text(String),
    Detail(Value),
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Finding::Text(text) => f.write_str(text),
            Finding::Detail(Value::Object(map)) => {
                // Prefer a descriptive field when one exists
                for key in ["description", "issue", "message", "name", "text"] {
                    if let Some(Value::String(s)) = map.get(key) {
                        return f.write_str(s);
                    }
                }
                write!(f, "{}", Value::Object(map.clone()))
            }
            Finding::Detail(other) => write!(f, "{}", other),
        }
    }
}

impl Finding {
    pub fn as_text(&self) -> String {
        self.to_string()
    }
}

/// Structural components extracted by the Parse stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedStructure {
    #[serde(default)]
    pub functions: Vec<Finding>,
    #[serde(default)]
    pub loops: Vec<Finding>,
    #[serde(default)]
    pub conditions: Vec<Finding>,
    #[serde(default)]
    pub variables: Vec<Finding>,
    #[serde(default)]
    pub calls: Vec<Finding>,
    #[serde(default)]
    pub returns: Vec<Finding>,
    #[serde(default)]
    pub assignments: Vec<Finding>,
    #[serde(default)]
    pub operations: Vec<Finding>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default)]
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
    pub relation: String,
}

/// Lightweight nodes/edges summary of the code, built by the BuildGraph stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeGraph {
    #[serde(default)]
    pub nodes: Vec<GraphNode>,
    #[serde(default)]
    pub edges: Vec<GraphEdge>,
}

impl KnowledgeGraph {
    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Returns the first id that appears on more than one node.
    pub fn duplicate_node_id(&self) -> Option<&str> {
        let mut seen = HashSet::with_capacity(self.nodes.len());
        self.nodes
            .iter()
            .find(|n| !seen.insert(n.id.as_str()))
            .map(|n| n.id.as_str())
    }

    /// Edges whose source or target does not name a node in this graph.
    pub fn dangling_edges(&self) -> Vec<&GraphEdge> {
        let ids: HashSet<&str> = self.nodes.iter().map(|n| n.id.as_str()).collect();
        self.edges
            .iter()
            .filter(|e| !ids.contains(e.source.as_str()) || !ids.contains(e.target.as_str()))
            .collect()
    }
}

/// Big-O estimates. Both fields are required; the model may answer "N/A".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Complexity {
    pub time: String,
    pub space: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    #[serde(default)]
    pub bugs: Vec<Finding>,
    #[serde(default)]
    pub edge_cases: Vec<Finding>,
    pub complexity: Complexity,
    #[serde(default)]
    pub suggestions: Vec<Finding>,
    #[serde(default)]
    pub anti_patterns: Vec<Finding>,
}

/// Mermaid diagrams produced by the Visualize stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagrams {
    pub flowchart: String,
    #[serde(default)]
    pub call_graph: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineExplanation {
    #[serde(default)]
    pub line: Option<u32>,
    #[serde(default)]
    pub code: String,
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Explanations {
    #[serde(default)]
    pub simple: String,
    #[serde(default)]
    pub technical: String,
    #[serde(default)]
    pub line_by_line: Vec<LineExplanation>,
    pub summary: String,
}

/// Decoding plus schema checks that serde alone cannot express.
pub trait StagePayload: DeserializeOwned {
    fn validate(&self) -> std::result::Result<(), String> {
        Ok(())
    }

    fn from_payload(payload: Payload) -> std::result::Result<Self, MalformedResponse> {
        let value = Value::Object(payload);
        let raw = value.to_string();
        let decoded: Self = serde_json::from_value(value).map_err(|e| {
            MalformedResponse::new(format!("payload does not match schema: {}", e), &raw)
        })?;
        decoded
            .validate()
            .map_err(|reason| MalformedResponse::new(reason, &raw))?;
        Ok(decoded)
    }
}

impl StagePayload for ParsedStructure {}

impl StagePayload for KnowledgeGraph {
    fn validate(&self) -> std::result::Result<(), String> {
        match self.duplicate_node_id() {
            Some(id) => Err(format!("duplicate knowledge graph node id: {}", id)),
            None => Ok(()),
        }
    }
}

impl StagePayload for Analysis {}

impl StagePayload for Diagrams {
    fn validate(&self) -> std::result::Result<(), String> {
        if self.flowchart.trim().is_empty() {
            return Err("flowchart is empty".to_string());
        }
        Ok(())
    }
}

impl StagePayload for Explanations {
    fn validate(&self) -> std::result::Result<(), String> {
        if self.summary.trim().is_empty() {
            return Err("explanation summary is empty".to_string());
        }
        Ok(())
    }
}
