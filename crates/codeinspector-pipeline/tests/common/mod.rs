#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use codeinspector_ai::{
    GenerationConfig, LLMProvider, LLMResponse, LLMResult, Message, ProviderCharacteristics,
};

pub const PARSE: &str = "parse";
pub const BUILD_GRAPH: &str = "build_graph";
pub const ANALYZE: &str = "analyze";
pub const VISUALIZE: &str = "visualize";
pub const EXPLAIN: &str = "explain";
pub const QUALITY: &str = "quality";

/// Classify a prompt by the role line each template opens with.
pub fn route(prompt: &str) -> &'static str {
    if prompt.contains("code parsing expert") {
        PARSE
    } else if prompt.contains("knowledge graph construction expert") {
        BUILD_GRAPH
    } else if prompt.contains("code analysis expert") {
        ANALYZE
    } else if prompt.contains("code visualization expert") {
        VISUALIZE
    } else if prompt.contains("code explanation expert") {
        EXPLAIN
    } else if prompt.contains("code quality expert") {
        QUALITY
    } else {
        "unknown"
    }
}

pub enum Reply {
    Text(String),
    Fail(String),
}

/// Mock provider answering each stage from a fixed script and recording
/// every prompt it receives.
pub struct ScriptedProvider {
    replies: HashMap<&'static str, Reply>,
    calls: Mutex<Vec<(&'static str, String)>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self {
            replies: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Valid replies for every stage of the sum_array sample.
    pub fn happy_path() -> Self {
        Self::new()
            .reply(PARSE, PARSE_REPLY)
            .reply(BUILD_GRAPH, BUILD_GRAPH_REPLY)
            .reply(ANALYZE, ANALYZE_REPLY)
            .reply(VISUALIZE, VISUALIZE_REPLY)
            .reply(EXPLAIN, EXPLAIN_REPLY)
    }

    pub fn reply(mut self, stage: &'static str, text: &str) -> Self {
        self.replies.insert(stage, Reply::Text(text.to_string()));
        self
    }

    pub fn fail(mut self, stage: &'static str, message: &str) -> Self {
        self.replies.insert(stage, Reply::Fail(message.to_string()));
        self
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(stage, _)| *stage)
            .collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn prompt_for(&self, stage: &str) -> Option<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .find(|(s, _)| *s == stage)
            .map(|(_, prompt)| prompt.clone())
    }
}

#[async_trait]
impl LLMProvider for ScriptedProvider {
    async fn generate_chat(
        &self,
        messages: &[Message],
        _config: &GenerationConfig,
    ) -> LLMResult<LLMResponse> {
        let prompt = messages
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        let stage = route(&prompt);
        self.calls.lock().unwrap().push((stage, prompt));

        match self.replies.get(stage) {
            Some(Reply::Text(text)) => Ok(LLMResponse::text(text.clone(), "scripted")),
            Some(Reply::Fail(message)) => Err(anyhow::anyhow!("{}", message)),
            None => Err(anyhow::anyhow!("no scripted reply for {}", stage)),
        }
    }

    async fn is_available(&self) -> bool {
        true
    }

    fn provider_name(&self) -> &str {
        "scripted"
    }

    fn model_name(&self) -> &str {
        "scripted-model"
    }

    fn characteristics(&self) -> ProviderCharacteristics {
        ProviderCharacteristics {
            max_tokens: 32_000,
            avg_latency_ms: 0,
            rpm_limit: None,
            supports_json_mode: true,
        }
    }
}

pub const SUM_ARRAY: &str = "def sum_array(arr):\n    total = 0\n    for num in arr:\n        total += num\n    return total\n";

pub const PARSE_REPLY: &str = r#"{
  "functions": ["sum_array(arr)"],
  "loops": ["for num in arr"],
  "conditions": [],
  "variables": ["total", "num"],
  "calls": [],
  "returns": ["total"],
  "assignments": ["total = 0", "total += num"],
  "operations": ["+="]
}"#;

pub const BUILD_GRAPH_REPLY: &str = r#"```json
{
  "nodes": [
    {"id": "f_sum_array", "type": "function", "label": "sum_array(arr)"},
    {"id": "loop_1", "type": "loop", "label": "for num in arr"},
    {"id": "v_total", "type": "variable", "label": "total"}
  ],
  "edges": [
    {"source": "f_sum_array", "target": "loop_1", "relation": "contains"},
    {"source": "loop_1", "target": "v_total", "relation": "modifies"}
  ]
}
```"#;

pub const ANALYZE_REPLY: &str = r#"{
  "bugs": [],
  "edge_cases": ["empty list returns 0", "non-numeric elements raise TypeError"],
  "complexity": {"time": "O(n)", "space": "O(1)"},
  "suggestions": ["use the built-in sum()"],
  "anti_patterns": []
}"#;

pub const VISUALIZE_REPLY: &str = r#"{
  "flowchart": "```mermaid\nflowchart TD\n    A[Start] --> B[total = 0]\n    B --> C[Return total]\n```",
  "call_graph": "graph LR\n    sum_array"
}"#;

pub const EXPLAIN_REPLY: &str = r#"{
  "simple": "Adds up every number in a list.",
  "technical": "Linear scan accumulating into a running total.",
  "line_by_line": [
    {"line": 1, "code": "def sum_array(arr):", "explanation": "Defines the function"}
  ],
  "summary": "Sums a list of numbers in O(n) time."
}"#;
