//! Prompt templates for each pipeline stage.
//!
//! Pure formatting: every function takes already-validated state fields and
//! returns the prompt text. Structured inputs are embedded as pretty JSON.

use codeinspector_core::{Analysis, KnowledgeGraph, ParsedStructure};
use serde::Serialize;

const JSON_ONLY: &str = "Return ONLY the JSON object, no additional text.";

fn code_block(language: &str, code: &str) -> String {
    format!("Language: {}\nCode:\n```\n{}\n```", language, code)
}

fn pretty<T: Serialize>(value: &T) -> serde_json::Result<String> {
    serde_json::to_string_pretty(value)
}

pub fn parse_prompt(language: &str, code: &str) -> String {
    format!(
        r#"You are a code parsing expert. Analyze the following code and extract its structural components.

{code}

Extract and return a JSON object with the following structure:
{{
  "functions": [list of function names],
  "loops": [list of loop descriptions, e.g., "for x in arr"],
  "conditions": [list of conditional statements],
  "variables": [list of variable names],
  "calls": [list of function calls],
  "returns": [list of return statements],
  "assignments": [list of variable assignments/updates],
  "operations": [list of key operations]
}}

Be thorough and precise. {json_only}
"#,
        code = code_block(language, code),
        json_only = JSON_ONLY,
    )
}

pub fn build_graph_prompt(
    language: &str,
    code: &str,
    parsed: &ParsedStructure,
) -> serde_json::Result<String> {
    Ok(format!(
        r#"You are a knowledge graph construction expert. Convert the parsed code structure into a lightweight JSON knowledge graph.

{code}

Parsed Structure:
{parsed}

Node types: function, loop, condition, variable, call, update, return, operation, error (if potential errors exist).
Edge relation types: contains, calls, compares, updates, initializes, returns, leads_to, may_cause (for errors).

Return a JSON object with this exact structure:
{{
  "nodes": [
    {{"id": "unique_id", "type": "node_type", "label": "descriptive_label"}}
  ],
  "edges": [
    {{"source": "source_node_id", "target": "target_node_id", "relation": "relation_type"}}
  ]
}}

Every node id must be unique. Use meaningful ids (e.g., "f_sum_array", "loop_1", "var_total").
{json_only}
"#,
        code = code_block(language, code),
        parsed = pretty(parsed)?,
        json_only = JSON_ONLY,
    ))
}

pub fn analyze_prompt(
    language: &str,
    code: &str,
    graph: &KnowledgeGraph,
) -> serde_json::Result<String> {
    Ok(format!(
        r#"You are a code analysis expert. Using the knowledge graph and code, identify potential issues and provide insights.

{code}

Knowledge Graph:
{graph}

Analyze the code and return a JSON object with:
{{
  "bugs": [list of potential bugs with descriptions],
  "edge_cases": [list of edge cases to consider],
  "complexity": {{
    "time": "Big O time complexity",
    "space": "Big O space complexity"
  }},
  "suggestions": [list of improvement suggestions],
  "anti_patterns": [list of code smells or anti-patterns]
}}

Always include both "time" and "space"; use "N/A" if unknown.
Be thorough but concise. {json_only}
"#,
        code = code_block(language, code),
        graph = pretty(graph)?,
        json_only = JSON_ONLY,
    ))
}

pub fn visualize_prompt(
    language: &str,
    code: &str,
    parsed: &ParsedStructure,
    graph: &KnowledgeGraph,
) -> serde_json::Result<String> {
    Ok(format!(
        r#"You are a code visualization expert. Generate Mermaid diagrams based on the code structure and knowledge graph.

{code}

Parsed Structure:
{parsed}

Knowledge Graph:
{graph}

Return a JSON object with:
{{
  "flowchart": "Mermaid flowchart showing control flow",
  "call_graph": "Mermaid graph showing calls and relationships, or an empty string"
}}

Flowchart rules:
1. Start with Start([Start]) and end with End([End])
2. Process steps use square brackets: Step[Do something]
3. Decisions use single curly braces: Check{{Is valid?}}
4. Label branches: -->|Yes|, -->|No|
5. Show loops with back arrows
6. Do not use double quotes inside node labels

Call graph rules:
1. Use 'graph LR' or 'graph TD'
2. Use square brackets for labels: node_id[Label Text]
3. Use --> for connections

Example flowchart:
flowchart TD
    Start([Start])
    Start --> Init[Initialize counter]
    Init --> Check{{Has items?}}
    Check -->|Yes| Process[Process item]
    Process --> Check
    Check -->|No| Done[Return result]
    Done --> End([End])

Return ONLY valid JSON with these two fields. Ensure all Mermaid syntax is valid.
"#,
        code = code_block(language, code),
        parsed = pretty(parsed)?,
        graph = pretty(graph)?,
    ))
}

pub fn explain_prompt(
    language: &str,
    code: &str,
    graph: &KnowledgeGraph,
    analysis: &Analysis,
) -> serde_json::Result<String> {
    Ok(format!(
        r#"You are a code explanation expert. Generate multi-level explanations for the code.

{code}

Knowledge Graph:
{graph}

Analysis:
{analysis}

Generate explanations at multiple levels and return a JSON object:
{{
  "simple": "A simple 1-2 sentence explanation for beginners",
  "technical": "A technical explanation for developers (2-3 sentences)",
  "line_by_line": [
    {{"line": 1, "code": "actual code line", "explanation": "what this line does"}}
  ],
  "summary": "A brief summary of the code's purpose and approach"
}}

Be clear, accurate, and educational. {json_only}
"#,
        code = code_block(language, code),
        graph = pretty(graph)?,
        analysis = pretty(analysis)?,
        json_only = JSON_ONLY,
    ))
}

/// Scores five quality dimensions; used after the pipeline when requested.
pub fn quality_prompt(language: &str, code: &str, analysis: &Analysis) -> String {
    // Long files are cut to keep the request within token limits
    let excerpt: String = code.chars().take(3000).collect();

    format!(
        r#"You are a code quality expert. Score the following code on these dimensions (1-10):
readability, maintainability, security, performance, best_practices.

{code}

Analysis Results:
- Bugs: {bugs}
- Complexity: Time: {time}, Space: {space}
- Suggestions: {suggestions}

Provide your assessment as JSON:
{{
  "readability": {{"score": 0, "reason": "..."}},
  "maintainability": {{"score": 0, "reason": "..."}},
  "security": {{"score": 0, "reason": "..."}},
  "performance": {{"score": 0, "reason": "..."}},
  "best_practices": {{"score": 0, "reason": "..."}},
  "highlights": ["positive aspect"],
  "critical_issues": ["issue"]
}}

{json_only}
"#,
        code = code_block(language, &excerpt),
        bugs = analysis.bugs.len(),
        time = analysis.complexity.time,
        space = analysis.complexity.space,
        suggestions = analysis.suggestions.len(),
        json_only = JSON_ONLY,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use codeinspector_core::{Finding, GraphNode};

    #[test]
    fn test_parse_prompt_embeds_code() {
        let prompt = parse_prompt("python", "def f(x):\n    return x+1");
        assert!(prompt.contains("Language: python"));
        assert!(prompt.contains("def f(x):\n    return x+1"));
        assert!(prompt.contains("\"functions\""));
    }

    #[test]
    fn test_build_graph_prompt_embeds_parsed_structure() {
        let parsed = ParsedStructure {
            functions: vec![Finding::Text("sum_array".into())],
            ..Default::default()
        };
        let prompt = build_graph_prompt("python", "x", &parsed).unwrap();
        assert!(prompt.contains("\"sum_array\""));
        // Template braces are rendered literally
        assert!(prompt.contains("{\"id\": \"unique_id\""));
    }

    #[test]
    fn test_visualize_prompt_single_brace_decision() {
        let graph = KnowledgeGraph {
            nodes: vec![GraphNode {
                id: "f".into(),
                node_type: "function".into(),
                label: "f".into(),
            }],
            edges: vec![],
        };
        let prompt =
            visualize_prompt("python", "x", &ParsedStructure::default(), &graph).unwrap();
        assert!(prompt.contains("Check{Is valid?}"));
        assert!(!prompt.contains("{{"));
    }
}
