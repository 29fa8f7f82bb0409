use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use codeinspector_core::{Finding, PipelineState, Result};
use tracing::info;

const RULE_WIDTH: usize = 80;

fn section(out: &mut String, title: &str) {
    let rule = "=".repeat(RULE_WIDTH);
    let _ = write!(out, "\n{}\n{}\n{}\n", rule, title, rule);
}

fn bullets(out: &mut String, heading: &str, items: &[Finding]) {
    if items.is_empty() {
        return;
    }
    let _ = writeln!(out, "\n{}:", heading);
    for item in items {
        let _ = writeln!(out, "  • {}", item);
    }
}

/// Human-readable console report. Sections for fields a failed run never
/// populated are left out.
pub fn format_report(state: &PipelineState) -> String {
    let mut out = String::new();
    let rule = "=".repeat(RULE_WIDTH);
    let thin = "-".repeat(40);

    let _ = writeln!(out, "{}\nCODE UNDERSTANDING ANALYSIS\n{}", rule, rule);
    let _ = writeln!(out, "\nLanguage: {}", state.language());
    let _ = writeln!(
        out,
        "\nCode:\n{}\n{}\n{}",
        thin,
        state.source_code().trim_end(),
        thin
    );

    if let Some(explanations) = state.explanations() {
        section(&mut out, "EXPLANATIONS");
        let _ = writeln!(out, "\nSimple: {}", or_na(&explanations.simple));
        let _ = writeln!(out, "\nTechnical: {}", or_na(&explanations.technical));
        let _ = writeln!(out, "\nSummary: {}", explanations.summary);
        if !explanations.line_by_line.is_empty() {
            let _ = writeln!(out, "\nLine by line:");
            for line in &explanations.line_by_line {
                match line.line {
                    Some(n) => {
                        let _ = writeln!(out, "  {:>3} | {} -- {}", n, line.code, line.explanation);
                    }
                    None => {
                        let _ = writeln!(out, "      | {} -- {}", line.code, line.explanation);
                    }
                }
            }
        }
    }

    if let Some(analysis) = state.analysis() {
        section(&mut out, "ANALYSIS");
        bullets(&mut out, "Potential Bugs", &analysis.bugs);
        bullets(&mut out, "Edge Cases", &analysis.edge_cases);
        let _ = writeln!(
            out,
            "\nComplexity:\n  • Time: {}\n  • Space: {}",
            analysis.complexity.time, analysis.complexity.space
        );
        bullets(&mut out, "Suggestions", &analysis.suggestions);
        bullets(&mut out, "Anti-patterns", &analysis.anti_patterns);
    }

    if let Some(flowchart) = state.flowchart() {
        section(&mut out, "FLOWCHART (Mermaid)");
        let _ = writeln!(out, "\n{}", flowchart);
    }

    if let Some(call_graph) = state.call_graph().filter(|g| !g.trim().is_empty()) {
        section(&mut out, "CALL GRAPH (Mermaid)");
        let _ = writeln!(out, "\n{}", call_graph);
    }

    if let Some(graph) = state.knowledge_graph() {
        section(&mut out, "KNOWLEDGE GRAPH SUMMARY");
        let _ = writeln!(out, "\nNodes: {}\nEdges: {}", graph.nodes.len(), graph.edges.len());
    }

    let _ = writeln!(out, "\n{}", rule);
    out
}

fn or_na(text: &str) -> &str {
    if text.trim().is_empty() {
        "N/A"
    } else {
        text
    }
}

/// Write `state` as pretty JSON, creating parent directories as needed.
pub fn save_output(state: &PipelineState, path: &Path) -> Result<PathBuf> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(state)?;
    fs::write(path, json)?;
    info!("Saved analysis to {}", path.display());
    Ok(path.to_path_buf())
}

/// `prefix_YYYYmmdd_HHMMSS.ext` in local time.
pub fn timestamped_filename(prefix: &str, ext: &str) -> String {
    format!("{}_{}.{}", prefix, Local::now().format("%Y%m%d_%H%M%S"), ext)
}

#[cfg(test)]
mod tests {
    use super::*;
    use codeinspector_core::{
        Analysis, Complexity, Explanations, GraphNode, KnowledgeGraph, ParsedStructure,
    };

    fn complete_state() -> PipelineState {
        let mut state = PipelineState::new("python", "def f():\n    return 1\n").unwrap();
        state.set_parsed_structure(ParsedStructure::default()).unwrap();
        state
            .set_knowledge_graph(KnowledgeGraph {
                nodes: vec![GraphNode {
                    id: "f".to_string(),
                    node_type: "function".to_string(),
                    label: "f()".to_string(),
                }],
                edges: vec![],
            })
            .unwrap();
        state
            .set_analysis(Analysis {
                bugs: vec![Finding::Text("none".to_string())],
                edge_cases: vec![],
                complexity: Complexity {
                    time: "O(1)".to_string(),
                    space: "O(1)".to_string(),
                },
                suggestions: vec![],
                anti_patterns: vec![],
            })
            .unwrap();
        state
            .set_diagrams("flowchart TD\n    A[Start] --> B[End]".to_string(), String::new())
            .unwrap();
        state
            .set_explanations(Explanations {
                simple: "Returns one.".to_string(),
                technical: String::new(),
                line_by_line: vec![],
                summary: "Constant function".to_string(),
            })
            .unwrap();
        state
    }

    #[test]
    fn test_format_report_sections() {
        let report = format_report(&complete_state());

        assert!(report.contains("Language: python"));
        assert!(report.contains("Summary: Constant function"));
        assert!(report.contains("Technical: N/A"));
        assert!(report.contains("Potential Bugs:\n  • none"));
        assert!(report.contains("  • Time: O(1)"));
        assert!(report.contains("FLOWCHART (Mermaid)"));
        assert!(!report.contains("CALL GRAPH"));
        assert!(report.contains("Nodes: 1\nEdges: 0"));
    }

    #[test]
    fn test_format_report_for_partial_state() {
        let state = PipelineState::new("python", "x = 1").unwrap();
        let report = format_report(&state);

        assert!(report.contains("x = 1"));
        // The banner is always present; only section headers are omitted
        assert!(report.contains("CODE UNDERSTANDING ANALYSIS"));
        assert!(!report.contains("\nANALYSIS\n"));
        assert!(!report.contains("\nEXPLANATIONS\n"));
        assert!(!report.contains("Potential Bugs"));
        assert!(!report.contains("Complexity:"));
    }

    #[test]
    fn test_save_output_writes_pretty_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("analysis.json");

        let written = save_output(&complete_state(), &path).unwrap();
        assert_eq!(written, path);

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("\n  \"language\": \"python\""));
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["analysis"]["complexity"]["time"], "O(1)");
        assert_eq!(value["code"], "def f():\n    return 1\n");
    }

    #[test]
    fn test_timestamped_filename_shape() {
        let name = timestamped_filename("analysis", "json");

        let stamp = name
            .strip_prefix("analysis_")
            .and_then(|rest| rest.strip_suffix(".json"))
            .unwrap();
        assert_eq!(stamp.len(), "20240101_120000".len());
        assert_eq!(stamp.as_bytes()[8], b'_');
        assert!(stamp
            .chars()
            .enumerate()
            .all(|(i, c)| i == 8 || c.is_ascii_digit()));
    }
}
