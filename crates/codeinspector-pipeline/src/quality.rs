// ABOUTME: Optional post-pipeline quality scoring
// ABOUTME: One extra LLM call; an undecodable reply falls back to scores derived from the analysis

use anyhow::{Context, Result};
use codeinspector_ai::{extract_payload, GenerationConfig, LLMProvider};
use codeinspector_core::{Analysis, Finding, PipelineState};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use tracing::{info, warn};

use crate::prompts;

const WEIGHTS: [f32; 5] = [0.25, 0.25, 0.20, 0.15, 0.15];
const METRIC_NAMES: [&str; 5] = [
    "Readability",
    "Maintainability",
    "Security",
    "Performance",
    "Best Practices",
];

/// One dimension, scored 1 to 10.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityScore {
    pub score: f32,
    #[serde(default)]
    pub reason: String,
}

impl QualityScore {
    fn new(score: f32, reason: &str) -> Self {
        Self {
            score: score.clamp(1.0, 10.0),
            reason: reason.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreSource {
    Model,
    Heuristic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub readability: QualityScore,
    pub maintainability: QualityScore,
    pub security: QualityScore,
    pub performance: QualityScore,
    pub best_practices: QualityScore,
    pub highlights: Vec<String>,
    pub critical_issues: Vec<String>,
    /// Weighted average, one decimal.
    pub overall: f32,
    pub grade: String,
    pub source: ScoreSource,
}

#[derive(Deserialize)]
struct ModelScores {
    readability: QualityScore,
    maintainability: QualityScore,
    security: QualityScore,
    performance: QualityScore,
    best_practices: QualityScore,
    #[serde(default)]
    highlights: Vec<Finding>,
    #[serde(default)]
    critical_issues: Vec<Finding>,
}

impl QualityReport {
    fn assemble(
        scores: [QualityScore; 5],
        highlights: Vec<String>,
        critical_issues: Vec<String>,
        source: ScoreSource,
    ) -> Self {
        let weighted: f32 = scores
            .iter()
            .zip(WEIGHTS)
            .map(|(metric, weight)| metric.score * weight)
            .sum();
        let [readability, maintainability, security, performance, best_practices] = scores;

        Self {
            readability,
            maintainability,
            security,
            performance,
            best_practices,
            highlights,
            critical_issues,
            overall: (weighted * 10.0).round() / 10.0,
            grade: letter_grade(weighted).to_string(),
            source,
        }
    }

    fn from_model(scores: ModelScores) -> Self {
        let clamp = |s: QualityScore| QualityScore::new(s.score, &s.reason);
        Self::assemble(
            [
                clamp(scores.readability),
                clamp(scores.maintainability),
                clamp(scores.security),
                clamp(scores.performance),
                clamp(scores.best_practices),
            ],
            scores.highlights.iter().map(Finding::as_text).collect(),
            scores.critical_issues.iter().map(Finding::as_text).collect(),
            ScoreSource::Model,
        )
    }

    /// Scores derived only from the counts in `analysis`.
    pub fn heuristic(analysis: &Analysis) -> Self {
        let bugs = analysis.bugs.len() as f32;
        let suggestions = analysis.suggestions.len() as f32;
        let security_bugs = analysis
            .bugs
            .iter()
            .filter(|bug| {
                let text = bug.as_text().to_lowercase();
                text.contains("security") || text.contains("vulnerable")
            })
            .count() as f32;

        Self::assemble(
            [
                QualityScore::new(10.0 - suggestions, "Based on code structure analysis"),
                QualityScore::new(
                    10.0 - ((bugs + suggestions) / 2.0).floor(),
                    "Based on complexity and issues",
                ),
                QualityScore::new(
                    10.0 - security_bugs * 2.0,
                    "Based on security-related findings",
                ),
                QualityScore::new(7.0, "Based on algorithmic complexity"),
                QualityScore::new(9.0 - bugs, "Based on code quality"),
            ],
            vec!["Code compiles successfully".to_string()],
            analysis.bugs.iter().take(3).map(Finding::as_text).collect(),
            ScoreSource::Heuristic,
        )
    }

    fn metrics(&self) -> [(&'static str, &QualityScore); 5] {
        [
            (METRIC_NAMES[0], &self.readability),
            (METRIC_NAMES[1], &self.maintainability),
            (METRIC_NAMES[2], &self.security),
            (METRIC_NAMES[3], &self.performance),
            (METRIC_NAMES[4], &self.best_practices),
        ]
    }

    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str("# Code Quality Report\n\n");
        out.push_str(&format!(
            "## Overall Score: {:.1}/10 ({})\n\n",
            self.overall, self.grade
        ));
        if self.source == ScoreSource::Heuristic {
            out.push_str("_Scores estimated from the analysis results._\n\n");
        }

        out.push_str("| Metric | Score | Assessment |\n");
        out.push_str("|--------|-------|------------|\n");
        for (name, metric) in self.metrics() {
            out.push_str(&format!(
                "| **{}** | {}/10 | {} |\n",
                name,
                metric.score,
                score_bar(metric.score)
            ));
        }

        if !self.highlights.is_empty() {
            out.push_str("\n### Highlights\n");
            for highlight in &self.highlights {
                out.push_str(&format!("- {}\n", highlight));
            }
        }

        if !self.critical_issues.is_empty() {
            out.push_str("\n### Critical Issues\n");
            for issue in &self.critical_issues {
                out.push_str(&format!("- {}\n", issue));
            }
        }

        out.push_str("\n### Detailed Assessment\n");
        for (name, metric) in self.metrics() {
            if !metric.reason.is_empty() {
                out.push_str(&format!("\n**{}**: {}\n", name, metric.reason));
            }
        }

        out
    }
}

impl fmt::Display for QualityReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_markdown())
    }
}

pub fn letter_grade(score: f32) -> &'static str {
    const GRADES: [(f32, &str); 10] = [
        (9.0, "A+"),
        (8.5, "A"),
        (8.0, "A-"),
        (7.5, "B+"),
        (7.0, "B"),
        (6.5, "B-"),
        (6.0, "C+"),
        (5.5, "C"),
        (5.0, "C-"),
        (4.0, "D"),
    ];

    GRADES
        .iter()
        .find(|(threshold, _)| score >= *threshold)
        .map(|(_, grade)| *grade)
        .unwrap_or("F")
}

fn score_bar(score: f32) -> String {
    let filled = (score.floor() as usize).min(10);
    format!("{}{}", "█".repeat(filled), "░".repeat(10 - filled))
}

/// Score a completed run. Requires `analysis` to be populated.
///
/// Transport errors propagate; an unusable reply falls back to
/// [`QualityReport::heuristic`].
pub async fn score_quality(
    provider: &dyn LLMProvider,
    state: &PipelineState,
    generation: &GenerationConfig,
) -> Result<QualityReport> {
    let analysis = state
        .analysis()
        .context("quality scoring needs a completed analysis")?;

    let prompt = prompts::quality_prompt(state.language(), state.source_code(), analysis);
    let response = provider
        .generate_with_config(&prompt, generation)
        .await
        .context("quality scoring request failed")?;

    let decoded = extract_payload(&response.content)
        .map_err(|e| e.to_string())
        .and_then(|payload| {
            serde_json::from_value::<ModelScores>(Value::Object(payload))
                .map_err(|e| e.to_string())
        });

    let report = match decoded {
        Ok(scores) => QualityReport::from_model(scores),
        Err(reason) => {
            warn!("Using heuristic quality scores: {}", reason);
            QualityReport::heuristic(analysis)
        }
    };

    info!(
        "Quality score {:.1}/10 ({})",
        report.overall, report.grade
    );
    Ok(report)
}
