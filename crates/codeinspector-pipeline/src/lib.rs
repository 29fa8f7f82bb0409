// ABOUTME: Staged analysis of a single code snippet.
// ABOUTME: Parse -> BuildGraph -> Analyze -> Visualize -> Explain, each stage one LLM round trip.

pub mod orchestrator;
pub mod prompts;
pub mod quality;
pub mod report;
pub mod stages;

pub use codeinspector_core::{
    PipelineError, PipelineState, StageError, StageFailure, StageKind, StateField,
};
pub use orchestrator::{Pipeline, StageReport, StageResult};
pub use quality::{score_quality, QualityReport, QualityScore, ScoreSource};
pub use report::{format_report, save_output, timestamped_filename};
pub use stages::{stage_for, Stage};
