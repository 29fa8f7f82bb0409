// ABOUTME: Runs the five stages in order over one PipelineState; the first failure halts the run
// ABOUTME: Each stage is a dependency check, a prompt, one LLM round trip, extraction and a write-once merge

use std::sync::Arc;
use std::time::{Duration, Instant};

use codeinspector_ai::extractor::Extraction;
use codeinspector_ai::{GenerationConfig, LLMProvider, ResponseExtractor};
use codeinspector_core::{
    detect_language, LLMConfig, MalformedResponse, PipelineError, PipelineState, StageError,
    StageFailure, StageKind,
};
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::stages::stage_for;

/// Raw model text for one stage together with the extraction outcome.
/// Lives only for the duration of a single stage invocation.
#[derive(Debug, Clone)]
pub struct StageResult {
    pub stage: StageKind,
    pub raw: String,
    pub outcome: Result<Extraction, MalformedResponse>,
}

/// What a successful stage did, for progress output.
#[derive(Debug, Clone)]
pub struct StageReport {
    pub stage: StageKind,
    pub elapsed: Duration,
    pub tokens: Option<usize>,
    pub summary: String,
}

pub struct Pipeline {
    provider: Arc<dyn LLMProvider>,
    extractor: ResponseExtractor,
    generation: GenerationConfig,
}

impl Pipeline {
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self {
            provider,
            extractor: ResponseExtractor::default(),
            generation: GenerationConfig {
                json_mode: true,
                ..GenerationConfig::default()
            },
        }
    }

    /// Generation parameters taken from the `[llm]` config section.
    pub fn from_config(provider: Arc<dyn LLMProvider>, config: &LLMConfig) -> Self {
        Self::new(provider).with_generation_config(GenerationConfig {
            temperature: config.temperature,
            max_tokens: Some(config.max_tokens),
            json_mode: true,
            ..GenerationConfig::default()
        })
    }

    pub fn with_generation_config(mut self, generation: GenerationConfig) -> Self {
        self.generation = generation;
        self
    }

    pub fn with_extractor(mut self, extractor: ResponseExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn provider(&self) -> &Arc<dyn LLMProvider> {
        &self.provider
    }

    pub fn generation_config(&self) -> &GenerationConfig {
        &self.generation
    }

    /// Run every stage in order. Blank input is rejected before any LLM call.
    pub async fn run(
        &self,
        language: &str,
        source_code: &str,
    ) -> Result<PipelineState, PipelineError> {
        let mut state = PipelineState::new(language, source_code)?;
        let started = Instant::now();

        info!(
            "Starting analysis of {} code with {} ({})",
            state.language(),
            self.provider.provider_name(),
            self.provider.model_name()
        );

        for kind in StageKind::all() {
            if let Err(cause) = self.run_stage(kind, &mut state).await {
                if cause.is_wiring_bug() {
                    error!("Stage {} violated the pipeline contract: {}", kind, cause);
                } else {
                    error!("Stage {} failed: {}", kind, cause);
                }
                return Err(StageFailure {
                    stage: kind,
                    cause,
                    state,
                }
                .into());
            }
        }

        info!(
            "Analysis complete in {:.2}s",
            started.elapsed().as_secs_f64()
        );
        Ok(state)
    }

    /// Like [`Pipeline::run`], detecting the language when none is given.
    pub async fn run_detect(
        &self,
        source_code: &str,
        language: Option<&str>,
    ) -> Result<PipelineState, PipelineError> {
        let language = match language {
            Some(language) => language,
            None => {
                let detected = detect_language(source_code);
                info!("Detected language: {}", detected);
                detected
            }
        };
        self.run(language, source_code).await
    }

    /// Run a single stage against `state`. The stage's declared inputs must
    /// already be populated.
    pub async fn run_stage(
        &self,
        kind: StageKind,
        state: &mut PipelineState,
    ) -> Result<StageReport, StageError> {
        let span = info_span!("stage", stage = kind.name());
        self.run_stage_inner(kind, state).instrument(span).await
    }

    async fn run_stage_inner(
        &self,
        kind: StageKind,
        state: &mut PipelineState,
    ) -> Result<StageReport, StageError> {
        let stage = stage_for(kind);

        let missing = state.missing(stage.inputs());
        if !missing.is_empty() {
            return Err(StageError::DependencyViolation {
                stage: kind,
                missing,
            });
        }

        info!("{} stage running", kind);
        let started = Instant::now();

        let prompt = stage.build_prompt(state)?;
        debug!("Prompt is {} chars", prompt.len());

        let response = self
            .provider
            .generate_with_config(&prompt, &self.generation)
            .await
            .map_err(StageError::Transport)?;

        if response.is_truncated() {
            warn!("{} response was cut off at the token limit", kind);
        }

        let tokens = response.total_tokens;
        let result = StageResult {
            stage: kind,
            outcome: self.extractor.extract(&response.content),
            raw: response.content,
        };
        let extraction = match result.outcome {
            Ok(extraction) => extraction,
            Err(malformed) => {
                debug!("Unusable {} response:\n{}", result.stage, result.raw);
                return Err(malformed.into());
            }
        };
        // Schema errors point at the model's own text, not the cleaned payload
        let summary = stage
            .merge(state, extraction.payload)
            .map_err(|e| match e {
                StageError::MalformedResponse(m) => {
                    StageError::from(MalformedResponse::new(m.reason, &result.raw))
                }
                other => other,
            })?;
        let elapsed = started.elapsed();
        info!("{} ({:.2}s)", summary, elapsed.as_secs_f64());

        Ok(StageReport {
            stage: kind,
            elapsed,
            tokens,
            summary,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codeinspector_ai::{LLMResponse, LLMResult, Message, ProviderCharacteristics};

    struct Silent;

    #[async_trait::async_trait]
    impl LLMProvider for Silent {
        async fn generate_chat(
            &self,
            _messages: &[Message],
            _config: &GenerationConfig,
        ) -> LLMResult<LLMResponse> {
            anyhow::bail!("no model behind this provider")
        }

        async fn is_available(&self) -> bool {
            false
        }

        fn provider_name(&self) -> &str {
            "silent"
        }

        fn model_name(&self) -> &str {
            "none"
        }

        fn characteristics(&self) -> ProviderCharacteristics {
            ProviderCharacteristics {
                max_tokens: 1024,
                avg_latency_ms: 0,
                rpm_limit: None,
                supports_json_mode: false,
            }
        }
    }

    #[test]
    fn test_from_config_copies_generation_settings() {
        let config = LLMConfig {
            temperature: 0.3,
            max_tokens: 2048,
            ..LLMConfig::default()
        };
        let pipeline = Pipeline::from_config(Arc::new(Silent), &config);

        assert_eq!(pipeline.generation_config().temperature, 0.3);
        assert_eq!(pipeline.generation_config().max_tokens, Some(2048));
        assert!(pipeline.generation_config().json_mode);
    }

    #[tokio::test]
    async fn test_transport_error_fails_first_stage() {
        let pipeline = Pipeline::new(Arc::new(Silent));
        let err = pipeline.run("python", "print(1)").await.unwrap_err();

        let failure = err.stage_failure().expect("stage failure");
        assert_eq!(failure.stage, StageKind::Parse);
        assert!(matches!(failure.cause, StageError::Transport(_)));
        assert!(failure.state.parsed_structure().is_none());
    }
}
