use crate::llm_provider::*;
use crate::transport::read_json;
use anyhow::anyhow;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, info};

/// Local models served by Ollama
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    pub model_name: String,
    pub base_url: String,
    pub context_window: usize,
    pub max_tokens: usize,
    pub temperature: f32,
    pub timeout: Duration,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            model_name: "qwen2.5-coder:14b".to_string(),
            base_url: "http://localhost:11434".to_string(),
            context_window: 32_000,
            max_tokens: 4096,
            temperature: 0.0,
            timeout: Duration::from_secs(120),
        }
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'static str>,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: usize,
    num_ctx: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
    #[serde(default)]
    done_reason: Option<String>,
    #[serde(default)]
    eval_count: Option<usize>,
    #[serde(default)]
    prompt_eval_count: Option<usize>,
}

pub struct OllamaProvider {
    client: Client,
    config: OllamaConfig,
}

impl OllamaProvider {
    pub fn new(config: OllamaConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn build_request(&self, messages: &[Message], config: &GenerationConfig) -> GenerateRequest {
        GenerateRequest {
            model: self.config.model_name.clone(),
            prompt: flatten_messages(messages),
            stream: false,
            format: config.json_mode.then_some("json"),
            options: GenerateOptions {
                temperature: config.temperature,
                num_predict: config.max_tokens.unwrap_or(self.config.max_tokens),
                num_ctx: self.config.context_window,
                stop: config.stop.clone(),
            },
        }
    }
}

#[async_trait]
impl LLMProvider for OllamaProvider {
    async fn generate_chat(
        &self,
        messages: &[Message],
        config: &GenerationConfig,
    ) -> LLMResult<LLMResponse> {
        let start_time = Instant::now();
        let request = self.build_request(messages, config);

        debug!(
            "Sending request to Ollama model {} ({} context window)",
            self.config.model_name, self.config.context_window
        );

        let response = timeout(
            self.config.timeout,
            self.client
                .post(format!("{}/api/generate", self.config.base_url))
                .json(&request)
                .send(),
        )
        .await
        .map_err(|_| anyhow!("Ollama request timeout after {:?}", self.config.timeout))?
        .map_err(|e| anyhow!("Ollama request failed: {}", e))?;

        let response_data: GenerateResponse = read_json("Ollama", response).await?;

        let prompt_tokens = response_data.prompt_eval_count.unwrap_or(0);
        let completion_tokens = response_data.eval_count.unwrap_or(0);

        info!(
            "Ollama generation completed: {}ms, context: {} tokens, completion: {} tokens",
            start_time.elapsed().as_millis(),
            prompt_tokens,
            completion_tokens
        );

        Ok(LLMResponse {
            content: response_data.response,
            total_tokens: Some(prompt_tokens + completion_tokens),
            prompt_tokens: Some(prompt_tokens),
            completion_tokens: Some(completion_tokens),
            finish_reason: response_data.done_reason,
            model: self.config.model_name.clone(),
        })
    }

    async fn is_available(&self) -> bool {
        let response = timeout(
            Duration::from_secs(5),
            self.client
                .get(format!("{}/api/tags", self.config.base_url))
                .send(),
        )
        .await;

        let models: serde_json::Value = match response {
            Ok(Ok(resp)) if resp.status().is_success() => match resp.json().await {
                Ok(models) => models,
                Err(_) => return false,
            },
            _ => return false,
        };

        let available = models["models"]
            .as_array()
            .map(|models| {
                models
                    .iter()
                    .filter_map(|model| model["name"].as_str())
                    .any(|name| name == self.config.model_name)
            })
            .unwrap_or(false);

        info!("Ollama model {} available: {}", self.config.model_name, available);
        available
    }

    fn provider_name(&self) -> &str {
        "ollama"
    }

    fn model_name(&self) -> &str {
        &self.config.model_name
    }

    fn characteristics(&self) -> ProviderCharacteristics {
        ProviderCharacteristics {
            max_tokens: self.config.context_window,
            avg_latency_ms: 5000,
            rpm_limit: None,
            supports_json_mode: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_uses_generation_overrides() {
        let provider = OllamaProvider::new(OllamaConfig::default());
        let config = GenerationConfig {
            max_tokens: Some(256),
            json_mode: true,
            ..Default::default()
        };
        let request = provider.build_request(&[Message::user("parse")], &config);
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(value["format"], "json");
        assert_eq!(value["options"]["num_predict"], 256);
        assert_eq!(value["stream"], false);
        assert!(value["prompt"].as_str().unwrap().ends_with("Assistant:"));
    }

    #[test]
    fn test_plain_request_has_no_format() {
        let provider = OllamaProvider::new(OllamaConfig::default());
        let request = provider.build_request(&[Message::user("x")], &GenerationConfig::default());
        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("format").is_none());
    }
}
