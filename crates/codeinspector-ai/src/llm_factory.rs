use crate::llm_provider::*;
use crate::ollama_provider::{OllamaConfig, OllamaProvider};
use anyhow::{anyhow, Result};
use codeinspector_core::LLMConfig;
use std::sync::Arc;
use std::time::Duration;

#[cfg(feature = "anthropic")]
use crate::anthropic_provider::{AnthropicConfig, AnthropicProvider};

#[cfg(feature = "openai-llm")]
use crate::openai_llm_provider::{OpenAIConfig, OpenAIProvider};

/// Factory for creating LLM providers based on configuration
pub struct LLMProviderFactory;

impl LLMProviderFactory {
    /// Create an LLM provider from configuration
    pub fn create_from_config(config: &LLMConfig) -> Result<Arc<dyn LLMProvider>> {
        let provider_name = config.provider.to_lowercase();

        match provider_name.as_str() {
            "ollama" => Self::create_ollama_provider(config),
            #[cfg(feature = "anthropic")]
            "anthropic" => Self::create_anthropic_provider(config),
            #[cfg(feature = "openai-llm")]
            "openai" => Self::create_openai_provider(config),
            _ => Err(anyhow!(
                "Unsupported LLM provider: {}. Available providers: {}",
                provider_name,
                Self::supported_providers().join(", ")
            )),
        }
    }

    /// Create an Ollama provider
    fn create_ollama_provider(config: &LLMConfig) -> Result<Arc<dyn LLMProvider>> {
        let defaults = OllamaConfig::default();
        let ollama_config = OllamaConfig {
            model_name: config.model.clone().unwrap_or(defaults.model_name),
            base_url: config.ollama_url.clone(),
            context_window: config.context_window,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            timeout: Duration::from_secs(config.timeout_secs),
        };

        Ok(Arc::new(OllamaProvider::new(ollama_config)))
    }

    /// Create an Anthropic Claude provider
    #[cfg(feature = "anthropic")]
    fn create_anthropic_provider(config: &LLMConfig) -> Result<Arc<dyn LLMProvider>> {
        let api_key = config
            .anthropic_api_key
            .clone()
            .or_else(|| std::env::var("ANTHROPIC_API_KEY").ok())
            .ok_or_else(|| {
                anyhow!(
                    "Anthropic API key not found. Set 'anthropic_api_key' in config \
                     or ANTHROPIC_API_KEY environment variable"
                )
            })?;

        let defaults = AnthropicConfig::default();
        let anthropic_config = AnthropicConfig {
            api_key,
            model: config.model.clone().unwrap_or(defaults.model),
            context_window: config.context_window,
            timeout_secs: config.timeout_secs,
            max_retries: config.max_retries,
        };

        Ok(Arc::new(AnthropicProvider::new(anthropic_config)?))
    }

    /// Create an OpenAI provider
    #[cfg(feature = "openai-llm")]
    fn create_openai_provider(config: &LLMConfig) -> Result<Arc<dyn LLMProvider>> {
        let api_key = config
            .openai_api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .ok_or_else(|| {
                anyhow!(
                    "OpenAI API key not found. Set 'openai_api_key' in config \
                     or OPENAI_API_KEY environment variable"
                )
            })?;

        let defaults = OpenAIConfig::default();
        let openai_config = OpenAIConfig {
            api_key,
            base_url: config.openai_base_url.trim_end_matches('/').to_string(),
            model: config.model.clone().unwrap_or(defaults.model),
            context_window: config.context_window,
            timeout_secs: config.timeout_secs,
            max_retries: config.max_retries,
            organization: defaults.organization,
        };

        Ok(Arc::new(OpenAIProvider::new(openai_config)?))
    }

    /// Get a list of supported providers (based on enabled features)
    pub fn supported_providers() -> Vec<&'static str> {
        #[allow(unused_mut)]
        let mut providers = vec!["ollama"];

        #[cfg(feature = "anthropic")]
        providers.push("anthropic");

        #[cfg(feature = "openai-llm")]
        providers.push("openai");

        providers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_providers() {
        let providers = LLMProviderFactory::supported_providers();
        assert!(providers.contains(&"ollama"));
    }

    #[test]
    fn test_ollama_provider_creation() {
        let config = LLMConfig {
            provider: "ollama".to_string(),
            model: Some("qwen2.5-coder:14b".to_string()),
            ..Default::default()
        };

        let provider = LLMProviderFactory::create_from_config(&config).unwrap();
        assert_eq!(provider.provider_name(), "ollama");
        assert_eq!(provider.model_name(), "qwen2.5-coder:14b");
    }

    #[test]
    fn test_unknown_provider() {
        let config = LLMConfig {
            provider: "mystery".to_string(),
            ..Default::default()
        };

        let err = LLMProviderFactory::create_from_config(&config)
            .err()
            .unwrap();
        assert!(err.to_string().contains("Unsupported LLM provider: mystery"));
    }
}
