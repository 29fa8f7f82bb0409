pub mod extractor;
pub mod llm_factory;
pub mod llm_provider;
pub mod ollama_provider;
pub mod transport;

// Cloud LLM providers
#[cfg(feature = "anthropic")]
pub mod anthropic_provider;
#[cfg(feature = "openai-llm")]
pub mod openai_llm_provider;

pub use extractor::{clean_diagram, extract_payload, unwrap_fence, ResponseExtractor};
pub use llm_factory::LLMProviderFactory;
pub use llm_provider::*;
pub use ollama_provider::{OllamaConfig, OllamaProvider};
