use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(String),

    #[error("Failed to read config: {0}")]
    ReadError(String),

    #[error("Failed to parse config: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Main configuration for Code Inspector
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CodeInspectorConfig {
    /// LLM used by every pipeline stage
    #[serde(default)]
    pub llm: LLMConfig,

    /// Where and whether results are written
    #[serde(default)]
    pub output: OutputConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// LLM configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMConfig {
    /// LLM provider: "openai", "anthropic", "ollama"
    #[serde(default = "default_llm_provider")]
    pub provider: String,

    /// Model identifier
    /// For OpenAI: model name (e.g., "gpt-4o-mini")
    /// For Anthropic: model name (e.g., "claude-3-5-sonnet-20241022")
    /// For Ollama: model name (e.g., "qwen2.5-coder:14b")
    #[serde(default)]
    pub model: Option<String>,

    /// OpenAI-compatible base URL
    #[serde(default = "default_openai_base_url")]
    pub openai_base_url: String,

    /// Ollama URL
    #[serde(default = "default_ollama_url")]
    pub ollama_url: String,

    /// OpenAI API key
    #[serde(default)]
    pub openai_api_key: Option<String>,

    /// Anthropic API key
    #[serde(default)]
    pub anthropic_api_key: Option<String>,

    /// Context window size
    #[serde(default = "default_context_window")]
    pub context_window: usize,

    /// Temperature for generation (0.0 keeps stage output deterministic)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate per stage
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Transport-level retries per request
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            model: None,
            openai_base_url: default_openai_base_url(),
            ollama_url: default_ollama_url(),
            openai_api_key: None,
            anthropic_api_key: None,
            context_window: default_context_window(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

/// Output persistence configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory for timestamped result files
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,

    /// Write results to disk after a successful run
    #[serde(default = "default_save")]
    pub save: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            save: default_save(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: "pretty", "compact"
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_llm_provider() -> String {
    "openai".to_string()
}
fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}
fn default_context_window() -> usize {
    128_000
}
fn default_temperature() -> f32 {
    0.0
}
fn default_max_tokens() -> usize {
    4096
}
fn default_timeout_secs() -> u64 {
    120
}
fn default_max_retries() -> u32 {
    3
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("outputs")
}
fn default_save() -> bool {
    true
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "pretty".to_string()
}

pub const SUPPORTED_PROVIDERS: &[&str] = &["openai", "anthropic", "ollama"];

/// Configuration manager with smart defaults
#[derive(Debug)]
pub struct ConfigManager {
    config: CodeInspectorConfig,
    config_path: Option<PathBuf>,
}

impl ConfigManager {
    /// Load configuration with the following precedence:
    /// 1. Environment variables (.env file)
    /// 2. Config file (.codeinspector.toml)
    /// 3. Sensible defaults
    pub fn load() -> Result<Self, ConfigError> {
        info!("Loading Code Inspector configuration");

        Self::load_dotenv();

        let (config, config_path) = Self::load_config_file()?;
        let config = Self::apply_env_overrides(config);
        Self::validate_config(&config)?;

        match config_path {
            Some(ref path) => info!("Config file: {}", path.display()),
            None => info!("Config file: NONE (using defaults)"),
        }
        info!(
            "LLM provider: {} (model: {})",
            config.llm.provider,
            config.llm.model.as_deref().unwrap_or("default")
        );

        Ok(Self {
            config,
            config_path,
        })
    }

    /// Load from an explicit TOML file, still honouring environment overrides.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let config = Self::apply_env_overrides(Self::read_toml_file(path)?);
        Self::validate_config(&config)?;
        Ok(Self {
            config,
            config_path: Some(path.to_path_buf()),
        })
    }

    /// Load .env file if it exists
    fn load_dotenv() {
        if Path::new(".env").exists() {
            if let Err(e) = dotenv::from_filename(".env") {
                warn!("Failed to load .env file: {}", e);
            } else {
                info!("Loaded .env file from current directory");
            }
            return;
        }

        if let Some(home) = dirs::home_dir() {
            let home_env = home.join(".codeinspector.env");
            if home_env.exists() {
                if let Err(e) = dotenv::from_path(&home_env) {
                    warn!("Failed to load .codeinspector.env: {}", e);
                } else {
                    info!("Loaded .codeinspector.env from home directory");
                }
            }
        }
    }

    /// Find and load config file
    /// Search order:
    /// 1. ./.codeinspector.toml (current directory)
    /// 2. ~/.codeinspector/config.toml (user config)
    /// 3. Use defaults
    fn load_config_file() -> Result<(CodeInspectorConfig, Option<PathBuf>), ConfigError> {
        let local_config = Path::new(".codeinspector.toml");
        if local_config.exists() {
            let config = Self::read_toml_file(local_config)?;
            return Ok((config, Some(local_config.to_path_buf())));
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".codeinspector").join("config.toml");
            if user_config.exists() {
                let config = Self::read_toml_file(&user_config)?;
                return Ok((config, Some(user_config)));
            }
        }

        info!("No config file found, using defaults");
        Ok((CodeInspectorConfig::default(), None))
    }

    fn read_toml_file(path: &Path) -> Result<CodeInspectorConfig, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError(e.to_string()))?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(mut config: CodeInspectorConfig) -> CodeInspectorConfig {
        if let Ok(provider) = std::env::var("CODEINSPECTOR_LLM_PROVIDER") {
            config.llm.provider = provider.to_lowercase();
        }
        if let Ok(model) = std::env::var("CODEINSPECTOR_MODEL") {
            config.llm.model = Some(model);
        }
        if let Ok(temp) = std::env::var("CODEINSPECTOR_TEMPERATURE") {
            if let Ok(t) = temp.parse() {
                config.llm.temperature = t;
            }
        }
        if let Ok(max_tokens) = std::env::var("CODEINSPECTOR_MAX_TOKENS") {
            if let Ok(n) = max_tokens.parse() {
                config.llm.max_tokens = n;
            }
        }
        if let Ok(timeout) = std::env::var("CODEINSPECTOR_TIMEOUT_SECS") {
            if let Ok(secs) = timeout.parse() {
                config.llm.timeout_secs = secs;
            }
        }
        if let Ok(url) = std::env::var("CODEINSPECTOR_OLLAMA_URL") {
            config.llm.ollama_url = url;
        }
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            config.llm.openai_api_key = Some(key);
        }
        if let Ok(key) = std::env::var("ANTHROPIC_API_KEY") {
            config.llm.anthropic_api_key = Some(key);
        }

        if let Ok(dir) = std::env::var("CODEINSPECTOR_OUTPUT_DIR") {
            config.output.dir = PathBuf::from(dir);
        }

        if let Ok(level) = std::env::var("RUST_LOG") {
            config.logging.level = level;
        }

        config
    }

    /// Validate configuration
    pub fn validate_config(config: &CodeInspectorConfig) -> Result<(), ConfigError> {
        if !SUPPORTED_PROVIDERS.contains(&config.llm.provider.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "Invalid LLM provider: {}. Must be one of: {}",
                config.llm.provider,
                SUPPORTED_PROVIDERS.join(", ")
            )));
        }

        if !(0.0..=2.0).contains(&config.llm.temperature) {
            return Err(ConfigError::ValidationError(format!(
                "Invalid temperature: {}. Must be between 0.0 and 2.0",
                config.llm.temperature
            )));
        }

        if config.llm.max_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "max_tokens must be greater than zero".to_string(),
            ));
        }

        // RUST_LOG-style directives ("codeinspector=debug,info") are passed through as-is
        match config.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            directive if directive.contains('=') || directive.contains(',') => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                    other
                )))
            }
        }

        Ok(())
    }

    /// Get the loaded configuration
    pub fn config(&self) -> &CodeInspectorConfig {
        &self.config
    }

    /// Get the path to the config file that was loaded, if any
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = CodeInspectorConfig::default();
        assert_eq!(config.llm.provider, "openai");
        assert_eq!(config.llm.temperature, 0.0);
        assert_eq!(config.output.dir, PathBuf::from("outputs"));
        assert!(ConfigManager::validate_config(&config).is_ok());
    }

    #[test]
    fn test_rejects_unknown_provider() {
        let mut config = CodeInspectorConfig::default();
        config.llm.provider = "mystery".to_string();
        let err = ConfigManager::validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("Invalid LLM provider"));
    }

    #[test]
    fn test_rejects_out_of_range_temperature() {
        let mut config = CodeInspectorConfig::default();
        config.llm.temperature = 3.5;
        assert!(ConfigManager::validate_config(&config).is_err());
    }

    #[test]
    #[serial]
    fn test_load_from_toml_with_env_override() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[llm]\nprovider = \"ollama\"\nmodel = \"qwen2.5-coder:14b\"\n\n[output]\nsave = false"
        )
        .unwrap();

        std::env::set_var("CODEINSPECTOR_TEMPERATURE", "0.3");
        let manager = ConfigManager::load_from(file.path()).unwrap();
        std::env::remove_var("CODEINSPECTOR_TEMPERATURE");

        let config = manager.config();
        assert_eq!(config.llm.provider, "ollama");
        assert_eq!(config.llm.model.as_deref(), Some("qwen2.5-coder:14b"));
        assert!((config.llm.temperature - 0.3).abs() < f32::EPSILON);
        assert!(!config.output.save);
        assert_eq!(manager.config_path(), Some(file.path()));
    }

    #[test]
    fn test_load_from_missing_file() {
        let err = ConfigManager::load_from(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }
}
