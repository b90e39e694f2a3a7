//! nerpipe Configuration Management
//!
//! Handles configuration from environment variables, a TOML config file,
//! and command-line arguments with sensible defaults for development.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Input dataset configuration
    pub dataset: DatasetConfig,

    /// LLM provider configuration
    pub llm: LlmConfig,

    /// Token-classification endpoint configuration
    pub transformer: TransformerConfig,

    /// Output store configuration
    pub store: StoreConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        // Dataset
        if let Ok(path) = std::env::var("NER_DATASET") {
            config.dataset.path = PathBuf::from(path);
        }

        // LLM
        if let Ok(provider) = std::env::var("LLM_PROVIDER") {
            config.llm.provider = provider.parse()?;
        }
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            config.llm.openai_api_key = Some(key);
        }
        if let Ok(url) = std::env::var("OLLAMA_URL") {
            config.llm.ollama_url = url;
        }
        if let Ok(model) = std::env::var("LLM_MODEL") {
            config.llm.model = model;
        }

        // Transformer endpoint
        if let Ok(url) = std::env::var("NER_INFERENCE_URL") {
            config.transformer.endpoint = url;
        }
        if let Ok(model) = std::env::var("NER_INFERENCE_MODEL") {
            config.transformer.model = model;
        }

        // Store
        if let Ok(path) = std::env::var("NER_DB") {
            config.store.db_path = Some(PathBuf::from(path));
        }

        // Logging
        if let Ok(level) = std::env::var("LOG_LEVEL") {
            config.logging.level = level;
        }

        Ok(config)
    }

    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path,
            message: e.to_string(),
        })
    }

    /// Merge with environment variables (env takes precedence)
    pub fn with_env_override(mut self) -> Result<Self, ConfigError> {
        let env_config = Self::from_env()?;

        if env_config.dataset.path != DatasetConfig::default().path {
            self.dataset.path = env_config.dataset.path;
        }
        if env_config.llm.provider != LlmConfig::default().provider {
            self.llm.provider = env_config.llm.provider;
        }
        if env_config.llm.model != LlmConfig::default().model {
            self.llm.model = env_config.llm.model;
        }
        if env_config.llm.ollama_url != LlmConfig::default().ollama_url {
            self.llm.ollama_url = env_config.llm.ollama_url;
        }
        if env_config.transformer.endpoint != TransformerConfig::default().endpoint {
            self.transformer.endpoint = env_config.transformer.endpoint;
        }
        if env_config.transformer.model != TransformerConfig::default().model {
            self.transformer.model = env_config.transformer.model;
        }
        if env_config.store.db_path.is_some() {
            self.store.db_path = env_config.store.db_path;
        }
        if env_config.logging.level != LoggingConfig::default().level {
            self.logging.level = env_config.logging.level;
        }

        // Always use env for sensitive values
        if env_config.llm.openai_api_key.is_some() {
            self.llm.openai_api_key = env_config.llm.openai_api_key;
        }

        Ok(self)
    }
}

/// Input dataset configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Path to the header-less four-column CSV file
    /// (identifier, sentence, part-of-speech tag, gold tag)
    pub path: PathBuf,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("ner.csv"),
        }
    }
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// LLM provider to use
    pub provider: LlmProvider,

    /// OpenAI API key (for OpenAI-compatible endpoints)
    pub openai_api_key: Option<String>,

    /// OpenAI API base URL (for compatible APIs)
    pub openai_base_url: Option<String>,

    /// Ollama server URL
    pub ollama_url: String,

    /// Model name to use
    pub model: String,

    /// Maximum tokens for completion
    pub max_tokens: u32,

    /// Temperature for generation; zero for deterministic extraction
    pub temperature: f32,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::Ollama,
            openai_api_key: None,
            openai_base_url: None,
            ollama_url: "http://localhost:11434".to_string(),
            model: "mistral".to_string(),
            max_tokens: 1024,
            temperature: 0.0,
            timeout_secs: 60,
        }
    }
}

/// Supported LLM providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    Ollama,
    OpenAI,
}

impl std::str::FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "openai" => Ok(Self::OpenAI),
            _ => Err(ConfigError::InvalidValue {
                key: "LLM_PROVIDER".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Token-classification endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformerConfig {
    /// Inference endpoint base URL
    pub endpoint: String,

    /// Model identifier on the inference server
    pub model: String,

    /// Sub-word span aggregation strategy
    pub aggregation_strategy: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for TransformerConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8080".to_string(),
            model: "dslim/bert-base-NER".to_string(),
            aggregation_strategy: "simple".to_string(),
            timeout_secs: 60,
        }
    }
}

/// Output store configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StoreConfig {
    /// Database file path; falls back to the pipeline's default when unset
    pub db_path: Option<PathBuf>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// JSON format for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

impl From<ConfigError> for crate::NerError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e.to_string())
    }
}
