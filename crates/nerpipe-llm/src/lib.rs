//! nerpipe LLM - Chat-completion clients
//!
//! Provides abstraction for Ollama and OpenAI-compatible chat APIs.
//! Each extraction request is a single blocking completion; the
//! pipelines never stream or batch model calls.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::warn;

use nerpipe_core::{LlmConfig, LlmProvider, NerError, Result};

// ============================================================================
// Client Trait
// ============================================================================

/// Trait for chat-completion clients
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Send a single-message prompt and return the model's reply text
    async fn complete(&self, prompt: &str) -> Result<String>;

    /// Client name for logging
    fn name(&self) -> &str;
}

// ============================================================================
// Ollama Client
// ============================================================================

/// Ollama chat API client
pub struct OllamaClient {
    client: Client,
    base_url: String,
    model: String,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    messages: Vec<Message>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct OllamaResponse {
    message: Message,
    done: bool,
}

impl OllamaClient {
    /// Create a new Ollama client
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        temperature: f32,
        timeout_secs: u64,
    ) -> Self {
        Self {
            client: http_client(timeout_secs),
            base_url: base_url.into(),
            model: model.into(),
            temperature,
        }
    }

    /// Create from config
    pub fn from_config(config: &LlmConfig) -> Self {
        Self::new(
            config.ollama_url.clone(),
            config.model.clone(),
            config.temperature,
            config.timeout_secs,
        )
    }
}

#[async_trait]
impl ChatClient for OllamaClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let request = OllamaRequest {
            model: self.model.clone(),
            messages: vec![Message {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            stream: false,
            options: OllamaOptions {
                temperature: self.temperature,
            },
        };

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| NerError::Llm(format!("Ollama request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            warn!(%status, model = %self.model, "Ollama chat request failed");
            return Err(NerError::Llm(format!("Ollama error: {error_text}")));
        }

        let result: OllamaResponse = response
            .json()
            .await
            .map_err(|e| NerError::Llm(format!("Failed to parse Ollama response: {e}")))?;

        Ok(result.message.content)
    }

    fn name(&self) -> &str {
        "ollama"
    }
}

// ============================================================================
// OpenAI-compatible Client
// ============================================================================

/// OpenAI-compatible chat API client
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<Message>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct Choice {
    message: Message,
    finish_reason: Option<String>,
}

impl OpenAiClient {
    /// Create a new OpenAI-compatible client
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        max_tokens: u32,
        temperature: f32,
    ) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: model.into(),
            max_tokens,
            temperature,
        }
    }

    /// Create from config
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let api_key = config
            .openai_api_key
            .as_ref()
            .ok_or_else(|| NerError::Config("OpenAI API key required".to_string()))?;

        let base_url = config
            .openai_base_url
            .clone()
            .unwrap_or_else(|| "https://api.openai.com/v1".to_string());

        Ok(Self {
            client: http_client(config.timeout_secs),
            api_key: api_key.clone(),
            base_url,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }

    /// Set custom base URL (for compatible APIs)
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

#[async_trait]
impl ChatClient for OpenAiClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let request = OpenAiRequest {
            model: self.model.clone(),
            messages: vec![Message {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| NerError::Llm(format!("Request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            warn!(%status, model = %self.model, "chat completion request failed");
            return Err(NerError::Llm(format!("OpenAI error: {error_text}")));
        }

        let result: OpenAiResponse = response
            .json()
            .await
            .map_err(|e| NerError::Llm(format!("Failed to parse response: {e}")))?;

        result
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .ok_or_else(|| NerError::Llm("No response generated".to_string()))
    }

    fn name(&self) -> &str {
        "openai"
    }
}

// ============================================================================
// Factory function
// ============================================================================

fn http_client(timeout_secs: u64) -> Client {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .unwrap_or_default()
}

/// Create a chat client from config
pub fn create_chat_client(config: &LlmConfig) -> Result<Box<dyn ChatClient>> {
    match config.provider {
        LlmProvider::Ollama => Ok(Box::new(OllamaClient::from_config(config))),
        LlmProvider::OpenAI => Ok(Box::new(OpenAiClient::from_config(config)?)),
    }
}

// ============================================================================
// Tests
// ============================================================================
