//! Generator API Providers
//!
//! HTTP clients for OpenAI-compatible chat completion endpoints (OpenAI,
//! vLLM, Ollama in OpenAI mode) and the Anthropic messages API.

use super::*;
use reqwest::Client;
use std::str::FromStr;
use std::time::Duration;

pub const PROVIDER_ENV: &str = "TRENDLINE_LLM_PROVIDER";
pub const MODEL_ENV: &str = "TRENDLINE_LLM_MODEL";
pub const TIMEOUT_ENV: &str = "TRENDLINE_LLM_TIMEOUT_SECS";
pub const MAX_TOKENS_ENV: &str = "TRENDLINE_LLM_MAX_TOKENS";

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const LOCAL_BASE_URL: &str = "http://localhost:11434";

// ============================================================================
// Configuration
// ============================================================================

/// Generator configuration loaded from the environment or built by hand.
#[derive(Debug, Clone, PartialEq)]
pub struct LLMConfig {
    pub provider: Provider,
    pub api_key: String,
    pub model: String,
    pub base_url: Option<String>,
    pub timeout_secs: u64,
    pub max_tokens: usize,
    pub temperature: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    OpenAI,
    Anthropic,
    Local,
}

impl FromStr for Provider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" | "open-ai" => Ok(Provider::OpenAI),
            "anthropic" | "claude" => Ok(Provider::Anthropic),
            "local" | "ollama" | "vllm" => Ok(Provider::Local),
            other => Err(ConfigError::Invalid(format!(
                "unknown provider `{other}` (expected openai, anthropic or local)"
            ))),
        }
    }
}

impl LLMConfig {
    /// Load from environment variables.
    ///
    /// `TRENDLINE_LLM_PROVIDER` picks the provider explicitly; otherwise the
    /// first of `OPENAI_API_KEY`, `ANTHROPIC_API_KEY`, `LOCAL_LLM_URL` wins.
    pub fn from_env() -> Result<Self, ConfigError> {
        let explicit = match std::env::var(PROVIDER_ENV) {
            Ok(v) if !v.trim().is_empty() => Some(v.parse::<Provider>()?),
            _ => None,
        };
        Self::from_env_for(explicit)
    }

    /// Like [`LLMConfig::from_env`], with the provider chosen by the caller.
    pub fn from_env_for(explicit: Option<Provider>) -> Result<Self, ConfigError> {
        let mut config = match explicit {
            Some(Provider::OpenAI) => Self::openai(&required_env("OPENAI_API_KEY")?, &openai_model()),
            Some(Provider::Anthropic) => {
                Self::anthropic(&required_env("ANTHROPIC_API_KEY")?, &anthropic_model())
            }
            Some(Provider::Local) => Self::local(
                &std::env::var("LOCAL_LLM_URL").unwrap_or_else(|_| LOCAL_BASE_URL.to_string()),
                &local_model(),
            ),
            None => {
                if let Ok(key) = std::env::var("OPENAI_API_KEY") {
                    Self::openai(&key, &openai_model())
                } else if let Ok(key) = std::env::var("ANTHROPIC_API_KEY") {
                    Self::anthropic(&key, &anthropic_model())
                } else if let Ok(url) = std::env::var("LOCAL_LLM_URL") {
                    Self::local(&url, &local_model())
                } else {
                    return Err(ConfigError::NoProviderConfigured);
                }
            }
        };

        match config.provider {
            Provider::OpenAI => config.base_url = std::env::var("OPENAI_BASE_URL").ok(),
            Provider::Anthropic => config.base_url = std::env::var("ANTHROPIC_BASE_URL").ok(),
            Provider::Local => {}
        }
        if let Ok(model) = std::env::var(MODEL_ENV) {
            if !model.trim().is_empty() {
                config.model = model.trim().to_string();
            }
        }
        config.timeout_secs = env_u64(TIMEOUT_ENV, config.timeout_secs, 1, 900)?;
        config.max_tokens = env_u64(MAX_TOKENS_ENV, config.max_tokens as u64, 256, 200_000)? as usize;
        Ok(config)
    }

    pub fn openai(api_key: &str, model: &str) -> Self {
        Self {
            provider: Provider::OpenAI,
            api_key: api_key.to_string(),
            model: model.to_string(),
            base_url: None,
            timeout_secs: 60,
            max_tokens: 4096,
            temperature: 0.7,
        }
    }

    pub fn anthropic(api_key: &str, model: &str) -> Self {
        Self {
            provider: Provider::Anthropic,
            ..Self::openai(api_key, model)
        }
    }

    pub fn local(url: &str, model: &str) -> Self {
        Self {
            provider: Provider::Local,
            api_key: String::new(),
            model: model.to_string(),
            base_url: Some(url.to_string()),
            timeout_secs: 120,
            max_tokens: 4096,
            temperature: 0.7,
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = Some(base_url.to_string());
        self
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Chat-completions root, always ending in `/v1` for local servers.
    fn chat_base_url(&self) -> String {
        match (self.provider, self.base_url.as_deref()) {
            (Provider::Local, base) => {
                let base = base.unwrap_or(LOCAL_BASE_URL).trim_end_matches('/');
                if base.ends_with("/v1") {
                    base.to_string()
                } else {
                    format!("{base}/v1")
                }
            }
            (_, Some(base)) => base.trim_end_matches('/').to_string(),
            (_, None) => OPENAI_BASE_URL.to_string(),
        }
    }
}

fn openai_model() -> String {
    std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string())
}

fn anthropic_model() -> String {
    std::env::var("ANTHROPIC_MODEL").unwrap_or_else(|_| "claude-3-5-sonnet-latest".to_string())
}

fn local_model() -> String {
    std::env::var("LOCAL_LLM_MODEL").unwrap_or_else(|_| "llama3.1".to_string())
}

fn required_env(name: &'static str) -> Result<String, ConfigError> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ConfigError::MissingKey(name)),
    }
}

fn env_u64(name: &str, default: u64, min: u64, max: u64) -> Result<u64, ConfigError> {
    match std::env::var(name) {
        Ok(v) => {
            let v = v.trim();
            if v.is_empty() {
                return Ok(default);
            }
            let parsed = v
                .parse::<u64>()
                .map_err(|_| ConfigError::Invalid(format!("{name}={v:?} (expected integer)")))?;
            Ok(parsed.clamp(min, max))
        }
        Err(_) => Ok(default),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("No generator configured. Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or LOCAL_LLM_URL")]
    NoProviderConfigured,
    #[error("{0} must be set for the selected provider")]
    MissingKey(&'static str),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

fn http_client(timeout_secs: u64) -> Result<Client, LLMError> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| LLMError::Network(format!("failed to create HTTP client: {e}")))
}

fn transport_error(e: reqwest::Error, timeout_secs: u64) -> LLMError {
    if e.is_timeout() {
        LLMError::Timeout(timeout_secs)
    } else {
        LLMError::Network(e.to_string())
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, LLMError> {
    if response.status() == 429 {
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<u64>().ok())
            .unwrap_or(60);
        return Err(LLMError::RateLimited {
            retry_after_ms: retry_after * 1000,
        });
    }
    if !response.status().is_success() {
        let status = response.status().as_u16();
        let error_text = response.text().await.unwrap_or_default();
        return Err(LLMError::Api(format!("HTTP {status}: {error_text}")));
    }
    Ok(response)
}

fn non_empty(text: String) -> Option<String> {
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

// ============================================================================
// OpenAI-compatible Provider
// ============================================================================

pub struct OpenAiCompatibleClient {
    client: Client,
    config: LLMConfig,
}

impl OpenAiCompatibleClient {
    pub fn new(config: LLMConfig) -> Result<Self, LLMError> {
        let client = http_client(config.timeout_secs)?;
        Ok(Self { client, config })
    }

    fn body(&self, request: &GenerationRequest) -> serde_json::Value {
        let mut messages = vec![serde_json::json!({
            "role": "system",
            "content": request.system,
        })];
        messages.extend(request.messages.iter().map(|m| {
            serde_json::json!({
                "role": m.role.as_str(),
                "content": m.content,
            })
        }));

        serde_json::json!({
            "model": self.config.model,
            "messages": messages,
            "max_tokens": request.max_tokens.unwrap_or(self.config.max_tokens),
            "temperature": request.temperature.unwrap_or(self.config.temperature),
        })
    }
}

#[async_trait]
impl TextGenerator for OpenAiCompatibleClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<Option<String>, LLMError> {
        let url = format!("{}/chat/completions", self.config.chat_base_url());

        let mut builder = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&self.body(request));
        if !self.config.api_key.is_empty() {
            builder = builder.header("Authorization", format!("Bearer {}", self.config.api_key));
        }

        let response = builder
            .send()
            .await
            .map_err(|e| transport_error(e, self.config.timeout_secs))?;
        let response = check_status(response).await?;

        let data: serde_json::Value = response
            .json()
            .await
            .map_err(|e| LLMError::InvalidResponse(e.to_string()))?;

        let content = data["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or("")
            .to_string();
        Ok(non_empty(content))
    }

    fn model_name(&self) -> String {
        self.config.model.clone()
    }
}

// ============================================================================
// Anthropic Provider
// ============================================================================

pub struct AnthropicClient {
    client: Client,
    config: LLMConfig,
}

impl AnthropicClient {
    pub fn new(config: LLMConfig) -> Result<Self, LLMError> {
        let client = http_client(config.timeout_secs)?;
        Ok(Self { client, config })
    }

    fn body(&self, request: &GenerationRequest) -> serde_json::Value {
        let messages: Vec<serde_json::Value> = request
            .messages
            .iter()
            .map(|m| {
                serde_json::json!({
                    "role": m.role.as_str(),
                    "content": m.content,
                })
            })
            .collect();

        serde_json::json!({
            "model": self.config.model,
            "system": request.system,
            "messages": messages,
            "max_tokens": request.max_tokens.unwrap_or(self.config.max_tokens),
            "temperature": request.temperature.unwrap_or(self.config.temperature),
        })
    }
}

#[async_trait]
impl TextGenerator for AnthropicClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<Option<String>, LLMError> {
        let base = self
            .config
            .base_url
            .as_deref()
            .unwrap_or(ANTHROPIC_BASE_URL)
            .trim_end_matches('/');
        let url = format!("{base}/messages");

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(&self.body(request))
            .send()
            .await
            .map_err(|e| transport_error(e, self.config.timeout_secs))?;
        let response = check_status(response).await?;

        let data: serde_json::Value = response
            .json()
            .await
            .map_err(|e| LLMError::InvalidResponse(e.to_string()))?;

        let content: String = data["content"]
            .as_array()
            .map(|blocks| {
                blocks
                    .iter()
                    .filter(|b| b["type"] == "text")
                    .filter_map(|b| b["text"].as_str())
                    .collect()
            })
            .unwrap_or_default();
        Ok(non_empty(content))
    }

    fn model_name(&self) -> String {
        self.config.model.clone()
    }
}

// ============================================================================
// Unified Client
// ============================================================================

/// Dispatches to the client matching the configured provider.
pub enum UnifiedClient {
    OpenAi(OpenAiCompatibleClient),
    Anthropic(AnthropicClient),
}

impl UnifiedClient {
    pub fn from_config(config: LLMConfig) -> Result<Self, LLMError> {
        Ok(match config.provider {
            Provider::OpenAI | Provider::Local => Self::OpenAi(OpenAiCompatibleClient::new(config)?),
            Provider::Anthropic => Self::Anthropic(AnthropicClient::new(config)?),
        })
    }
}

#[async_trait]
impl TextGenerator for UnifiedClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<Option<String>, LLMError> {
        match self {
            Self::OpenAi(c) => c.generate(request).await,
            Self::Anthropic(c) => c.generate(request).await,
        }
    }

    fn model_name(&self) -> String {
        match self {
            Self::OpenAi(c) => c.model_name(),
            Self::Anthropic(c) => c.model_name(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
