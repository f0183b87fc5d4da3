//! LLM client configuration.

use serde::{Deserialize, Serialize};

use super::prompts::{PromptRevision, CONTENT_PLACEHOLDER};
use crate::rate_limit::env_number;

/// LLM provider type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    /// Google Gemini `generateContent` API (default)
    #[default]
    Gemini,
    /// OpenAI-compatible chat completions (OpenAI, Groq, Together.ai, etc.)
    #[value(name = "openai")]
    OpenAI,
    /// Ollama API (local)
    Ollama,
}

impl LlmProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::OpenAI => "openai",
            Self::Ollama => "ollama",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "gemini" | "google" => Some(Self::Gemini),
            "openai" | "groq" | "together" => Some(Self::OpenAI),
            "ollama" => Some(Self::Ollama),
            _ => None,
        }
    }

    pub fn default_endpoint(&self) -> &'static str {
        match self {
            Self::Gemini => "https://generativelanguage.googleapis.com",
            Self::OpenAI => "https://api.openai.com",
            Self::Ollama => "http://localhost:11434",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Self::Gemini => "gemini-1.5-flash",
            Self::OpenAI => "gpt-4o-mini",
            Self::Ollama => "llama3.1:8b",
        }
    }

    /// Whether requests need an API key.
    pub fn requires_api_key(&self) -> bool {
        !matches!(self, Self::Ollama)
    }
}

impl std::fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration for the generative-text client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Provider whose request format to speak
    #[serde(default)]
    pub provider: LlmProvider,
    /// API endpoint (provider default when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// API key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Model name (provider default when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Maximum tokens in response
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Temperature for generation (0.0 - 1.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Maximum bytes of recognized text embedded in the prompt
    #[serde(default = "default_max_content_chars")]
    pub max_content_chars: usize,
    /// Built-in prompt to use
    #[serde(default)]
    pub prompt_revision: PromptRevision,
    /// Custom prompt (uses the {content} placeholder); overrides `prompt_revision`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    /// Timeout for each request, in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_max_tokens() -> u32 {
    2048
}

fn default_temperature() -> f32 {
    0.2
}

fn default_max_content_chars() -> usize {
    12000
}

fn default_request_timeout_secs() -> u64 {
    120
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::default(),
            endpoint: None,
            api_key: None,
            model: None,
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            max_content_chars: default_max_content_chars(),
            prompt_revision: PromptRevision::default(),
            prompt: None,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl LlmConfig {
    /// Apply environment variable overrides.
    ///
    /// - `LLM_PROVIDER`: gemini, openai (also groq/together), or ollama
    /// - `LLM_ENDPOINT`: API endpoint
    /// - `LLM_API_KEY`: API key for any provider
    /// - `GEMINI_API_KEY` / `OPENAI_API_KEY`: provider-specific keys
    /// - `LLM_MODEL`: model name
    /// - `LLM_MAX_TOKENS`, `LLM_TEMPERATURE`, `LLM_MAX_CONTENT_CHARS`
    /// - `LLM_PROMPT_REVISION`: clinical or diagnosis
    /// - `LLM_PROMPT`: custom prompt template
    ///
    /// LLM_PROVIDER wins over auto-detection from API keys, and so does a
    /// provider chosen in the config file. Only when neither picked one does a
    /// GEMINI_API_KEY select Gemini and an OPENAI_API_KEY select OpenAI.
    pub fn with_env_overrides(mut self) -> Self {
        let explicit_provider = std::env::var("LLM_PROVIDER")
            .ok()
            .and_then(|val| LlmProvider::from_str(&val));
        if let Some(provider) = explicit_provider {
            self.provider = provider;
        }

        if let Ok(val) = std::env::var("LLM_ENDPOINT") {
            self.endpoint = Some(val);
        }

        // Explicit API key always wins
        if let Ok(val) = std::env::var("LLM_API_KEY") {
            self.api_key = Some(val);
        }

        if self.api_key.is_none() {
            self.pick_provider_key(
                explicit_provider.is_some(),
                std::env::var("GEMINI_API_KEY").ok(),
                std::env::var("OPENAI_API_KEY").ok(),
            );
        }

        if let Ok(val) = std::env::var("LLM_MODEL") {
            self.model = Some(val);
        }
        if let Some(n) = env_number("LLM_MAX_TOKENS") {
            self.max_tokens = n;
        }
        if let Some(t) = env_number("LLM_TEMPERATURE") {
            self.temperature = t;
        }
        if let Some(n) = env_number("LLM_MAX_CONTENT_CHARS") {
            self.max_content_chars = n;
        }
        if let Some(revision) = std::env::var("LLM_PROMPT_REVISION")
            .ok()
            .and_then(|val| PromptRevision::from_str(&val))
        {
            self.prompt_revision = revision;
        }
        if let Ok(val) = std::env::var("LLM_PROMPT") {
            self.prompt = Some(val);
        }
        self
    }

    /// Fill in the API key from provider-specific variables.
    fn pick_provider_key(
        &mut self,
        provider_chosen: bool,
        gemini_key: Option<String>,
        openai_key: Option<String>,
    ) {
        let auto_detect = !provider_chosen && self.provider == LlmProvider::default();
        if !auto_detect {
            self.api_key = match self.provider {
                LlmProvider::Gemini => gemini_key,
                LlmProvider::OpenAI => openai_key,
                LlmProvider::Ollama => None,
            };
            return;
        }

        if let Some(key) = gemini_key {
            self.api_key = Some(key);
            self.provider = LlmProvider::Gemini;
        } else if let Some(key) = openai_key {
            self.api_key = Some(key);
            self.provider = LlmProvider::OpenAI;
        }
    }

    pub fn with_provider(mut self, provider: LlmProvider) -> Self {
        self.provider = provider;
        self
    }

    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = Some(endpoint.to_string());
        self
    }

    pub fn with_api_key(mut self, api_key: &str) -> Self {
        self.api_key = Some(api_key.to_string());
        self
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = Some(model.to_string());
        self
    }

    /// Endpoint with any trailing slash removed.
    pub fn endpoint(&self) -> &str {
        self.endpoint
            .as_deref()
            .unwrap_or_else(|| self.provider.default_endpoint())
            .trim_end_matches('/')
    }

    pub fn model(&self) -> &str {
        self.model
            .as_deref()
            .unwrap_or_else(|| self.provider.default_model())
    }

    /// The prompt template, using the custom prompt or the selected revision.
    pub fn prompt_template(&self) -> &str {
        self.prompt
            .as_deref()
            .filter(|p| p.contains(CONTENT_PLACEHOLDER))
            .unwrap_or_else(|| self.prompt_revision.template())
    }

    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }
}
