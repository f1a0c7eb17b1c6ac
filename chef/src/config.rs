//! Model client configuration, read from the environment (and `.env`).

use std::time::Duration;

use crate::errors::ConfigError;

/// Default model to use.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Default OpenAI-compatible base URL.
pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// Default deadline for one model call, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Clone)]
pub struct ModelConfig {
    pub api_key: String,
    /// Model name, e.g. "gpt-4o-mini" or "llama3.1" behind an Ollama endpoint.
    pub model: String,
    pub api_base: String,
    /// How long a single model call may take before it fails with a timeout.
    pub timeout: Duration,
}

impl std::fmt::Debug for ModelConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("api_base", &self.api_base)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ModelConfig {
    /// Configuration with every optional setting at its default.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Required:
    /// - `OPENAI_API_KEY`
    ///
    /// Optional:
    /// - `CHEF_MODEL`: model name (default: "gpt-4o-mini")
    /// - `CHEF_LLM_API_BASE`: API base URL (default: "https://api.openai.com/v1")
    /// - `CHEF_LLM_TIMEOUT_SECS`: per-call deadline (default: 60)
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = dotenvy::var("OPENAI_API_KEY")
            .map_err(|_| ConfigError::MissingEnvVar("OPENAI_API_KEY".to_string()))?;
        let mut config = Self::new(api_key);
        if let Ok(model) = dotenvy::var("CHEF_MODEL") {
            config.model = model;
        }
        if let Ok(api_base) = dotenvy::var("CHEF_LLM_API_BASE") {
            config.api_base = api_base;
        }
        if let Ok(secs) = dotenvy::var("CHEF_LLM_TIMEOUT_SECS") {
            config.timeout = parse_timeout("CHEF_LLM_TIMEOUT_SECS", &secs)?;
        }
        Ok(config)
    }
}

fn parse_timeout(name: &str, value: &str) -> Result<Duration, ConfigError> {
    match value.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ConfigError::InvalidValue {
            name: name.to_string(),
            value: value.to_string(),
        }),
    }
}
