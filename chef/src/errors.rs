//! Error types for rendering prompts and calling the model.

/// Problems with a template or the parameters used to render it.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("Missing value for placeholder {{{name}}}")]
    MissingParameter { name: String },
    #[error("Malformed template at byte {offset}: {reason}")]
    Malformed { offset: usize, reason: &'static str },
}

/// Failures reported by a model backend.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("Model service unavailable: {0}")]
    Unavailable(String),
    #[error("Model call timed out: {0}")]
    Timeout(String),
    #[error("Model service is rate limiting us: {0}")]
    RateLimited(String),
    #[error("Model service rejected the request: {0}")]
    Rejected(String),
    #[error("Model response could not be read: {0}")]
    MalformedResponse(String),
}

/// Everything that can go wrong while turning parameters into model text.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PromptError {
    #[error("Validation error: {0}")]
    Validation(#[from] TemplateError),
    #[error("Upstream error: {0}")]
    Upstream(ModelError),
    #[error("Extraction error: {0}")]
    Extraction(String),
}

impl From<ModelError> for PromptError {
    fn from(err: ModelError) -> Self {
        match err {
            // The call went through, there was just nothing usable in it
            ModelError::MalformedResponse(reason) => PromptError::Extraction(reason),
            other => PromptError::Upstream(other),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: String, value: String },
    #[error("Could not build the HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}
