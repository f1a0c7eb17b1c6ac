use axum::{
    http,
    response::{IntoResponse, Response},
};
use chef::{ModelError, PromptError, TemplateError};

pub type WebResult<T> = std::result::Result<T, WebError>;

#[derive(thiserror::Error, Debug)]
pub enum WebError {
    #[error("{0}")]
    Prompt(#[from] PromptError),
    #[error("Internal Server Error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl WebError {
    pub fn status(&self) -> http::StatusCode {
        match self {
            WebError::Prompt(PromptError::Validation(TemplateError::MissingParameter { .. })) => {
                http::StatusCode::BAD_REQUEST
            }
            // Only reachable if a built-in template is broken
            WebError::Prompt(PromptError::Validation(TemplateError::Malformed { .. })) => {
                http::StatusCode::INTERNAL_SERVER_ERROR
            }
            WebError::Prompt(PromptError::Upstream(ModelError::Timeout(_))) => {
                http::StatusCode::GATEWAY_TIMEOUT
            }
            WebError::Prompt(PromptError::Upstream(ModelError::RateLimited(_))) => {
                http::StatusCode::SERVICE_UNAVAILABLE
            }
            WebError::Prompt(PromptError::Upstream(_))
            | WebError::Prompt(PromptError::Extraction(_)) => http::StatusCode::BAD_GATEWAY,
            WebError::Internal(_) => http::StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("{}", self);
        }
        (status, self.to_string()).into_response()
    }
}
