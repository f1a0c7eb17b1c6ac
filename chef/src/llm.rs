//! Model invocation: the [`ModelClient`] capability and its OpenAI-compatible
//! backend.

use async_openai::{
    error::OpenAIError,
    types::{
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequest,
        CreateChatCompletionRequestArgs, CreateChatCompletionResponse,
    },
};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::config::ModelConfig;
use crate::errors::{ConfigError, ModelError};
use crate::template::Prompt;

/// Anything that can turn a prompt into a completion.
///
/// Every call stands alone: implementations keep no conversation between
/// calls.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn invoke(&self, prompt: &Prompt) -> Result<ModelResponse, ModelError>;
}

/// Token usage information.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// One generated choice. The text may be missing, e.g. when the model only
/// produced a refusal or a tool call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completion {
    pub text: Option<String>,
}

/// What the model sent back for a single prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelResponse {
    /// The model that actually answered.
    pub model: String,
    pub completions: Vec<Completion>,
    #[serde(default)]
    pub usage: Usage,
}

impl ModelResponse {
    /// A response holding a single completion with `text`.
    pub fn single(model: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            completions: vec![Completion {
                text: Some(text.into()),
            }],
            usage: Usage::default(),
        }
    }
}

impl From<CreateChatCompletionResponse> for ModelResponse {
    fn from(response: CreateChatCompletionResponse) -> Self {
        Self {
            model: response.model,
            completions: response
                .choices
                .into_iter()
                .map(|choice| Completion {
                    text: choice.message.content,
                })
                .collect(),
            usage: response
                .usage
                .map(|u| Usage {
                    prompt_tokens: u.prompt_tokens,
                    completion_tokens: u.completion_tokens,
                    total_tokens: u.total_tokens,
                })
                .unwrap_or_default(),
        }
    }
}

/// The `{"error": {...}}` body OpenAI-compatible servers send with a failure.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    message: String,
    #[serde(rename = "type", default)]
    kind: Option<String>,
}

/// Chat-completions backend. Works against OpenAI or any compatible server
/// (Ollama, OpenRouter, ...) depending on the configured base URL.
///
/// Requests are built with async-openai's types but sent with our own reqwest
/// client, so the HTTP status is seen before the body is decoded and nothing
/// is retried behind our back.
pub struct OpenAiModel {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl OpenAiModel {
    /// Create a new client from environment configuration.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::new(&ModelConfig::from_env()?)
    }

    pub fn new(config: &ModelConfig) -> Result<Self, ConfigError> {
        // Covers connecting, sending and reading the whole body
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self {
            http,
            endpoint: format!("{}/chat/completions", config.api_base.trim_end_matches('/')),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }

    fn request(&self, prompt: &Prompt) -> Result<CreateChatCompletionRequest, OpenAIError> {
        CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages([ChatCompletionRequestUserMessageArgs::default()
                .content(prompt.as_str())
                .build()?
                .into()])
            .build()
    }
}

#[async_trait]
impl ModelClient for OpenAiModel {
    async fn invoke(&self, prompt: &Prompt) -> Result<ModelResponse, ModelError> {
        if prompt.is_empty() {
            return Err(ModelError::Rejected("prompt is empty".into()));
        }
        let request = self
            .request(prompt)
            .map_err(|err| ModelError::Rejected(err.to_string()))?;

        tracing::debug!(model = %self.model, "Calling the model");
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(transport_error)?;
        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;

        if !status.is_success() {
            return Err(status_error(status, &body));
        }
        let completion: CreateChatCompletionResponse = serde_json::from_str(&body)
            .map_err(|err| ModelError::MalformedResponse(err.to_string()))?;
        Ok(completion.into())
    }
}

fn transport_error(err: reqwest::Error) -> ModelError {
    if err.is_timeout() {
        ModelError::Timeout(err.to_string())
    } else {
        ModelError::Unavailable(err.to_string())
    }
}

/// Sort a non-2xx answer into our taxonomy. The body may be anything: a JSON
/// error object, an HTML page from a proxy, or nothing at all.
fn status_error(status: StatusCode, body: &str) -> ModelError {
    let detail = serde_json::from_str::<ErrorBody>(body).ok().map(|b| b.error);
    let message = match &detail {
        Some(detail) if !detail.message.is_empty() => format!("{status}: {}", detail.message),
        _ => format!("{status}: {}", body.trim()),
    };
    let kind = detail.as_ref().and_then(|d| d.kind.as_deref());

    if status == StatusCode::TOO_MANY_REQUESTS || matches!(kind, Some("requests" | "tokens")) {
        ModelError::RateLimited(message)
    } else if status == StatusCode::REQUEST_TIMEOUT || status == StatusCode::GATEWAY_TIMEOUT {
        ModelError::Timeout(message)
    } else if status.is_server_error() {
        ModelError::Unavailable(message)
    } else {
        ModelError::Rejected(message)
    }
}

#[cfg(any(test, feature = "stub"))]
pub use stub::StubModel;

#[cfg(any(test, feature = "stub"))]
mod stub {
    use std::sync::Mutex;

    use super::*;

    enum Reply {
        Echo,
        Response(ModelResponse),
        Fail(ModelError),
    }

    /// Deterministic in-process model. Records every prompt it is given.
    pub struct StubModel {
        reply: Reply,
        prompts: Mutex<Vec<String>>,
    }

    impl StubModel {
        fn with_reply(reply: Reply) -> Self {
            Self {
                reply,
                prompts: Mutex::new(vec![]),
            }
        }

        /// Always answers with `text`.
        pub fn replying(text: impl Into<String>) -> Self {
            Self::with_reply(Reply::Response(ModelResponse::single("stub", text)))
        }

        /// Answers with the prompt it was given.
        pub fn echoing() -> Self {
            Self::with_reply(Reply::Echo)
        }

        /// Always answers with `response`, however odd.
        pub fn responding(response: ModelResponse) -> Self {
            Self::with_reply(Reply::Response(response))
        }

        /// Always fails with `err`.
        pub fn failing(err: ModelError) -> Self {
            Self::with_reply(Reply::Fail(err))
        }

        /// Prompts received so far, oldest first.
        pub fn prompts(&self) -> Vec<String> {
            self.prompts
                .lock()
                .map(|prompts| prompts.clone())
                .unwrap_or_default()
        }

        pub fn calls(&self) -> usize {
            self.prompts().len()
        }
    }

    #[async_trait]
    impl ModelClient for StubModel {
        async fn invoke(&self, prompt: &Prompt) -> Result<ModelResponse, ModelError> {
            if let Ok(mut prompts) = self.prompts.lock() {
                prompts.push(prompt.as_str().to_string());
            }
            match &self.reply {
                Reply::Echo => Ok(ModelResponse::single("stub", prompt.as_str())),
                Reply::Response(response) => Ok(response.clone()),
                Reply::Fail(err) => Err(err.clone()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::sync::oneshot;

    use super::*;
    use crate::errors::PromptError;
    use crate::service::PromptService;
    use crate::template::{ParameterSet, Template};

    const COMPLETION: &str = r#"{
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "created": 1700000000,
        "model": "gpt-4o-mini-2024-07-18",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": "1. Japanese\n2. Thai"},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 30, "completion_tokens": 8, "total_tokens": 38}
    }"#;

    const NO_CHOICES: &str = r#"{
        "id": "chatcmpl-2",
        "object": "chat.completion",
        "created": 1700000000,
        "model": "gpt-4o-mini",
        "choices": []
    }"#;

    /// Read one HTTP request (headers plus `Content-Length` body) off the socket.
    async fn read_request(socket: &mut TcpStream) -> String {
        let mut buf = vec![];
        let mut chunk = [0u8; 4096];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf);
            if let Some(end) = text.find("\r\n\r\n") {
                let length = text[..end]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if buf.len() >= end + 4 + length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    /// Serve a single canned HTTP answer. Returns the API base URL and the
    /// request the server received.
    async fn answer_once(
        status_line: &'static str,
        body: &'static str,
    ) -> (String, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let request = read_request(&mut socket).await;
            let response = format!(
                "HTTP/1.1 {status_line}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            tx.send(request).ok();
        });
        (format!("http://{addr}/v1"), rx)
    }

    fn model(api_base: &str, timeout: Duration) -> OpenAiModel {
        let mut config = ModelConfig::new("sk-test");
        config.api_base = api_base.to_string();
        config.timeout = timeout;
        OpenAiModel::new(&config).unwrap()
    }

    async fn ask(status_line: &'static str, body: &'static str) -> Result<String, PromptError> {
        let (api_base, _request) = answer_once(status_line, body).await;
        let service =
            PromptService::new(Arc::new(model(&api_base, Duration::from_secs(5)))).unwrap();
        service.list_cuisines_for_continent("Asia").await
    }

    #[tokio::test]
    async fn successful_answers_come_back_verbatim() {
        let (api_base, request) = answer_once("200 OK", COMPLETION).await;
        let model = model(&api_base, Duration::from_secs(5));
        let prompt = Template::new("Cuisines of {continent}")
            .unwrap()
            .render(&ParameterSet::new().with("continent", "Asia"))
            .unwrap();

        let response = model.invoke(&prompt).await.unwrap();
        assert_eq!(response.model, "gpt-4o-mini-2024-07-18");
        assert_eq!(
            response.completions[0].text.as_deref(),
            Some("1. Japanese\n2. Thai")
        );
        assert_eq!(response.usage.total_tokens, 38);

        let request = request.await.unwrap();
        assert!(request.starts_with("POST /v1/chat/completions "));
        assert!(request.contains("Bearer sk-test"));
        assert!(request.contains("Cuisines of Asia"));
    }

    #[tokio::test]
    async fn proxy_errors_are_unavailable_not_extraction() {
        let err = ask("503 Service Unavailable", "upstream down").await.unwrap_err();
        assert!(
            matches!(err, PromptError::Upstream(ModelError::Unavailable(_))),
            "{err:?}"
        );

        let err = ask(
            "500 Internal Server Error",
            r#"{"error": {"message": "The server had an error", "type": "server_error"}}"#,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, PromptError::Upstream(ModelError::Unavailable(_))));
    }

    #[tokio::test]
    async fn wrong_base_url_is_a_rejection() {
        let err = ask("404 Not Found", "<html>nope</html>").await.unwrap_err();
        assert!(
            matches!(err, PromptError::Upstream(ModelError::Rejected(_))),
            "{err:?}"
        );

        let err = ask(
            "401 Unauthorized",
            r#"{"error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}}"#,
        )
        .await
        .unwrap_err();
        assert_eq!(
            err,
            PromptError::Upstream(ModelError::Rejected(
                "401 Unauthorized: Incorrect API key provided".into()
            ))
        );
    }

    #[tokio::test]
    async fn rate_limits_surface_within_the_deadline() {
        let (api_base, _request) = answer_once(
            "429 Too Many Requests",
            r#"{"error": {"message": "Rate limit reached", "type": "requests"}}"#,
        )
        .await;
        let model = model(&api_base, Duration::from_secs(1));
        let prompt = Template::new("hi {x}")
            .unwrap()
            .render(&ParameterSet::new().with("x", "there"))
            .unwrap();

        let result = tokio::time::timeout(Duration::from_secs(3), model.invoke(&prompt))
            .await
            .expect("rate limit was not surfaced within the deadline");
        assert!(matches!(result, Err(ModelError::RateLimited(_))), "{result:?}");
    }

    #[tokio::test]
    async fn successful_status_without_usable_text_is_extraction() {
        let err = ask("200 OK", NO_CHOICES).await.unwrap_err();
        assert_eq!(
            err,
            PromptError::Extraction("model returned no completions".into())
        );

        let err = ask("200 OK", "<html>not json</html>").await.unwrap_err();
        assert!(matches!(err, PromptError::Extraction(_)), "{err:?}");
    }

    #[tokio::test]
    async fn silent_upstream_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            read_request(&mut socket).await;
            tokio::time::sleep(Duration::from_secs(30)).await;
        });
        let model = model(&format!("http://{addr}/v1"), Duration::from_millis(300));
        let prompt = Template::new("{x}")
            .unwrap()
            .render(&ParameterSet::new().with("x", "slow"))
            .unwrap();

        let result = model.invoke(&prompt).await;
        assert!(matches!(result, Err(ModelError::Timeout(_))), "{result:?}");
    }

    #[tokio::test]
    async fn refused_connection_is_unavailable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let model = model(&format!("http://{addr}/v1"), Duration::from_secs(2));
        let prompt = Template::new("{x}")
            .unwrap()
            .render(&ParameterSet::new().with("x", "anyone?"))
            .unwrap();

        let result = model.invoke(&prompt).await;
        assert!(matches!(result, Err(ModelError::Unavailable(_))), "{result:?}");
    }

    #[test]
    fn status_errors() {
        assert!(matches!(
            status_error(StatusCode::TOO_MANY_REQUESTS, ""),
            ModelError::RateLimited(_)
        ));
        assert!(matches!(
            status_error(
                StatusCode::FORBIDDEN,
                r#"{"error": {"message": "quota", "type": "tokens"}}"#
            ),
            ModelError::RateLimited(_)
        ));
        assert!(matches!(
            status_error(StatusCode::GATEWAY_TIMEOUT, "timeout"),
            ModelError::Timeout(_)
        ));
        assert!(matches!(
            status_error(StatusCode::BAD_GATEWAY, ""),
            ModelError::Unavailable(_)
        ));
        assert!(matches!(
            status_error(StatusCode::BAD_REQUEST, "{}"),
            ModelError::Rejected(_)
        ));
    }

    #[tokio::test]
    async fn empty_prompts_never_leave_the_process() {
        let model = model("http://127.0.0.1:9/v1", Duration::from_secs(1));
        let prompt = Template::new("{x}")
            .unwrap()
            .render(&ParameterSet::new().with("x", ""))
            .unwrap();
        assert!(matches!(
            model.invoke(&prompt).await,
            Err(ModelError::Rejected(_))
        ));
    }

    #[tokio::test]
    async fn stub_records_prompts() {
        let stub = StubModel::echoing();
        let prompt = Template::new("hello {who}")
            .unwrap()
            .render(&ParameterSet::new().with("who", "chef"))
            .unwrap();
        let response = stub.invoke(&prompt).await.unwrap();
        assert_eq!(response.completions[0].text.as_deref(), Some("hello chef"));
        assert_eq!(stub.prompts(), vec!["hello chef".to_string()]);
    }
}
