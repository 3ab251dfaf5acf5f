/// Client for OpenAI-compatible chat completion endpoints.
///
/// Used for conversational phrasing only. The default base URL points at Gemini's
/// OpenAI-compatible surface; any host that speaks `POST {base}/chat/completions`
/// works. Transient failures (transport errors, 429, 5xx) are retried with capped
/// exponential backoff plus jitter.
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use futures::StreamExt;
use reqwest::StatusCode;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::warn;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai";

#[derive(Clone, Debug)]
pub struct OpenAiClientConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub default_timeout: Duration,
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub max_error_body_bytes: usize,
}

impl OpenAiClientConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary variable source. Unparseable numbers fall back
    /// to their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let base_url = lookup("OPENAI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let api_key = lookup("OPENAI_API_KEY")
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());

        let default_timeout = lookup("OPENAI_TIMEOUT_SECS")
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or_else(|| Duration::from_secs(30));

        let max_retries = lookup("OPENAI_MAX_RETRIES")
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(2);

        let initial_backoff = lookup("OPENAI_RETRY_INITIAL_MS")
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or_else(|| Duration::from_millis(200));

        let max_backoff = lookup("OPENAI_RETRY_MAX_MS")
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or_else(|| Duration::from_millis(2_000));

        let max_error_body_bytes = lookup("OPENAI_MAX_ERROR_BODY_BYTES")
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(8 * 1024);

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            default_timeout,
            max_retries,
            initial_backoff,
            max_backoff,
            max_error_body_bytes,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OpenAiClientError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("invalid response JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("upstream returned error: status={status} message={message}")]
    Upstream { status: StatusCode, message: String },

    #[error("upstream returned non-JSON error: status={status} body={body}")]
    UpstreamBody { status: StatusCode, body: String },

    #[error("streaming response ended without a completion")]
    StreamEnded,
}

/// Capped exponential backoff. Attempt `n` (0-based) waits `initial * 2^n`, never more
/// than `max`, plus up to a quarter of that as jitter.
#[derive(Clone, Copy, Debug)]
struct RetryPolicy {
    max_retries: u32,
    initial: Duration,
    max: Duration,
}

impl RetryPolicy {
    fn from_config(config: &OpenAiClientConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            initial: config.initial_backoff,
            max: config.max_backoff,
        }
    }

    fn delay(&self, retry: u32) -> Duration {
        let factor = 2u32.checked_pow(retry).unwrap_or(u32::MAX);
        let capped = self.initial.saturating_mul(factor).min(self.max);
        let capped_ms = capped.as_millis() as u64;
        let jitter_ms = pseudo_jitter_ms((capped_ms / 4).max(1));
        capped + Duration::from_millis(jitter_ms)
    }

    fn is_transient(err: &OpenAiClientError) -> bool {
        match err {
            OpenAiClientError::Request(e) => {
                e.is_timeout() || e.is_connect() || e.is_request() || e.is_body() || e.is_decode()
            }
            OpenAiClientError::Upstream { status, .. }
            | OpenAiClientError::UpstreamBody { status, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
            }
            OpenAiClientError::InvalidJson(_) | OpenAiClientError::StreamEnded => false,
        }
    }
}

#[derive(Clone)]
pub struct OpenAiClient {
    config: OpenAiClientConfig,
    retry: RetryPolicy,
    http: reqwest::Client,
}

impl OpenAiClient {
    pub fn new(config: OpenAiClientConfig) -> Result<Self, OpenAiClientError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("podpal/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            retry: RetryPolicy::from_config(&config),
            config,
            http,
        })
    }

    pub async fn chat_completions(
        &self,
        request: ChatCompletionRequest,
        timeout_override: Option<Duration>,
    ) -> Result<ChatCompletionResponse, OpenAiClientError> {
        let timeout = timeout_override.unwrap_or(self.config.default_timeout);
        let request = &request;
        self.with_retries(|| async move {
            let resp = self.send_checked(request, timeout).await?;
            Ok(resp.json::<ChatCompletionResponse>().await?)
        })
        .await
    }

    /// Request a streamed completion and concatenate the `delta.content` pieces.
    pub async fn chat_completions_streaming_aggregate(
        &self,
        request: ChatCompletionRequest,
        timeout_override: Option<Duration>,
    ) -> Result<String, OpenAiClientError> {
        let timeout = timeout_override.unwrap_or(self.config.default_timeout);
        let request = ChatCompletionRequest {
            stream: Some(true),
            ..request
        };
        let request = &request;
        self.with_retries(|| async move {
            let resp = self.send_checked(request, timeout).await?;
            let mut body = resp.bytes_stream();
            let mut sse = SseAccumulator::default();
            while let Some(chunk) = body.next().await {
                if sse.push(&chunk?) {
                    return Ok(sse.text);
                }
            }
            sse.finish()
        })
        .await
    }

    /// POST the request and turn any non-2xx status into an upstream error.
    async fn send_checked(
        &self,
        request: &ChatCompletionRequest,
        timeout: Duration,
    ) -> Result<reqwest::Response, OpenAiClientError> {
        let url = format!("{}/chat/completions", self.config.base_url);
        let mut builder = self.http.post(url).timeout(timeout).json(request);
        if let Some(key) = &self.config.api_key {
            builder = builder.bearer_auth(key);
        }
        let resp = builder.send().await?;
        if resp.status().is_success() {
            Ok(resp)
        } else {
            Err(upstream_error(resp, self.config.max_error_body_bytes).await)
        }
    }

    async fn with_retries<T, Fut, F>(&self, mut attempt: F) -> Result<T, OpenAiClientError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, OpenAiClientError>>,
    {
        let mut retries = 0;
        loop {
            let err = match attempt().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };
            if retries >= self.retry.max_retries || !RetryPolicy::is_transient(&err) {
                return Err(err);
            }
            let delay = self.retry.delay(retries);
            retries += 1;
            warn!(
                retry = retries,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "chat completion failed, retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }
}

/// Incremental decoder for a `text/event-stream` completion body.
#[derive(Default)]
struct SseAccumulator {
    pending: String,
    text: String,
}

impl SseAccumulator {
    /// Feed raw bytes. Returns `true` once `data: [DONE]` has been seen.
    fn push(&mut self, bytes: &[u8]) -> bool {
        self.pending.push_str(&String::from_utf8_lossy(bytes));
        while let Some(end) = self.pending.find("\n\n") {
            let event: String = self.pending.drain(..end + 2).collect();
            if self.consume_event(&event) {
                return true;
            }
        }
        false
    }

    /// Called when the body ends. Some hosts close the stream without a trailing `[DONE]`.
    fn finish(mut self) -> Result<String, OpenAiClientError> {
        let pending = std::mem::take(&mut self.pending);
        if self.consume_event(&pending) || !self.text.is_empty() {
            Ok(self.text)
        } else {
            Err(OpenAiClientError::StreamEnded)
        }
    }

    fn consume_event(&mut self, event: &str) -> bool {
        for data in event
            .lines()
            .filter_map(|line| line.trim().strip_prefix("data:"))
            .map(str::trim)
        {
            if data == "[DONE]" {
                return true;
            }
            let Ok(chunk) = serde_json::from_str::<ChatCompletionStreamChunk>(data) else {
                continue;
            };
            if let Some(piece) = chunk.choices.into_iter().next().and_then(|c| c.delta.content) {
                self.text.push_str(&piece);
            }
        }
        false
    }
}

async fn upstream_error(resp: reqwest::Response, max_body_bytes: usize) -> OpenAiClientError {
    let status = resp.status();
    let body = match resp.bytes().await {
        Ok(bytes) => String::from_utf8_lossy(&bytes[..bytes.len().min(max_body_bytes)]).into_owned(),
        Err(e) => {
            warn!(error = %e, "failed to read upstream error body");
            return OpenAiClientError::UpstreamBody {
                status,
                body: String::new(),
            };
        }
    };
    match serde_json::from_str::<ErrorBody>(&body) {
        Ok(parsed) => OpenAiClientError::Upstream {
            status,
            message: parsed
                .into_message()
                .unwrap_or_else(|| "unknown upstream error".to_string()),
        },
        Err(_) => OpenAiClientError::UpstreamBody { status, body },
    }
}

fn pseudo_jitter_ms(max_inclusive: u64) -> u64 {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos() as u64)
        .unwrap_or(0);
    nanos % (max_inclusive + 1)
}

/// OpenAI returns `{"error": {...}}`; Gemini wraps the same object in a one-element array.
///
/// `Array` comes first: serde lets a struct deserialize from a sequence, so `Object` would
/// also accept the wrapped form and lose the message.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorBody {
    Array(Vec<ErrorEnvelope>),
    Object(ErrorEnvelope),
}

impl ErrorBody {
    fn into_message(self) -> Option<String> {
        match self {
            ErrorBody::Object(e) => e.error.message,
            ErrorBody::Array(list) => list.into_iter().next().and_then(|e| e.error.message),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionResponse {
    pub id: Option<String>,
    pub choices: Vec<ChatCompletionChoice>,
    pub usage: Option<ChatCompletionUsage>,
}

impl ChatCompletionResponse {
    /// Text of the first choice, if the host returned one.
    pub fn first_text(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.message.content.as_deref())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionChoice {
    pub index: Option<u32>,
    pub message: ChatCompletionMessage,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionMessage {
    pub role: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionUsage {
    pub prompt_tokens: Option<u64>,
    pub completion_tokens: Option<u64>,
    pub total_tokens: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionStreamChunk {
    choices: Vec<ChatCompletionStreamChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionStreamChoice {
    delta: ChatCompletionStreamDelta,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionStreamDelta {
    content: Option<String>,
}
