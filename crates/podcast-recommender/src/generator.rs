/// Remote phrasing of chat replies.
///
/// The generator only ever supplies wording. Which shows get recommended is decided
/// locally from the catalog before any call is made.
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use mcp_common::openai::{ChatCompletionRequest, Message, OpenAiClient, OpenAiClientError};

const SYSTEM_PROMPT: &str = "You are PodPal, a friendly podcast recommendation assistant. \
     Answer in plain text without markdown. Never invent podcast titles.";

const MAX_REPLY_TOKENS: u32 = 256;

#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("generation timed out after {0:?}")]
    Timeout(Duration),

    #[error("upstream generation failed: {0}")]
    Upstream(#[from] OpenAiClientError),

    #[error("generator returned an empty completion")]
    EmptyCompletion,
}

/// Turns an instruction prompt into a short conversational reply.
pub trait TextGenerator: Send + Sync {
    fn generate(&self, prompt: &str) -> impl Future<Output = Result<String, GenerateError>> + Send;
}

/// [`TextGenerator`] backed by an OpenAI-compatible chat completion endpoint.
pub struct OpenAiGenerator {
    client: Arc<OpenAiClient>,
    model: String,
    stream: bool,
}

impl OpenAiGenerator {
    pub fn new(client: Arc<OpenAiClient>, model: impl Into<String>, stream: bool) -> Self {
        Self {
            client,
            model: model.into(),
            stream,
        }
    }

    fn request(&self, prompt: &str) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![Message::system(SYSTEM_PROMPT), Message::user(prompt)],
            temperature: Some(0.7),
            max_tokens: Some(MAX_REPLY_TOKENS),
            stream: None,
        }
    }
}

impl TextGenerator for OpenAiGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerateError> {
        let request = self.request(prompt);

        let text = if self.stream {
            self.client
                .chat_completions_streaming_aggregate(request, None)
                .await?
        } else {
            let response = self.client.chat_completions(request, None).await?;
            if let Some(usage) = &response.usage {
                debug!(
                    model = %self.model,
                    prompt_tokens = usage.prompt_tokens,
                    completion_tokens = usage.completion_tokens,
                    "completion usage"
                );
            }
            response.first_text().unwrap_or_default().to_string()
        };

        let text = text.trim();
        if text.is_empty() {
            return Err(GenerateError::EmptyCompletion);
        }
        Ok(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use mcp_common::openai::OpenAiClientConfig;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn client_for(server: &MockServer) -> Arc<OpenAiClient> {
        let config = OpenAiClientConfig {
            base_url: server.uri(),
            api_key: None,
            default_timeout: Duration::from_secs(5),
            max_retries: 0,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(1),
            max_error_body_bytes: 1024,
        };
        Arc::new(OpenAiClient::new(config).unwrap())
    }

    #[tokio::test]
    async fn trims_completion_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(serde_json::json!({ "model": "gemini-2.0-flash" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "c1",
                "choices": [{ "index": 0, "message": { "role": "assistant", "content": "  Hello there!\n" } }],
                "usage": { "prompt_tokens": 10, "completion_tokens": 3, "total_tokens": 13 }
            })))
            .mount(&server)
            .await;

        let generator = OpenAiGenerator::new(client_for(&server), "gemini-2.0-flash", false);
        assert_eq!(generator.generate("say hi").await.unwrap(), "Hello there!");
    }

    #[tokio::test]
    async fn blank_completion_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{ "message": { "content": "   " } }]
            })))
            .mount(&server)
            .await;

        let generator = OpenAiGenerator::new(client_for(&server), "m", false);
        assert!(matches!(
            generator.generate("x").await,
            Err(GenerateError::EmptyCompletion)
        ));
    }

    #[tokio::test]
    async fn upstream_failure_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": { "message": "bad model" }
            })))
            .mount(&server)
            .await;

        let generator = OpenAiGenerator::new(client_for(&server), "m", false);
        let err = generator.generate("x").await.unwrap_err();
        assert!(matches!(err, GenerateError::Upstream(_)));
        assert!(err.to_string().contains("bad model"));
    }

    #[tokio::test]
    async fn streaming_mode_aggregates_chunks() {
        let server = MockServer::start().await;
        let body = concat!(
            "data: {\"choices\":[{\"delta\":{\"content\":\"Great \"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"picks!\"}}]}\n\n",
            "data: [DONE]\n\n"
        );
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(serde_json::json!({ "stream": true })))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(body),
            )
            .mount(&server)
            .await;

        let generator = OpenAiGenerator::new(client_for(&server), "m", true);
        assert_eq!(generator.generate("x").await.unwrap(), "Great picks!");
    }
}
