//! LLM interaction: a minimal OpenAI-compatible chat-completion client.
//!
//! DeepSeek, OpenAI, vLLM, Ollama and LiteLLM all speak the same
//! `POST {base}/chat/completions` dialect, so one small client with a
//! configurable base URL covers every provider. It is intentionally thin:
//! prompt wording lives in [`crate::prompts`] and response cleanup in
//! [`crate::pipeline::postprocess`].
//!
//! ## No retries
//!
//! A failed call is reported once and the caller decides what to do. The
//! structurer turns any failure into "no questions", which the user can
//! resolve by resubmitting the form.

use crate::error::{PipelineError, StructureError};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// A chat message in the OpenAI wire format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: usize,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Default, Clone, Copy, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: usize,
    #[serde(default)]
    pub completion_tokens: usize,
}

/// The text of a completion plus token accounting.
#[derive(Debug, Clone)]
pub struct Completion {
    pub content: String,
    pub usage: Usage,
}

/// Client for one OpenAI-compatible endpoint.
#[derive(Clone)]
pub struct ChatClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: usize,
}

impl ChatClient {
    /// `api_base` is the provider root, e.g. `https://api.deepseek.com`;
    /// `/chat/completions` is appended.
    pub fn new(
        api_base: &str,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self, PipelineError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| PipelineError::HttpClient(e.to_string()))?;

        Ok(Self {
            http,
            endpoint: format!("{}/chat/completions", api_base.trim_end_matches('/')),
            api_key: api_key.into(),
            model: model.into(),
            temperature: 0.1,
            max_tokens: 4000,
        })
    }

    pub fn with_sampling(mut self, temperature: f32, max_tokens: usize) -> Self {
        self.temperature = temperature;
        self.max_tokens = max_tokens;
        self
    }

    /// Send `messages` and return the first choice's content.
    pub async fn complete(&self, messages: &[ChatMessage]) -> Result<Completion, StructureError> {
        let body = ChatRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| StructureError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StructureError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| StructureError::Request(format!("unreadable response body: {e}")))?;

        let usage = parsed.usage.unwrap_or_default();
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(StructureError::EmptyResponse)?;

        debug!(
            "LLM call: {} input tokens, {} output tokens",
            usage.prompt_tokens, usage.completion_tokens
        );

        Ok(Completion { content, usage })
    }
}

impl std::fmt::Debug for ChatClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatClient")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> ChatClient {
        ChatClient::new(&server.uri(), "sk-test", "deepseek-chat", 5).unwrap()
    }

    #[tokio::test]
    async fn sends_openai_shaped_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({
                "model": "deepseek-chat",
                "max_tokens": 4000,
                "messages": [
                    {"role": "system", "content": "sys"},
                    {"role": "user", "content": "hi"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "[]"}}],
                "usage": {"prompt_tokens": 12, "completion_tokens": 1}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let out = client(&server)
            .complete(&[ChatMessage::system("sys"), ChatMessage::user("hi")])
            .await
            .unwrap();

        assert_eq!(out.content, "[]");
        assert_eq!(out.usage.prompt_tokens, 12);
    }

    #[tokio::test]
    async fn non_success_status_is_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .mount(&server)
            .await;

        let err = client(&server)
            .complete(&[ChatMessage::user("hi")])
            .await
            .unwrap_err();

        assert!(
            matches!(err, StructureError::Api { status: 401, ref body } if body == "bad key"),
            "got: {err:?}"
        );
    }

    #[tokio::test]
    async fn missing_choices_is_empty_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let err = client(&server)
            .complete(&[ChatMessage::user("hi")])
            .await
            .unwrap_err();

        assert!(matches!(err, StructureError::EmptyResponse));
    }

    #[test]
    fn endpoint_tolerates_trailing_slash() {
        let c = ChatClient::new("https://api.deepseek.com/", "k", "m", 5).unwrap();
        assert_eq!(c.endpoint, "https://api.deepseek.com/chat/completions");
    }
}
