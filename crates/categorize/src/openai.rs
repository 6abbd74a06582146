use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::model::{FallbackNeeded, ModelClient, ModelError};

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// Root of the API, e.g. `https://api.openai.com/v1` or
    /// `http://localhost:11434/v1` for Ollama.
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    /// Whether the endpoint honours `response_format: json_object`.
    pub structured_output: bool,
}

/// Chat-completions client for any OpenAI-compatible endpoint.
#[derive(Clone)]
pub struct OpenAiCompatClient {
    client: Client,
    config: OpenAiConfig,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: Option<String>,
}

impl OpenAiCompatClient {
    pub fn new(config: OpenAiConfig) -> Result<Self, ModelError> {
        let client = Client::builder().build()?;
        Ok(Self { client, config })
    }

    async fn chat(&self, prompt: &str, json_mode: bool) -> Result<String, ModelError> {
        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));
        let request = ChatRequest {
            model: &self.config.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: 0.0,
            response_format: json_mode.then_some(ResponseFormat {
                kind: "json_object",
            }),
        };

        let mut builder = self.client.post(&url).json(&request);
        if let Some(key) = &self.config.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let reply: ChatResponse = response.json().await?;
        reply
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(ModelError::EmptyResponse)
    }
}

#[async_trait]
impl ModelClient for OpenAiCompatClient {
    async fn complete_structured(&self, prompt: &str) -> Result<Value, FallbackNeeded> {
        if !self.config.structured_output {
            return Err(FallbackNeeded::Unsupported);
        }
        let content = self.chat(prompt, true).await?;
        debug!(model = %self.config.model, "structured completion received");
        serde_json::from_str(&content).map_err(|e| FallbackNeeded::Failed(e.into()))
    }

    async fn complete(&self, prompt: &str) -> Result<String, ModelError> {
        let content = self.chat(prompt, false).await?;
        debug!(model = %self.config.model, chars = content.len(), "text completion received");
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(base_url: &str, structured_output: bool) -> OpenAiConfig {
        OpenAiConfig {
            base_url: base_url.to_string(),
            model: "test-model".to_string(),
            api_key: Some("sk-test".to_string()),
            structured_output,
        }
    }

    fn reply(content: &str) -> Value {
        json!({ "choices": [{ "message": { "role": "assistant", "content": content } }] })
    }

    #[tokio::test]
    async fn text_completion_returns_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({ "model": "test-model" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply("hello")))
            .mount(&server)
            .await;

        let client = OpenAiCompatClient::new(config(&server.uri(), true)).unwrap();
        assert_eq!(client.complete("prompt").await.unwrap(), "hello");
    }

    #[tokio::test]
    async fn structured_completion_requests_json_mode() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(json!({ "response_format": { "type": "json_object" } })))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply(
                r#"{"reasoning":"r","category":"Food","confidence":8}"#,
            )))
            .mount(&server)
            .await;

        let client = OpenAiCompatClient::new(config(&server.uri(), true)).unwrap();
        let value = client.complete_structured("prompt").await.unwrap();
        assert_eq!(value["category"], "Food");
        assert_eq!(value["confidence"], 8);
    }

    #[tokio::test]
    async fn structured_disabled_skips_network() {
        let client = OpenAiCompatClient::new(config("http://127.0.0.1:9", false)).unwrap();
        assert!(matches!(
            client.complete_structured("prompt").await,
            Err(FallbackNeeded::Unsupported)
        ));
    }

    #[tokio::test]
    async fn structured_non_json_content_needs_fallback() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply("not json")))
            .mount(&server)
            .await;

        let client = OpenAiCompatClient::new(config(&server.uri(), true)).unwrap();
        assert!(matches!(
            client.complete_structured("prompt").await,
            Err(FallbackNeeded::Failed(ModelError::InvalidJson(_)))
        ));
    }

    #[tokio::test]
    async fn error_status_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let client = OpenAiCompatClient::new(config(&server.uri(), true)).unwrap();
        match client.complete("prompt").await {
            Err(ModelError::Status { status, body }) => {
                assert_eq!(status, 500);
                assert_eq!(body, "overloaded");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_choices_is_empty_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
            .mount(&server)
            .await;

        let client = OpenAiCompatClient::new(config(&server.uri(), true)).unwrap();
        assert!(matches!(
            client.complete("prompt").await,
            Err(ModelError::EmptyResponse)
        ));
    }
}
