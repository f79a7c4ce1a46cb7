use crate::domain::ports::{ChatMessage, CompletionClient, CompletionRequest};
use crate::utils::error::{OptimizerError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "https://models.inference.ai.azure.com";
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// OpenAI 相容的 `/chat/completions` 用戶端
pub struct ChatCompletionClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

#[derive(Serialize)]
struct ChatRequestBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponseBody {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

impl ChatCompletionClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.client = Client::builder().timeout(timeout).build()?;
        Ok(self)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[async_trait]
impl CompletionClient for ChatCompletionClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let body = ChatRequestBody {
            model: &self.model,
            messages: &request.messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        tracing::debug!(
            "POST {} (model: {}, max_tokens: {})",
            self.completions_url(),
            self.model,
            request.max_tokens
        );

        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        tracing::debug!("API response status: {}", status);

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OptimizerError::ApiStatusError {
                status: status.as_u16(),
                body,
            });
        }

        // 先取文字再解析，格式錯誤時回報 MalformedResponseError
        let text = response.text().await?;
        let parsed: ChatResponseBody = serde_json::from_str(&text)?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(OptimizerError::EmptyCompletionError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn request() -> CompletionRequest {
        CompletionRequest {
            messages: vec![
                ChatMessage::system("You are a DAX expert."),
                ChatMessage::user("Optimize SUM(Sales[Amount])"),
            ],
            temperature: 0.2,
            max_tokens: 1500,
        }
    }

    #[test]
    fn test_builder_defaults_and_overrides() {
        let client = ChatCompletionClient::new("token");
        assert_eq!(client.model(), DEFAULT_MODEL);
        assert_eq!(
            client.completions_url(),
            "https://models.inference.ai.azure.com/chat/completions"
        );

        let client = client
            .with_base_url("http://localhost:9000/v1/")
            .with_model("gpt-4o-mini");
        assert_eq!(client.model(), "gpt-4o-mini");
        assert_eq!(client.completions_url(), "http://localhost:9000/v1/chat/completions");
    }

    #[tokio::test]
    async fn test_complete_sends_bearer_token_and_returns_content() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(POST)
                .path("/chat/completions")
                .header("Authorization", "Bearer test-token")
                .json_body_partial(r#"{"model": "gpt-4o", "max_tokens": 1500}"#);
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(serde_json::json!({
                    "choices": [
                        {"message": {"role": "assistant", "content": "OPTIMIZED DAX:\nSUM(Sales[Amount])"}}
                    ]
                }));
        });

        let client = ChatCompletionClient::new("test-token").with_base_url(server.base_url());
        let reply = client.complete(&request()).await.unwrap();

        api_mock.assert();
        assert_eq!(reply, "OPTIMIZED DAX:\nSUM(Sales[Amount])");
    }

    #[tokio::test]
    async fn test_complete_maps_error_status() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(POST).path("/chat/completions");
            then.status(401).body("Bad credentials");
        });

        let client = ChatCompletionClient::new("bad").with_base_url(server.base_url());
        let err = client.complete(&request()).await.unwrap_err();

        api_mock.assert();
        match err {
            OptimizerError::ApiStatusError { status, body } => {
                assert_eq!(status, 401);
                assert_eq!(body, "Bad credentials");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_complete_without_choices_is_empty_completion() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/chat/completions");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(serde_json::json!({"choices": []}));
        });

        let client = ChatCompletionClient::new("token").with_base_url(server.base_url());
        let err = client.complete(&request()).await.unwrap_err();

        assert!(matches!(err, OptimizerError::EmptyCompletionError));
    }

    #[tokio::test]
    async fn test_complete_with_non_json_body_is_malformed_response() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/chat/completions");
            then.status(200)
                .header("Content-Type", "text/html")
                .body("<html>gateway login</html>");
        });

        let client = ChatCompletionClient::new("token").with_base_url(server.base_url());
        let err = client.complete(&request()).await.unwrap_err();

        assert!(matches!(err, OptimizerError::MalformedResponseError(_)));
    }
}
