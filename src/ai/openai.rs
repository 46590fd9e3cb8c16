//! OpenAI chat completions provider

use std::collections::HashMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest_middleware::ClientWithMiddleware;
use serde::{Deserialize, Serialize};

use super::TextGenerator;
use crate::http::check_status;
use crate::{AstrocastError, ErrorCode};

/// Models tried in order after any configured override
pub const OPENAI_MODELS: [&str; 6] = [
    "gpt-4o-mini",
    "gpt-4o",
    "gpt-4o-2024-08-06",
    "gpt-4.1-mini",
    "gpt-4.1",
    "gpt-3.5-turbo",
];

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

pub struct OpenAiGenerator {
    client: ClientWithMiddleware,
    base_url: String,
    api_key: String,
    model_override: Option<String>,
}

impl OpenAiGenerator {
    pub fn new(
        client: ClientWithMiddleware,
        base_url: &str,
        api_key: String,
        model_override: Option<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model_override,
        }
    }
}

#[async_trait]
impl TextGenerator for OpenAiGenerator {
    fn name(&self) -> &'static str {
        "OpenAI"
    }

    fn candidate_models(&self) -> Vec<String> {
        self.model_override
            .iter()
            .cloned()
            .chain(OPENAI_MODELS.iter().map(|m| (*m).to_string()))
            .collect()
    }

    async fn generate(&self, model: &str, prompt: &str, max_tokens: u32, temperature: f32) -> Result<String> {
        let request = ChatRequest {
            model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens,
            temperature,
        };
        let body = serde_json::to_vec(&request).with_context(|| "Failed to encode chat request")?;

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| {
                AstrocastError::api_with_context(
                    format!("OpenAI request failed: {e}"),
                    ErrorCode::ApiNetworkError,
                    HashMap::from([("model".to_string(), model.to_string())]),
                )
            })?;
        let response = check_status(response, "OpenAI")?;

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            AstrocastError::api(
                format!("Invalid chat completion from OpenAI: {e}"),
                ErrorCode::ApiInvalidResponse,
            )
        })?;

        Ok(parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default()
            .trim()
            .to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::build_client;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_generate_posts_chat_completion() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({
                "model": "gpt-4o-mini",
                "max_tokens": 120,
                "messages": [{"role": "user", "content": "Return the word OK"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"index": 0, "message": {"role": "assistant", "content": " OK \n"}}]
            })))
            .mount(&server)
            .await;

        let client = build_client(Duration::from_secs(5), "test", 0, Duration::from_millis(10)).unwrap();
        let generator = OpenAiGenerator::new(client, &server.uri(), "sk-test".to_string(), None);
        let text = generator
            .generate("gpt-4o-mini", "Return the word OK", 120, 0.6)
            .await
            .unwrap();
        assert_eq!(text, "OK");
    }

    #[test]
    fn test_override_comes_first() {
        let client = build_client(Duration::from_secs(5), "test", 0, Duration::from_millis(10)).unwrap();
        let generator =
            OpenAiGenerator::new(client, "http://localhost", "k".to_string(), Some("gpt-custom".to_string()));
        let models = generator.candidate_models();
        assert_eq!(models[0], "gpt-custom");
        assert_eq!(models[1], "gpt-4o-mini");
        assert_eq!(models.len(), 7);
    }
}
