//! Google Gemini `generateContent` provider

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Url;
use reqwest::header::CONTENT_TYPE;
use reqwest_middleware::ClientWithMiddleware;
use serde::{Deserialize, Serialize};

use super::TextGenerator;
use crate::http::check_status;
use crate::{AstrocastError, ErrorCode};

pub const GEMINI_MODELS: [&str; 6] = [
    "gemini-1.5-flash-latest",
    "gemini-1.5-flash",
    "gemini-1.5-pro-latest",
    "gemini-1.5-pro",
    "gemini-pro",
    "gemini-1.0-pro",
];

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

pub struct GeminiGenerator {
    client: ClientWithMiddleware,
    base_url: String,
    api_key: String,
    model_override: Option<String>,
}

impl GeminiGenerator {
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
impl TextGenerator for GeminiGenerator {
    fn name(&self) -> &'static str {
        "Gemini"
    }

    fn candidate_models(&self) -> Vec<String> {
        self.model_override
            .iter()
            .cloned()
            .chain(GEMINI_MODELS.iter().map(|m| (*m).to_string()))
            .collect()
    }

    async fn generate(&self, model: &str, prompt: &str, max_tokens: u32, temperature: f32) -> Result<String> {
        let url = Url::parse_with_params(
            &format!("{}/models/{}:generateContent", self.base_url, model),
            &[("key", self.api_key.as_str())],
        )
        .with_context(|| format!("Invalid Gemini URL for model {model}"))?;

        let request = GenerateRequest {
            contents: [Content {
                parts: [Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                max_output_tokens: max_tokens,
                temperature,
            },
        };
        let body = serde_json::to_vec(&request).with_context(|| "Failed to encode Gemini request")?;

        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| {
                AstrocastError::api(format!("Gemini request failed: {e}"), ErrorCode::ApiNetworkError)
            })?;
        let response = check_status(response, "Gemini")?;

        let parsed: GenerateResponse = response.json().await.map_err(|e| {
            AstrocastError::api(
                format!("Invalid generateContent response from Gemini: {e}"),
                ErrorCode::ApiInvalidResponse,
            )
        })?;

        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| content.parts.into_iter().map(|part| part.text).collect())
            .unwrap_or_default();
        Ok(text.trim().to_string())
    }
}
