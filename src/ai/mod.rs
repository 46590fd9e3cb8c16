//! Generative text: weather summaries, questions and a health probe
//!
//! Providers sit behind [`TextGenerator`]. Each provider walks its model
//! candidates until one answers and remembers that model for the next call.
//! Nothing in here returns an error to the caller: an unconfigured or failing
//! provider produces a readable notice instead.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{AiConfig, Secrets};
use crate::http::build_client;

pub mod context;
pub mod gemini;
pub mod openai;
pub mod prompts;

pub use prompts::WeatherMetrics;

const MAX_LOGGED_ERRORS: usize = 50;
const MAX_ERROR_CHARS: usize = 400;
const HEALTH_ERROR_CHARS: usize = 300;

const SUMMARY_TEMPERATURE: f32 = 0.6;
const ANSWER_TEMPERATURE: f32 = 0.5;

/// Message returned when no provider has a usable key
pub const NOT_CONFIGURED: &str = "AI not configured (add OPENAI_API_KEY or GEMINI_API_KEY to secrets or env).";
/// Message returned when there are no figures to summarise
pub const INSUFFICIENT_DATA: &str = "Insufficient weather data for summary.";

/// A remote text generation backend
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Display name of the provider
    fn name(&self) -> &'static str;

    /// Models to try, in priority order
    fn candidate_models(&self) -> Vec<String>;

    /// Generate a completion for `prompt` with one specific model
    async fn generate(&self, model: &str, prompt: &str, max_tokens: u32, temperature: f32) -> Result<String>;
}

/// Bounded record of recent provider failures
#[derive(Default)]
struct ErrorLog(Mutex<VecDeque<String>>);

impl ErrorLog {
    fn push(&self, entry: &str) {
        let mut entries = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        entries.push_back(entry.chars().take(MAX_ERROR_CHARS).collect());
        while entries.len() > MAX_LOGGED_ERRORS {
            entries.pop_front();
        }
    }

    fn entries(&self) -> Vec<String> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }
}

struct Provider {
    generator: Box<dyn TextGenerator>,
    selected_model: Mutex<Option<String>>,
}

impl Provider {
    fn new(generator: Box<dyn TextGenerator>) -> Self {
        Self {
            generator,
            selected_model: Mutex::new(None),
        }
    }

    fn selected_model(&self) -> Option<String> {
        self.selected_model
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Remembered model first, then the remaining candidates
    fn ordered_models(&self) -> Vec<String> {
        let candidates = self.generator.candidate_models();
        match self.selected_model() {
            Some(selected) => std::iter::once(selected.clone())
                .chain(candidates.into_iter().filter(|m| *m != selected))
                .collect(),
            None => candidates,
        }
    }

    /// Text from the first model that answers, or the last error
    async fn generate(
        &self,
        prompt: &str,
        max_tokens: u32,
        temperature: f32,
        log: &ErrorLog,
    ) -> std::result::Result<String, String> {
        let mut last_error = None;
        for model in self.ordered_models() {
            match self.generator.generate(&model, prompt, max_tokens, temperature).await {
                Ok(text) => {
                    debug!("{} answered with model {}", self.generator.name(), model);
                    *self.selected_model.lock().unwrap_or_else(PoisonError::into_inner) = Some(model);
                    return Ok(text);
                }
                Err(e) => {
                    let entry = format!("{}: {}", model, e);
                    warn!("{} model failed: {}", self.generator.name(), entry);
                    log.push(&entry);
                    last_error = Some(entry);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| "Unknown error".to_string()))
    }
}

/// Result of the AI health probe
#[derive(Debug, Clone, Serialize)]
pub struct AiHealth {
    pub provider: Option<String>,
    pub configured: bool,
    pub ok: bool,
    pub model: Option<String>,
    pub error: Option<String>,
    pub recent_errors: Vec<String>,
}

/// Front door for all generative features
pub struct AiAssistant {
    providers: Vec<Provider>,
    errors: ErrorLog,
    summary_max_tokens: u32,
    answer_max_tokens: u32,
}

impl AiAssistant {
    /// Build the providers named by `config.provider` that have a key
    pub fn from_config(config: &AiConfig, secrets: &Secrets) -> Result<Self> {
        let client = build_client(
            Duration::from_secs(config.timeout_seconds.into()),
            &format!("astrocast/{}", crate::VERSION),
            1,
            Duration::from_millis(500),
        )?;

        let openai = || {
            secrets.openai_api_key.clone().map(|key| {
                Box::new(openai::OpenAiGenerator::new(
                    client.clone(),
                    &config.openai_base_url,
                    key,
                    config.openai_model.clone(),
                )) as Box<dyn TextGenerator>
            })
        };
        let gemini = || {
            secrets.gemini_api_key.clone().map(|key| {
                Box::new(gemini::GeminiGenerator::new(
                    client.clone(),
                    &config.gemini_base_url,
                    key,
                    config.gemini_model.clone(),
                )) as Box<dyn TextGenerator>
            })
        };

        let generators: Vec<Box<dyn TextGenerator>> = match config.provider.as_str() {
            "openai" => openai().into_iter().collect(),
            "gemini" => gemini().into_iter().collect(),
            "none" => Vec::new(),
            _ => openai().into_iter().chain(gemini()).collect(),
        };

        if generators.is_empty() {
            info!("No AI provider configured; AI features disabled");
        } else {
            let names: Vec<&str> = generators.iter().map(|g| g.name()).collect();
            info!("AI providers enabled: {}", names.join(", "));
        }

        Ok(Self::with_generators(
            generators,
            config.summary_max_tokens,
            config.answer_max_tokens,
        ))
    }

    /// Assistant over explicit generators, tried in order
    #[must_use]
    pub fn with_generators(
        generators: Vec<Box<dyn TextGenerator>>,
        summary_max_tokens: u32,
        answer_max_tokens: u32,
    ) -> Self {
        Self {
            providers: generators.into_iter().map(Provider::new).collect(),
            errors: ErrorLog::default(),
            summary_max_tokens,
            answer_max_tokens,
        }
    }

    /// Assistant with no providers
    #[must_use]
    pub fn disabled() -> Self {
        Self::with_generators(Vec::new(), 0, 0)
    }

    #[must_use]
    pub fn is_configured(&self) -> bool {
        !self.providers.is_empty()
    }

    /// Name of the first provider
    #[must_use]
    pub fn provider_name(&self) -> Option<&'static str> {
        self.providers.first().map(|p| p.generator.name())
    }

    /// Recent provider errors, oldest first
    #[must_use]
    pub fn recent_errors(&self) -> Vec<String> {
        self.errors.entries()
    }

    async fn generate(
        &self,
        prompt: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> std::result::Result<(String, &'static str), String> {
        let mut last_error = String::from("Not configured");
        for provider in &self.providers {
            match provider.generate(prompt, max_tokens, temperature, &self.errors).await {
                Ok(text) => return Ok((text, provider.generator.name())),
                Err(e) => last_error = e,
            }
        }
        Err(last_error)
    }

    /// Two-sentence summary of the given figures
    pub async fn summarize_weather(&self, metrics: &WeatherMetrics) -> String {
        if !self.is_configured() {
            return NOT_CONFIGURED.to_string();
        }
        let Some(prompt) = prompts::summary_prompt(metrics) else {
            return INSUFFICIENT_DATA.to_string();
        };
        match self
            .generate(&prompt, self.summary_max_tokens, SUMMARY_TEMPERATURE)
            .await
        {
            Ok((text, _)) if text.is_empty() => "No summary generated".to_string(),
            Ok((text, _)) => text,
            Err(e) => format!("AI summary unavailable ({e})."),
        }
    }

    /// Answer a free-form question using only `context`
    pub async fn answer_question(&self, question: &str, context: &str) -> String {
        if !self.is_configured() {
            return NOT_CONFIGURED.to_string();
        }
        let prompt = prompts::question_prompt(question, context);
        match self
            .generate(&prompt, self.answer_max_tokens, ANSWER_TEMPERATURE)
            .await
        {
            Ok((text, _)) if text.is_empty() => "No answer generated".to_string(),
            Ok((text, _)) => text,
            Err(e) => format!("AI answer unavailable ({e})."),
        }
    }

    /// Probe the providers with a tiny prompt
    pub async fn health(&self) -> AiHealth {
        if !self.is_configured() {
            return AiHealth {
                provider: None,
                configured: false,
                ok: false,
                model: None,
                error: Some("API key missing/invalid".to_string()),
                recent_errors: self.recent_errors(),
            };
        }

        let result = self.generate(prompts::HEALTH_PROMPT, 5, 0.0).await;
        let (ok, provider, error) = match result {
            Ok((_, name)) => (true, Some(name.to_string()), None),
            Err(e) => (
                false,
                self.provider_name().map(str::to_string),
                Some(e.chars().take(HEALTH_ERROR_CHARS).collect()),
            ),
        };
        let model = self
            .providers
            .iter()
            .find(|p| Some(p.generator.name()) == provider.as_deref())
            .and_then(Provider::selected_model);

        AiHealth {
            provider,
            configured: true,
            ok,
            model,
            error,
            recent_errors: self.recent_errors(),
        }
    }
}
