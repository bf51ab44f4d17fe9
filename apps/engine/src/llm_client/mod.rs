//! LLM Client — the single point of entry for every call to the local Ollama server.
//!
//! ARCHITECTURAL RULE: no scorer talks HTTP directly. Everything goes through
//! the [`TextGenerator`] trait so tests can swap in a scripted generator and
//! operators can switch the LLM family off entirely.
//!
//! Failure never propagates as an error: `generate` returns `None` once every
//! model in the chain has been tried, and callers degrade from there.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::{LlmConfig, TEMPERATURE_CEILING, TEMPERATURE_FLOOR};

pub mod prompts;

const TOP_P: f32 = 0.9;
const MAX_BACKOFF: Duration = Duration::from_secs(2);

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("LLM returned an empty response")]
    EmptyResponse,
}

impl LlmError {
    /// Transport failures, 429 and 5xx are worth another attempt on the same
    /// model. Anything else moves on to the next model.
    fn is_retryable(&self) -> bool {
        match self {
            LlmError::Http(e) => !e.is_decode(),
            LlmError::Api { status, .. } => *status == 429 || *status >= 500,
            LlmError::EmptyResponse => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseFormat {
    #[default]
    Text,
    /// The caller expects JSON; code fences are stripped from the reply.
    Json,
}

/// Per-call generation options.
#[derive(Debug, Clone, Copy)]
pub struct GenerateOptions {
    pub temperature: f32,
    pub max_tokens: u32,
    pub format: ResponseFormat,
    /// Overrides the configured per-request timeout.
    pub timeout: Option<Duration>,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            temperature: 0.1,
            max_tokens: 200,
            format: ResponseFormat::Text,
            timeout: None,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Trait definition
// ────────────────────────────────────────────────────────────────────────────

/// Anything that can complete a prompt. Carried as `Arc<dyn TextGenerator>`.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Completes `prompt`. `None` means no model produced usable text.
    async fn generate(&self, prompt: &str, options: GenerateOptions) -> Option<String>;

    /// Cheap liveness probe.
    async fn is_reachable(&self) -> bool;

    fn name(&self) -> &str;
}

/// Generator used when the LLM family is switched off.
pub struct DisabledGenerator;

#[async_trait]
impl TextGenerator for DisabledGenerator {
    async fn generate(&self, _prompt: &str, _options: GenerateOptions) -> Option<String> {
        None
    }

    async fn is_reachable(&self) -> bool {
        false
    }

    fn name(&self) -> &str {
        "disabled"
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Ollama client
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct GenerateBody<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: ModelOptions,
}

#[derive(Debug, Serialize)]
struct ModelOptions {
    temperature: f32,
    top_p: f32,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateReply {
    #[serde(default)]
    response: String,
}

#[derive(Debug, Deserialize)]
struct OllamaError {
    error: String,
}

/// HTTP client for Ollama's `/api/generate`, walking the configured model
/// chain with bounded retries per model.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    config: LlmConfig,
}

impl LlmClient {
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    /// One model, up to `1 + retries` attempts.
    /// Retries on transport errors, 429 and 5xx with exponential backoff (1s, 2s, 2s, ...).
    async fn generate_with_model(
        &self,
        model: &str,
        prompt: &str,
        options: &GenerateOptions,
        temperature: f32,
    ) -> Result<String, LlmError> {
        let url = format!("{}/api/generate", self.config.host);
        let body = GenerateBody {
            model,
            prompt,
            stream: false,
            options: ModelOptions {
                temperature,
                top_p: TOP_P,
                num_predict: options.max_tokens,
            },
        };
        let timeout = options.timeout.unwrap_or(self.config.timeout);

        let mut last_error: Option<LlmError> = None;

        for attempt in 0..=self.config.retries {
            if attempt > 0 {
                let delay = Duration::from_millis(1000 * (1 << (attempt - 1).min(4))).min(MAX_BACKOFF);
                warn!(
                    "LLM call to {} attempt {} failed, retrying after {}ms...",
                    model,
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            match self.post_generate(&url, &body, timeout).await {
                Ok(text) => return Ok(text),
                Err(e) if e.is_retryable() => {
                    last_error = Some(e);
                    continue;
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or(LlmError::EmptyResponse))
    }

    async fn post_generate(
        &self,
        url: &str,
        body: &GenerateBody<'_>,
        timeout: Duration,
    ) -> Result<String, LlmError> {
        let response = self.client.post(url).timeout(timeout).json(body).send().await?;
        let status = response.status();

        if !status.is_success() {
            let raw = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<OllamaError>(&raw)
                .map(|e| e.error)
                .unwrap_or(raw);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let reply: GenerateReply = response.json().await?;
        if reply.response.trim().is_empty() {
            return Err(LlmError::EmptyResponse);
        }
        Ok(reply.response)
    }
}

#[async_trait]
impl TextGenerator for LlmClient {
    async fn generate(&self, prompt: &str, options: GenerateOptions) -> Option<String> {
        let temperature = clamp_temperature(options.temperature);

        for model in self.config.model_chain() {
            match self.generate_with_model(model, prompt, &options, temperature).await {
                Ok(text) => {
                    debug!(model, chars = text.len(), "LLM call succeeded");
                    let text = match options.format {
                        ResponseFormat::Json => strip_json_fences(&text).to_string(),
                        ResponseFormat::Text => text.trim().to_string(),
                    };
                    return Some(text);
                }
                Err(e) => warn!(model, error = %e, "LLM model failed, trying next in chain"),
            }
        }

        warn!("All LLM models failed");
        None
    }

    async fn is_reachable(&self) -> bool {
        let url = format!("{}/api/tags", self.config.host);
        match self
            .client
            .get(&url)
            .timeout(self.config.probe_timeout)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!(error = %e, "LLM probe failed");
                false
            }
        }
    }

    fn name(&self) -> &str {
        "ollama"
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Temperature helpers
// ────────────────────────────────────────────────────────────────────────────

/// Forces a temperature into `[0.05, 0.8]`. NaN maps to the floor.
pub fn clamp_temperature(temperature: f32) -> f32 {
    if temperature.is_nan() {
        return TEMPERATURE_FLOOR;
    }
    temperature.clamp(TEMPERATURE_FLOOR, TEMPERATURE_CEILING)
}

/// Temperature for a pair whose cheap pre-estimate is `estimated_score`.
///
/// Strong matches get a cooler, more deterministic model:
/// `t = max − (max − min) × score / 100`, clamped into the hard bounds.
pub fn temperature_for_match(estimated_score: f64, min: f32, max: f32) -> f32 {
    let score = if estimated_score.is_nan() {
        0.0
    } else {
        estimated_score.clamp(0.0, 100.0)
    };
    let t = f64::from(max) - f64::from(max - min) * score / 100.0;
    clamp_temperature(t as f32)
}

// ────────────────────────────────────────────────────────────────────────────
// Response cleanup
// ────────────────────────────────────────────────────────────────────────────

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
pub fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    let inner = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```JSON"))
        .or_else(|| text.strip_prefix("```"));

    match inner {
        Some(stripped) => stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start()),
        None => text,
    }
}

/// Finds the outermost balanced `{ ... }` in `text`, ignoring braces inside
/// JSON strings. Handles fences, a leading `json` label and prose around the
/// object.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let text = strip_json_fences(text);
    let start = text.find('{')?;

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}
