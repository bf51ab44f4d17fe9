use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tracing::warn;

use crate::engine::fusion::FusionWeights;
use crate::engine::method::{Method, MethodFamily};

/// Hard bounds for any temperature sent to the LLM.
pub const TEMPERATURE_FLOOR: f32 = 0.05;
pub const TEMPERATURE_CEILING: f32 = 0.8;

/// Engine configuration. Every key is optional; see [`Config::default`].
#[derive(Debug, Clone)]
pub struct Config {
    pub llm: LlmConfig,
    pub embedding: EmbeddingConfig,
    /// Method used when the caller does not name one.
    pub default_method: Method,
    /// Scorer families switched off by the operator.
    pub disabled: Vec<MethodFamily>,
    pub fusion_weights: FusionWeights,
    pub rust_log: String,
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub host: String,
    pub primary_model: String,
    pub fallback_models: Vec<String>,
    pub timeout: Duration,
    /// Extra attempts per model after the first one.
    pub retries: u32,
    pub probe_timeout: Duration,
    pub dynamic_temperature: bool,
    pub temp_min: f32,
    pub temp_max: f32,
    pub max_chars: usize,
}

#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    pub model: String,
    pub max_chars: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            host: "http://localhost:11434".to_string(),
            primary_model: "qwen2.5-coder:1.5b".to_string(),
            fallback_models: vec!["qwen2.5:3b".to_string()],
            timeout: Duration::from_secs(30),
            retries: 2,
            probe_timeout: Duration::from_secs(2),
            dynamic_temperature: true,
            temp_min: 0.05,
            temp_max: 0.6,
            max_chars: 3000,
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "paraphrase-multilingual-mpnet-base-v2".to_string(),
            max_chars: 2000,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            llm: LlmConfig::default(),
            embedding: EmbeddingConfig::default(),
            default_method: Method::Auto,
            disabled: Vec::new(),
            fusion_weights: FusionWeights::default(),
            rust_log: "info".to_string(),
        }
    }
}

impl LlmConfig {
    /// Primary model followed by the fallbacks, without duplicates.
    pub fn model_chain(&self) -> Vec<&str> {
        let mut chain: Vec<&str> = Vec::with_capacity(1 + self.fallback_models.len());
        for model in std::iter::once(&self.primary_model).chain(&self.fallback_models) {
            let model = model.trim();
            if !model.is_empty() && !chain.contains(&model) {
                chain.push(model);
            }
        }
        chain
    }
}

impl Config {
    /// Loads configuration from the process environment (and `.env`, if present).
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary key lookup. Keys that are
    /// missing or blank take their default.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = LlmConfig::default();

        let temp_min = clamp_temperature_bound(parse_or(&get, "LLM_TEMP_MIN", defaults.temp_min)?);
        let temp_max = clamp_temperature_bound(parse_or(&get, "LLM_TEMP_MAX", defaults.temp_max)?);
        if temp_min > temp_max {
            bail!("LLM_TEMP_MIN ({temp_min}) must not exceed LLM_TEMP_MAX ({temp_max})");
        }

        let llm = LlmConfig {
            host: get("OLLAMA_HOST")
                .map(|h| h.trim_end_matches('/').to_string())
                .unwrap_or(defaults.host),
            primary_model: get("SKILLS_LLM_MODEL").unwrap_or(defaults.primary_model),
            fallback_models: match get("LLM_MODEL_FALLBACKS") {
                Some(list) => split_list(&list),
                None => defaults.fallback_models,
            },
            timeout: Duration::from_secs(parse_or(&get, "LLM_TIMEOUT", 30u64)?),
            retries: parse_or(&get, "LLM_RETRIES", defaults.retries)?,
            probe_timeout: Duration::from_secs(parse_or(&get, "LLM_PROBE_TIMEOUT", 2u64)?),
            dynamic_temperature: match get("LLM_DYNAMIC_TEMPERATURE") {
                Some(v) => parse_bool(&v)
                    .with_context(|| format!("LLM_DYNAMIC_TEMPERATURE has invalid value '{v}'"))?,
                None => defaults.dynamic_temperature,
            },
            temp_min,
            temp_max,
            max_chars: parse_or(&get, "LLM_MAX_CHARS", defaults.max_chars)?,
        };

        let embedding_defaults = EmbeddingConfig::default();
        let embedding = EmbeddingConfig {
            model: get("EMBEDDING_MODEL").unwrap_or(embedding_defaults.model),
            max_chars: parse_or(&get, "EMBEDDING_MAX_CHARS", embedding_defaults.max_chars)?,
        };

        let default_method = match get("COMPATIBILITY_METHOD") {
            Some(name) => Method::from_str(&name).unwrap_or_else(|_| {
                warn!("Unknown COMPATIBILITY_METHOD '{}', using auto", name);
                Method::Auto
            }),
            None => Method::Auto,
        };

        let mut disabled = Vec::new();
        if let Some(list) = get("COMPATIBILITY_DISABLED_METHODS") {
            for name in split_list(&list) {
                match MethodFamily::from_str(&name) {
                    Ok(family) if !disabled.contains(&family) => disabled.push(family),
                    Ok(_) => {}
                    Err(_) => warn!("Ignoring unknown method family '{}' in COMPATIBILITY_DISABLED_METHODS", name),
                }
            }
        }

        let fusion_weights = match get("ULTRA_WEIGHTS") {
            Some(raw) => FusionWeights::parse(&raw).context("ULTRA_WEIGHTS is invalid")?,
            None => FusionWeights::default(),
        };

        Ok(Config {
            llm,
            embedding,
            default_method,
            disabled,
            fusion_weights,
            rust_log: get("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }

    pub fn is_disabled(&self, family: MethodFamily) -> bool {
        self.disabled.contains(&family)
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .parse::<T>()
            .with_context(|| format!("{key} has invalid value '{raw}'")),
        None => Ok(default),
    }
}

fn parse_bool(raw: &str) -> Result<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("expected a boolean, got '{other}'"),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn clamp_temperature_bound(value: f32) -> f32 {
    if value.is_nan() {
        return TEMPERATURE_FLOOR;
    }
    value.clamp(TEMPERATURE_FLOOR, TEMPERATURE_CEILING)
}
