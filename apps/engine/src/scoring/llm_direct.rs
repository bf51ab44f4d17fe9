//! LLM direct score: the model reads both texts and answers with a percentage.
//!
//! `llm` reports the model's number; `llm_hybrid` blends it 70/30 with
//! Jaccard so an overconfident answer is pulled back toward keyword evidence.

use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use super::jaccard::{self, jaccard};
use super::{round1, CompatibilityScorer, ScoreDetails, ScoreResult};
use crate::config::LlmConfig;
use crate::engine::method::{Method, MethodTag};
use crate::errors::ScoringError;
use crate::llm_client::prompts::delimited;
use crate::llm_client::{temperature_for_match, GenerateOptions, ResponseFormat, TextGenerator};
use crate::text::truncate_chars;

const STATIC_TEMPERATURE: f32 = 0.1;
const MAX_TOKENS: u32 = 200;
const JUSTIFICATION_CHARS: usize = 200;
const HYBRID_LLM_WEIGHT: f64 = 0.7;
const HYBRID_JACCARD_WEIGHT: f64 = 0.3;

static PERCENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+(?:[.,]\d+)?)\s*%").expect("percent regex"));
static SCORE_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)score[:\s]+(\d+(?:[.,]\d+)?)").expect("score label regex"));
static BARE_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(\d+(?:[.,]\d+)?)\b").expect("number regex"));

fn build_prompt(resume: &str, job: &str) -> String {
    format!(
        r#"Você avalia candidatos para vagas de tecnologia. Compare o currículo com a vaga.

{resume}

{job}

Considere:
1. Tecnologias, ferramentas e experiência exigidas pela vaga e presentes no currículo.
2. Termos equivalentes contam como iguais (K8s = Kubernetes, SRE = DevOps, IaC = Terraform).
3. Senioridade pedida versus experiência demonstrada.
4. Idioma e formatação do texto não importam.

Faixas de referência:
- 80-100: atende praticamente tudo
- 60-79: atende bem, com lacunas pequenas
- 40-59: atende parcialmente
- 20-39: pouca sobreposição
- 0-19: área diferente

Responda exatamente neste formato:
Score: <número de 0 a 100>%
Justificativa: <uma ou duas linhas>"#,
        resume = delimited("CURRÍCULO", resume),
        job = delimited("VAGA", job),
    )
}

/// Pulls a 0–100 score out of a free-form answer.
///
/// Tries, in order: a percentage (`75%`, `75,5 %`), a `score: N` label, and
/// the first bare number if it lies in `[0, 100]`. The result is clamped.
pub fn extract_score(response: &str) -> Option<f64> {
    let parse = |raw: &str| raw.replace(',', ".").parse::<f64>().ok();

    if let Some(value) = PERCENT.captures(response).and_then(|c| parse(&c[1])) {
        return Some(value.clamp(0.0, 100.0));
    }
    if let Some(value) = SCORE_LABEL.captures(response).and_then(|c| parse(&c[1])) {
        return Some(value.clamp(0.0, 100.0));
    }
    BARE_NUMBER
        .captures(response)
        .and_then(|c| parse(&c[1]))
        .filter(|v| (0.0..=100.0).contains(v))
}

/// Text after `Justificativa:` if present, else the whole answer; at most
/// 200 chars.
pub fn extract_justification(response: &str) -> String {
    let text = match response.split_once("Justificativa:") {
        Some((_, rest)) => rest,
        None => response,
    };
    truncate_chars(text.trim(), JUSTIFICATION_CHARS).to_string()
}

#[derive(Debug, Clone, PartialEq)]
pub struct DirectOutcome {
    pub score: f64,
    pub justification: String,
    pub temperature: f32,
}

pub struct LlmDirectScorer {
    generator: Arc<dyn TextGenerator>,
    config: LlmConfig,
    hybrid: bool,
}

impl LlmDirectScorer {
    pub fn new(generator: Arc<dyn TextGenerator>, config: LlmConfig, hybrid: bool) -> Self {
        Self {
            generator,
            config,
            hybrid,
        }
    }

    /// Temperature for a pair with the given Jaccard pre-estimate.
    pub fn temperature_for(&self, estimated_score: f64) -> f32 {
        if self.config.dynamic_temperature {
            temperature_for_match(estimated_score, self.config.temp_min, self.config.temp_max)
        } else {
            STATIC_TEMPERATURE
        }
    }

    /// Asks the model for a score. `Err` when nothing usable came back.
    pub async fn direct(&self, resume: &str, job: &str, temperature: f32) -> Result<DirectOutcome, ScoringError> {
        let prompt = build_prompt(
            truncate_chars(resume, self.config.max_chars),
            truncate_chars(job, self.config.max_chars),
        );
        let options = GenerateOptions {
            temperature,
            max_tokens: MAX_TOKENS,
            format: ResponseFormat::Text,
            timeout: None,
        };

        let response = self
            .generator
            .generate(&prompt, options)
            .await
            .ok_or_else(|| ScoringError::LlmUnavailable("no model in the chain answered".to_string()))?;

        let score = extract_score(&response).ok_or_else(|| {
            ScoringError::LlmUnavailable(format!(
                "could not extract a score from: {}",
                truncate_chars(&response, 100)
            ))
        })?;

        Ok(DirectOutcome {
            score: round1(score),
            justification: extract_justification(&response),
            temperature,
        })
    }
}

#[async_trait]
impl CompatibilityScorer for LlmDirectScorer {
    fn method(&self) -> Method {
        if self.hybrid {
            Method::LlmHybrid
        } else {
            Method::Llm
        }
    }

    async fn score(&self, resume: &str, job: &str) -> Result<ScoreResult, ScoringError> {
        let keyword = jaccard(resume, job);
        let temperature = self.temperature_for(keyword.score);

        let outcome = match self.direct(resume, job, temperature).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(error = %e, method = %self.method(), "LLM direct score failed, falling back to Jaccard");
                return Ok(jaccard::fallback(resume, job, &e.to_string()));
            }
        };
        debug!(score = outcome.score, temperature, "llm direct scored");

        if !self.hybrid {
            return Ok(ScoreResult::new(
                outcome.score,
                format!("LLM: {:.1}% | {}", outcome.score, outcome.justification),
                ScoreDetails::new(MethodTag::Llm)
                    .with("llm_score", outcome.score)
                    .with("llm_temperature", outcome.temperature)
                    .with("justification", &outcome.justification),
            ));
        }

        let final_score = round1(HYBRID_LLM_WEIGHT * outcome.score + HYBRID_JACCARD_WEIGHT * keyword.score);
        Ok(ScoreResult::new(
            final_score,
            format!(
                "LLM: {:.1}%, Jaccard: {:.1}%, Final: {:.1}% | {}",
                outcome.score,
                keyword.score,
                final_score,
                truncate_chars(&outcome.justification, 100)
            ),
            ScoreDetails::new(MethodTag::LlmHybrid)
                .with("llm_score", outcome.score)
                .with("jaccard_score", keyword.score)
                .with("llm_temperature", outcome.temperature)
                .with("llm_explanation", &outcome.justification),
        ))
    }
}
