//! Scorers — every way of turning (résumé, job) into a 0–100 compatibility score.
//!
//! All backends share [`ScoreResult`] and the [`CompatibilityScorer`] trait, so
//! the engine can dispatch to any of them without knowing which one it holds.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::engine::method::{Method, MethodTag};
use crate::errors::ScoringError;

pub mod jaccard;
pub mod llm_direct;
pub mod semantic;
pub mod skills;
pub mod tfidf;

// ────────────────────────────────────────────────────────────────────────────
// Output data model (shared across all scorer backends)
// ────────────────────────────────────────────────────────────────────────────

/// The result of one scoring call.
#[derive(Debug, Clone, Serialize)]
pub struct ScoreResult {
    /// 0.0 – 100.0, one decimal.
    pub score: f64,
    pub explanation: String,
    pub details: ScoreDetails,
}

/// Method-specific details. `method` is always present; everything else is a
/// free-form field set by the scorer that produced the result.
#[derive(Debug, Clone, Serialize)]
pub struct ScoreDetails {
    pub method: MethodTag,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl ScoreDetails {
    pub fn new(method: MethodTag) -> Self {
        Self {
            method,
            error: None,
            fields: Map::new(),
        }
    }

    /// Adds a field. Values that cannot be represented as JSON become `null`.
    pub fn with(mut self, key: &str, value: impl Serialize) -> Self {
        let value = serde_json::to_value(value).unwrap_or(Value::Null);
        self.fields.insert(key.to_string(), value);
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.fields.get(key).and_then(Value::as_f64)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }
}

impl ScoreResult {
    /// Builds a result, rounding the score to one decimal.
    pub fn new(score: f64, explanation: impl Into<String>, details: ScoreDetails) -> Self {
        Self {
            score: round1(score),
            explanation: explanation.into(),
            details,
        }
    }

    /// Result for a call where either text is empty.
    pub fn empty() -> Self {
        Self::new(0.0, "Empty text", ScoreDetails::new(MethodTag::Empty))
    }

    pub fn method(&self) -> MethodTag {
        self.details.method
    }

    /// Forces the score into `[0, 100]`; NaN becomes 0.
    pub fn clamped(mut self) -> Self {
        self.score = clamp_score(self.score);
        self
    }
}

/// Rounds to one decimal place.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Clamps to `[0, 100]` and rounds to one decimal; NaN becomes 0.
pub fn clamp_score(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    round1(value.clamp(0.0, 100.0))
}

// ────────────────────────────────────────────────────────────────────────────
// Trait definition
// ────────────────────────────────────────────────────────────────────────────

/// A scoring backend. Implement this to add a method without touching the
/// engine's dispatch or fallback code.
///
/// Degradation that the backend can handle itself (LLM down, model missing)
/// comes back as `Ok` with a fallback result; `Err` is reserved for failures
/// the engine must turn into the Jaccard fallback.
#[async_trait]
pub trait CompatibilityScorer: Send + Sync {
    fn method(&self) -> Method;

    async fn score(&self, resume: &str, job: &str) -> Result<ScoreResult, ScoringError>;
}
