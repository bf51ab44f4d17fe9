//! Jaccard token-set overlap. The baseline every other method degrades to.

use async_trait::async_trait;
use tracing::debug;

use super::{round1, CompatibilityScorer, ScoreDetails, ScoreResult};
use crate::engine::method::{Method, MethodTag};
use crate::errors::ScoringError;
use crate::text::tokenize;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JaccardOutcome {
    /// 0 – 100, one decimal.
    pub score: f64,
    pub common_tokens: usize,
    pub total_tokens: usize,
}

/// Pure Jaccard similarity over [`tokenize`] sets.
///
/// score = 100 × |R ∩ J| / |R ∪ J|, or 0 when either set is empty.
/// Symmetric, and 100 for any text scored against itself.
pub fn jaccard(resume: &str, job: &str) -> JaccardOutcome {
    let r = tokenize(resume);
    let j = tokenize(job);

    if r.is_empty() || j.is_empty() {
        return JaccardOutcome {
            score: 0.0,
            common_tokens: 0,
            total_tokens: r.len().max(j.len()),
        };
    }

    let common = r.intersection(&j).count();
    let total = r.len() + j.len() - common;

    JaccardOutcome {
        score: round1(100.0 * common as f64 / total as f64),
        common_tokens: common,
        total_tokens: total,
    }
}

/// Jaccard result reported as the degraded path of another method.
///
/// `reason` ends up in `details.error` so callers can see why the requested
/// method did not run.
pub fn fallback(resume: &str, job: &str, reason: &str) -> ScoreResult {
    let outcome = jaccard(resume, job);
    ScoreResult::new(
        outcome.score,
        format!("Fallback (Jaccard): {:.1}% token overlap", outcome.score),
        ScoreDetails::new(MethodTag::Fallback)
            .with_error(reason)
            .with("common_tokens", outcome.common_tokens)
            .with("total_tokens", outcome.total_tokens),
    )
}

pub struct JaccardScorer;

#[async_trait]
impl CompatibilityScorer for JaccardScorer {
    fn method(&self) -> Method {
        Method::Jaccard
    }

    async fn score(&self, resume: &str, job: &str) -> Result<ScoreResult, ScoringError> {
        let outcome = jaccard(resume, job);
        debug!(score = outcome.score, "jaccard scored");

        Ok(ScoreResult::new(
            outcome.score,
            format!(
                "Jaccard: {} of {} distinct terms in common ({:.1}%)",
                outcome.common_tokens, outcome.total_tokens, outcome.score
            ),
            ScoreDetails::new(MethodTag::Jaccard)
                .with("common_tokens", outcome.common_tokens)
                .with("total_tokens", outcome.total_tokens),
        ))
    }
}
