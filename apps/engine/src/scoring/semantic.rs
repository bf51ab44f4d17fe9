//! Cosine similarity of sentence embeddings.
//!
//! `semantic_hybrid` blends 0.7 × semantic with 0.3 × TF-IDF hybrid: the
//! embedding captures meaning across languages and paraphrase, TF-IDF puts
//! weight back on rare exact terms.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::{jaccard, round1, tfidf, CompatibilityScorer, ScoreDetails, ScoreResult};
use crate::embedding::{cosine_similarity, EmbeddingError, ModelSource};
use crate::engine::method::{Method, MethodTag};
use crate::errors::ScoringError;
use crate::text::truncate_chars;

const HYBRID_SEMANTIC_WEIGHT: f64 = 0.7;
const HYBRID_TFIDF_WEIGHT: f64 = 0.3;

#[derive(Debug, Clone, PartialEq)]
pub struct SemanticOutcome {
    /// 0 – 100, one decimal. Negative cosine counts as 0.
    pub score: f64,
    pub model: String,
    pub embedding_dim: usize,
}

pub struct SemanticScorer {
    source: Arc<dyn ModelSource>,
    max_chars: usize,
    hybrid: bool,
}

impl SemanticScorer {
    pub fn new(source: Arc<dyn ModelSource>, max_chars: usize, hybrid: bool) -> Self {
        Self {
            source,
            max_chars,
            hybrid,
        }
    }

    /// Embedding similarity, or `Ok(None)` when no model can be loaded.
    ///
    /// Encoding runs on the blocking pool; an encoder error or a panicked
    /// encode task comes back as `Err`.
    pub async fn similarity(&self, resume: &str, job: &str) -> Result<Option<SemanticOutcome>, ScoringError> {
        let Some(model) = self.source.get_model().await else {
            return Ok(None);
        };

        let texts = vec![
            truncate_chars(resume, self.max_chars).to_string(),
            truncate_chars(job, self.max_chars).to_string(),
        ];
        let encoder = Arc::clone(&model);
        let vectors = tokio::task::spawn_blocking(move || encoder.encode(&texts)).await??;

        let [resume_vec, job_vec] = vectors.as_slice() else {
            return Err(EmbeddingError::Shape {
                expected: 2,
                got: vectors.len(),
            }
            .into());
        };

        let cosine = f64::from(cosine_similarity(resume_vec, job_vec));
        Ok(Some(SemanticOutcome {
            score: round1(100.0 * cosine.max(0.0)),
            model: model.model_name().to_string(),
            embedding_dim: resume_vec.len(),
        }))
    }
}

#[async_trait]
impl CompatibilityScorer for SemanticScorer {
    fn method(&self) -> Method {
        if self.hybrid {
            Method::SemanticHybrid
        } else {
            Method::Semantic
        }
    }

    async fn score(&self, resume: &str, job: &str) -> Result<ScoreResult, ScoringError> {
        let Some(outcome) = self.similarity(resume, job).await? else {
            warn!(method = %self.method(), "Embedding model unavailable, falling back to Jaccard");
            return Ok(jaccard::fallback(
                resume,
                job,
                &ScoringError::EmbeddingUnavailable.to_string(),
            ));
        };
        debug!(score = outcome.score, model = %outcome.model, "semantic scored");

        if !self.hybrid {
            return Ok(ScoreResult::new(
                outcome.score,
                format!("Semantic similarity: {:.1}% ({})", outcome.score, outcome.model),
                ScoreDetails::new(MethodTag::Semantic)
                    .with("semantic_score", outcome.score)
                    .with("model", &outcome.model)
                    .with("embedding_dim", outcome.embedding_dim),
            ));
        }

        let keyword = tfidf::hybrid(resume, job);
        let final_score = round1(HYBRID_SEMANTIC_WEIGHT * outcome.score + HYBRID_TFIDF_WEIGHT * keyword.score);
        Ok(ScoreResult::new(
            final_score,
            format!(
                "Semantic: {:.1}%, TF-IDF: {:.1}%, Final: {:.1}%",
                outcome.score, keyword.score, final_score
            ),
            ScoreDetails::new(MethodTag::SemanticHybrid)
                .with("semantic_score", outcome.score)
                .with("tfidf_score", keyword.score)
                .with("model", &outcome.model)
                .with("embedding_dim", outcome.embedding_dim),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::{NoModel, SentenceEncoder};
    use crate::testing::{fixtures, ConceptEncoder, FailingEncoder, FixedModel};

    fn scorer(hybrid: bool) -> SemanticScorer {
        SemanticScorer::new(Arc::new(FixedModel::new(ConceptEncoder)), 2000, hybrid)
    }

    #[tokio::test]
    async fn test_same_domain_scores_high() {
        let result = scorer(false)
            .score(fixtures::DEVOPS_RESUME, fixtures::SRE_JOB)
            .await
            .unwrap();
        assert_eq!(result.method(), MethodTag::Semantic);
        assert_eq!(result.score, 100.0);
        assert_eq!(result.details.get_str("model"), Some("concept-axes"));
        assert_eq!(result.details.get_f64("embedding_dim"), Some(5.0));
    }

    #[tokio::test]
    async fn test_wrong_domain_scores_low() {
        let result = scorer(false)
            .score(fixtures::DEVOPS_RESUME, fixtures::DATA_SCIENCE_JOB)
            .await
            .unwrap();
        assert!(result.score <= 35.0, "got {}", result.score);
    }

    #[tokio::test]
    async fn test_hybrid_blends_tfidf() {
        let result = scorer(true)
            .score(fixtures::DEVOPS_RESUME, fixtures::SRE_JOB)
            .await
            .unwrap();

        // 0.7 × 100 + 0.3 × 29.5
        assert_eq!(result.method(), MethodTag::SemanticHybrid);
        assert_eq!(result.details.get_f64("semantic_score"), Some(100.0));
        assert_eq!(result.details.get_f64("tfidf_score"), Some(29.5));
        assert_eq!(result.score, 78.9);
    }

    #[tokio::test]
    async fn test_missing_model_falls_back() {
        for hybrid in [false, true] {
            let scorer = SemanticScorer::new(Arc::new(NoModel), 2000, hybrid);
            let result = scorer.score(fixtures::DEVOPS_RESUME, fixtures::SRE_JOB).await.unwrap();
            assert_eq!(result.method(), MethodTag::Fallback);
            assert_eq!(result.score, 11.8);
        }
    }

    #[tokio::test]
    async fn test_encoder_failure_is_an_error() {
        let scorer = SemanticScorer::new(Arc::new(FixedModel::new(FailingEncoder)), 2000, false);
        let err = scorer
            .score(fixtures::DEVOPS_RESUME, fixtures::SRE_JOB)
            .await
            .unwrap_err();
        assert!(matches!(err, ScoringError::Embedding(_)));
    }

    struct OppositeEncoder;

    impl SentenceEncoder for OppositeEncoder {
        fn model_name(&self) -> &str {
            "opposite"
        }

        fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            Ok(texts
                .iter()
                .enumerate()
                .map(|(i, _)| if i == 0 { vec![1.0, 0.5] } else { vec![-1.0, -0.5] })
                .collect())
        }
    }

    #[tokio::test]
    async fn test_negative_cosine_counts_as_zero() {
        let scorer = SemanticScorer::new(Arc::new(FixedModel::new(OppositeEncoder)), 2000, false);
        let outcome = scorer.similarity("kubernetes", "excel").await.unwrap().unwrap();
        assert_eq!(outcome.score, 0.0);
        assert_eq!(outcome.embedding_dim, 2);
    }

    #[tokio::test]
    async fn test_texts_are_truncated_before_encoding() {
        let long = "k".repeat(5000);
        let scorer = SemanticScorer::new(Arc::new(FixedModel::new(ConceptEncoder)), 10, false);
        assert!(scorer.similarity(&long, &long).await.is_ok());
    }
}
