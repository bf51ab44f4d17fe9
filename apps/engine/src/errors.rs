use thiserror::Error;

use crate::embedding::EmbeddingError;

/// Failure of a single scorer.
///
/// Scorers return `Result<ScoreResult, ScoringError>`; the engine never lets one
/// escape. Every variant is turned into a Jaccard fallback result carrying the
/// message in `details.error`.
#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("TF-IDF vectorizer failed: {0}")]
    Vectorizer(String),

    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Embedding model unavailable")]
    EmbeddingUnavailable,

    #[error("LLM unavailable: {0}")]
    LlmUnavailable(String),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl ScoringError {
    /// Short machine-oriented label, used in logs next to the full message.
    pub fn kind(&self) -> &'static str {
        match self {
            ScoringError::Vectorizer(_) => "vectorizer",
            ScoringError::Embedding(_) => "embedding",
            ScoringError::EmbeddingUnavailable => "embedding_unavailable",
            ScoringError::LlmUnavailable(_) => "llm_unavailable",
            ScoringError::Task(_) => "task",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_cause() {
        let err = ScoringError::Vectorizer("empty vocabulary".to_string());
        assert_eq!(err.to_string(), "TF-IDF vectorizer failed: empty vocabulary");
        assert_eq!(err.kind(), "vectorizer");
    }

    #[test]
    fn test_embedding_error_converts() {
        let err: ScoringError = EmbeddingError::Shape { expected: 2, got: 1 }.into();
        assert_eq!(err.kind(), "embedding");
        assert!(err.to_string().contains("1 vectors for 2 texts"));
    }
}
