//! Sentence embeddings for the semantic scorer.
//!
//! # Architecture
//!
//! - [`SentenceEncoder`] — a loaded model: texts in, one vector per text out.
//! - [`ModelSource`] — hands out the process-wide encoder, loading it on first use.
//! - [`LazyModelLoader`] — the production source. Each model name is loaded at
//!   most once per process behind a single async mutex; a failed load is
//!   retried on the next request, never cached as a failure.
//! - [`NoModel`] — the source used when the semantic family is disabled.
//! - [`cosine_similarity`] — similarity between two vectors.
//!
//! The ONNX backend is `fastembed`, compiled in with the `local-embeddings`
//! feature (on by default). Without it every load reports "unavailable" and the semantic
//! methods degrade to their fallback.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::EmbeddingConfig;

#[cfg(feature = "local-embeddings")]
mod fastembed_backend;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("failed to load embedding model '{model}': {message}")]
    Load { model: String, message: String },

    #[error("encoding failed: {0}")]
    Encode(String),

    #[error("encoder returned {got} vectors for {expected} texts")]
    Shape { expected: usize, got: usize },
}

/// A loaded sentence-embedding model. Encoding is CPU-bound and synchronous;
/// callers run it on the blocking pool.
pub trait SentenceEncoder: Send + Sync {
    fn model_name(&self) -> &str;

    fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;
}

#[async_trait]
pub trait ModelSource: Send + Sync {
    /// Whether a model can be provided at all in this build/configuration.
    /// Does not trigger a load.
    fn is_available(&self) -> bool;

    /// The process-wide encoder, or `None` if it cannot be loaded.
    async fn get_model(&self) -> Option<Arc<dyn SentenceEncoder>>;
}

/// Source for a disabled semantic family.
pub struct NoModel;

#[async_trait]
impl ModelSource for NoModel {
    fn is_available(&self) -> bool {
        false
    }

    async fn get_model(&self) -> Option<Arc<dyn SentenceEncoder>> {
        None
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Lazy process-wide loader
// ────────────────────────────────────────────────────────────────────────────

/// Loaded encoders keyed by model name. One async mutex guards the map and
/// is held for the whole load, so concurrent first requests for a model wait
/// and exactly one of them loads it.
#[derive(Default)]
#[cfg_attr(not(feature = "local-embeddings"), allow(dead_code))]
pub(crate) struct ModelCache {
    models: tokio::sync::Mutex<HashMap<String, Arc<dyn SentenceEncoder>>>,
}

#[cfg_attr(not(feature = "local-embeddings"), allow(dead_code))]
impl ModelCache {
    /// Returns the cached encoder for `name`, running `load` on the blocking
    /// pool if there is none yet. Errors are returned, not cached.
    pub(crate) async fn get_or_load<F>(&self, name: &str, load: F) -> Result<Arc<dyn SentenceEncoder>, EmbeddingError>
    where
        F: FnOnce(String) -> Result<Arc<dyn SentenceEncoder>, EmbeddingError> + Send + 'static,
    {
        let mut models = self.models.lock().await;
        if let Some(model) = models.get(name) {
            return Ok(Arc::clone(model));
        }

        let owned = name.to_string();
        let encoder = tokio::task::spawn_blocking(move || load(owned))
            .await
            .map_err(|e| EmbeddingError::Load {
                model: name.to_string(),
                message: format!("load task failed: {e}"),
            })??;

        models.insert(name.to_string(), Arc::clone(&encoder));
        Ok(encoder)
    }
}

#[cfg(feature = "local-embeddings")]
static MODEL_CACHE: once_cell::sync::Lazy<ModelCache> = once_cell::sync::Lazy::new(ModelCache::default);

/// Loads the configured model on first request and shares it for the rest of
/// the process. Engines configured with different model names get different
/// encoders; engines sharing a name share one.
pub struct LazyModelLoader {
    config: EmbeddingConfig,
}

impl LazyModelLoader {
    pub fn new(config: EmbeddingConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ModelSource for LazyModelLoader {
    fn is_available(&self) -> bool {
        cfg!(feature = "local-embeddings")
    }

    #[cfg(feature = "local-embeddings")]
    async fn get_model(&self) -> Option<Arc<dyn SentenceEncoder>> {
        use tracing::{debug, info, warn};

        let name = self.config.model.trim();
        let loaded = MODEL_CACHE
            .get_or_load(name, |name| {
                info!(model = %name, "Loading embedding model");
                let encoder: Arc<dyn SentenceEncoder> = Arc::new(fastembed_backend::FastEmbedEncoder::load(&name)?);
                info!(model = %name, "Embedding model loaded");
                Ok(encoder)
            })
            .await;

        match loaded {
            Ok(encoder) => {
                debug!(model = %name, "embedding model ready");
                Some(encoder)
            }
            Err(e) => {
                warn!(error = %e, "Embedding model unavailable");
                None
            }
        }
    }

    #[cfg(not(feature = "local-embeddings"))]
    async fn get_model(&self) -> Option<Arc<dyn SentenceEncoder>> {
        tracing::warn!(
            model = %self.config.model,
            "Embedding model unavailable: built without the local-embeddings feature"
        );
        None
    }
}

/// Compute cosine similarity between two embedding vectors.
///
/// Returns a value in `[-1.0, 1.0]`, or `0.0` for empty vectors, vectors of
/// different lengths, or a zero vector.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }
    dot / denom
}
