//! Résumé ↔ job posting compatibility scoring.
//!
//! One facade, [`CompatibilityEngine`], over several interchangeable methods:
//! token Jaccard, TF-IDF (exact, synonym-expanded, hybrid), LLM skill
//! extraction scored by job coverage, a direct LLM score, sentence-embedding
//! similarity, and an `ultra` fusion of whatever is available. Every method
//! degrades on its own; the facade always returns a score in `[0, 100]`.
//!
//! ```no_run
//! # async fn run() {
//! let result = compat_engine::score(
//!     "DevOps Engineer with 5 years in Kubernetes, Docker, AWS.",
//!     "SRE needed for K8s orchestration and cloud infrastructure (AWS).",
//!     Some("tfidf_hybrid"),
//! )
//! .await;
//! println!("{} {}", result.score, result.explanation);
//! # }
//! ```

use once_cell::sync::OnceCell;
use tracing::warn;

pub mod config;
pub mod embedding;
pub mod engine;
pub mod errors;
pub mod llm_client;
pub mod scoring;
pub mod telemetry;
pub mod text;

#[cfg(test)]
pub(crate) mod testing;

pub use config::Config;
pub use engine::method::{Method, MethodCatalog, MethodTag};
pub use engine::CompatibilityEngine;
pub use errors::ScoringError;
pub use scoring::{ScoreDetails, ScoreResult};

static DEFAULT_ENGINE: OnceCell<CompatibilityEngine> = OnceCell::new();

/// Process-wide engine built from the environment on first use.
///
/// A broken environment is logged and replaced with the default
/// configuration, so this never fails.
pub fn default_engine() -> &'static CompatibilityEngine {
    DEFAULT_ENGINE.get_or_init(|| {
        let config = Config::from_env().unwrap_or_else(|e| {
            warn!(error = %e, "Invalid configuration, using defaults");
            Config::default()
        });
        CompatibilityEngine::from_config(config.clone()).unwrap_or_else(|e| {
            warn!(error = %e, "Failed to initialize backends, LLM disabled");
            let mut config = config;
            config.disabled.push(engine::method::MethodFamily::Llm);
            CompatibilityEngine::with_backends(
                config.clone(),
                std::sync::Arc::new(llm_client::DisabledGenerator),
                std::sync::Arc::new(embedding::LazyModelLoader::new(config.embedding)),
            )
        })
    })
}

/// Scores with the [`default_engine`]. `method` defaults to the configured
/// method (normally `auto`).
pub async fn score(resume: &str, job: &str, method: Option<&str>) -> ScoreResult {
    default_engine().score(resume, job, method).await
}
