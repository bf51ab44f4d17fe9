//! The compatibility facade: one entry point over every scoring method.
//!
//! # Architecture
//!
//! - [`CompatibilityEngine::score`] takes the method by name, replaces unknown
//!   names with `auto` and never fails.
//! - [`CompatibilityEngine::score_with`] dispatches a parsed [`Method`]:
//!   `auto` is resolved against the live catalog, `ultra` fuses every
//!   available family, everything else goes to its [`CompatibilityScorer`].
//! - A scorer `Err` becomes the Jaccard fallback with the error recorded in
//!   `details.error`; every result is clamped to `[0, 100]` on the way out.

use std::sync::Arc;

use anyhow::Context;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::embedding::{LazyModelLoader, ModelSource, NoModel};
use crate::llm_client::{DisabledGenerator, LlmClient, TextGenerator};
use crate::scoring::jaccard::{self, jaccard, JaccardScorer};
use crate::scoring::llm_direct::LlmDirectScorer;
use crate::scoring::semantic::SemanticScorer;
use crate::scoring::skills::SkillsScorer;
use crate::scoring::tfidf::{self, TfidfScorer, TfidfVariant};
use crate::scoring::{CompatibilityScorer, ScoreDetails, ScoreResult};

pub mod fusion;
pub mod method;

use fusion::{fuse, FusionComponent};
use method::{Method, MethodCatalog, MethodFamily, MethodTag};

/// Which LLM method fed the `llm` component of an `ultra` fusion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LlmSource {
    Skills,
    Direct,
}

impl LlmSource {
    fn as_str(&self) -> &'static str {
        match self {
            LlmSource::Skills => "llm_skills",
            LlmSource::Direct => "llm",
        }
    }
}

pub struct CompatibilityEngine {
    config: Config,
    generator: Arc<dyn TextGenerator>,
    models: Arc<dyn ModelSource>,
    tfidf: TfidfScorer,
    tfidf_synonyms: TfidfScorer,
    tfidf_hybrid: TfidfScorer,
    skills: SkillsScorer,
    llm: LlmDirectScorer,
    llm_hybrid: LlmDirectScorer,
    semantic: SemanticScorer,
    semantic_hybrid: SemanticScorer,
}

impl CompatibilityEngine {
    /// Production wiring: the Ollama client and the lazy embedding loader,
    /// or their disabled stand-ins for families switched off in `config`.
    pub fn from_config(config: Config) -> anyhow::Result<Self> {
        let generator: Arc<dyn TextGenerator> = if config.is_disabled(MethodFamily::Llm) {
            Arc::new(DisabledGenerator)
        } else {
            Arc::new(LlmClient::new(config.llm.clone()).context("Failed to build LLM client")?)
        };
        let models: Arc<dyn ModelSource> = if config.is_disabled(MethodFamily::Semantic) {
            Arc::new(NoModel)
        } else {
            Arc::new(LazyModelLoader::new(config.embedding.clone()))
        };

        info!(
            llm = generator.name(),
            embedding_model = %config.embedding.model,
            disabled = ?config.disabled,
            "Compatibility engine initialized"
        );
        Ok(Self::with_backends(config, generator, models))
    }

    /// Wires the engine over explicit backends.
    pub fn with_backends(config: Config, generator: Arc<dyn TextGenerator>, models: Arc<dyn ModelSource>) -> Self {
        let llm_config = config.llm.clone();
        let embedding_chars = config.embedding.max_chars;

        Self {
            tfidf: TfidfScorer::new(TfidfVariant::Exact),
            tfidf_synonyms: TfidfScorer::new(TfidfVariant::Synonyms),
            tfidf_hybrid: TfidfScorer::new(TfidfVariant::Hybrid),
            skills: SkillsScorer::new(Arc::clone(&generator), llm_config.max_chars),
            llm: LlmDirectScorer::new(Arc::clone(&generator), llm_config.clone(), false),
            llm_hybrid: LlmDirectScorer::new(Arc::clone(&generator), llm_config, true),
            semantic: SemanticScorer::new(Arc::clone(&models), embedding_chars, false),
            semantic_hybrid: SemanticScorer::new(Arc::clone(&models), embedding_chars, true),
            config,
            generator,
            models,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Scores `resume` against `job`.
    ///
    /// `method` is a name from the catalog; `None` uses the configured
    /// default and an unknown name is replaced with `auto`. Never fails: the
    /// score is always in `[0, 100]` and `details.method` is always set.
    pub async fn score(&self, resume: &str, job: &str, method: Option<&str>) -> ScoreResult {
        let method = match method {
            None => self.config.default_method,
            Some(name) => name.parse().unwrap_or_else(|e| {
                warn!(error = %e, "Unknown method requested, using auto");
                Method::Auto
            }),
        };
        self.score_with(resume, job, method).await
    }

    pub async fn score_with(&self, resume: &str, job: &str, method: Method) -> ScoreResult {
        if resume.trim().is_empty() || job.trim().is_empty() {
            return ScoreResult::empty();
        }

        let method = match method {
            Method::Auto => {
                let resolved = self.resolve_auto().await;
                info!(method = %resolved, "Resolved auto method");
                resolved
            }
            other => other,
        };

        let result = match method {
            Method::Ultra => self.ultra(resume, job).await,
            other => self.dispatch(other, resume, job).await,
        };
        debug!(method = %result.method(), score = result.score, "compatibility scored");
        result.clamped()
    }

    /// Every method with its description and whether it can run right now.
    /// Probes the LLM server.
    pub async fn catalog(&self) -> MethodCatalog {
        let llm_up = self.llm_available().await;
        MethodCatalog::from_availability(|family| match family {
            MethodFamily::Semantic => self.semantic_available(),
            MethodFamily::Llm => llm_up,
            MethodFamily::Tfidf => self.tfidf_available(),
        })
    }

    /// First available of `semantic_hybrid`, `llm_hybrid`, `tfidf_hybrid`,
    /// `jaccard`.
    pub async fn resolve_auto(&self) -> Method {
        if self.semantic_available() && self.tfidf_available() {
            return Method::SemanticHybrid;
        }
        if self.llm_available().await {
            return Method::LlmHybrid;
        }
        if self.tfidf_available() {
            return Method::TfidfHybrid;
        }
        Method::Jaccard
    }

    // ────────────────────────────────────────────────────────────────────────
    // Availability
    // ────────────────────────────────────────────────────────────────────────

    fn semantic_available(&self) -> bool {
        !self.config.is_disabled(MethodFamily::Semantic) && self.models.is_available()
    }

    fn tfidf_available(&self) -> bool {
        !self.config.is_disabled(MethodFamily::Tfidf)
    }

    async fn llm_available(&self) -> bool {
        !self.config.is_disabled(MethodFamily::Llm) && self.generator.is_reachable().await
    }

    // ────────────────────────────────────────────────────────────────────────
    // Dispatch
    // ────────────────────────────────────────────────────────────────────────

    fn scorer(&self, method: Method) -> Option<&dyn CompatibilityScorer> {
        let scorer: &dyn CompatibilityScorer = match method {
            Method::Jaccard => &JaccardScorer,
            Method::Tfidf => &self.tfidf,
            Method::TfidfSynonyms => &self.tfidf_synonyms,
            Method::TfidfHybrid => &self.tfidf_hybrid,
            Method::LlmSkills => &self.skills,
            Method::Llm => &self.llm,
            Method::LlmHybrid => &self.llm_hybrid,
            Method::Semantic => &self.semantic,
            Method::SemanticHybrid => &self.semantic_hybrid,
            Method::Auto | Method::Ultra => return None,
        };
        Some(scorer)
    }

    async fn dispatch(&self, method: Method, resume: &str, job: &str) -> ScoreResult {
        let Some(scorer) = self.scorer(method) else {
            return jaccard::fallback(resume, job, &format!("method '{method}' has no scorer"));
        };

        match scorer.score(resume, job).await {
            Ok(result) => result,
            Err(e) => {
                warn!(method = %method, kind = e.kind(), error = %e, "Scorer failed, falling back to Jaccard");
                jaccard::fallback(resume, job, &e.to_string())
            }
        }
    }

    // ────────────────────────────────────────────────────────────────────────
    // Ultra
    // ────────────────────────────────────────────────────────────────────────

    /// Runs every available family and fuses the scores with renormalized
    /// weights. Jaccard always takes part; a family that is disabled or fails
    /// is left out rather than counted as zero.
    async fn ultra(&self, resume: &str, job: &str) -> ScoreResult {
        let keyword = jaccard(resume, job);
        let mut components = vec![(FusionComponent::Jaccard, keyword.score)];

        if self.tfidf_available() {
            components.push((FusionComponent::Tfidf, tfidf::hybrid(resume, job).score));
        }

        let (llm, semantic) = tokio::join!(
            self.ultra_llm(resume, job, keyword.score),
            self.ultra_semantic(resume, job)
        );
        if let Some((_, score)) = llm {
            components.push((FusionComponent::Llm, score));
        }
        if let Some(score) = semantic {
            components.push((FusionComponent::Semantic, score));
        }

        let fusion = fuse(&components, &self.config.fusion_weights);
        let breakdown = fusion
            .components
            .iter()
            .map(|(name, score)| format!("{name} {score:.1}%"))
            .collect::<Vec<_>>()
            .join(", ");

        let mut details = ScoreDetails::new(MethodTag::Ultra)
            .with("final_score", fusion.score)
            .with("component_scores", &fusion.components)
            .with("weights", &fusion.weights);
        if let Some((source, _)) = llm {
            details = details.with("llm_source", source.as_str());
        }

        ScoreResult::new(fusion.score, format!("Ultra: {:.1}% ({breakdown})", fusion.score), details)
    }

    /// LLM-Skills if the model actually extracted something, else the direct
    /// score, else nothing.
    async fn ultra_llm(&self, resume: &str, job: &str, jaccard_score: f64) -> Option<(LlmSource, f64)> {
        if !self.llm_available().await {
            return None;
        }

        let skills = self.skills.evaluate(resume, job).await;
        if skills.used_llm() {
            return Some((LlmSource::Skills, skills.matched.score));
        }

        let temperature = self.llm.temperature_for(jaccard_score);
        match self.llm.direct(resume, job, temperature).await {
            Ok(outcome) => Some((LlmSource::Direct, outcome.score)),
            Err(e) => {
                warn!(error = %e, "No LLM component for ultra");
                None
            }
        }
    }

    async fn ultra_semantic(&self, resume: &str, job: &str) -> Option<f64> {
        if !self.semantic_available() {
            return None;
        }
        match self.semantic.similarity(resume, job).await {
            Ok(Some(outcome)) => Some(outcome.score),
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "No semantic component for ultra");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fixtures, ConceptEncoder, FailingEncoder, FixedModel, ScriptedGenerator};

    fn full_engine() -> CompatibilityEngine {
        engine_with(Config::default())
    }

    fn engine_with(config: Config) -> CompatibilityEngine {
        CompatibilityEngine::with_backends(
            config,
            Arc::new(ScriptedGenerator::skills()),
            Arc::new(FixedModel::new(ConceptEncoder)),
        )
    }

    fn bare_engine() -> CompatibilityEngine {
        CompatibilityEngine::with_backends(Config::default(), Arc::new(DisabledGenerator), Arc::new(NoModel))
    }

    fn disabling(families: &[MethodFamily]) -> Config {
        Config {
            disabled: families.to_vec(),
            ..Config::default()
        }
    }

    async fn score(engine: &CompatibilityEngine, resume: &str, job: &str, method: &str) -> ScoreResult {
        engine.score(resume, job, Some(method)).await
    }

    // ── End-to-end scenarios ────────────────────────────────────────────────

    #[tokio::test]
    async fn test_strong_devops_match() {
        let engine = full_engine();
        let (r, j) = (fixtures::DEVOPS_RESUME, fixtures::SRE_JOB);

        let exact = score(&engine, r, j, "tfidf").await;
        let synonyms = score(&engine, r, j, "tfidf_synonyms").await;
        assert!(synonyms.score - exact.score >= 5.0);

        let skills = score(&engine, r, j, "llm_skills").await;
        assert_eq!(skills.method(), MethodTag::LlmSkills);
        assert!(skills.score >= 65.0);

        let semantic_hybrid = score(&engine, r, j, "semantic_hybrid").await;
        assert_eq!(semantic_hybrid.method(), MethodTag::SemanticHybrid);
        assert!(semantic_hybrid.score >= 50.0);

        let ultra = score(&engine, r, j, "ultra").await;
        assert_eq!(ultra.method(), MethodTag::Ultra);
        assert_eq!(ultra.score, 71.8);
        assert!(ultra.score >= 60.0);
        assert_eq!(ultra.details.get_str("llm_source"), Some("llm_skills"));
    }

    #[tokio::test]
    async fn test_wrong_domain_same_keyword() {
        let engine = full_engine();
        let (r, j) = (fixtures::DEVOPS_RESUME, fixtures::DATA_SCIENCE_JOB);

        assert!(score(&engine, r, j, "jaccard").await.score > 0.0);
        assert!(score(&engine, r, j, "llm_skills").await.score <= 25.0);
        assert!(score(&engine, r, j, "semantic").await.score <= 35.0);
        assert!(score(&engine, r, j, "ultra").await.score < 40.0);
    }

    #[tokio::test]
    async fn test_synonym_recognition() {
        let engine = full_engine();
        let (r, j) = (fixtures::SYNONYM_RESUME, fixtures::SYNONYM_JOB);

        let exact = score(&engine, r, j, "tfidf").await.score;
        let synonyms = score(&engine, r, j, "tfidf_synonyms").await.score;
        assert!(exact < 30.0);
        assert!(synonyms >= 50.0);
        assert!(synonyms - exact >= 20.0);
    }

    #[tokio::test]
    async fn test_empty_input() {
        let engine = full_engine();
        for (r, j) in [("", "anything"), ("anything", "   "), ("\n\t", "")] {
            let result = engine.score(r, j, None).await;
            assert_eq!(result.score, 0.0);
            assert_eq!(result.explanation, "Empty text");
            assert_eq!(result.method(), MethodTag::Empty);
        }
    }

    #[tokio::test]
    async fn test_self_match_under_jaccard() {
        let engine = full_engine();
        let text = "Kubernetes Docker AWS";
        let result = score(&engine, text, text, "jaccard").await;
        assert_eq!(result.score, 100.0);
        assert_eq!(result.method(), MethodTag::Jaccard);
    }

    #[tokio::test]
    async fn test_llm_unreachable_still_scores() {
        let engine = bare_engine();
        let result = score(&engine, fixtures::DEVOPS_RESUME, fixtures::SRE_JOB, "llm_skills").await;
        assert!(matches!(result.method(), MethodTag::LlmSkills | MethodTag::Fallback));
        assert!(result.score.is_finite());
        assert!((0.0..=100.0).contains(&result.score));
    }

    // ── Facade behavior ─────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_unknown_method_becomes_auto() {
        let engine = bare_engine();
        let result = score(&engine, fixtures::DEVOPS_RESUME, fixtures::SRE_JOB, "bert").await;
        assert_eq!(result.method(), MethodTag::TfidfHybrid);
        assert_eq!(result.score, 29.5);
    }

    #[tokio::test]
    async fn test_default_method_comes_from_config() {
        let config = Config {
            default_method: Method::Jaccard,
            ..Config::default()
        };
        let engine = engine_with(config);
        let result = engine.score(fixtures::DEVOPS_RESUME, fixtures::SRE_JOB, None).await;
        assert_eq!(result.method(), MethodTag::Jaccard);
    }

    #[tokio::test]
    async fn test_auto_resolution_order() {
        assert_eq!(full_engine().resolve_auto().await, Method::SemanticHybrid);

        let llm_only =
            CompatibilityEngine::with_backends(Config::default(), Arc::new(ScriptedGenerator::skills()), Arc::new(NoModel));
        assert_eq!(llm_only.resolve_auto().await, Method::LlmHybrid);

        let unreachable = CompatibilityEngine::with_backends(
            Config::default(),
            Arc::new(ScriptedGenerator::skills().unreachable()),
            Arc::new(NoModel),
        );
        assert_eq!(unreachable.resolve_auto().await, Method::TfidfHybrid);

        let nothing = engine_with(disabling(&[MethodFamily::Semantic, MethodFamily::Llm, MethodFamily::Tfidf]));
        assert_eq!(nothing.resolve_auto().await, Method::Jaccard);

        // semantic_hybrid needs TF-IDF too
        let no_tfidf = engine_with(disabling(&[MethodFamily::Tfidf]));
        assert_eq!(no_tfidf.resolve_auto().await, Method::LlmHybrid);
    }

    #[tokio::test]
    async fn test_catalog_reflects_availability() {
        let catalog = full_engine().catalog().await;
        assert_eq!(catalog.methods.len(), Method::ALL.len());
        assert!(Method::ALL.iter().all(|m| catalog.is_available(*m)));
        assert!(catalog.methods.iter().all(|info| !info.description.is_empty()));

        let catalog = bare_engine().catalog().await;
        assert!(catalog.is_available(Method::Jaccard));
        assert!(catalog.is_available(Method::TfidfHybrid));
        assert!(!catalog.is_available(Method::LlmSkills));
        assert!(!catalog.is_available(Method::Semantic));
    }

    #[tokio::test]
    async fn test_unavailable_method_is_still_dispatched() {
        let engine = bare_engine();
        let result = score(&engine, fixtures::DEVOPS_RESUME, fixtures::SRE_JOB, "semantic").await;
        assert_eq!(result.method(), MethodTag::Fallback);
        assert!(result.details.error.is_some());
    }

    #[tokio::test]
    async fn test_embedding_failure_falls_back_with_error() {
        let engine = CompatibilityEngine::with_backends(
            Config::default(),
            Arc::new(ScriptedGenerator::skills()),
            Arc::new(FixedModel::new(FailingEncoder)),
        );
        let result = score(&engine, fixtures::DEVOPS_RESUME, fixtures::SRE_JOB, "semantic").await;
        assert_eq!(result.method(), MethodTag::Fallback);
        assert!(result
            .details
            .error
            .as_deref()
            .is_some_and(|e| e.contains("onnx session crashed")));
        assert_eq!(result.score, 11.8);

        let ultra = score(&engine, fixtures::DEVOPS_RESUME, fixtures::SRE_JOB, "ultra").await;
        assert_eq!(ultra.method(), MethodTag::Ultra);
        assert!(ultra.details.get("component_scores").and_then(|c| c.get("semantic")).is_none());
    }

    // ── Ultra fusion ────────────────────────────────────────────────────────

    fn assert_weighted_average(result: &ScoreResult) {
        let components = result.details.get("component_scores").and_then(|v| v.as_object()).unwrap();
        let weights = result.details.get("weights").and_then(|v| v.as_object()).unwrap();
        assert_eq!(components.len(), weights.len());

        let weight_sum: f64 = weights.values().filter_map(|w| w.as_f64()).sum();
        assert!((weight_sum - 1.0).abs() < 1e-9);

        let expected: f64 = components
            .iter()
            .map(|(name, score)| score.as_f64().unwrap() * weights[name].as_f64().unwrap())
            .sum();
        assert!((result.score - expected).abs() <= 0.05 + 1e-9, "{} vs {expected}", result.score);
    }

    #[tokio::test]
    async fn test_ultra_renormalizes_over_any_subset() {
        let subsets: [&[MethodFamily]; 5] = [
            &[],
            &[MethodFamily::Semantic],
            &[MethodFamily::Llm],
            &[MethodFamily::Semantic, MethodFamily::Llm],
            &[MethodFamily::Semantic, MethodFamily::Llm, MethodFamily::Tfidf],
        ];

        for disabled in subsets {
            let engine = engine_with(disabling(disabled));
            let result = score(&engine, fixtures::DEVOPS_RESUME, fixtures::SRE_JOB, "ultra").await;
            assert_eq!(result.method(), MethodTag::Ultra);
            assert_weighted_average(&result);

            let components = result.details.get("component_scores").unwrap();
            assert_eq!(components.as_object().unwrap().len(), 4 - disabled.len());
            assert!(components.get("jaccard").is_some());
        }
    }

    #[tokio::test]
    async fn test_ultra_keyword_only_weights() {
        let engine = engine_with(disabling(&[MethodFamily::Semantic, MethodFamily::Llm]));
        let result = score(&engine, fixtures::DEVOPS_RESUME, fixtures::SRE_JOB, "ultra").await;

        let weights = result.details.get("weights").unwrap();
        assert!((weights["tfidf"].as_f64().unwrap() - 2.0 / 3.0).abs() < 1e-9);
        assert!((weights["jaccard"].as_f64().unwrap() - 1.0 / 3.0).abs() < 1e-9);
        // (2 × 29.5 + 11.8) / 3
        assert_eq!(result.score, 23.6);
        assert!(result.details.get("llm_source").is_none());
    }

    #[tokio::test]
    async fn test_ultra_uses_direct_score_when_extraction_fell_back() {
        let engine =
            CompatibilityEngine::with_backends(Config::default(), Arc::new(ScriptedGenerator::direct()), Arc::new(NoModel));
        let result = score(&engine, fixtures::DEVOPS_RESUME, fixtures::SRE_JOB, "ultra").await;

        assert_eq!(result.details.get_str("llm_source"), Some("llm"));
        let components = result.details.get("component_scores").unwrap();
        assert_eq!(components["llm"].as_f64(), Some(80.0));
        assert_weighted_average(&result);
    }

    #[tokio::test]
    async fn test_ultra_honors_configured_weights() {
        let config = Config {
            fusion_weights: fusion::FusionWeights {
                semantic: 0.0,
                llm: 0.0,
                tfidf: 0.0,
                jaccard: 1.0,
            },
            ..Config::default()
        };
        let result = score(&engine_with(config), fixtures::DEVOPS_RESUME, fixtures::SRE_JOB, "ultra").await;
        assert_eq!(result.score, 11.8);
    }

    // ── Boundaries ──────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_boundary_lengths_for_every_method() {
        let engine = full_engine();
        let cap = engine.config().llm.max_chars;
        let texts = [
            "k".to_string(),
            "kubernetes ".repeat(cap / 11 + 1).chars().take(cap).collect::<String>(),
            "docker ".repeat(cap / 7 + 2).chars().take(cap + 1).collect::<String>(),
            "python ".repeat(1000),
        ];

        for method in Method::ALL {
            for text in &texts {
                let result = engine.score_with(text, fixtures::SRE_JOB, method).await;
                assert!(
                    (0.0..=100.0).contains(&result.score),
                    "{method} gave {} for a {}-char text",
                    result.score,
                    text.chars().count()
                );
            }
        }
    }

    #[tokio::test]
    async fn test_stopword_only_inputs() {
        let engine = bare_engine();
        let stop = "the and of de para com";
        assert_eq!(score(&engine, stop, fixtures::SRE_JOB, "jaccard").await.score, 0.0);

        let tfidf = score(&engine, stop, stop, "tfidf").await;
        assert_eq!(tfidf.score, 0.0);
        assert_eq!(tfidf.method(), MethodTag::Fallback);

        let skills = score(&engine, fixtures::DEVOPS_RESUME, stop, "llm_skills").await;
        assert_eq!(skills.score, 0.0);
    }

    #[tokio::test]
    async fn test_from_config_with_everything_disabled() {
        let engine =
            CompatibilityEngine::from_config(disabling(&[MethodFamily::Semantic, MethodFamily::Llm])).unwrap();
        let result = engine.score(fixtures::DEVOPS_RESUME, fixtures::SRE_JOB, None).await;
        assert_eq!(result.method(), MethodTag::TfidfHybrid);
    }
}
