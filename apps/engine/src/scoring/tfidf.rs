//! TF-IDF cosine similarity over the two-document corpus {résumé, job}.
//!
//! The vectorizer is fitted per call on exactly those two documents:
//! unigrams + bigrams from [`crate::text::analyze`], smoothed idf
//! `ln((1 + n) / (1 + df)) + 1`, raw term counts, l2-normalized rows.
//! Synonym mode runs both texts through [`crate::text::expand`] first so that
//! `K8s` on one side and `Kubernetes` on the other land on shared features.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::jaccard::{self, jaccard};
use super::{round1, CompatibilityScorer, ScoreDetails, ScoreResult};
use crate::engine::method::{Method, MethodTag};
use crate::errors::ScoringError;
use crate::text::{analyze, expand};

const TOP_TERMS: usize = 5;
const HYBRID_SYNONYM_WEIGHT: f64 = 0.6;
const HYBRID_EXACT_WEIGHT: f64 = 0.4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TfidfMode {
    Exact,
    Synonyms,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TfidfOutcome {
    /// 0 – 100, one decimal.
    pub score: f64,
    /// Features with non-zero weight in both documents.
    pub common_terms: usize,
    /// Up to five shared features, strongest first.
    pub top_terms: Vec<String>,
}

/// TF-IDF similarity of `resume` and `job`.
///
/// Returns `ScoringError::Vectorizer` when the combined vocabulary is empty
/// (both texts are stopwords or punctuation only).
pub fn similarity(resume: &str, job: &str, mode: TfidfMode) -> Result<TfidfOutcome, ScoringError> {
    let (resume_doc, job_doc) = match mode {
        TfidfMode::Exact => (resume.to_string(), job.to_string()),
        TfidfMode::Synonyms => (expand(resume), expand(job)),
    };

    let resume_counts = term_counts(&analyze(&resume_doc));
    let job_counts = term_counts(&analyze(&job_doc));

    if resume_counts.is_empty() && job_counts.is_empty() {
        return Err(ScoringError::Vectorizer(
            "empty vocabulary; the documents only contain stop words".to_string(),
        ));
    }

    let resume_vec = weigh(&resume_counts, &job_counts);
    let job_vec = weigh(&job_counts, &resume_counts);

    let mut shared: Vec<(&str, f64)> = resume_vec
        .iter()
        .filter_map(|(term, w_r)| job_vec.get(term).map(|w_j| (term.as_str(), (w_r * w_j).sqrt())))
        .collect();

    let cosine: f64 = resume_vec
        .iter()
        .filter_map(|(term, w_r)| job_vec.get(term).map(|w_j| w_r * w_j))
        .sum();

    shared.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.0.cmp(b.0))
    });

    Ok(TfidfOutcome {
        score: round1((100.0 * cosine).clamp(0.0, 100.0)),
        common_terms: shared.len(),
        top_terms: shared
            .iter()
            .take(TOP_TERMS)
            .map(|(term, _)| term.to_string())
            .collect(),
    })
}

fn term_counts(features: &[String]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for feature in features {
        *counts.entry(feature.clone()).or_insert(0) += 1;
    }
    counts
}

/// tf × idf for one document, l2-normalized. `other` is the second document
/// of the corpus, needed for document frequency. An all-zero row stays empty.
fn weigh(doc: &BTreeMap<String, usize>, other: &BTreeMap<String, usize>) -> BTreeMap<String, f64> {
    const N_DOCS: f64 = 2.0;

    let weights: BTreeMap<String, f64> = doc
        .iter()
        .map(|(term, &count)| {
            let df = if other.contains_key(term) { 2.0 } else { 1.0 };
            let idf = ((1.0 + N_DOCS) / (1.0 + df)).ln() + 1.0;
            (term.clone(), count as f64 * idf)
        })
        .collect();

    let norm = weights.values().map(|w| w * w).sum::<f64>().sqrt();
    if norm == 0.0 {
        return BTreeMap::new();
    }
    weights.into_iter().map(|(t, w)| (t, w / norm)).collect()
}

/// Scores with exact TF-IDF; Jaccard stands in if vectorizing fails.
pub fn exact_or_jaccard(resume: &str, job: &str) -> f64 {
    similarity(resume, job, TfidfMode::Exact)
        .map(|o| o.score)
        .unwrap_or_else(|_| jaccard(resume, job).score)
}

#[derive(Debug, Clone, PartialEq)]
pub struct HybridOutcome {
    pub score: f64,
    pub score_with_synonyms: f64,
    pub score_exact: f64,
    pub top_terms: Vec<String>,
}

/// 0.6 × synonym-expanded + 0.4 × exact. Either half that cannot be
/// vectorized is replaced with the Jaccard score.
pub fn hybrid(resume: &str, job: &str) -> HybridOutcome {
    let (score_with_synonyms, top_terms) = match similarity(resume, job, TfidfMode::Synonyms) {
        Ok(outcome) => (outcome.score, outcome.top_terms),
        Err(e) => {
            warn!(error = %e, "TF-IDF with synonyms failed, using Jaccard for that half");
            (jaccard(resume, job).score, Vec::new())
        }
    };
    let score_exact = exact_or_jaccard(resume, job);

    HybridOutcome {
        score: round1(HYBRID_SYNONYM_WEIGHT * score_with_synonyms + HYBRID_EXACT_WEIGHT * score_exact),
        score_with_synonyms,
        score_exact,
        top_terms,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Scorer
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TfidfVariant {
    Exact,
    Synonyms,
    Hybrid,
}

pub struct TfidfScorer {
    pub variant: TfidfVariant,
}

impl TfidfScorer {
    pub fn new(variant: TfidfVariant) -> Self {
        Self { variant }
    }

    fn single(&self, resume: &str, job: &str, mode: TfidfMode) -> ScoreResult {
        let (tag, label) = match mode {
            TfidfMode::Exact => (MethodTag::Tfidf, "TF-IDF"),
            TfidfMode::Synonyms => (MethodTag::TfidfSynonyms, "TF-IDF with synonyms"),
        };

        match similarity(resume, job, mode) {
            Ok(outcome) => ScoreResult::new(
                outcome.score,
                format!(
                    "{label}: {:.1}% similarity, {} shared terms",
                    outcome.score, outcome.common_terms
                ),
                ScoreDetails::new(tag)
                    .with("tfidf_score", outcome.score)
                    .with("common_terms", outcome.common_terms)
                    .with("top_terms", &outcome.top_terms)
                    .with("synonym_expansion", mode == TfidfMode::Synonyms),
            ),
            Err(e) => {
                warn!(error = %e, "{} failed, falling back to Jaccard", label);
                jaccard::fallback(resume, job, &e.to_string())
            }
        }
    }
}

#[async_trait]
impl CompatibilityScorer for TfidfScorer {
    fn method(&self) -> Method {
        match self.variant {
            TfidfVariant::Exact => Method::Tfidf,
            TfidfVariant::Synonyms => Method::TfidfSynonyms,
            TfidfVariant::Hybrid => Method::TfidfHybrid,
        }
    }

    async fn score(&self, resume: &str, job: &str) -> Result<ScoreResult, ScoringError> {
        let result = match self.variant {
            TfidfVariant::Exact => self.single(resume, job, TfidfMode::Exact),
            TfidfVariant::Synonyms => self.single(resume, job, TfidfMode::Synonyms),
            TfidfVariant::Hybrid => {
                let outcome = hybrid(resume, job);
                ScoreResult::new(
                    outcome.score,
                    format!(
                        "TF-IDF hybrid: {:.1}% (with synonyms {:.1}%, exact {:.1}%)",
                        outcome.score, outcome.score_with_synonyms, outcome.score_exact
                    ),
                    ScoreDetails::new(MethodTag::TfidfHybrid)
                        .with("score_with_synonyms", outcome.score_with_synonyms)
                        .with("score_exact", outcome.score_exact)
                        .with("top_terms", &outcome.top_terms),
                )
            }
        };
        debug!(method = %self.method(), score = result.score, "tfidf scored");
        Ok(result)
    }
}
