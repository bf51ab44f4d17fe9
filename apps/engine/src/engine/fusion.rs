//! Weighted fusion for the `ultra` method.

use std::collections::BTreeMap;

use anyhow::{bail, Context, Result};
use serde::Serialize;

use crate::scoring::round1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FusionComponent {
    Semantic,
    Llm,
    Tfidf,
    Jaccard,
}

impl FusionComponent {
    pub fn as_str(&self) -> &'static str {
        match self {
            FusionComponent::Semantic => "semantic",
            FusionComponent::Llm => "llm",
            FusionComponent::Tfidf => "tfidf",
            FusionComponent::Jaccard => "jaccard",
        }
    }
}

/// Base weights before renormalization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusionWeights {
    pub semantic: f64,
    pub llm: f64,
    pub tfidf: f64,
    pub jaccard: f64,
}

impl Default for FusionWeights {
    fn default() -> Self {
        Self {
            semantic: 0.40,
            llm: 0.30,
            tfidf: 0.20,
            jaccard: 0.10,
        }
    }
}

impl FusionWeights {
    pub fn base(&self, component: FusionComponent) -> f64 {
        match component {
            FusionComponent::Semantic => self.semantic,
            FusionComponent::Llm => self.llm,
            FusionComponent::Tfidf => self.tfidf,
            FusionComponent::Jaccard => self.jaccard,
        }
    }

    /// Parses `semantic,llm,tfidf,jaccard`. Weights must be finite and
    /// non-negative, and at least one must be positive. They need not sum
    /// to one.
    pub fn parse(raw: &str) -> Result<Self> {
        let values = raw
            .split(',')
            .map(|part| {
                part.trim()
                    .parse::<f64>()
                    .with_context(|| format!("invalid weight '{}'", part.trim()))
            })
            .collect::<Result<Vec<f64>>>()?;

        let &[semantic, llm, tfidf, jaccard] = values.as_slice() else {
            bail!("expected 4 comma-separated weights, got {}", values.len());
        };
        if values.iter().any(|w| !w.is_finite() || *w < 0.0) {
            bail!("weights must be finite and non-negative");
        }
        if values.iter().all(|w| *w == 0.0) {
            bail!("at least one weight must be positive");
        }

        Ok(Self {
            semantic,
            llm,
            tfidf,
            jaccard,
        })
    }
}

/// Result of fusing the available component scores.
#[derive(Debug, Clone, PartialEq)]
pub struct Fusion {
    pub score: f64,
    /// Component → score that went into the fusion.
    pub components: BTreeMap<&'static str, f64>,
    /// Component → renormalized weight actually applied. Sums to 1.
    pub weights: BTreeMap<&'static str, f64>,
}

/// Weighted average of the components present in `scores`.
///
/// Algorithm:
/// 1. Look up each present component's base weight.
/// 2. Divide by the sum of present base weights, so the applied weights sum to 1.
/// 3. If every present component has base weight 0, weight them equally.
/// 4. score = round1(Σ weight × score)
///
/// Absent components contribute nothing. An empty input scores 0.
pub fn fuse(scores: &[(FusionComponent, f64)], weights: &FusionWeights) -> Fusion {
    let mut components = BTreeMap::new();
    let mut applied = BTreeMap::new();

    if scores.is_empty() {
        return Fusion {
            score: 0.0,
            components,
            weights: applied,
        };
    }

    let total: f64 = scores.iter().map(|(c, _)| weights.base(*c)).sum();
    let mut fused = 0.0;
    for &(component, score) in scores {
        let weight = if total > 0.0 {
            weights.base(component) / total
        } else {
            1.0 / scores.len() as f64
        };
        fused += weight * score;
        components.insert(component.as_str(), score);
        applied.insert(component.as_str(), weight);
    }

    Fusion {
        score: round1(fused),
        components,
        weights: applied,
    }
}
