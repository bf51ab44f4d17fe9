//! Closed set of scoring methods, the tags reported in results, and the
//! catalog of what is currently available.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown compatibility method '{0}'")]
pub struct UnknownMethod(pub String);

/// A method a caller may request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    Auto,
    Ultra,
    Jaccard,
    Tfidf,
    TfidfSynonyms,
    TfidfHybrid,
    LlmSkills,
    Llm,
    LlmHybrid,
    Semantic,
    SemanticHybrid,
}

impl Method {
    pub const ALL: [Method; 11] = [
        Method::Auto,
        Method::Ultra,
        Method::Jaccard,
        Method::Tfidf,
        Method::TfidfSynonyms,
        Method::TfidfHybrid,
        Method::LlmSkills,
        Method::Llm,
        Method::LlmHybrid,
        Method::Semantic,
        Method::SemanticHybrid,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Auto => "auto",
            Method::Ultra => "ultra",
            Method::Jaccard => "jaccard",
            Method::Tfidf => "tfidf",
            Method::TfidfSynonyms => "tfidf_synonyms",
            Method::TfidfHybrid => "tfidf_hybrid",
            Method::LlmSkills => "llm_skills",
            Method::Llm => "llm",
            Method::LlmHybrid => "llm_hybrid",
            Method::Semantic => "semantic",
            Method::SemanticHybrid => "semantic_hybrid",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Method::Auto => "Picks the best available method automatically",
            Method::Ultra => "Weighted fusion of every available method (semantic, LLM, TF-IDF, Jaccard)",
            Method::Jaccard => "Token-set overlap (simple, fast, no dependencies)",
            Method::Tfidf => "TF-IDF cosine similarity on unigrams and bigrams",
            Method::TfidfSynonyms => "TF-IDF with technical synonym expansion (K8s = Kubernetes)",
            Method::TfidfHybrid => "TF-IDF blend: 60% with synonyms, 40% exact",
            Method::LlmSkills => "Structured skill extraction by a local LLM, scored by job coverage",
            Method::Llm => "Local LLM asked directly for a compatibility percentage",
            Method::LlmHybrid => "LLM direct score blended with Jaccard (70% + 30%)",
            Method::Semantic => "Sentence-embedding cosine similarity (multilingual model)",
            Method::SemanticHybrid => "Semantic similarity blended with TF-IDF hybrid (70% + 30%)",
        }
    }

    /// The optional dependency family a method relies on. `None` for methods
    /// that are always available.
    pub fn family(&self) -> Option<MethodFamily> {
        match self {
            Method::Tfidf | Method::TfidfSynonyms | Method::TfidfHybrid => Some(MethodFamily::Tfidf),
            Method::LlmSkills | Method::Llm | Method::LlmHybrid => Some(MethodFamily::Llm),
            Method::Semantic | Method::SemanticHybrid => Some(MethodFamily::Semantic),
            Method::Auto | Method::Ultra | Method::Jaccard => None,
        }
    }

    /// Tag a successful run of this method reports. `Auto` has none because it
    /// always resolves to a concrete method first.
    pub fn tag(&self) -> Option<MethodTag> {
        let tag = match self {
            Method::Auto => return None,
            Method::Ultra => MethodTag::Ultra,
            Method::Jaccard => MethodTag::Jaccard,
            Method::Tfidf => MethodTag::Tfidf,
            Method::TfidfSynonyms => MethodTag::TfidfSynonyms,
            Method::TfidfHybrid => MethodTag::TfidfHybrid,
            Method::LlmSkills => MethodTag::LlmSkills,
            Method::Llm => MethodTag::Llm,
            Method::LlmHybrid => MethodTag::LlmHybrid,
            Method::Semantic => MethodTag::Semantic,
            Method::SemanticHybrid => MethodTag::SemanticHybrid,
        };
        Some(tag)
    }
}

impl FromStr for Method {
    type Err = UnknownMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Method::ALL
            .iter()
            .copied()
            .find(|m| m.as_str() == wanted)
            .ok_or_else(|| UnknownMethod(s.to_string()))
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The method that actually produced a result, as reported in
/// `details.method`. Adds `fallback` and `empty` to the concrete methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MethodTag {
    Jaccard,
    Tfidf,
    TfidfSynonyms,
    TfidfHybrid,
    LlmSkills,
    Llm,
    LlmHybrid,
    Semantic,
    SemanticHybrid,
    Ultra,
    Fallback,
    Empty,
}

impl MethodTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            MethodTag::Jaccard => "jaccard",
            MethodTag::Tfidf => "tfidf",
            MethodTag::TfidfSynonyms => "tfidf_synonyms",
            MethodTag::TfidfHybrid => "tfidf_hybrid",
            MethodTag::LlmSkills => "llm_skills",
            MethodTag::Llm => "llm",
            MethodTag::LlmHybrid => "llm_hybrid",
            MethodTag::Semantic => "semantic",
            MethodTag::SemanticHybrid => "semantic_hybrid",
            MethodTag::Ultra => "ultra",
            MethodTag::Fallback => "fallback",
            MethodTag::Empty => "empty",
        }
    }
}

impl fmt::Display for MethodTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Optional dependency families an operator can switch off. Jaccard is not
/// one of them: it is the floor every other method degrades to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MethodFamily {
    Semantic,
    Llm,
    Tfidf,
}

impl FromStr for MethodFamily {
    type Err = UnknownMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "semantic" => Ok(MethodFamily::Semantic),
            "llm" => Ok(MethodFamily::Llm),
            "tfidf" => Ok(MethodFamily::Tfidf),
            _ => Err(UnknownMethod(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MethodInfo {
    pub method: Method,
    pub description: &'static str,
    pub available: bool,
}

/// Snapshot of which methods can run right now.
#[derive(Debug, Clone, Serialize)]
pub struct MethodCatalog {
    pub methods: Vec<MethodInfo>,
}

impl MethodCatalog {
    /// Builds the catalog from per-family availability. `auto`, `ultra` and
    /// `jaccard` are always available.
    pub fn from_availability<F>(is_family_available: F) -> Self
    where
        F: Fn(MethodFamily) -> bool,
    {
        let methods = Method::ALL
            .iter()
            .map(|&method| MethodInfo {
                method,
                description: method.description(),
                available: method.family().map_or(true, &is_family_available),
            })
            .collect();
        Self { methods }
    }

    pub fn is_available(&self, method: Method) -> bool {
        self.methods
            .iter()
            .any(|info| info.method == method && info.available)
    }

    pub fn available(&self) -> impl Iterator<Item = Method> + '_ {
        self.methods.iter().filter(|i| i.available).map(|i| i.method)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_names_round_trip_through_from_str() {
        for method in Method::ALL {
            assert_eq!(Method::from_str(method.as_str()), Ok(method));
        }
        assert_eq!(Method::from_str(" Semantic_Hybrid "), Ok(Method::SemanticHybrid));
    }

    #[test]
    fn test_unknown_method_is_rejected() {
        assert_eq!(
            Method::from_str("bert"),
            Err(UnknownMethod("bert".to_string()))
        );
    }

    #[test]
    fn test_serde_names_match_as_str() {
        for method in Method::ALL {
            let json = serde_json::to_value(method).unwrap();
            assert_eq!(json, serde_json::Value::String(method.as_str().to_string()));
        }
        assert_eq!(serde_json::to_value(MethodTag::Fallback).unwrap(), "fallback");
    }

    #[test]
    fn test_catalog_marks_disabled_families() {
        let catalog = MethodCatalog::from_availability(|family| family == MethodFamily::Tfidf);

        assert_eq!(catalog.methods.len(), Method::ALL.len());
        assert!(catalog.is_available(Method::Jaccard));
        assert!(catalog.is_available(Method::Ultra));
        assert!(catalog.is_available(Method::TfidfHybrid));
        assert!(!catalog.is_available(Method::LlmSkills));
        assert!(!catalog.is_available(Method::SemanticHybrid));
        assert!(catalog
            .methods
            .iter()
            .all(|info| !info.description.is_empty()));
    }

    #[test]
    fn test_auto_has_no_tag() {
        assert_eq!(Method::Auto.tag(), None);
        assert_eq!(Method::LlmSkills.tag(), Some(MethodTag::LlmSkills));
    }
}
