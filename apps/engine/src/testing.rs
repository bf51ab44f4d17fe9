//! Hand-written test doubles shared by the unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use crate::embedding::{EmbeddingError, ModelSource, SentenceEncoder};
use crate::llm_client::{GenerateOptions, TextGenerator};

pub mod fixtures {
    pub const DEVOPS_RESUME: &str =
        "DevOps Engineer with 5 years in Kubernetes, Docker, AWS, Terraform, CI/CD, Python.";
    pub const SRE_JOB: &str =
        "SRE needed for K8s orchestration, IaC automation, and cloud infrastructure (AWS). Python or Go.";
    pub const DATA_SCIENCE_JOB: &str = "Data Scientist: Python, R, scikit-learn, pandas, ML, statistics.";
    pub const CONTAINERS_JOB: &str = "Vaga: Kubernetes e Docker para time DevOps.";
    pub const SYNONYM_RESUME: &str = "experiência com Kubernetes e Terraform.";
    pub const SYNONYM_JOB: &str = "buscamos profissional com K8s e IaC.";
}

// ────────────────────────────────────────────────────────────────────────────
// LLM
// ────────────────────────────────────────────────────────────────────────────

const DIRECT_PROMPT_MARKER: &str = "Responda exatamente neste formato";
const DIRECT_ANSWER: &str = "Score: 80%\nJustificativa: cobre Kubernetes, AWS, Terraform e Python; não cita Go.";

const DEVOPS_RESUME_SKILLS: &str = r#"```json
{"technical_skills": ["Kubernetes", "Docker", "AWS (Amazon Web Services)", "Terraform", "CI/CD", "Python", "DevOps"],
 "soft_skills": [], "domains": ["DevOps", "Cloud"], "seniority": "senior",
 "summary": "Engenheiro DevOps com 5 anos de experiência"}
```"#;
const SRE_JOB_SKILLS: &str = r#"{"technical_skills": ["K8s", "IaC", "AWS", "Python", "Go", "SRE"],
 "soft_skills": [], "domains": ["DevOps", "Cloud"], "seniority": "pleno",
 "summary": "Vaga de SRE para orquestração e infraestrutura em nuvem"}"#;
const DATA_SCIENCE_JOB_SKILLS: &str = r#"Claro! Segue o JSON:
{"technical_skills": ["Python", "R", "scikit-learn", "pandas", "Machine Learning", "Statistics"],
 "soft_skills": [], "domains": ["Data Science"], "seniority": "unknown",
 "summary": "Vaga de cientista de dados"}"#;
const CONTAINERS_JOB_SKILLS: &str = r#"{"technical_skills": ["Kubernetes", "Docker"], "soft_skills": [],
 "domains": ["DevOps"], "seniority": "unknown", "summary": "Vaga de containers"}"#;

/// Answers prompts from a fixed table: the first rule whose needle occurs in
/// the prompt wins, no match means `None`. Counts every call.
pub struct ScriptedGenerator {
    rules: Vec<(&'static str, &'static str)>,
    reachable: bool,
    calls: AtomicUsize,
}

impl ScriptedGenerator {
    pub fn new(rules: Vec<(&'static str, &'static str)>) -> Self {
        Self {
            rules,
            reachable: true,
            calls: AtomicUsize::new(0),
        }
    }

    /// Direct-score prompt only.
    pub fn direct() -> Self {
        Self::new(vec![(DIRECT_PROMPT_MARKER, DIRECT_ANSWER)])
    }

    /// Direct-score prompt plus skill extraction for every fixture.
    pub fn skills() -> Self {
        Self::new(vec![
            (DIRECT_PROMPT_MARKER, DIRECT_ANSWER),
            ("5 years in Kubernetes", DEVOPS_RESUME_SKILLS),
            ("SRE needed for", SRE_JOB_SKILLS),
            ("Data Scientist:", DATA_SCIENCE_JOB_SKILLS),
            ("Kubernetes e Docker para time DevOps", CONTAINERS_JOB_SKILLS),
        ])
    }

    pub fn unreachable(mut self) -> Self {
        self.reachable = false;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, prompt: &str, _options: GenerateOptions) -> Option<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.rules
            .iter()
            .find(|(needle, _)| prompt.contains(needle))
            .map(|(_, response)| response.to_string())
    }

    async fn is_reachable(&self) -> bool {
        self.reachable
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Embeddings
// ────────────────────────────────────────────────────────────────────────────

/// Bag-of-concepts encoder: one axis per topic, set when any of its terms
/// occurs. Programming languages count half so a shared `python` alone does
/// not make two texts look alike.
pub struct ConceptEncoder;

const CONCEPT_AXES: &[(&[&str], f32)] = &[
    (
        &["devops", "sre", "infrastructure", "terraform", "iac", "automation", "orchestration"],
        1.0,
    ),
    (&["kubernetes", "k8s", "docker", "containers"], 1.0),
    (&["aws", "cloud", "gcp", "azure"], 1.0),
    (&["python", "go", "golang", "java"], 0.5),
    (
        &["data", "scientist", "scikit", "pandas", "ml", "statistics"],
        1.0,
    ),
];

impl SentenceEncoder for ConceptEncoder {
    fn model_name(&self) -> &str {
        "concept-axes"
    }

    fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts
            .iter()
            .map(|text| {
                let lower = text.to_lowercase();
                let words: Vec<&str> = lower.split(|c: char| !c.is_alphanumeric()).collect();
                CONCEPT_AXES
                    .iter()
                    .map(|(terms, weight)| {
                        if terms.iter().any(|t| words.contains(t)) {
                            *weight
                        } else {
                            0.0
                        }
                    })
                    .collect()
            })
            .collect())
    }
}

pub struct FailingEncoder;

impl SentenceEncoder for FailingEncoder {
    fn model_name(&self) -> &str {
        "failing"
    }

    fn encode(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Err(EmbeddingError::Encode("onnx session crashed".to_string()))
    }
}

/// Source that always hands out the same encoder.
pub struct FixedModel {
    encoder: Arc<dyn SentenceEncoder>,
}

impl FixedModel {
    pub fn new<E: SentenceEncoder + 'static>(encoder: E) -> Self {
        Self {
            encoder: Arc::new(encoder),
        }
    }
}

#[async_trait]
impl ModelSource for FixedModel {
    fn is_available(&self) -> bool {
        true
    }

    async fn get_model(&self) -> Option<Arc<dyn SentenceEncoder>> {
        Some(Arc::clone(&self.encoder))
    }
}
