//! Turning text into a [`SkillSet`]: robust parsing of the LLM's JSON answer,
//! and the keyword extractor used when the LLM is down or answers garbage.

use serde::Deserialize;

use super::{Seniority, SkillSet};
use crate::llm_client::extract_json_object;
use crate::text::normalize::padded_terms;

/// Technical whitelist, normalized. Aliases are canonicalized on the way out.
const TECH_KEYWORDS: &[&str] = &[
    // languages
    "python", "py", "java", "javascript", "js", "typescript", "ts", "go", "golang", "rust",
    "ruby", "php", "scala", "kotlin", "swift", "bash", "shell", "sql", "nosql",
    // data stores
    "postgresql", "postgres", "mysql", "mongodb", "mongo", "redis", "elasticsearch",
    "kafka", "rabbitmq",
    // containers, infra, delivery
    "docker", "containers", "kubernetes", "k8s", "helm", "terraform", "iac", "ansible",
    "puppet", "chef", "jenkins", "gitlab", "github actions", "git", "ci/cd", "argocd",
    "linux", "nginx",
    // cloud
    "aws", "gcp", "azure",
    // observability
    "prometheus", "grafana", "datadog", "elk", "observability", "monitoring",
    // roles / practices
    "devops", "sre", "microservices",
    // web
    "rest", "graphql", "react", "angular", "vue", "nodejs", "django", "flask", "fastapi",
    "spring",
    // data
    "spark", "airflow", "pandas", "numpy", "scikit-learn", "tensorflow", "pytorch",
    "machine learning", "ml",
];

/// Domain tag → trigger terms, normalized.
const DOMAIN_TRIGGERS: &[(&str, &[&str])] = &[
    (
        "devops",
        &[
            "devops", "sre", "ci/cd", "pipeline", "pipelines", "deploy", "infrastructure",
            "infraestrutura", "kubernetes", "k8s", "terraform", "iac",
        ],
    ),
    ("cloud", &["cloud", "nuvem", "aws", "gcp", "azure"]),
    (
        "data science",
        &[
            "data science", "data scientist", "cientista de dados", "machine learning", "ml",
            "statistics", "estatistica", "pandas", "scikit-learn",
        ],
    ),
    ("backend", &["backend", "back-end", "api", "apis", "microservices", "microsservicos"]),
    ("frontend", &["frontend", "front-end", "react", "angular", "vue"]),
    ("security", &["security", "seguranca", "devsecops", "compliance"]),
    ("mobile", &["mobile", "android", "ios", "flutter"]),
];

const SOFT_KEYWORDS: &[&str] = &[
    "communication", "comunicacao", "teamwork", "trabalho em equipe", "leadership",
    "lideranca", "proactive", "proatividade", "problem solving", "resolucao de problemas",
    "collaboration", "colaboracao", "mentoring", "mentoria",
];

#[derive(Debug, Deserialize)]
struct RawSkillSet {
    technical_skills: Vec<String>,
    #[serde(default)]
    soft_skills: Vec<String>,
    #[serde(default)]
    domains: Vec<String>,
    #[serde(default)]
    seniority: Option<String>,
    #[serde(default)]
    summary: Option<String>,
}

/// Parses an LLM answer into a canonicalized [`SkillSet`].
///
/// Tolerates code fences, a leading `json` label and prose around the object;
/// returns `None` when no object matching the schema can be found.
pub fn parse_skill_response(raw: &str) -> Option<SkillSet> {
    let object = extract_json_object(raw)?;
    let parsed: RawSkillSet = serde_json::from_str(object).ok()?;

    Some(SkillSet::from_parts(
        parsed.technical_skills,
        parsed.soft_skills,
        parsed.domains,
        parsed
            .seniority
            .as_deref()
            .map(Seniority::parse)
            .unwrap_or_default(),
        parsed.summary.unwrap_or_default(),
    ))
}

/// Whitelist extraction on whole-term boundaries of the normalized text.
pub fn extract_by_keywords(text: &str) -> SkillSet {
    let padded = padded_terms(text);
    let has = |term: &str| padded.contains(&format!(" {term} "));

    let technical: Vec<String> = TECH_KEYWORDS
        .iter()
        .filter(|t| has(**t))
        .map(|t| t.to_string())
        .collect();
    let domains: Vec<String> = DOMAIN_TRIGGERS
        .iter()
        .filter(|(_, triggers)| triggers.iter().any(|t| has(*t)))
        .map(|(domain, _)| domain.to_string())
        .collect();
    let soft: Vec<String> = SOFT_KEYWORDS
        .iter()
        .filter(|t| has(**t))
        .map(|t| t.to_string())
        .collect();

    let mut skills = SkillSet::from_parts(technical, soft, domains, Seniority::Unknown, String::new());
    skills.summary = format!(
        "Extracted by keywords (LLM unavailable): {} technical skills, {} domains",
        skills.technical_skills.len(),
        skills.domains.len()
    );
    skills
}
