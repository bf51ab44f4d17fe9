//! LLM-Skills — the LLM extracts a structured [`SkillSet`] from each text and
//! the two sets are compared by job coverage.
//!
//! Coverage is deliberately one-sided: a résumé that knows more than the job
//! asks for loses nothing, a résumé missing what the job asks for does.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{round1, CompatibilityScorer, ScoreDetails, ScoreResult};
use crate::engine::method::{Method, MethodTag};
use crate::errors::ScoringError;
use crate::llm_client::{GenerateOptions, ResponseFormat, TextGenerator};
use crate::text::{canonicalize, normalize, truncate_chars};

pub mod extract;
pub mod prompts;

use extract::{extract_by_keywords, parse_skill_response};
use prompts::{build_extraction_prompt, TextKind};

const TECH_WEIGHT: f64 = 0.60;
const DOMAIN_WEIGHT: f64 = 0.25;
const SOFT_WEIGHT: f64 = 0.15;
/// Score used for the domain / soft components when the job lists none.
const NEUTRAL: f64 = 50.0;

const EXTRACTION_TEMPERATURE: f32 = 0.1;
const EXTRACTION_MAX_TOKENS: u32 = 512;

// ────────────────────────────────────────────────────────────────────────────
// Data model
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Seniority {
    Junior,
    Pleno,
    Senior,
    Specialist,
    Lead,
    Manager,
    #[default]
    Unknown,
}

impl Seniority {
    /// Lenient parse of whatever the model wrote (`"Sênior"`, `"mid-level"`,
    /// `"Tech Lead"`). Anything unrecognized is `Unknown`.
    pub fn parse(raw: &str) -> Self {
        let value = normalize(raw.trim());
        match value.as_str() {
            "junior" | "jr" | "entry" | "entry-level" | "trainee" | "estagiario" => Seniority::Junior,
            "pleno" | "mid" | "mid-level" | "middle" | "intermediate" => Seniority::Pleno,
            "senior" | "sr" => Seniority::Senior,
            "specialist" | "especialista" | "staff" | "principal" => Seniority::Specialist,
            "lead" | "tech lead" | "lider" | "lider tecnico" => Seniority::Lead,
            "manager" | "gerente" | "coordenador" | "head" => Seniority::Manager,
            _ => Seniority::Unknown,
        }
    }
}

/// Canonicalized skills of one text. Sets are ordered so details are stable.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SkillSet {
    pub technical_skills: BTreeSet<String>,
    pub soft_skills: BTreeSet<String>,
    pub domains: BTreeSet<String>,
    pub seniority: Seniority,
    pub summary: String,
}

impl SkillSet {
    /// Builds a set, canonicalizing every element and dropping blanks.
    pub fn from_parts<I, J, K>(technical: I, soft: J, domains: K, seniority: Seniority, summary: String) -> Self
    where
        I: IntoIterator<Item = String>,
        J: IntoIterator<Item = String>,
        K: IntoIterator<Item = String>,
    {
        Self {
            technical_skills: canonical_set(technical),
            soft_skills: canonical_set(soft),
            domains: canonical_set(domains),
            seniority,
            summary: summary.trim().to_string(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.technical_skills.is_empty() && self.soft_skills.is_empty() && self.domains.is_empty()
    }
}

fn canonical_set<I: IntoIterator<Item = String>>(items: I) -> BTreeSet<String> {
    items
        .into_iter()
        .map(|s| canonicalize(&s))
        .filter(|s| !s.is_empty())
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionSource {
    Llm,
    Keywords,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub skills: SkillSet,
    pub source: ExtractionSource,
}

// ────────────────────────────────────────────────────────────────────────────
// Coverage scoring
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ComponentScores {
    pub technical: f64,
    pub domain: f64,
    pub soft_skills: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkillMatch {
    pub score: f64,
    pub components: ComponentScores,
    pub common_technical: Vec<String>,
    pub common_domains: Vec<String>,
    pub missing_technical: Vec<String>,
}

/// `100 × |R ∩ J| / |J|`, or `None` when the job side is empty.
pub fn coverage(resume: &BTreeSet<String>, job: &BTreeSet<String>) -> Option<f64> {
    if job.is_empty() {
        return None;
    }
    let covered = job.intersection(resume).count();
    Some(100.0 * covered as f64 / job.len() as f64)
}

/// Job-coverage score of a résumé skill set against a job skill set.
///
/// Algorithm:
/// 1. technical = coverage of job technical skills (0 if the job lists none)
/// 2. domain    = coverage of job domains (neutral 50 if the job lists none)
/// 3. soft      = coverage of job soft skills (neutral 50 if the job lists none)
/// 4. score     = round1(0.60 × technical + 0.25 × domain + 0.15 × soft)
///
/// A job with no extracted requirements at all scores 0: there is nothing to
/// cover, and neutral components would otherwise invent 20 points.
pub fn score_skill_sets(resume: &SkillSet, job: &SkillSet) -> SkillMatch {
    let common_technical: Vec<String> = job
        .technical_skills
        .intersection(&resume.technical_skills)
        .cloned()
        .collect();
    let missing_technical: Vec<String> = job
        .technical_skills
        .difference(&resume.technical_skills)
        .cloned()
        .collect();
    let common_domains: Vec<String> = job.domains.intersection(&resume.domains).cloned().collect();

    if job.is_empty() {
        return SkillMatch {
            score: 0.0,
            components: ComponentScores {
                technical: 0.0,
                domain: 0.0,
                soft_skills: 0.0,
            },
            common_technical,
            common_domains,
            missing_technical,
        };
    }

    let technical = coverage(&resume.technical_skills, &job.technical_skills).unwrap_or(0.0);
    let domain = coverage(&resume.domains, &job.domains).unwrap_or(NEUTRAL);
    let soft = coverage(&resume.soft_skills, &job.soft_skills).unwrap_or(NEUTRAL);

    SkillMatch {
        score: round1(TECH_WEIGHT * technical + DOMAIN_WEIGHT * domain + SOFT_WEIGHT * soft),
        components: ComponentScores {
            technical: round1(technical),
            domain: round1(domain),
            soft_skills: round1(soft),
        },
        common_technical,
        common_domains,
        missing_technical,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Scorer
// ────────────────────────────────────────────────────────────────────────────

/// Everything one LLM-Skills run produced; `ultra` needs more than the score.
#[derive(Debug, Clone)]
pub struct SkillsOutcome {
    pub resume: Extraction,
    pub job: Extraction,
    pub matched: SkillMatch,
}

impl SkillsOutcome {
    /// True if at least one side was extracted by the LLM rather than keywords.
    pub fn used_llm(&self) -> bool {
        self.resume.source == ExtractionSource::Llm || self.job.source == ExtractionSource::Llm
    }

    pub fn into_result(self) -> ScoreResult {
        let m = &self.matched;
        let explanation = format!(
            "Skills coverage: {:.1}% (technical {:.1}%, domain {:.1}%, soft skills {:.1}%); \
             {} of {} required technical skills present",
            m.score,
            m.components.technical,
            m.components.domain,
            m.components.soft_skills,
            m.common_technical.len(),
            self.job.skills.technical_skills.len(),
        );

        let details = ScoreDetails::new(MethodTag::LlmSkills)
            .with("component_scores", m.components)
            .with("resume_technical_skills", &self.resume.skills.technical_skills)
            .with("job_technical_skills", &self.job.skills.technical_skills)
            .with("common_technical_skills", &m.common_technical)
            .with("missing_technical_skills", &m.missing_technical)
            .with("resume_domains", &self.resume.skills.domains)
            .with("job_domains", &self.job.skills.domains)
            .with("common_domains", &m.common_domains)
            .with("resume_seniority", self.resume.skills.seniority)
            .with("job_seniority", self.job.skills.seniority)
            .with("resume_extraction", self.resume.source)
            .with("job_extraction", self.job.source)
            .with("resume_summary", &self.resume.skills.summary)
            .with("job_summary", &self.job.skills.summary);

        ScoreResult::new(m.score, explanation, details)
    }
}

pub struct SkillsScorer {
    generator: Arc<dyn TextGenerator>,
    max_chars: usize,
}

impl SkillsScorer {
    pub fn new(generator: Arc<dyn TextGenerator>, max_chars: usize) -> Self {
        Self { generator, max_chars }
    }

    /// One text → skills. Falls back to keyword extraction when the LLM gives
    /// nothing or something unparseable.
    pub async fn extract(&self, text: &str, kind: TextKind) -> Extraction {
        let prompt = build_extraction_prompt(kind, text);
        let options = GenerateOptions {
            temperature: EXTRACTION_TEMPERATURE,
            max_tokens: EXTRACTION_MAX_TOKENS,
            format: ResponseFormat::Json,
            timeout: None,
        };

        match self.generator.generate(&prompt, options).await {
            Some(raw) => match parse_skill_response(&raw) {
                Some(skills) => {
                    return Extraction {
                        skills,
                        source: ExtractionSource::Llm,
                    }
                }
                None => warn!(?kind, "LLM skill response was not valid JSON, using keyword extraction"),
            },
            None => warn!(?kind, "LLM returned nothing, using keyword extraction"),
        }

        Extraction {
            skills: extract_by_keywords(text),
            source: ExtractionSource::Keywords,
        }
    }

    /// Extracts both sides concurrently and scores job coverage.
    ///
    /// Identical inputs are extracted once; nothing is cached past this call.
    pub async fn evaluate(&self, resume: &str, job: &str) -> SkillsOutcome {
        let resume = truncate_chars(resume, self.max_chars);
        let job = truncate_chars(job, self.max_chars);

        let (resume_ex, job_ex) = if resume == job {
            let extraction = self.extract(resume, TextKind::Resume).await;
            (extraction.clone(), extraction)
        } else {
            tokio::join!(
                self.extract(resume, TextKind::Resume),
                self.extract(job, TextKind::Job)
            )
        };

        let matched = score_skill_sets(&resume_ex.skills, &job_ex.skills);
        debug!(score = matched.score, "llm_skills scored");

        SkillsOutcome {
            resume: resume_ex,
            job: job_ex,
            matched,
        }
    }
}

#[async_trait]
impl CompatibilityScorer for SkillsScorer {
    fn method(&self) -> Method {
        Method::LlmSkills
    }

    async fn score(&self, resume: &str, job: &str) -> Result<ScoreResult, ScoringError> {
        Ok(self.evaluate(resume, job).await.into_result())
    }
}
