//! Synonym registry for technical terms.
//!
//! Each group maps a canonical term to the surface forms that mean the same
//! thing in a résumé or a job posting (`k8s` → `kubernetes`, `iac` →
//! `terraform`). The registry is built once per process and is read-only
//! afterwards.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use super::normalize::{normalize, raw_tokens};

/// `(canonical, aliases)`. All entries are lowercase and accent-folded.
const SYNONYM_GROUPS: &[(&str, &[&str])] = &[
    ("kubernetes", &["k8s", "kube"]),
    ("docker", &["container"]),
    (
        "ci/cd",
        &[
            "cicd",
            "ci-cd",
            "pipeline",
            "pipelines",
            "continuous integration",
            "continuous-integration",
            "continuous delivery",
            "continuous deployment",
            "integracao continua",
            "entrega continua",
        ],
    ),
    (
        "terraform",
        &["iac", "infrastructure-as-code", "infrastructure as code", "infraestrutura como codigo"],
    ),
    (
        "devops",
        &[
            "sre",
            "site-reliability",
            "site reliability engineering",
            "platform-engineer",
            "platform engineering",
            "engenharia de plataforma",
        ],
    ),
    ("aws", &["amazon-web-services", "amazon web services", "ec2", "s3", "eks", "lambda"]),
    ("gcp", &["google-cloud", "google cloud", "google cloud platform", "gke", "cloud-run"]),
    ("azure", &["microsoft-cloud", "microsoft azure", "aks", "azure-devops"]),
    ("javascript", &["js"]),
    ("typescript", &["ts"]),
    ("golang", &["go"]),
    ("python", &["py"]),
    ("postgresql", &["postgres", "psql"]),
    ("mongodb", &["mongo"]),
    ("observability", &["monitoring", "observabilidade", "monitoramento"]),
    ("machine learning", &["ml", "aprendizado de maquina"]),
    ("ansible", &["configuration-management"]),
    ("prometheus", &["metrics", "alerting"]),
    ("grafana", &["dashboard", "dashboards"]),
    ("elk", &["elasticsearch", "logstash", "kibana", "elastic-stack"]),
    ("bash", &["shell", "shell-script", "scripting"]),
    ("linux", &["unix"]),
    ("networking", &["network", "rede", "redes", "tcp/ip"]),
    ("security", &["seguranca", "compliance", "cybersecurity"]),
];

static REGISTRY: Lazy<SynonymRegistry> = Lazy::new(|| SynonymRegistry::from_groups(SYNONYM_GROUPS));

/// Process-wide registry.
pub fn registry() -> &'static SynonymRegistry {
    &REGISTRY
}

/// Shorthand for `registry().canonicalize(term)`.
pub fn canonicalize(term: &str) -> String {
    registry().canonicalize(term)
}

/// Shorthand for `registry().expand(text)`.
pub fn expand(text: &str) -> String {
    registry().expand(text)
}

pub struct SynonymRegistry {
    groups: &'static [(&'static str, &'static [&'static str])],
    /// surface form → canonical. Reflexive: every canonical maps to itself.
    lookup: HashMap<&'static str, &'static str>,
    /// Multi-word surface forms, longest first, as ` phrase ` patterns.
    phrases: Vec<(String, &'static str)>,
}

impl SynonymRegistry {
    fn from_groups(groups: &'static [(&'static str, &'static [&'static str])]) -> Self {
        let mut lookup = HashMap::new();
        let mut phrases = Vec::new();

        for &(canonical, aliases) in groups {
            lookup.insert(canonical, canonical);
            for &alias in aliases {
                lookup.insert(alias, canonical);
                if alias.contains(' ') {
                    phrases.push((format!(" {alias} "), canonical));
                }
            }
        }
        phrases.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(&b.0)));

        Self {
            groups,
            lookup,
            phrases,
        }
    }

    /// Canonical form of an exact (already normalized) surface form.
    pub fn lookup(&self, surface: &str) -> Option<&'static str> {
        self.lookup.get(surface).copied()
    }

    /// Aliases registered for `canonical`, if it is a canonical term.
    pub fn aliases(&self, canonical: &str) -> Option<&'static [&'static str]> {
        self.groups
            .iter()
            .find(|(c, _)| *c == canonical)
            .map(|(_, aliases)| *aliases)
    }

    pub fn canonical_terms(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.groups.iter().map(|(c, _)| *c)
    }

    /// Every surface form the registry knows, canonicals included.
    pub fn surface_forms(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.lookup.keys().copied()
    }

    /// Maps a single skill term to its canonical form.
    ///
    /// Lowercases, folds accents, drops parenthetical qualifiers
    /// (`"Kubernetes (K8s)"` → `"kubernetes"`), collapses whitespace, then
    /// looks the result up. Unknown terms come back normalized but otherwise
    /// unchanged. Idempotent.
    pub fn canonicalize(&self, term: &str) -> String {
        let normalized = normalize(term);
        let stripped = strip_parentheticals(&normalized);
        let collapsed = stripped.split_whitespace().collect::<Vec<_>>().join(" ");

        match self.lookup(&collapsed) {
            Some(canonical) => canonical.to_string(),
            None => collapsed,
        }
    }

    /// Rewrites free text so every known surface form appears in canonical
    /// form. Multi-word phrases are replaced first (longest first), then
    /// single tokens.
    pub fn canonicalize_text(&self, text: &str) -> String {
        let normalized = normalize(text);
        let mut padded = String::with_capacity(normalized.len() + 2);
        padded.push(' ');
        for token in raw_tokens(&normalized) {
            padded.push_str(token);
            padded.push(' ');
        }

        for (pattern, canonical) in &self.phrases {
            let replacement = format!(" {canonical} ");
            while let Some(pos) = padded.find(pattern.as_str()) {
                padded.replace_range(pos..pos + pattern.len(), &replacement);
            }
        }

        padded
            .split_whitespace()
            .map(|token| self.lookup(token).unwrap_or(token))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Canonicalizes `text`, then appends the aliases of every canonical term
    /// found in it, in registry order. Used to give TF-IDF a shared vocabulary
    /// when the two sides name the same technology differently.
    pub fn expand(&self, text: &str) -> String {
        let canonical_text = self.canonicalize_text(text);
        let padded = format!(" {canonical_text} ");

        let mut expanded = canonical_text;
        for &(canonical, aliases) in self.groups {
            if padded.contains(&format!(" {canonical} ")) {
                for alias in aliases {
                    expanded.push(' ');
                    expanded.push_str(alias);
                }
            }
        }
        expanded
    }
}

/// Removes `( ... )` segments. An unclosed `(` drops the rest of the input.
fn strip_parentheticals(text: &str) -> String {
    let mut depth = 0usize;
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '(' => depth += 1,
            ')' if depth > 0 => depth -= 1,
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }
    out
}
