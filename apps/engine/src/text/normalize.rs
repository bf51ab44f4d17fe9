use std::collections::{BTreeSet, HashSet};

use once_cell::sync::Lazy;

/// Minimum length (in chars) of a token kept by [`tokenize`].
pub const MIN_TOKEN_LEN: usize = 3;

/// Portuguese + English short stopword list, stored accent-folded.
const STOPWORDS: &[&str] = &[
    // pt
    "a", "o", "e", "as", "os", "um", "uma", "uns", "umas", "de", "do", "da", "dos", "das", "em",
    "no", "na", "nos", "nas", "com", "para", "por", "pra", "que", "se", "ou", "ao", "aos", "sao",
    "ser", "estar", "como", "mais", "muito", "sua", "seu", "suas", "seus", "ate", "sem", "sobre",
    "entre", "tambem", "nao", "este", "esta", "isso", "isto", "ja",
    // en
    "the", "and", "or", "in", "on", "at", "by", "of", "for", "to", "with", "is", "are", "an",
    "be", "we", "you", "our", "your", "will", "this", "that", "from", "has", "have", "not",
    "but", "its", "it", "into",
];

static STOPWORD_SET: Lazy<HashSet<&'static str>> = Lazy::new(|| STOPWORDS.iter().copied().collect());

pub fn is_stopword(token: &str) -> bool {
    STOPWORD_SET.contains(token)
}

/// Maps Latin accented letters to their base letter. Expects lowercase input.
pub fn fold_accent(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ã' | 'ä' | 'å' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'ç' => 'c',
        'ñ' => 'n',
        'ý' | 'ÿ' => 'y',
        other => other,
    }
}

/// Lowercases and removes accents.
pub fn normalize(text: &str) -> String {
    text.chars()
        .flat_map(char::to_lowercase)
        .map(fold_accent)
        .collect()
}

fn is_token_char(c: char) -> bool {
    c.is_alphanumeric() || c == '/' || c == '-'
}

/// Splits already-normalized text into raw tokens.
///
/// `/` and `-` are kept inside tokens (`ci/cd`, `site-reliability`) but trimmed
/// from the edges, so a dangling `-` never becomes a token.
pub fn raw_tokens(normalized: &str) -> impl Iterator<Item = &str> {
    normalized
        .split(|c: char| !is_token_char(c))
        .map(|t| t.trim_matches(|c| c == '/' || c == '-'))
        .filter(|t| !t.is_empty())
}

/// Canonical token set used by the Jaccard scorer.
///
/// Lowercase, accent-folded, split on anything that is not alphanumeric, `/`
/// or `-`; tokens shorter than [`MIN_TOKEN_LEN`] and stopwords are dropped.
pub fn tokenize(text: &str) -> BTreeSet<String> {
    let normalized = normalize(text);
    raw_tokens(&normalized)
        .filter(|t| t.chars().count() >= MIN_TOKEN_LEN && !is_stopword(t))
        .map(str::to_string)
        .collect()
}

/// TF-IDF analyzer: stopword-filtered unigrams followed by the bigrams of the
/// remaining token sequence. No length filter, so `go` and `r` survive.
pub fn analyze(text: &str) -> Vec<String> {
    let normalized = normalize(text);
    let unigrams: Vec<&str> = raw_tokens(&normalized)
        .filter(|t| !is_stopword(t))
        .collect();

    let mut features: Vec<String> = unigrams.iter().map(|t| t.to_string()).collect();
    features.extend(unigrams.windows(2).map(|w| format!("{} {}", w[0], w[1])));
    features
}

/// Joins the raw tokens of `text` with single spaces and pads both ends, so
/// callers can test for whole-term containment with `contains(" term ")`.
pub fn padded_terms(text: &str) -> String {
    let normalized = normalize(text);
    let mut padded = String::with_capacity(normalized.len() + 2);
    padded.push(' ');
    for token in raw_tokens(&normalized) {
        padded.push_str(token);
        padded.push(' ');
    }
    padded
}

/// Returns at most `max_chars` characters of `text`, never splitting a char.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_folds_portuguese_accents() {
        assert_eq!(normalize("Experiência em Integração Contínua"), "experiencia em integracao continua");
        assert_eq!(normalize("SÊNIOR"), "senior");
    }

    #[test]
    fn test_tokenize_keeps_slash_and_hyphen_terms() {
        let tokens = tokenize("CI/CD pipelines, site-reliability and K8s!");
        assert!(tokens.contains("ci/cd"));
        assert!(tokens.contains("site-reliability"));
        assert!(tokens.contains("pipelines"));
        assert!(tokens.contains("k8s"));
        assert!(!tokens.contains("and"));
    }

    #[test]
    fn test_tokenize_drops_short_tokens_and_stopwords() {
        let tokens = tokenize("Go e R com Python para AWS");
        assert_eq!(
            tokens.into_iter().collect::<Vec<_>>(),
            vec!["aws".to_string(), "python".to_string()]
        );
    }

    #[test]
    fn test_tokenize_trims_dangling_separators() {
        let tokens = tokenize("--- docker / / kubernetes-");
        assert!(tokens.contains("docker"));
        assert!(tokens.contains("kubernetes"));
        assert_eq!(tokens.len(), 2);
    }

    #[test]
    fn test_tokenize_stopwords_only_is_empty() {
        assert!(tokenize("the and with para com de que").is_empty());
    }

    #[test]
    fn test_analyze_builds_bigrams_after_stopword_removal() {
        let features = analyze("Kubernetes e Docker");
        assert_eq!(features, vec!["kubernetes", "docker", "kubernetes docker"]);
    }

    #[test]
    fn test_analyze_keeps_short_technical_tokens() {
        let features = analyze("Python or Go");
        assert!(features.contains(&"go".to_string()));
        assert!(features.contains(&"python go".to_string()));
    }

    #[test]
    fn test_padded_terms() {
        assert_eq!(padded_terms("AWS (EC2), Go."), " aws ec2 go ");
    }

    #[test]
    fn test_truncate_chars_respects_char_boundaries() {
        let text = "ção".repeat(10);
        let truncated = truncate_chars(&text, 4);
        assert_eq!(truncated, "çãoç");
        assert_eq!(truncate_chars("abc", 3), "abc");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("abcd", 3), "abc");
    }
}
