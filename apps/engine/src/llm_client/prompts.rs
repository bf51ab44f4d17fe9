// Shared prompt fragments.
// Each scorer that calls the LLM keeps its own prompt next to it; only the
// pieces several prompts need live here.

/// Appended to prompts whose answer is parsed as JSON.
pub const JSON_ONLY_INSTRUCTION: &str = "\
    Responda APENAS com um objeto JSON válido. \
    Não use blocos de código markdown. \
    Não inclua texto antes ou depois do JSON.";

/// Reminds the model to stay grounded in the text it was given.
pub const GROUNDING_INSTRUCTION: &str = "\
    Use somente informações presentes no texto. \
    Não invente habilidades, tecnologias ou experiências.";

/// Wraps a document in explicit delimiters so instructions inside the
/// document are not mistaken for ours.
pub fn delimited(label: &str, text: &str) -> String {
    format!("<<<{label}>>>\n{text}\n<<<FIM {label}>>>")
}
