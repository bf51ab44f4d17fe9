use std::sync::Mutex;

use super::{EmbeddingError, SentenceEncoder};

const BATCH_SIZE: usize = 8;

/// fastembed-backed encoder. The ONNX session needs `&mut` access to embed,
/// so calls are serialized on a mutex held for one `encode`.
pub(super) struct FastEmbedEncoder {
    name: String,
    model: Mutex<fastembed::TextEmbedding>,
}

impl FastEmbedEncoder {
    /// Blocking: may download the model on first use.
    pub(super) fn load(name: &str) -> Result<Self, EmbeddingError> {
        let load_error = |message: String| EmbeddingError::Load {
            model: name.to_string(),
            message,
        };

        let model_id = model_for_name(name).ok_or_else(|| load_error(unknown_model_message()))?;
        let model = fastembed::TextEmbedding::try_new(
            fastembed::InitOptions::new(model_id).with_show_download_progress(false),
        )
        .map_err(|e| load_error(e.to_string()))?;

        Ok(Self {
            name: name.to_string(),
            model: Mutex::new(model),
        })
    }
}

impl SentenceEncoder for FastEmbedEncoder {
    fn model_name(&self) -> &str {
        &self.name
    }

    fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut model = self
            .model
            .lock()
            .map_err(|_| EmbeddingError::Encode("model mutex poisoned".to_string()))?;

        let vectors = model
            .embed(texts.to_vec(), Some(BATCH_SIZE))
            .map_err(|e| EmbeddingError::Encode(e.to_string()))?;

        if vectors.len() != texts.len() {
            return Err(EmbeddingError::Shape {
                expected: texts.len(),
                got: vectors.len(),
            });
        }
        Ok(vectors)
    }
}

fn model_for_name(name: &str) -> Option<fastembed::EmbeddingModel> {
    let name = name
        .trim()
        .trim_start_matches("sentence-transformers/")
        .to_ascii_lowercase();
    match name.as_str() {
        "paraphrase-multilingual-mpnet-base-v2" => Some(fastembed::EmbeddingModel::ParaphraseMLMpnetBaseV2),
        "paraphrase-multilingual-minilm-l12-v2" => Some(fastembed::EmbeddingModel::ParaphraseMLMiniLML12V2),
        "multilingual-e5-small" => Some(fastembed::EmbeddingModel::MultilingualE5Small),
        "multilingual-e5-base" => Some(fastembed::EmbeddingModel::MultilingualE5Base),
        "multilingual-e5-large" => Some(fastembed::EmbeddingModel::MultilingualE5Large),
        "all-minilm-l6-v2" => Some(fastembed::EmbeddingModel::AllMiniLML6V2),
        _ => None,
    }
}

fn unknown_model_message() -> String {
    "unsupported model; expected one of paraphrase-multilingual-mpnet-base-v2, \
     paraphrase-multilingual-minilm-l12-v2, multilingual-e5-small, multilingual-e5-base, \
     multilingual-e5-large, all-minilm-l6-v2"
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_names_map() {
        assert!(model_for_name("paraphrase-multilingual-mpnet-base-v2").is_some());
        assert!(model_for_name("sentence-transformers/paraphrase-multilingual-mpnet-base-v2").is_some());
        assert!(model_for_name("Multilingual-E5-Small").is_some());
        assert!(model_for_name("bert-base-uncased").is_none());
    }

    #[test]
    fn test_unknown_model_fails_to_load() {
        let err = FastEmbedEncoder::load("bert-base-uncased").err().unwrap();
        assert!(matches!(err, EmbeddingError::Load { .. }));
    }
}
