use std::str::FromStr;

use fastembed::{EmbeddingModel, TextEmbedding, TextInitOptions};
use parking_lot::Mutex;

use crate::{application::services::EmbeddingEngine, domain::DomainError};

/// In-process embeddings through `fastembed`. The loaded ONNX session lives
/// behind a `Mutex` because inference takes `&mut self`.
pub struct FastEmbedEngine {
    model_label: String,
    dimensions: usize,
    inner: Mutex<TextEmbedding>,
}

impl FastEmbedEngine {
    /// Load a model such as `BAAI/bge-small-en-v1.5`, downloading it on first use.
    pub fn try_new(model_name: impl AsRef<str>) -> Result<Self, DomainError> {
        let label = model_name.as_ref().trim();
        if label.is_empty() {
            return Err(DomainError::validation("fastembed model name cannot be empty"));
        }

        let embedding_model = EmbeddingModel::from_str(label).map_err(|err| {
            DomainError::embedding(format!("unknown fastembed model `{label}`: {err}"))
        })?;
        let dimensions = TextEmbedding::get_model_info(&embedding_model)
            .map_err(|err| DomainError::embedding(format!("no metadata for `{label}`: {err}")))?
            .dim;
        let text_embedding = TextEmbedding::try_new(TextInitOptions::new(embedding_model))
            .map_err(|err| DomainError::embedding(format!("failed to load `{label}`: {err}")))?;

        Ok(Self {
            model_label: label.to_string(),
            dimensions,
            inner: Mutex::new(text_embedding),
        })
    }
}

impl EmbeddingEngine for FastEmbedEngine {
    fn embed(&self, model: &str, text: &str) -> Result<Vec<f32>, DomainError> {
        if text.trim().is_empty() {
            return Err(DomainError::validation("text payload cannot be empty"));
        }
        self.embed_batch(model, &[text.to_string()])?
            .pop()
            .ok_or_else(|| DomainError::embedding("fastembed returned no embedding"))
    }

    fn embed_batch(&self, model: &str, texts: &[String]) -> Result<Vec<Vec<f32>>, DomainError> {
        if !model.eq_ignore_ascii_case(&self.model_label) {
            return Err(DomainError::embedding(format!(
                "engine initialised for `{}` but `{}` requested",
                self.model_label, model
            )));
        }
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let vectors = self
            .inner
            .lock()
            .embed(texts.to_vec(), None)
            .map_err(|err| DomainError::embedding(format!("fastembed inference failed: {err}")))?;

        if let Some(bad) = vectors.iter().find(|v| v.len() != self.dimensions) {
            return Err(DomainError::embedding(format!(
                "unexpected embedding dimension (expected {}, got {})",
                self.dimensions,
                bad.len()
            )));
        }

        Ok(vectors)
    }
}
