use std::sync::Arc;

use crate::{
    application::services::EmbeddingEngine, domain::DomainError,
    infrastructure::http_client::OllamaClient,
};

pub const DEFAULT_OLLAMA_EMBED_MODEL: &str = "nomic-embed-text";

/// Embedding engine that delegates to a running Ollama server (`/api/embed`).
pub struct OllamaEmbedEngine {
    client: Arc<OllamaClient>,
    model_name: String,
}

impl OllamaEmbedEngine {
    pub fn try_new(
        client: Arc<OllamaClient>,
        model_name: impl AsRef<str>,
    ) -> Result<Self, DomainError> {
        let model_name = model_name.as_ref().trim();
        if model_name.is_empty() {
            return Err(DomainError::validation("ollama embedding model name cannot be empty"));
        }
        Ok(Self {
            client,
            model_name: model_name.to_string(),
        })
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    fn check_model(&self, model: &str) -> Result<(), DomainError> {
        if model.eq_ignore_ascii_case(&self.model_name) {
            Ok(())
        } else {
            Err(DomainError::embedding(format!(
                "engine initialised for `{}` but `{}` requested",
                self.model_name, model
            )))
        }
    }
}

impl EmbeddingEngine for OllamaEmbedEngine {
    fn embed(&self, model: &str, text: &str) -> Result<Vec<f32>, DomainError> {
        if text.trim().is_empty() {
            return Err(DomainError::validation("text payload cannot be empty"));
        }
        self.embed_batch(model, &[text.to_string()])?
            .pop()
            .ok_or_else(|| DomainError::embedding("ollama returned no embedding"))
    }

    fn embed_batch(&self, model: &str, texts: &[String]) -> Result<Vec<Vec<f32>>, DomainError> {
        self.check_model(model)?;
        self.client.embed(&self.model_name, texts)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn client() -> Arc<OllamaClient> {
        Arc::new(OllamaClient::new("http://127.0.0.1:9", Duration::from_secs(1)))
    }

    #[test]
    fn rejects_empty_model_name() {
        assert!(OllamaEmbedEngine::try_new(client(), "  ").is_err());
    }

    #[test]
    fn rejects_mismatched_model_before_any_request() {
        let engine = OllamaEmbedEngine::try_new(client(), DEFAULT_OLLAMA_EMBED_MODEL).unwrap();
        let err = engine.embed("all-minilm", "hello").unwrap_err();
        assert!(err.to_string().contains("all-minilm"));
    }

    #[test]
    fn empty_batch_needs_no_server() {
        let engine = OllamaEmbedEngine::try_new(client(), DEFAULT_OLLAMA_EMBED_MODEL).unwrap();
        assert!(engine
            .embed_batch(DEFAULT_OLLAMA_EMBED_MODEL, &[])
            .unwrap()
            .is_empty());
    }
}
