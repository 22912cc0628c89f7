use ahash::AHasher;
use std::hash::{Hash, Hasher};

use crate::{application::services::EmbeddingEngine, domain::DomainError};

pub const DEFAULT_SIMPLE_MODEL: &str = "intelhub/simple-hash";

/// A lightweight, deterministic embedding engine that hashes lower-cased tokens
/// into a fixed-size vector. Keeps the hub usable offline and in tests; it is not
/// a semantic model.
pub struct SimpleEmbedEngine {
    model_name: String,
    dimensions: usize,
}

impl SimpleEmbedEngine {
    pub fn try_new(model_name: impl Into<String>, dimensions: usize) -> Result<Self, DomainError> {
        if dimensions == 0 {
            return Err(DomainError::validation(
                "embedding dimensions must be greater than zero",
            ));
        }
        Ok(Self {
            model_name: model_name.into(),
            dimensions: dimensions.clamp(8, 4096),
        })
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
        text.split(|c: char| c.is_whitespace() || c.is_ascii_punctuation())
            .filter(|token| !token.is_empty())
            .map(str::to_lowercase)
    }

    fn bucket(&self, token: &str) -> usize {
        let mut hasher = AHasher::default();
        token.hash(&mut hasher);
        (hasher.finish() as usize) % self.dimensions
    }

    fn embed_internal(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        for token in Self::tokenize(text) {
            vector[self.bucket(&token)] += 1.0;
        }

        // L2 normalize to keep scores in [-1, 1]
        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut vector {
                *value /= norm;
            }
        }

        vector
    }
}

impl Default for SimpleEmbedEngine {
    fn default() -> Self {
        Self {
            model_name: DEFAULT_SIMPLE_MODEL.to_string(),
            dimensions: 256,
        }
    }
}

impl EmbeddingEngine for SimpleEmbedEngine {
    fn embed(&self, model: &str, text: &str) -> Result<Vec<f32>, DomainError> {
        if !model.eq_ignore_ascii_case(&self.model_name) {
            return Err(DomainError::embedding(format!(
                "engine initialised for `{}` but `{}` requested",
                self.model_name, model
            )));
        }
        if text.trim().is_empty() {
            return Err(DomainError::validation("text payload cannot be empty"));
        }
        Ok(self.embed_internal(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[test]
    fn vectors_are_normalised_and_deterministic() {
        let engine = SimpleEmbedEngine::default();
        let a = engine.embed(DEFAULT_SIMPLE_MODEL, "GST is an indirect tax").unwrap();
        let b = engine.embed(DEFAULT_SIMPLE_MODEL, "gst IS an indirect TAX").unwrap();
        assert_eq!(a.len(), 256);
        assert_eq!(a, b);
        assert!((cosine(&a, &a) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn related_text_scores_higher() {
        let engine = SimpleEmbedEngine::default();
        let query = engine.embed(DEFAULT_SIMPLE_MODEL, "what is gst tax").unwrap();
        let tax = engine
            .embed(DEFAULT_SIMPLE_MODEL, "GST is an indirect tax on goods")
            .unwrap();
        let flu = engine
            .embed(DEFAULT_SIMPLE_MODEL, "influenza causes fever and cough")
            .unwrap();
        assert!(cosine(&query, &tax) > cosine(&query, &flu));
    }

    #[test]
    fn rejects_wrong_model_and_empty_text() {
        let engine = SimpleEmbedEngine::default();
        assert!(matches!(
            engine.embed("nomic-embed-text", "text"),
            Err(DomainError::Embedding(_))
        ));
        assert!(matches!(
            engine.embed(DEFAULT_SIMPLE_MODEL, "  "),
            Err(DomainError::Validation(_))
        ));
        assert!(SimpleEmbedEngine::try_new("m", 0).is_err());
    }
}
