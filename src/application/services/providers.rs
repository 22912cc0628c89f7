use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::domain::{Domain, DomainError, NewChunk, ScoredChunk};

/// Abstraction over any embedding engine (Ollama, FastEmbed, the offline hash engine).
pub trait EmbeddingEngine: Send + Sync {
    fn embed(&self, model: &str, text: &str) -> Result<Vec<f32>, DomainError>;

    /// Embed several texts; engines with a native batch API should override this.
    fn embed_batch(&self, model: &str, texts: &[String]) -> Result<Vec<Vec<f32>>, DomainError> {
        texts.iter().map(|text| self.embed(model, text)).collect()
    }
}

/// One partition of the vector index. Embeds internally on both write and query.
pub trait DomainCollection: Send + Sync {
    fn domain(&self) -> Domain;

    /// Upsert chunks by id. Returns the number written.
    fn add(&self, chunks: &[NewChunk]) -> Result<usize, DomainError>;

    /// Nearest-neighbour query by text, most similar first. An empty collection
    /// yields an empty list.
    fn query(&self, text: &str, limit: usize) -> Result<Vec<ScoredChunk>, DomainError>;

    fn count(&self) -> Result<usize, DomainError>;
}

/// Contract for the vector storage engine holding every domain collection.
pub trait VectorStore: Send + Sync {
    /// Get-or-create the collection for `domain`.
    fn collection(&self, domain: Domain) -> Result<Arc<dyn DomainCollection>, DomainError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

/// Requested shape of the completion text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResponseFormat {
    #[default]
    Text,
    /// Ask the backend to constrain output to JSON when it supports that.
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub format: ResponseFormat,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            format: ResponseFormat::Text,
        }
    }

    pub fn with_format(mut self, format: ResponseFormat) -> Self {
        self.format = format;
        self
    }

    /// Concatenated content of every user message; handy for prompt assertions.
    pub fn user_content(&self) -> String {
        self.messages
            .iter()
            .filter(|m| m.role == ChatRole::User)
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Completion backend shared by the router and the expert generator.
pub trait ChatBackend: Send + Sync {
    /// Blocking call; returns the assistant message text.
    fn chat(&self, request: &ChatRequest) -> Result<String, DomainError>;
}

/// Model catalogue operations used by the model presence checker.
pub trait ModelRegistry: Send + Sync {
    fn list_models(&self) -> Result<Vec<String>, DomainError>;

    /// Pull a model, reporting each status line through `progress`.
    fn pull_model(&self, model: &str, progress: &mut dyn FnMut(&str)) -> Result<(), DomainError>;
}

/// Turns a document on disk into plain text.
pub trait TextExtractor: Send + Sync {
    fn supports(&self, path: &std::path::Path) -> bool;

    fn extract(&self, path: &std::path::Path) -> Result<String, DomainError>;
}
