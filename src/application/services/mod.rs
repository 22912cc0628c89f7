//! Service layer: the routing/retrieval/generation pipeline plus the ingestion and
//! model-management collaborators, all written against provider traits.

pub mod chunker;
mod classifier;
mod generator;
mod hub;
mod ingestion;
mod models;
mod providers;
mod retriever;
pub mod samples;

pub use chunker::{chunk_text, ChunkingConfig};
pub use classifier::{parse_routing_reply, routing_prompt, DomainClassifier, ParsedRoute};
pub use generator::{
    compose_prompt, ExpertGenerator, ExpertModels, EXPERT_ERROR_PREFIX, NO_CONTEXT_MARKER,
};
pub use hub::IntelligenceHub;
pub use ingestion::IngestionService;
pub use models::{model_is_present, ModelInventory};
pub use providers::{
    ChatBackend, ChatMessage, ChatRequest, ChatRole, DomainCollection, EmbeddingEngine,
    ModelRegistry, ResponseFormat, TextExtractor, VectorStore,
};
pub use retriever::Retriever;
