//! Domain layer: core entities and value objects for the intelligence hub.

pub mod errors;
pub mod models;

pub use errors::DomainError;
pub use models::{
    ChunkEmbedding, ChunkRecord, Domain, FallbackReason, NewChunk, RoutingDecision, ScoredChunk,
};
