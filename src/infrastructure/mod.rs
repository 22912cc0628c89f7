//! Infrastructure layer wiring concrete adapters (embeddings, storage, model backend).

pub mod documents;
pub mod embeddings;
pub mod http_client;
pub mod storage;

pub use documents::DocumentExtractor;
#[cfg(feature = "fastembed-engine")]
pub use embeddings::FastEmbedEngine;
pub use embeddings::{OllamaEmbedEngine, SimpleEmbedEngine};
pub use http_client::{check_service_availability, OllamaClient, RemoteVectorStore};
pub use storage::SledVectorStore;
