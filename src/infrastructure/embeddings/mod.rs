pub mod ollama_engine;
pub mod simple_engine;

#[cfg(feature = "fastembed-engine")]
pub mod fastembed_engine;

#[cfg(feature = "fastembed-engine")]
pub use fastembed_engine::FastEmbedEngine;
pub use ollama_engine::{OllamaEmbedEngine, DEFAULT_OLLAMA_EMBED_MODEL};
pub use simple_engine::{SimpleEmbedEngine, DEFAULT_SIMPLE_MODEL};
