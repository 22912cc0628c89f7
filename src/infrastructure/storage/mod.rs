//! Storage adapters for the hub.
//!
//! The embedded sled store keeps one tree per domain and ranks chunks with an
//! in-memory cosine scan.

pub mod sled_store;

pub use sled_store::{SledCollection, SledVectorStore};
