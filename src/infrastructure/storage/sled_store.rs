use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use bincode::Options;
use parking_lot::{Mutex, RwLock};
use serde::de::DeserializeOwned;
use sled::{Config, Db, Tree};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    application::services::{DomainCollection, EmbeddingEngine, VectorStore},
    domain::{ChunkEmbedding, ChunkRecord, Domain, DomainError, NewChunk, ScoredChunk},
};

const TREE_PREFIX: &str = "chunks/";
const META_TREE: &str = "collections";

/// Embedded vector store backed by `sled`.
///
/// Every domain gets its own tree, created the first time the domain is
/// touched. Records carry their full embedding and similarity is computed by a
/// linear cosine scan, which is fine for the document volumes a local hub sees.
pub struct SledVectorStore {
    db: Db,
    meta: Tree,
    embedder: Arc<dyn EmbeddingEngine>,
    model: String,
    collections: RwLock<HashMap<Domain, Arc<SledCollection>>>,
}

impl SledVectorStore {
    /// Opens (or creates) a sled database rooted at `data_dir`.
    pub fn open(
        data_dir: impl AsRef<Path>,
        embedder: Arc<dyn EmbeddingEngine>,
        model: impl Into<String>,
    ) -> Result<Self, DomainError> {
        let dir = data_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir).map_err(|err| {
            DomainError::storage(format!("failed to create data directory {:?}: {err}", dir))
        })?;

        let db = Config::default()
            .path(&dir)
            .cache_capacity(64 * 1024 * 1024)
            .mode(sled::Mode::HighThroughput)
            .open()
            .map_err(|err| DomainError::storage(format!("failed to open sled db: {err}")))?;

        let meta = db
            .open_tree(META_TREE)
            .map_err(|err| DomainError::storage(format!("failed to open metadata tree: {err}")))?;

        Ok(Self {
            db,
            meta,
            embedder,
            model: model.into(),
            collections: RwLock::new(HashMap::new()),
        })
    }

    fn open_collection(&self, domain: Domain) -> Result<SledCollection, DomainError> {
        let tree = self
            .db
            .open_tree(format!("{TREE_PREFIX}{domain}"))
            .map_err(|err| DomainError::storage(format!("failed to open {domain} tree: {err}")))?;

        let description = collection_description(domain);
        self.meta
            .insert(domain.as_str(), description.as_bytes())
            .map_err(|err| {
                DomainError::storage(format!("failed to record {domain} metadata: {err}"))
            })?;

        debug!(target: "intelhub::storage", %domain, "opened collection");

        Ok(SledCollection {
            domain,
            tree,
            embedder: Arc::clone(&self.embedder),
            model: self.model.clone(),
            write_lock: Mutex::new(()),
        })
    }
}

impl VectorStore for SledVectorStore {
    fn collection(&self, domain: Domain) -> Result<Arc<dyn DomainCollection>, DomainError> {
        if let Some(existing) = self.collections.read().get(&domain) {
            return Ok(Arc::clone(existing) as Arc<dyn DomainCollection>);
        }

        let mut collections = self.collections.write();
        // Another caller may have created it between the two locks.
        if let Some(existing) = collections.get(&domain) {
            return Ok(Arc::clone(existing) as Arc<dyn DomainCollection>);
        }

        let created = Arc::new(self.open_collection(domain)?);
        collections.insert(domain, Arc::clone(&created));
        Ok(created as Arc<dyn DomainCollection>)
    }
}

/// Metadata attached to each collection.
pub fn collection_description(domain: Domain) -> String {
    format!("Documents for domain: {domain}")
}

/// One domain partition of the sled store.
pub struct SledCollection {
    domain: Domain,
    tree: Tree,
    embedder: Arc<dyn EmbeddingEngine>,
    model: String,
    write_lock: Mutex<()>,
}

impl SledCollection {
    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, DomainError> {
        bincode::options()
            .with_fixint_encoding()
            .allow_trailing_bytes()
            .serialize(value)
            .map_err(|err| DomainError::storage(format!("serialization error: {err}")))
    }

    fn deserialize<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, DomainError> {
        bincode::options()
            .with_fixint_encoding()
            .allow_trailing_bytes()
            .deserialize(bytes)
            .map_err(|err| DomainError::storage(format!("deserialization error: {err}")))
    }

    fn encode_key(id: &Uuid) -> [u8; 16] {
        *id.as_bytes()
    }

    fn records(&self) -> impl Iterator<Item = Result<ChunkRecord, DomainError>> + '_ {
        self.tree.iter().map(|entry| {
            let (_, value) = entry.map_err(|err| {
                DomainError::storage(format!("failed to read chunk record: {err}"))
            })?;
            Self::deserialize(value.as_ref())
        })
    }
}

impl DomainCollection for SledCollection {
    fn domain(&self) -> Domain {
        self.domain
    }

    fn add(&self, chunks: &[NewChunk]) -> Result<usize, DomainError> {
        let chunks: Vec<&NewChunk> = chunks.iter().filter(|c| !c.text.trim().is_empty()).collect();
        if chunks.is_empty() {
            return Ok(0);
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = self.embedder.embed_batch(&self.model, &texts)?;
        if vectors.len() != chunks.len() {
            return Err(DomainError::embedding(format!(
                "embedded {} of {} chunks",
                vectors.len(),
                chunks.len()
            )));
        }

        let _guard = self.write_lock.lock();
        let mut batch = sled::Batch::default();
        for (chunk, vector) in chunks.iter().zip(vectors) {
            let record = ChunkRecord::new(
                self.domain,
                (*chunk).clone(),
                ChunkEmbedding::new(self.model.clone(), vector),
            );
            batch.insert(Self::encode_key(&record.id).to_vec(), Self::serialize(&record)?);
        }

        self.tree
            .apply_batch(batch)
            .map_err(|err| DomainError::storage(format!("failed to write chunks: {err}")))?;
        self.tree
            .flush()
            .map_err(|err| DomainError::storage(format!("failed to flush chunks: {err}")))?;

        debug!(target: "intelhub::storage", domain = %self.domain, added = chunks.len(), "stored chunks");
        Ok(chunks.len())
    }

    fn query(&self, text: &str, limit: usize) -> Result<Vec<ScoredChunk>, DomainError> {
        if limit == 0 || self.tree.is_empty() {
            return Ok(Vec::new());
        }

        let query = self.embedder.embed(&self.model, text)?;
        let mut scored: Vec<(ChunkRecord, f32)> = Vec::new();
        let mut skipped = 0usize;

        for record in self.records() {
            let record = record?;
            if !record.embedding.model.eq_ignore_ascii_case(&self.model) {
                skipped += 1;
                continue;
            }
            let score = cosine_similarity(&query, &record.embedding.vector)?;
            scored.push((record, score));
        }

        if skipped > 0 {
            warn!(
                target: "intelhub::storage",
                domain = %self.domain,
                skipped,
                model = %self.model,
                "ignored chunks embedded with a different model"
            );
        }

        // Stable sort: equal scores keep key order.
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(limit);

        Ok(scored
            .into_iter()
            .map(|(record, score)| ScoredChunk::from_record(record, score))
            .collect())
    }

    fn count(&self) -> Result<usize, DomainError> {
        Ok(self.tree.len())
    }
}

fn cosine_similarity(query: &[f32], candidate: &[f32]) -> Result<f32, DomainError> {
    if query.len() != candidate.len() {
        return Err(DomainError::embedding(format!(
            "embedding dimension mismatch: query {} vs candidate {}",
            query.len(),
            candidate.len()
        )));
    }

    let mut dot = 0.0f32;
    let mut q_norm = 0.0f32;
    let mut c_norm = 0.0f32;

    for (q, c) in query.iter().zip(candidate.iter()) {
        dot += q * c;
        q_norm += q * q;
        c_norm += c * c;
    }

    let denom = q_norm.sqrt() * c_norm.sqrt();
    if denom == 0.0 {
        return Ok(0.0);
    }

    Ok((dot / denom).clamp(-1.0, 1.0))
}
