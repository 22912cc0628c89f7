use std::sync::Arc;

use tracing::debug;

use super::VectorStore;
use crate::domain::{Domain, DomainError};

/// Domain-scoped retrieval over the vector store.
pub struct Retriever {
    store: Arc<dyn VectorStore>,
    default_top_k: usize,
}

impl Retriever {
    pub fn new(store: Arc<dyn VectorStore>, default_top_k: usize) -> Self {
        Self {
            store,
            default_top_k: default_top_k.max(1),
        }
    }

    pub fn default_top_k(&self) -> usize {
        self.default_top_k
    }

    /// Top-k chunk texts for `query` from the `domain` collection, most relevant
    /// first. An empty collection is not an error.
    pub fn retrieve(
        &self,
        domain: Domain,
        query: &str,
        top_k: Option<usize>,
    ) -> Result<Vec<String>, DomainError> {
        let limit = top_k.unwrap_or(self.default_top_k).max(1);
        let collection = self.store.collection(domain)?;

        if collection.count()? == 0 {
            debug!(target: "intelhub::retrieval", %domain, "collection is empty");
            return Ok(Vec::new());
        }

        let hits = collection.query(query, limit)?;
        debug!(
            target: "intelhub::retrieval",
            %domain,
            hits = hits.len(),
            top_score = hits.first().map(|h| h.score),
            "retrieved chunks"
        );

        Ok(hits.into_iter().take(limit).map(|hit| hit.text).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::DomainCollection;
    use crate::domain::{NewChunk, ScoredChunk};
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use uuid::Uuid;

    struct FixedCollection {
        domain: Domain,
        texts: Vec<String>,
    }

    impl DomainCollection for FixedCollection {
        fn domain(&self) -> Domain {
            self.domain
        }

        fn add(&self, chunks: &[NewChunk]) -> Result<usize, DomainError> {
            Ok(chunks.len())
        }

        fn query(&self, _text: &str, limit: usize) -> Result<Vec<ScoredChunk>, DomainError> {
            Ok(self
                .texts
                .iter()
                .enumerate()
                .take(limit)
                .map(|(i, text)| ScoredChunk {
                    id: Uuid::new_v4(),
                    text: text.clone(),
                    source: "fixture".into(),
                    score: 1.0 - i as f32 * 0.1,
                })
                .collect())
        }

        fn count(&self) -> Result<usize, DomainError> {
            Ok(self.texts.len())
        }
    }

    #[derive(Default)]
    struct FixtureStore {
        texts: HashMap<Domain, Vec<String>>,
        requested: Mutex<Vec<Domain>>,
    }

    impl VectorStore for FixtureStore {
        fn collection(&self, domain: Domain) -> Result<Arc<dyn DomainCollection>, DomainError> {
            self.requested.lock().push(domain);
            Ok(Arc::new(FixedCollection {
                domain,
                texts: self.texts.get(&domain).cloned().unwrap_or_default(),
            }))
        }
    }

    fn store_with(domain: Domain, texts: &[&str]) -> Arc<FixtureStore> {
        let mut store = FixtureStore::default();
        store
            .texts
            .insert(domain, texts.iter().map(|t| t.to_string()).collect());
        Arc::new(store)
    }

    #[test]
    fn empty_collection_returns_empty_result() {
        let retriever = Retriever::new(Arc::new(FixtureStore::default()), 5);
        let chunks = retriever.retrieve(Domain::Medical, "fever", None).unwrap();
        assert!(chunks.is_empty());
    }

    #[test]
    fn uses_default_top_k_when_absent() {
        let store = store_with(Domain::Finance, &["a", "b", "c", "d"]);
        let retriever = Retriever::new(store, 2);
        let chunks = retriever.retrieve(Domain::Finance, "tax", None).unwrap();
        assert_eq!(chunks, vec!["a", "b"]);
    }

    #[test]
    fn explicit_top_k_overrides_default() {
        let store = store_with(Domain::Finance, &["a", "b", "c", "d"]);
        let retriever = Retriever::new(store, 2);
        let chunks = retriever.retrieve(Domain::Finance, "tax", Some(3)).unwrap();
        assert_eq!(chunks, vec!["a", "b", "c"]);
    }

    #[test]
    fn only_the_routed_domain_is_queried() {
        let store = store_with(Domain::Finance, &["finance only"]);
        let retriever = Retriever::new(store.clone(), 5);
        let chunks = retriever.retrieve(Domain::News, "tax", None).unwrap();
        assert!(chunks.is_empty());
        assert_eq!(*store.requested.lock(), vec![Domain::News]);
    }
}
