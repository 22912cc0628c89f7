//! Vector store that proxies collection operations to a running intelhub-service.

use std::sync::Arc;

use crate::application::dtos::{
    AddChunksRequest, AddChunksResponse, CollectionQueryRequest, CollectionQueryResponse,
    CollectionStats,
};
use crate::application::services::{DomainCollection, VectorStore};
use crate::domain::{Domain, DomainError, NewChunk, ScoredChunk};

use super::{get_service_url, http_error_message};

/// Client side of the `/api/collections` endpoints.
pub struct RemoteVectorStore {
    base_url: String,
    agent: ureq::Agent,
}

impl RemoteVectorStore {
    pub fn new(host: &str, port: u16) -> Self {
        let base_url = get_service_url(host, port);
        let agent = ureq::AgentBuilder::new()
            .timeout(std::time::Duration::from_secs(30))
            .build();

        Self { base_url, agent }
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/api/{}", self.base_url, path)
    }
}

impl VectorStore for RemoteVectorStore {
    fn collection(&self, domain: Domain) -> Result<Arc<dyn DomainCollection>, DomainError> {
        Ok(Arc::new(RemoteCollection {
            domain,
            url: self.api_url(&format!("collections/{domain}")),
            agent: self.agent.clone(),
        }))
    }
}

/// One remote domain collection. Embedding happens on the service side.
pub struct RemoteCollection {
    domain: Domain,
    url: String,
    agent: ureq::Agent,
}

impl DomainCollection for RemoteCollection {
    fn domain(&self) -> Domain {
        self.domain
    }

    fn add(&self, chunks: &[NewChunk]) -> Result<usize, DomainError> {
        if chunks.is_empty() {
            return Ok(0);
        }

        let body = AddChunksRequest {
            chunks: chunks.to_vec(),
        };
        let response: AddChunksResponse = self
            .agent
            .post(&format!("{}/chunks", self.url))
            .send_json(&body)
            .map_err(|e| {
                DomainError::storage(format!("failed to add chunks: {}", http_error_message(e)))
            })?
            .into_json()
            .map_err(|e| DomainError::storage(format!("failed to parse add response: {}", e)))?;

        Ok(response.added)
    }

    fn query(&self, text: &str, limit: usize) -> Result<Vec<ScoredChunk>, DomainError> {
        let body = CollectionQueryRequest {
            text: text.to_string(),
            limit,
        };
        let response: CollectionQueryResponse = self
            .agent
            .post(&format!("{}/query", self.url))
            .send_json(&body)
            .map_err(|e| DomainError::storage(format!("query failed: {}", http_error_message(e))))?
            .into_json()
            .map_err(|e| DomainError::storage(format!("failed to parse query response: {}", e)))?;

        Ok(response.results)
    }

    fn count(&self) -> Result<usize, DomainError> {
        let stats: CollectionStats = self
            .agent
            .get(&self.url)
            .call()
            .map_err(|e| {
                DomainError::storage(format!(
                    "failed to read collection: {}",
                    http_error_message(e)
                ))
            })?
            .into_json()
            .map_err(|e| DomainError::storage(format!("failed to parse collection stats: {}", e)))?;

        Ok(stats.count)
    }
}
