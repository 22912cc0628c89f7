#[cfg(feature = "mcp-server")]
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::domain::{Domain, NewChunk, RoutingDecision, ScoredChunk};

/// Payload accepted by the MCP tool.
#[cfg_attr(feature = "mcp-server", derive(JsonSchema))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    /// Natural-language question for the hub.
    pub query: String,
}

/// Response body of `POST /query`.
#[cfg_attr(feature = "mcp-server", derive(JsonSchema))]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub query: String,
    pub answer: String,
}

/// Pipeline result with the auxiliary fields describing how it was produced.
#[cfg_attr(feature = "mcp-server", derive(JsonSchema))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubAnswer {
    pub query: String,
    pub domain: Domain,
    pub routing: RoutingDecision,
    pub expert_model: String,
    pub chunks_retrieved: usize,
    pub retrieval_error: Option<String>,
    pub answer: String,
}

impl From<HubAnswer> for QueryResponse {
    fn from(value: HubAnswer) -> Self {
        Self {
            query: value.query,
            answer: value.answer,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileIngest {
    pub path: String,
    pub chunks: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestFailure {
    pub path: String,
    pub error: String,
}

/// Outcome of a directory ingestion run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestReport {
    pub domain: Domain,
    pub files: Vec<FileIngest>,
    pub failures: Vec<IngestFailure>,
}

impl IngestReport {
    pub fn new(domain: Domain) -> Self {
        Self {
            domain,
            files: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn total_chunks(&self) -> usize {
        self.files.iter().map(|file| file.chunks).sum()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelReport {
    pub installed: Vec<String>,
    pub already_present: Vec<String>,
    pub pulled: Vec<String>,
}

/// Body of the collection query endpoint used by remote mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionQueryRequest {
    pub text: String,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionQueryResponse {
    pub domain: Domain,
    pub results: Vec<ScoredChunk>,
}

/// Body of the chunk upsert endpoint used by remote mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddChunksRequest {
    pub chunks: Vec<NewChunk>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddChunksResponse {
    pub domain: Domain,
    pub added: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionStats {
    pub domain: Domain,
    pub description: String,
    pub count: usize,
}

/// Health/readiness report for diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatusResponse {
    pub status: String,
    pub message: String,
}

impl HealthStatusResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".into(),
            message: "Intelligence Hub API. POST /query with {\"query\": \"...\"}".into(),
        }
    }
}

const fn default_limit() -> usize {
    5
}
