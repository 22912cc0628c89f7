use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
#[cfg(feature = "mcp-server")]
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::DomainError;

mod routing;

pub use routing::{FallbackReason, RoutingDecision};

/// Subject-matter areas the hub knows about. Each selects an expert model and a
/// retrieval partition.
#[cfg_attr(feature = "mcp-server", derive(JsonSchema))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Finance,
    Medical,
    News,
}

impl Domain {
    /// Every domain in configuration order.
    pub const ALL: [Domain; 3] = [Domain::Finance, Domain::Medical, Domain::News];

    pub fn all() -> &'static [Domain] {
        &Self::ALL
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Finance => "finance",
            Self::Medical => "medical",
            Self::News => "news",
        }
    }

    /// Comma separated list used in prompts and error messages.
    pub fn names() -> String {
        Self::ALL
            .iter()
            .map(Domain::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Domain {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|domain| domain.as_str() == normalized)
            .ok_or_else(|| {
                DomainError::validation(format!(
                    "domain must be one of {}, got `{}`",
                    Domain::names(),
                    s.trim()
                ))
            })
    }
}

/// Vector representation of a chunk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkEmbedding {
    pub model: String,
    pub vector: Vec<f32>,
}

impl ChunkEmbedding {
    pub fn new(model: impl Into<String>, vector: Vec<f32>) -> Self {
        Self {
            model: model.into(),
            vector,
        }
    }
}

/// A chunk produced at ingestion time, before the collection embeds it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewChunk {
    pub id: Uuid,
    pub text: String,
    pub source: String,
}

impl NewChunk {
    pub fn new(text: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into().trim().to_string(),
            source: sanitize_single_line(source),
        }
    }
}

/// Stored unit of retrievable text. Immutable once persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub id: Uuid,
    pub domain: Domain,
    pub text: String,
    pub source: String,
    pub embedding: ChunkEmbedding,
    pub created_at: DateTime<Utc>,
}

impl ChunkRecord {
    pub fn new(domain: Domain, chunk: NewChunk, embedding: ChunkEmbedding) -> Self {
        Self {
            id: chunk.id,
            domain,
            text: chunk.text,
            source: chunk.source,
            embedding,
            created_at: Utc::now(),
        }
    }
}

/// A retrieval hit with its similarity score.
#[cfg_attr(feature = "mcp-server", derive(JsonSchema))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredChunk {
    #[cfg_attr(feature = "mcp-server", schemars(with = "String"))]
    pub id: Uuid,
    pub text: String,
    pub source: String,
    pub score: f32,
}

impl ScoredChunk {
    pub fn from_record(record: ChunkRecord, score: f32) -> Self {
        Self {
            id: record.id,
            text: record.text,
            source: record.source,
            score,
        }
    }
}

fn sanitize_single_line(input: impl Into<String>) -> String {
    input
        .into()
        .lines()
        .next()
        .unwrap_or_default()
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_domain_case_insensitively() {
        assert_eq!(" Finance ".parse::<Domain>().unwrap(), Domain::Finance);
        assert_eq!("NEWS".parse::<Domain>().unwrap(), Domain::News);
        assert!(matches!(
            "sports".parse::<Domain>(),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn domain_serializes_lowercase() {
        let json = serde_json::to_string(&Domain::Medical).unwrap();
        assert_eq!(json, "\"medical\"");
        assert_eq!(Domain::names(), "finance, medical, news");
    }

    #[test]
    fn new_chunk_trims_text_and_source() {
        let chunk = NewChunk::new("  GST is an indirect tax.  \n", " report.pdf\nextra");
        assert_eq!(chunk.text, "GST is an indirect tax.");
        assert_eq!(chunk.source, "report.pdf");
    }
}
