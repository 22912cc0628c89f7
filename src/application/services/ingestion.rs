use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};
use walkdir::WalkDir;

use super::chunker::{chunk_text, ChunkingConfig};
use super::{TextExtractor, VectorStore};
use crate::application::dtos::{FileIngest, IngestFailure, IngestReport};
use crate::domain::{Domain, DomainError, NewChunk};

/// Loads documents, chunks them and upserts the chunks into a domain collection.
#[derive(Clone)]
pub struct IngestionService {
    store: Arc<dyn VectorStore>,
    extractor: Arc<dyn TextExtractor>,
    chunking: ChunkingConfig,
}

impl IngestionService {
    pub fn new(
        store: Arc<dyn VectorStore>,
        extractor: Arc<dyn TextExtractor>,
        chunking: ChunkingConfig,
    ) -> Self {
        Self {
            store,
            extractor,
            chunking,
        }
    }

    /// Same store and extractor, different window settings.
    pub fn with_chunking(mut self, chunking: ChunkingConfig) -> Self {
        self.chunking = chunking;
        self
    }

    pub fn chunking(&self) -> ChunkingConfig {
        self.chunking
    }

    /// Chunk `text` and store it under `source`. Returns the number of chunks added.
    pub fn ingest_text(
        &self,
        domain: Domain,
        source: &str,
        text: &str,
    ) -> Result<usize, DomainError> {
        let chunks: Vec<NewChunk> = chunk_text(text, self.chunking.size, self.chunking.overlap)
            .into_iter()
            .map(|chunk| NewChunk::new(chunk, source))
            .collect();

        if chunks.is_empty() {
            return Ok(0);
        }

        let collection = self.store.collection(domain)?;
        let added = collection.add(&chunks)?;
        info!(target: "intelhub::ingest", %domain, source, chunks = added, "document ingested");
        Ok(added)
    }

    pub fn ingest_file(&self, domain: Domain, path: &Path) -> Result<usize, DomainError> {
        if !path.is_file() {
            return Err(DomainError::not_found(format!(
                "file not found: {}",
                path.display()
            )));
        }

        let text = self.extractor.extract(path)?;
        let source = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        self.ingest_text(domain, &source, &text)
    }

    /// Ingest every supported document below `dir`, in path order. A failing file
    /// is recorded in the report and does not stop the run.
    pub fn ingest_directory(
        &self,
        domain: Domain,
        dir: &Path,
    ) -> Result<IngestReport, DomainError> {
        if !dir.is_dir() {
            return Err(DomainError::not_found(format!(
                "directory not found: {}",
                dir.display()
            )));
        }

        let mut report = IngestReport::new(domain);

        let entries = WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| self.extractor.supports(entry.path()));

        for entry in entries {
            let path = entry.path();
            match self.ingest_file(domain, path) {
                Ok(chunks) => report.files.push(FileIngest {
                    path: path.display().to_string(),
                    chunks,
                }),
                Err(err) => {
                    warn!(
                        target: "intelhub::ingest",
                        path = %path.display(),
                        error = %err,
                        "skipping document"
                    );
                    report.failures.push(IngestFailure {
                        path: path.display().to_string(),
                        error: err.to_string(),
                    });
                }
            }
        }

        Ok(report)
    }
}
