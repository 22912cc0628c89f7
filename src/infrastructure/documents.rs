//! Plain-text extraction for the document formats the ingestion pipeline accepts.

use std::path::Path;

use tracing::debug;

use crate::{application::services::TextExtractor, domain::DomainError};

const SUPPORTED_EXTENSIONS: [&str; 3] = ["pdf", "txt", "md"];

/// Reads `.pdf`, `.txt` and `.md` files.
#[derive(Debug, Default, Clone, Copy)]
pub struct DocumentExtractor;

impl DocumentExtractor {
    pub fn new() -> Self {
        Self
    }

    fn extension(path: &Path) -> Option<String> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
    }

    fn extract_pdf(path: &Path) -> Result<String, DomainError> {
        // pdf-extract panics on some malformed fonts; report those as a failed file.
        let result = std::panic::catch_unwind(|| pdf_extract::extract_text(path));
        let raw = match result {
            Ok(Ok(text)) => text,
            Ok(Err(err)) => {
                return Err(DomainError::other(format!(
                    "failed to read pdf {}: {err}",
                    path.display()
                )))
            }
            Err(_) => {
                return Err(DomainError::other(format!(
                    "pdf parser aborted on {}",
                    path.display()
                )))
            }
        };

        Ok(join_pages(&raw))
    }
}

/// Pages arrive separated by form feeds; trim each and join with a blank line.
fn join_pages(raw: &str) -> String {
    raw.split('\u{c}')
        .map(str::trim)
        .filter(|page| !page.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

impl TextExtractor for DocumentExtractor {
    fn supports(&self, path: &Path) -> bool {
        Self::extension(path)
            .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
            .unwrap_or(false)
    }

    fn extract(&self, path: &Path) -> Result<String, DomainError> {
        if !path.is_file() {
            return Err(DomainError::not_found(format!("{} is not a file", path.display())));
        }

        let text = match Self::extension(path).as_deref() {
            Some("pdf") => Self::extract_pdf(path)?,
            Some("txt") | Some("md") => std::fs::read_to_string(path).map_err(|err| {
                DomainError::other(format!("failed to read {}: {err}", path.display()))
            })?,
            _ => {
                return Err(DomainError::validation(format!(
                    "unsupported document type: {}",
                    path.display()
                )))
            }
        };

        debug!(target: "intelhub::ingest", path = %path.display(), chars = text.len(), "extracted text");
        Ok(text)
    }
}
