//! Blocking client for the Ollama HTTP API.

use std::io::{BufRead, BufReader};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{handle_http_error, http_error_message};
use crate::application::services::{
    ChatBackend, ChatMessage, ChatRequest, ModelRegistry, ResponseFormat,
};
use crate::domain::DomainError;

pub const DEFAULT_OLLAMA_HOST: &str = "http://localhost:11434";

#[derive(Debug, Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'static str>,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    #[serde(default)]
    message: Option<OllamaMessage>,
}

#[derive(Debug, Deserialize)]
struct OllamaMessage {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Serialize)]
struct OllamaEmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct OllamaEmbedResponse {
    #[serde(default)]
    embeddings: Vec<Vec<f32>>,
}

#[derive(Debug, Deserialize)]
struct OllamaTagsResponse {
    #[serde(default)]
    models: Vec<OllamaModelTag>,
}

#[derive(Debug, Deserialize)]
struct OllamaModelTag {
    #[serde(default)]
    name: String,
    #[serde(default)]
    model: String,
}

#[derive(Debug, Deserialize)]
struct OllamaPullStatus {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Thin wrapper over a `ureq::Agent` pointed at one Ollama host.
pub struct OllamaClient {
    base_url: String,
    agent: ureq::Agent,
    pull_agent: ureq::Agent,
}

impl OllamaClient {
    pub fn new(host: &str, timeout: Duration) -> Self {
        let base_url = host.trim().trim_end_matches('/').to_string();
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        // Pulls stream for minutes; only bound the connect phase.
        let pull_agent = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(10))
            .build();

        Self {
            base_url,
            agent,
            pull_agent,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/api/{}", self.base_url, path)
    }

    /// `POST /api/embed` for a batch of inputs.
    pub fn embed(&self, model: &str, texts: &[String]) -> Result<Vec<Vec<f32>>, DomainError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let response = self
            .agent
            .post(&self.api_url("embed"))
            .send_json(OllamaEmbedRequest { model, input: texts })
            .map_err(|err| DomainError::embedding(http_error_message(err)))?;

        let body: OllamaEmbedResponse = response
            .into_json()
            .map_err(|err| DomainError::embedding(format!("invalid embed response: {err}")))?;

        if body.embeddings.len() != texts.len() {
            return Err(DomainError::embedding(format!(
                "expected {} embeddings from `{}`, got {}",
                texts.len(),
                model,
                body.embeddings.len()
            )));
        }

        Ok(body.embeddings)
    }
}

impl ChatBackend for OllamaClient {
    fn chat(&self, request: &ChatRequest) -> Result<String, DomainError> {
        let payload = OllamaChatRequest {
            model: &request.model,
            messages: &request.messages,
            stream: false,
            format: match request.format {
                ResponseFormat::Json => Some("json"),
                ResponseFormat::Text => None,
            },
        };

        debug!(target: "intelhub::ollama", model = %request.model, "chat request");

        let response = self
            .agent
            .post(&self.api_url("chat"))
            .send_json(&payload)
            .map_err(handle_http_error)?;

        let body: OllamaChatResponse = response
            .into_json()
            .map_err(|err| DomainError::backend(format!("invalid chat response: {err}")))?;

        Ok(body.message.map(|m| m.content).unwrap_or_default())
    }
}

impl ModelRegistry for OllamaClient {
    fn list_models(&self) -> Result<Vec<String>, DomainError> {
        let response = self
            .agent
            .get(&self.api_url("tags"))
            .call()
            .map_err(handle_http_error)?;

        let body: OllamaTagsResponse = response
            .into_json()
            .map_err(|err| DomainError::backend(format!("invalid tags response: {err}")))?;

        Ok(body
            .models
            .into_iter()
            .map(|tag| if tag.name.is_empty() { tag.model } else { tag.name })
            .filter(|name| !name.is_empty())
            .collect())
    }

    fn pull_model(&self, model: &str, progress: &mut dyn FnMut(&str)) -> Result<(), DomainError> {
        let response = self
            .pull_agent
            .post(&self.api_url("pull"))
            .send_json(serde_json::json!({ "name": model }))
            .map_err(handle_http_error)?;

        let reader = BufReader::new(response.into_reader());
        for line in reader.lines() {
            let line =
                line.map_err(|err| DomainError::backend(format!("pull stream failed: {err}")))?;
            if line.trim().is_empty() {
                continue;
            }
            // The stream may end without a final JSON object; tolerate stray lines.
            let Ok(status) = serde_json::from_str::<OllamaPullStatus>(&line) else {
                continue;
            };
            if let Some(error) = status.error {
                return Err(DomainError::backend(format!("pull of `{model}` failed: {error}")));
            }
            if let Some(status) = status.status {
                progress(&status);
            }
        }

        Ok(())
    }
}
