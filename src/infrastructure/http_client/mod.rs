//! HTTP clients: the Ollama model backend and the remote collection proxy used
//! when an `intelhub-service` instance already owns the database.

mod ollama;
mod remote_store;

pub use ollama::OllamaClient;
pub use remote_store::RemoteVectorStore;

use serde::Deserialize;
use tracing::debug;

use crate::domain::DomainError;

/// Default service host
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default service port
pub const DEFAULT_PORT: u16 = 8765;

/// Health check response from the service
#[derive(Debug, Deserialize)]
struct HealthResponse {
    status: String,
}

/// Check if an intelhub-service is running and accessible
pub fn check_service_availability(host: &str, port: u16) -> bool {
    let url = format!("{}/health", get_service_url(host, port));

    match ureq::get(&url)
        .timeout(std::time::Duration::from_secs(2))
        .call()
    {
        Ok(response) => {
            if response.status() != 200 {
                return false;
            }
            match response.into_json::<HealthResponse>() {
                Ok(health) => {
                    debug!(target: "intelhub::http_client", status = %health.status, "service health");
                    health.status == "ok"
                }
                Err(err) => {
                    debug!(target: "intelhub::http_client", error = %err, "unparseable health response");
                    false
                }
            }
        }
        Err(err) => {
            debug!(target: "intelhub::http_client", url = %url, error = %err, "service not reachable");
            false
        }
    }
}

/// Get the service base URL
pub fn get_service_url(host: &str, port: u16) -> String {
    format!("http://{}:{}", host, port)
}

/// Error body used both by Ollama and by intelhub-service.
#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Convert ureq errors into backend errors, keeping the server's message.
pub fn handle_http_error(error: ureq::Error) -> DomainError {
    DomainError::backend(http_error_message(error))
}

/// Human readable message for a failed request.
pub fn http_error_message(error: ureq::Error) -> String {
    match error {
        ureq::Error::Status(code, response) => {
            let body = response.into_string().unwrap_or_default();
            match serde_json::from_str::<ErrorResponse>(&body) {
                Ok(err_response) => format!("HTTP {}: {}", code, err_response.error),
                Err(_) if body.trim().is_empty() => format!("HTTP error: {}", code),
                Err(_) => format!("HTTP {}: {}", code, body.trim()),
            }
        }
        ureq::Error::Transport(transport) => format!("transport error: {}", transport),
    }
}
