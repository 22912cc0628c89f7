//! HTTP service for the intelligence hub.
//!
//! Owns the sled database so CLI and MCP processes started later can proxy
//! collection operations to it instead of fighting over the file lock.
//!
//! # Endpoints
//!
//! - `GET /`, `GET /health`: status JSON
//! - `POST /query`: `{"query": "..."}` -> `{"query", "answer"}`
//! - `GET /api/collections`, `GET /api/collections/{domain}`: collection stats
//! - `POST /api/collections/{domain}/query`: nearest chunks for a text
//! - `POST /api/collections/{domain}/chunks`: upsert chunks
//!
//! # Environment Variables
//!
//! - `INTELHUB_LOG`: log filter (default `info`)
//! - `INTELHUB_DATA_DIR`: data directory override
//! - `INTELHUB_SERVICE_HOST` / `INTELHUB_SERVICE_PORT`: bind address (default 127.0.0.1:8765)

use intelhub_lib::run_http_service;

#[tokio::main]
async fn main() {
    if let Err(err) = run_http_service().await {
        eprintln!("[intelhub::service] service failed: {err:?}");
        std::process::exit(1);
    }
}
