//! HTTP surface of the hub: the query API plus the collection endpoints that
//! remote-mode clients proxy through.

use std::{net::SocketAddr, sync::Arc};

use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::task;
use tracing::{error, info, warn};

use crate::application::dtos::{
    AddChunksRequest, AddChunksResponse, CollectionQueryRequest, CollectionQueryResponse,
    CollectionStats, HealthStatusResponse, QueryResponse,
};
use crate::application::services::VectorStore;
use crate::application::IntelligenceHub;
use crate::domain::{Domain, DomainError};
use crate::infrastructure::storage::sled_store::collection_description;

const EMPTY_BODY: &str = "Body required: {\"query\": \"your question\"}";
const INVALID_QUERY: &str = "Body must be JSON with \"query\": \"string\"";

#[derive(Clone)]
pub struct HttpState {
    hub: Arc<IntelligenceHub>,
    store: Arc<dyn VectorStore>,
}

impl HttpState {
    pub fn new(hub: Arc<IntelligenceHub>, store: Arc<dyn VectorStore>) -> Self {
        Self { hub, store }
    }
}

pub fn router(state: HttpState) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/query", post(query).fallback(not_found))
        .route("/api/collections", get(list_collections))
        .route("/api/collections/:domain", get(collection_stats))
        .route("/api/collections/:domain/query", post(query_collection))
        .route("/api/collections/:domain/chunks", post(add_chunks))
        .fallback(not_found)
        .with_state(state)
}

/// Bind `addr` and serve until ctrl-c.
pub async fn serve(addr: SocketAddr, state: HttpState) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!(target: "intelhub::service", %addr, "intelligence hub API listening");
    info!(target: "intelhub::service", "POST http://{addr}/query with {{\"query\": \"...\"}}");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("HTTP server failed")
}

async fn health() -> Json<HealthStatusResponse> {
    Json(HealthStatusResponse::ok())
}

async fn not_found(method: Method) -> Response {
    let message = if method == Method::POST {
        "Not found. Use POST /query"
    } else {
        "Not found"
    };
    error_response(StatusCode::NOT_FOUND, message)
}

async fn query(State(state): State<HttpState>, body: Bytes) -> Response {
    if body.iter().all(u8::is_ascii_whitespace) {
        return error_response(StatusCode::BAD_REQUEST, EMPTY_BODY);
    }

    let payload: Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(_) => return error_response(StatusCode::BAD_REQUEST, "Invalid JSON"),
    };

    let query = match payload.get("query").and_then(Value::as_str) {
        Some(query) if !query.is_empty() => query.to_string(),
        _ => return error_response(StatusCode::BAD_REQUEST, INVALID_QUERY),
    };

    let hub = Arc::clone(&state.hub);
    let question = query.clone();
    match task::spawn_blocking(move || hub.run(&question)).await {
        Ok(answer) => Json(QueryResponse {
            query,
            answer: answer.answer,
        })
        .into_response(),
        Err(err) => {
            error!(target: "intelhub::service", error = %err, "query pipeline aborted");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": err.to_string(), "query": query })),
            )
                .into_response()
        }
    }
}

async fn list_collections(State(state): State<HttpState>) -> Response {
    let store = Arc::clone(&state.store);
    let result = task::spawn_blocking(move || {
        Domain::all()
            .iter()
            .map(|domain| stats_for(store.as_ref(), *domain))
            .collect::<Result<Vec<_>, DomainError>>()
    })
    .await;

    respond(result)
}

async fn collection_stats(State(state): State<HttpState>, Path(domain): Path<String>) -> Response {
    let domain = match domain.parse::<Domain>() {
        Ok(domain) => domain,
        Err(err) => return domain_error_response(err),
    };
    let store = Arc::clone(&state.store);
    respond(task::spawn_blocking(move || stats_for(store.as_ref(), domain)).await)
}

async fn query_collection(
    State(state): State<HttpState>,
    Path(domain): Path<String>,
    Json(request): Json<CollectionQueryRequest>,
) -> Response {
    let domain = match domain.parse::<Domain>() {
        Ok(domain) => domain,
        Err(err) => return domain_error_response(err),
    };
    if request.text.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "text must not be empty");
    }

    let store = Arc::clone(&state.store);
    let result = task::spawn_blocking(move || -> Result<_, DomainError> {
        let collection = store.collection(domain)?;
        let results = collection.query(&request.text, request.limit.max(1))?;
        Ok(CollectionQueryResponse { domain, results })
    })
    .await;

    respond(result)
}

async fn add_chunks(
    State(state): State<HttpState>,
    Path(domain): Path<String>,
    Json(request): Json<AddChunksRequest>,
) -> Response {
    let domain = match domain.parse::<Domain>() {
        Ok(domain) => domain,
        Err(err) => return domain_error_response(err),
    };

    let store = Arc::clone(&state.store);
    let result = task::spawn_blocking(move || -> Result<_, DomainError> {
        let added = store.collection(domain)?.add(&request.chunks)?;
        info!(target: "intelhub::service", %domain, added, "chunks added over HTTP");
        Ok(AddChunksResponse { domain, added })
    })
    .await;

    respond(result)
}

fn stats_for(store: &dyn VectorStore, domain: Domain) -> Result<CollectionStats, DomainError> {
    Ok(CollectionStats {
        domain,
        description: collection_description(domain),
        count: store.collection(domain)?.count()?,
    })
}

fn respond<T: serde::Serialize>(
    result: Result<Result<T, DomainError>, task::JoinError>,
) -> Response {
    match result {
        Ok(Ok(body)) => Json(body).into_response(),
        Ok(Err(err)) => domain_error_response(err),
        Err(err) => {
            error!(target: "intelhub::service", error = %err, "blocking task aborted");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

fn domain_error_response(err: DomainError) -> Response {
    let status = match &err {
        DomainError::Validation(_) => StatusCode::BAD_REQUEST,
        DomainError::NotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        warn!(target: "intelhub::service", error = %err, "request failed");
    }
    error_response(status, err.to_string())
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}
