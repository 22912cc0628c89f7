#![cfg(feature = "http-service")]

mod common;

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use common::{hub, FixtureStore, ScriptedChat};
use intelhub_lib::application::services::VectorStore;
use intelhub_lib::domain::{Domain, DomainError, NewChunk};
use intelhub_lib::infrastructure::{SimpleEmbedEngine, SledVectorStore};
use intelhub_lib::interfaces::http::{router, HttpState};

fn finance_chat() -> Arc<ScriptedChat> {
    Arc::new(ScriptedChat::new(
        |_| Ok(r#"{"domain":"finance"}"#.to_string()),
        |_| Ok("GST is a tax on goods and services.".to_string()),
    ))
}

fn app_with(chat: Arc<ScriptedChat>, store: Arc<dyn VectorStore>) -> Router {
    let hub = Arc::new(hub(chat, Arc::clone(&store)));
    router(HttpState::new(hub, store))
}

fn app() -> Router {
    app_with(finance_chat(), Arc::new(FixtureStore::default()))
}

async fn send(
    app: Router,
    method: Method,
    uri: &str,
    body: impl Into<Body>,
) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body.into())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn health_endpoints_report_ok() {
    for uri in ["/", "/health"] {
        let (status, body) = send(app(), Method::GET, uri, Body::empty()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert!(body["message"].is_string());
    }
}

#[tokio::test]
async fn query_returns_answer_and_echoes_query() {
    let (status, body) = send(
        app(),
        Method::POST,
        "/query",
        json!({ "query": "What is GST?" }).to_string(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({ "query": "What is GST?", "answer": "GST is a tax on goods and services." })
    );
}

#[tokio::test]
async fn query_rejects_bad_bodies() {
    let cases = [
        ("", "Body required: {\"query\": \"your question\"}"),
        ("   ", "Body required: {\"query\": \"your question\"}"),
        ("{not json", "Invalid JSON"),
        ("{\"question\": \"hi\"}", "Body must be JSON with \"query\": \"string\""),
        ("{\"query\": \"\"}", "Body must be JSON with \"query\": \"string\""),
        ("{\"query\": 42}", "Body must be JSON with \"query\": \"string\""),
    ];

    for (raw, message) in cases {
        let (status, body) = send(app(), Method::POST, "/query", raw).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body {raw:?}");
        assert_eq!(body["error"], message, "body {raw:?}");
    }
}

#[tokio::test]
async fn whitespace_query_passes_through_unchanged() {
    let chat = Arc::new(ScriptedChat::new(
        |_| Ok(r#"{"domain":"finance"}"#.to_string()),
        |request| {
            assert!(request.user_content().contains("User question:    \n"));
            Ok("Please ask a question.".to_string())
        },
    ));
    let app = app_with(Arc::clone(&chat), Arc::new(FixtureStore::default()));

    let (status, body) = send(app.clone(), Method::POST, "/query", r#"{"query":"   "}"#).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "query": "   ", "answer": "Please ask a question." }));

    let (status, body) = send(app, Method::POST, "/query", r#"{"query":"  What is GST? "}"#).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["query"], "  What is GST? ");
    assert!(chat
        .expert_requests()
        .iter()
        .any(|r| r.user_content().contains("User question:   What is GST? \n")));
}

#[tokio::test]
async fn pipeline_panic_becomes_internal_error() {
    let chat = Arc::new(ScriptedChat::new(
        |_| Ok(r#"{"domain":"finance"}"#.to_string()),
        |_| panic!("expert crashed"),
    ));
    let app = app_with(chat, Arc::new(FixtureStore::default()));

    let (status, body) = send(app, Method::POST, "/query", r#"{"query":"What is GST?"}"#).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["query"], "What is GST?");
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn unknown_routes_are_not_found() {
    let (status, body) = send(app(), Method::GET, "/nope", Body::empty()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Not found");

    let (status, body) = send(app(), Method::POST, "/ask", "{}").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Not found. Use POST /query");

    let (status, body) = send(app(), Method::GET, "/query", Body::empty()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Not found");
}

#[tokio::test]
async fn collection_endpoints_add_count_and_query() {
    let dir = tempfile::tempdir().unwrap();
    let embedder = Arc::new(SimpleEmbedEngine::try_new("test-hash", 128).unwrap());
    let store: Arc<dyn VectorStore> =
        Arc::new(SledVectorStore::open(dir.path(), embedder, "test-hash").unwrap());
    let app = app_with(finance_chat(), store);

    let chunks = vec![
        NewChunk::new("GST is an indirect tax on goods and services.", "gst.md"),
        NewChunk::new("Income tax slabs changed this year.", "income.md"),
    ];
    let (status, body) = send(
        app.clone(),
        Method::POST,
        "/api/collections/finance/chunks",
        json!({ "chunks": chunks }).to_string(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["added"], 2);
    assert_eq!(body["domain"], "finance");

    let (status, body) = send(
        app.clone(),
        Method::GET,
        "/api/collections/finance",
        Body::empty(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);
    assert_eq!(body["description"], "Documents for domain: finance");

    let (status, body) = send(
        app.clone(),
        Method::POST,
        "/api/collections/finance/query",
        json!({ "text": "indirect tax on goods", "limit": 1 }).to_string(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["source"], "gst.md");

    let (status, body) = send(app.clone(), Method::GET, "/api/collections", Body::empty()).await;
    assert_eq!(status, StatusCode::OK);
    let counts: Vec<(String, u64)> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|c| (c["domain"].as_str().unwrap().to_string(), c["count"].as_u64().unwrap()))
        .collect();
    assert_eq!(
        counts,
        Domain::all()
            .iter()
            .map(|d| (d.to_string(), if *d == Domain::Finance { 2 } else { 0 }))
            .collect::<Vec<_>>()
    );

    let (status, body) = send(app, Method::GET, "/api/collections/sports", Body::empty()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("sports"));
}

#[tokio::test]
async fn storage_errors_map_to_server_error() {
    let app = app_with(finance_chat(), Arc::new(FixtureStore::failing()));

    let (status, body) = send(app, Method::GET, "/api/collections/news", Body::empty()).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body["error"],
        DomainError::storage("index unavailable").to_string()
    );
}
