use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use tracing::{debug, info, warn};

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod interfaces;
pub mod settings;

use application::services::{
    ChatBackend, DomainClassifier, EmbeddingEngine, ExpertGenerator, ModelRegistry, Retriever,
    VectorStore,
};
use application::{IngestionService, IntelligenceHub, ModelInventory};
#[cfg(feature = "fastembed-engine")]
use infrastructure::FastEmbedEngine;
use infrastructure::{
    check_service_availability, http_client, DocumentExtractor, OllamaClient, OllamaEmbedEngine,
    RemoteVectorStore, SimpleEmbedEngine, SledVectorStore,
};
use settings::{AppConfig, ConfigManager, EmbeddingBackend};

const ENV_DATA_DIR: &str = "INTELHUB_DATA_DIR";
const ENV_SERVICE_HOST: &str = "INTELHUB_SERVICE_HOST";
const ENV_SERVICE_PORT: &str = "INTELHUB_SERVICE_PORT";
const ENV_LOG: &str = "INTELHUB_LOG";

/// Where collection operations are executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreMode {
    /// This process owns the sled database.
    Local,
    /// Operations are proxied to a running intelhub-service.
    Remote { url: String },
}

/// Everything a surface needs, built once at startup.
pub struct AppHandles {
    pub hub: Arc<IntelligenceHub>,
    pub ingestion: Arc<IngestionService>,
    pub inventory: Arc<ModelInventory>,
    pub store: Arc<dyn VectorStore>,
    pub config: Arc<ConfigManager>,
    pub data_dir: PathBuf,
    pub mode: StoreMode,
}

impl AppHandles {
    /// Models the Ollama server must provide for the active configuration.
    pub fn required_models(&self) -> Vec<String> {
        self.config.current().required_models()
    }
}

/// Host and port of the HTTP service, from the environment or defaults.
pub fn service_address() -> (String, u16) {
    let host = std::env::var(ENV_SERVICE_HOST)
        .ok()
        .map(|h| h.trim().to_string())
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| http_client::DEFAULT_HOST.to_string());
    let port = std::env::var(ENV_SERVICE_PORT)
        .ok()
        .and_then(|p| p.trim().parse().ok())
        .unwrap_or(http_client::DEFAULT_PORT);
    (host, port)
}

/// Read `.env` from the working directory when present.
pub fn load_dotenv() {
    match dotenvy::dotenv() {
        Ok(path) => debug!(target: "intelhub::config", path = %path.display(), "loaded .env"),
        Err(err) if err.not_found() => {}
        Err(err) => warn!(target: "intelhub::config", error = %err, "ignoring unreadable .env"),
    }
}

/// Install the global subscriber once. Output goes to stderr so stdio
/// transports keep stdout for protocol traffic.
pub fn init_tracing() {
    static INIT: std::sync::OnceLock<()> = std::sync::OnceLock::new();

    let _ = INIT.get_or_init(|| {
        let filter = std::env::var(ENV_LOG).unwrap_or_else(|_| "info".into());
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .compact()
            .try_init();
    });
}

/// Build handles, proxying to a running service when one answers its health check.
pub fn build_environment() -> Result<AppHandles> {
    let (host, port) = service_address();
    debug!(target: "intelhub::hub", %host, port, "checking for intelhub-service");

    if check_service_availability(&host, port) {
        info!(
            target: "intelhub::hub",
            url = %http_client::get_service_url(&host, port),
            "intelhub-service detected; using remote collections"
        );
        return build_remote_environment(&host, port);
    }

    debug!(target: "intelhub::hub", "no service detected; opening the local store");
    build_local_environment()
}

/// Build handles that open the sled database in this process.
pub fn build_local_environment() -> Result<AppHandles> {
    let data_dir = resolve_data_dir()?;
    let config = load_config(&data_dir)?;
    let active = config.current();
    let ollama = ollama_client(&active);

    let (embedder, model) = init_embedder(&active.embedding, &ollama)
        .context("failed to initialise embedding backend")?;

    let store_path = data_dir.join("store");
    let store = SledVectorStore::open(&store_path, embedder, model)
        .map_err(|err| anyhow!(err))
        .context("failed to open embedded store")?;

    Ok(assemble(config, Arc::new(store), ollama, data_dir, StoreMode::Local))
}

fn build_remote_environment(host: &str, port: u16) -> Result<AppHandles> {
    let data_dir = resolve_data_dir()?;
    let config = load_config(&data_dir)?;
    let ollama = ollama_client(&config.current());
    let store = Arc::new(RemoteVectorStore::new(host, port));
    let mode = StoreMode::Remote {
        url: http_client::get_service_url(host, port),
    };

    Ok(assemble(config, store, ollama, data_dir, mode))
}

fn load_config(data_dir: &std::path::Path) -> Result<Arc<ConfigManager>> {
    let manager = ConfigManager::load_with_env(data_dir)
        .map_err(|err| anyhow!(err))
        .context("failed to load configuration")?;
    Ok(Arc::new(manager))
}

fn ollama_client(config: &AppConfig) -> Arc<OllamaClient> {
    Arc::new(OllamaClient::new(
        &config.ollama_host,
        Duration::from_secs(config.request_timeout_secs.max(1)),
    ))
}

fn assemble(
    config: Arc<ConfigManager>,
    store: Arc<dyn VectorStore>,
    ollama: Arc<OllamaClient>,
    data_dir: PathBuf,
    mode: StoreMode,
) -> AppHandles {
    let active = config.current();
    let chat: Arc<dyn ChatBackend> = ollama.clone();
    let registry: Arc<dyn ModelRegistry> = ollama;

    let hub = IntelligenceHub::new(
        DomainClassifier::new(
            Arc::clone(&chat),
            active.router_model.clone(),
            active.fallback_domain,
        ),
        Retriever::new(Arc::clone(&store), active.top_k),
        ExpertGenerator::new(chat, active.expert_models()),
    );
    let ingestion = IngestionService::new(
        Arc::clone(&store),
        Arc::new(DocumentExtractor::new()),
        active.chunking(),
    );

    AppHandles {
        hub: Arc::new(hub),
        ingestion: Arc::new(ingestion),
        inventory: Arc::new(ModelInventory::new(registry)),
        store,
        config,
        data_dir,
        mode,
    }
}

fn init_embedder(
    backend: &EmbeddingBackend,
    ollama: &Arc<OllamaClient>,
) -> Result<(Arc<dyn EmbeddingEngine>, String)> {
    let model = backend.model_name().to_string();
    let engine: Arc<dyn EmbeddingEngine> = match backend {
        EmbeddingBackend::Ollama { model } => Arc::new(
            OllamaEmbedEngine::try_new(Arc::clone(ollama), model).map_err(|err| anyhow!(err))?,
        ),
        EmbeddingBackend::Simple { model, dimensions } => Arc::new(
            SimpleEmbedEngine::try_new(model.clone(), *dimensions).map_err(|err| anyhow!(err))?,
        ),
        #[cfg(feature = "fastembed-engine")]
        EmbeddingBackend::FastEmbed { model } => {
            Arc::new(FastEmbedEngine::try_new(model).map_err(|err| anyhow!(err))?)
        }
    };
    debug!(target: "intelhub::hub", backend = backend.id(), %model, "embedding engine ready");
    Ok((engine, model))
}

/// `INTELHUB_DATA_DIR`, or the per-user data directory.
pub fn resolve_data_dir() -> Result<PathBuf> {
    let dir = match std::env::var(ENV_DATA_DIR) {
        Ok(dir) if !dir.trim().is_empty() => PathBuf::from(dir.trim()),
        _ => directories::ProjectDirs::from("dev", "intelhub", "IntelHub")
            .ok_or_else(|| anyhow!("unable to determine OS data dir"))?
            .data_dir()
            .to_path_buf(),
    };
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create data directory {}", dir.display()))?;
    Ok(dir)
}

/// Serve the hub tool over MCP SSE until ctrl-c.
#[cfg(feature = "mcp-server")]
pub async fn run_mcp_bridge(config: Option<interfaces::mcp::McpServerConfig>) -> Result<()> {
    init_tracing();
    load_dotenv();

    let handles = tokio::task::spawn_blocking(build_environment)
        .await
        .context("bootstrap task failed")?
        .context("failed to bootstrap intelligence hub")?;

    let server = interfaces::mcp::spawn_mcp_server(Arc::clone(&handles.hub), config)
        .await
        .context("failed to start MCP server")?;

    info!(
        target: "intelhub::mcp",
        sse = %server.metadata().sse_url(),
        "standalone bridge running; press Ctrl+C to exit"
    );

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;

    server.shutdown();
    Ok(())
}

/// Serve the hub tool over MCP stdio.
#[cfg(feature = "mcp-server")]
pub async fn run_mcp_stdio() -> Result<()> {
    init_tracing();
    load_dotenv();

    let handles = tokio::task::spawn_blocking(build_environment)
        .await
        .context("bootstrap task failed")?
        .context("failed to bootstrap intelligence hub")?;

    interfaces::mcp::run_mcp_stdio_server(handles.hub)
        .await
        .context("MCP stdio server failed")
}

/// Run the HTTP API on `INTELHUB_SERVICE_HOST:INTELHUB_SERVICE_PORT`.
#[cfg(feature = "http-service")]
pub async fn run_http_service() -> Result<()> {
    init_tracing();
    load_dotenv();

    // The service owns the database; never proxy to another instance.
    let handles = tokio::task::spawn_blocking(build_local_environment)
        .await
        .context("bootstrap task failed")?
        .context("failed to bootstrap intelligence hub")?;

    let (host, port) = service_address();
    let addr: std::net::SocketAddr = format!("{host}:{port}")
        .parse()
        .with_context(|| format!("invalid bind address {host}:{port}"))?;

    info!(
        target: "intelhub::service",
        data_dir = %handles.data_dir.display(),
        version = env!("CARGO_PKG_VERSION"),
        "starting intelhub-service"
    );

    let state = interfaces::http::HttpState::new(handles.hub, handles.store);
    interfaces::http::serve(addr, state).await
}
