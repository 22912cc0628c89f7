use std::{env, net::SocketAddr, str::FromStr, sync::Arc, time::Duration};

use anyhow::{Context as AnyhowContext, Result};
use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Content, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router,
    transport::sse_server::{SseServer, SseServerConfig},
    ErrorData as McpError, ServerHandler,
};
use serde_json::{json, Value};
use tokio::task;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::application::{dtos::QueryRequest, IntelligenceHub};

const ENV_BIND_ADDR: &str = "INTELHUB_MCP_BIND_ADDR";
const ENV_SSE_PATH: &str = "INTELHUB_MCP_SSE_PATH";
const ENV_POST_PATH: &str = "INTELHUB_MCP_POST_PATH";
const ENV_KEEP_ALIVE_SECS: &str = "INTELHUB_MCP_KEEP_ALIVE_SECS";

pub const TOOL_NAME: &str = "query_intelligence_hub";

/// Static metadata describing the active MCP endpoints.
#[derive(Debug, Clone)]
pub struct McpEndpointMetadata {
    pub bind_addr: SocketAddr,
    pub sse_path: String,
    pub post_path: String,
}

impl McpEndpointMetadata {
    pub fn post_url(&self) -> String {
        format!("http://{}{}", self.bind_addr, self.post_path)
    }

    pub fn sse_url(&self) -> String {
        format!("http://{}{}", self.bind_addr, self.sse_path)
    }
}

/// Runtime configuration for the MCP SSE server.
#[derive(Debug, Clone)]
pub struct McpServerConfig {
    pub bind_addr: SocketAddr,
    pub sse_path: String,
    pub post_path: String,
    pub keep_alive: Duration,
}

impl Default for McpServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 5210)),
            sse_path: "/sse".into(),
            post_path: "/message".into(),
            keep_alive: Duration::from_secs(30),
        }
    }
}

impl McpServerConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(raw) = env::var(ENV_BIND_ADDR) {
            if let Ok(addr) = SocketAddr::from_str(raw.trim()) {
                cfg.bind_addr = addr;
            }
        }

        if let Ok(path) = env::var(ENV_SSE_PATH) {
            cfg.sse_path = normalize_path(&path);
        }

        if let Ok(path) = env::var(ENV_POST_PATH) {
            cfg.post_path = normalize_path(&path);
        }

        if let Ok(raw) = env::var(ENV_KEEP_ALIVE_SECS) {
            if let Ok(seconds) = raw.trim().parse::<u64>() {
                cfg.keep_alive = Duration::from_secs(seconds.max(5));
            }
        }

        cfg
    }

    fn into_pair(self, cancel_token: CancellationToken) -> (SseServerConfig, McpEndpointMetadata) {
        (
            SseServerConfig {
                bind: self.bind_addr,
                sse_path: self.sse_path.clone(),
                post_path: self.post_path.clone(),
                ct: cancel_token,
                sse_keep_alive: Some(self.keep_alive),
            },
            McpEndpointMetadata {
                bind_addr: self.bind_addr,
                sse_path: self.sse_path,
                post_path: self.post_path,
            },
        )
    }
}

fn normalize_path(input: &str) -> String {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return "/".into();
    }
    if trimmed.starts_with('/') {
        trimmed.into()
    } else {
        format!("/{}", trimmed)
    }
}

/// Handle to the background SSE server. Dropping it shuts the server down.
pub struct McpServerHandle {
    root_token: CancellationToken,
    worker_token: CancellationToken,
    metadata: McpEndpointMetadata,
}

impl McpServerHandle {
    pub fn shutdown(&self) {
        self.worker_token.cancel();
        self.root_token.cancel();
    }

    pub fn metadata(&self) -> &McpEndpointMetadata {
        &self.metadata
    }
}

impl Drop for McpServerHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Bind the SSE transport and serve the hub tool on it.
pub async fn spawn_mcp_server(
    hub: Arc<IntelligenceHub>,
    config: Option<McpServerConfig>,
) -> Result<McpServerHandle> {
    let config = config.unwrap_or_else(McpServerConfig::from_env);
    let root_token = CancellationToken::new();
    let (sse_config, metadata) = config.into_pair(root_token.clone());

    let sse_server = SseServer::serve_with_config(sse_config)
        .await
        .context("failed to bind MCP SSE listener")?;

    let worker_token = sse_server.with_service(move || IntelHubMcpServer::new(Arc::clone(&hub)));

    info!(
        target: "intelhub::mcp",
        bind = %metadata.bind_addr,
        sse = %metadata.sse_url(),
        post = %metadata.post_url(),
        "MCP SSE server listening"
    );

    Ok(McpServerHandle {
        root_token,
        worker_token,
        metadata,
    })
}

#[derive(Clone)]
pub struct IntelHubMcpServer {
    hub: Arc<IntelligenceHub>,
    tool_router: ToolRouter<Self>,
}

impl IntelHubMcpServer {
    pub fn new(hub: Arc<IntelligenceHub>) -> Self {
        Self {
            hub,
            tool_router: Self::tool_router(),
        }
    }

    /// Runs the pipeline on the query as given. The answer text is the tool's
    /// content; the full report rides along as structured content.
    async fn answer(&self, payload: QueryRequest) -> Result<CallToolResult, McpError> {
        let hub = Arc::clone(&self.hub);
        let query = payload.query;
        let answer = task::spawn_blocking(move || hub.run(&query))
            .await
            .map_err(|err| internal_error(err.to_string()))?;

        let text = answer.answer.clone();
        let report = serde_json::to_value(answer).map_err(|err| internal_error(err.to_string()))?;
        let mut result = CallToolResult::success(vec![Content::text(text)]);
        result.structured_content = Some(report);
        Ok(result)
    }
}

#[tool_router]
impl IntelHubMcpServer {
    #[tool(
        name = "query_intelligence_hub",
        description = "Answer a question in finance, medical or news using local documents and the matching expert model."
    )]
    async fn query_intelligence_hub(
        &self,
        Parameters(payload): Parameters<QueryRequest>,
    ) -> Result<CallToolResult, McpError> {
        self.answer(payload).await
    }
}

#[tool_handler]
impl ServerHandler for IntelHubMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: rmcp::model::ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: rmcp::model::Implementation {
                name: "intelhub-mcp".into(),
                title: Some("Local Intelligence Hub".into()),
                version: env!("CARGO_PKG_VERSION").into(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Call query_intelligence_hub with a natural-language question. The hub routes it \
                 to a finance, medical or news expert, grounds the answer in locally ingested \
                 documents and returns the answer text along with the chosen domain."
                    .into(),
            ),
        }
    }
}

fn internal_error(message: impl Into<String>) -> McpError {
    McpError::internal_error(
        "internal MCP server error",
        Some(json!({ "detail": message.into() })),
    )
}

/// Serve MCP over stdin/stdout, one JSON-RPC message per line.
pub async fn run_mcp_stdio_server(hub: Arc<IntelligenceHub>) -> Result<()> {
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

    info!(target: "intelhub::mcp", "starting MCP stdio server");

    let server = IntelHubMcpServer::new(hub);
    let mut stdout = tokio::io::stdout();
    let mut reader = BufReader::new(tokio::io::stdin());
    let mut line = String::new();

    loop {
        line.clear();
        let read = reader
            .read_line(&mut line)
            .await
            .context("failed to read from stdin")?;
        if read == 0 {
            info!(target: "intelhub::mcp", "client closed stdio connection");
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        debug!(target: "intelhub::mcp", request = %trimmed, "received");

        let response = match serde_json::from_str::<Value>(trimmed) {
            Ok(request) => handle_jsonrpc_request(&server, request).await,
            Err(err) => {
                error!(target: "intelhub::mcp", error = %err, "failed to parse JSON-RPC request");
                Some(json!({
                    "jsonrpc": "2.0",
                    "id": Value::Null,
                    "error": { "code": -32700, "message": format!("Parse error: {}", err) }
                }))
            }
        };

        // Notifications get no reply.
        let Some(response) = response else {
            continue;
        };

        let mut payload = response.to_string();
        payload.push('\n');
        stdout
            .write_all(payload.as_bytes())
            .await
            .context("failed to write response")?;
        stdout.flush().await.context("failed to flush stdout")?;
    }

    info!(target: "intelhub::mcp", "MCP stdio server terminated");
    Ok(())
}

/// Dispatch one JSON-RPC message. Returns `None` for notifications.
pub async fn handle_jsonrpc_request(server: &IntelHubMcpServer, request: Value) -> Option<Value> {
    let id = request.get("id").cloned();
    let method = request.get("method").and_then(Value::as_str).unwrap_or("");

    if id.is_none() && method.starts_with("notifications/") {
        debug!(target: "intelhub::mcp", method, "notification");
        return None;
    }

    let outcome: Result<Value, McpError> = match method {
        "initialize" => {
            let info = server.get_info();
            Ok(json!({
                "protocolVersion": info.protocol_version,
                "capabilities": info.capabilities,
                "serverInfo": info.server_info,
                "instructions": info.instructions
            }))
        }
        "ping" => Ok(json!({})),
        "tools/list" => Ok(json!({ "tools": server.tool_router.list_all() })),
        "tools/call" => call_tool(server, request.get("params")).await,
        _ => Err(McpError::new(
            rmcp::model::ErrorCode::METHOD_NOT_FOUND,
            format!("Method not found: {}", method),
            None,
        )),
    };

    Some(match outcome {
        Ok(result) => json!({ "jsonrpc": "2.0", "id": id, "result": result }),
        Err(err) => json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": { "code": err.code, "message": err.message, "data": err.data }
        }),
    })
}

async fn call_tool(server: &IntelHubMcpServer, params: Option<&Value>) -> Result<Value, McpError> {
    let params = params.ok_or_else(|| McpError::invalid_params("Invalid params", None))?;
    let tool_name = params.get("name").and_then(Value::as_str).unwrap_or("");
    let arguments = params.get("arguments").cloned().unwrap_or_else(|| json!({}));

    if tool_name != TOOL_NAME {
        return Err(McpError::invalid_params(
            format!("Unknown tool: {}", tool_name),
            None,
        ));
    }

    let request = serde_json::from_value::<QueryRequest>(arguments).map_err(|err| {
        McpError::invalid_params(
            format!("Invalid {TOOL_NAME} arguments"),
            Some(json!({ "detail": err.to_string() })),
        )
    })?;

    let result = server.answer(request).await?;
    serde_json::to_value(result).map_err(|err| internal_error(err.to_string()))
}
