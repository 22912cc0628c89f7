use intelhub_lib::run_mcp_bridge;

/// MCP server over SSE. Bind address and paths come from
/// `INTELHUB_MCP_BIND_ADDR`, `INTELHUB_MCP_SSE_PATH` and `INTELHUB_MCP_POST_PATH`.
#[tokio::main]
async fn main() {
    if let Err(err) = run_mcp_bridge(None).await {
        eprintln!("[intelhub::mcp-bridge] runtime failed: {err:?}");
        std::process::exit(1);
    }
}
