use intelhub_lib::run_mcp_stdio;

/// MCP server over stdin/stdout for clients that spawn the process themselves.
///
/// ```json
/// {
///   "mcpServers": {
///     "intelhub": {
///       "command": "/path/to/mcp-stdio",
///       "args": []
///     }
///   }
/// }
/// ```
///
/// Logs go to stderr; set `INTELHUB_LOG` to change the filter.
#[tokio::main]
async fn main() {
    if let Err(err) = run_mcp_stdio().await {
        eprintln!("[intelhub::mcp-stdio] runtime failed: {err:?}");
        std::process::exit(1);
    }
}
