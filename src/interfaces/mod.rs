//! Transport adapters over the hub. Each is gated by the feature that pulls in
//! its framework.

#[cfg(feature = "http-service")]
pub mod http;
#[cfg(feature = "mcp-server")]
pub mod mcp;
