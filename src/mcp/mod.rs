// MCP JSON-RPC surface: protocol types and the tool dispatcher
pub mod handler;
pub mod protocol;
