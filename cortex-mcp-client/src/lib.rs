//! MCP connection lifecycle: initialize handshake, catalog discovery, and
//! the `CallTool`/`ReadResource`/`GetPrompt` operations (spec §4.8).

mod connection;
mod error;

pub use connection::{Catalog, McpConnection, ServerCapabilities, ServerInfo};
pub use error::McpError;
