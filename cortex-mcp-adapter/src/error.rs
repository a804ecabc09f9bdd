//! Adapter failure taxonomy (spec §4.10).
//!
//! Per-tool/per-resource failures inside a batch are not errors here — spec
//! §4.10 step 1 turns those into inline `Tool <name> failed: <msg>` lines.
//! This enum covers only requests that can't be served at all: an unknown
//! name, or the owning connection having gone away.

use cortex_mcp_client::McpError;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum AdapterError {
    #[error("unknown tool '{0}'")]
    UnknownTool(String),
    #[error("unknown prompt '{0}'")]
    UnknownPrompt(String),
    #[error("unknown resource '{0}'")]
    UnknownResource(String),
    #[error("connection '{0}' is not registered")]
    ConnectionUnavailable(String),
    #[error(transparent)]
    Mcp(#[from] McpError),
}
