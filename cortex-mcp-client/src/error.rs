//! MCP connection failure taxonomy (spec §4.8/§7).

use cortex_mcp_transport::TransportError;

/// Failures raised by [`crate::McpConnection`].
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum McpError {
    /// The transport itself failed to connect or send/receive.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    /// The server rejected every protocol version we offered, or its
    /// `initialize` result was malformed (spec §4.8 step 1).
    #[error("protocol negotiation failed: {0}")]
    Protocol(String),
    /// A discovery or operation result did not match its expected shape.
    #[error("malformed response from server: {0}")]
    Malformed(String),
    /// `CallTool`/`ReadResource`/`GetPrompt` targeted a name the catalog
    /// doesn't have.
    #[error("unknown {kind} '{name}'")]
    NotFound { kind: &'static str, name: String },
}

impl McpError {
    /// `Transport` failures reflect the underlying retry policy; everything
    /// else is a protocol/lookup mismatch that retrying won't fix.
    pub fn is_retryable(&self) -> bool {
        match self {
            McpError::Transport(source) => source.is_retryable(),
            McpError::Protocol(_) | McpError::Malformed(_) | McpError::NotFound { .. } => false,
        }
    }
}
