//! Transport-level failure taxonomy (spec §4.7/§7).

use cortex_types::RpcError;

/// Failures raised by a [`crate::Transport`] below the JSON-RPC method level.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum TransportError {
    /// Spawning the child process (stdio) or dialing the endpoint (HTTP/WS) failed.
    #[error("failed to connect: {0}")]
    Connect(String),
    /// A send/recv against an already-established channel failed.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The remote peer returned a JSON-RPC error object.
    #[error("remote error: {0}")]
    Remote(#[from] RpcError),
    /// The pending request's timer expired before a response arrived.
    #[error("request timed out waiting for a response")]
    Timeout,
    /// The transport was disconnected while a request was still pending.
    #[error("transport disconnected")]
    Disconnected,
    /// A response or notification line could not be parsed as JSON-RPC.
    #[error("malformed message: {0}")]
    Malformed(String),
}

impl TransportError {
    /// `Timeout`/`Io` reflect transient conditions worth retrying;
    /// `Connect`/`Malformed`/`Remote` point at a configuration or protocol
    /// mismatch that won't resolve itself on retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TransportError::Timeout | TransportError::Io(_) | TransportError::Disconnected)
    }
}
