//! JSON-RPC transports for the MCP connection layer (spec §4.7).
//!
//! Three wire-level variants sharing one capability set: `send_request`,
//! `send_notification`, a registered notification handler, `is_connected`,
//! and `disconnect`. Modeled as a closed enum rather than a trait object —
//! the variant set is fixed by spec §4.7 and each leg has a materially
//! different connection story (child process vs unary HTTP vs full-duplex
//! socket).

mod correlation;
mod error;
mod http;
mod stdio;
mod websocket;

use std::sync::Arc;
use std::time::Duration;

use cortex_config::{McpServerConfig, McpTransportKind};
use cortex_types::Notification;

pub use error::TransportError;
pub use http::HttpTransport;
pub use stdio::StdioTransport;
pub use websocket::WebSocketTransport;

/// Callback invoked with every server-initiated notification (spec §4.7
/// "Notification -> deliver to the registered notification handler").
pub type NotificationHandler = Arc<dyn Fn(Notification) + Send + Sync>;

/// A connected JSON-RPC transport, in one of the three shapes spec §4.7 defines.
pub enum Transport {
    Stdio(Arc<StdioTransport>),
    Http(Arc<HttpTransport>),
    WebSocket(Arc<WebSocketTransport>),
}

impl Transport {
    /// Connect per `config.transport`, dispatching to the matching variant
    /// (spec §4.7 "Connect()").
    pub async fn connect(
        config: &McpServerConfig,
        default_timeout: Duration,
        on_notification: NotificationHandler,
    ) -> Result<Self, TransportError> {
        match config.transport {
            McpTransportKind::Stdio => {
                let command = config
                    .command
                    .as_deref()
                    .ok_or_else(|| TransportError::Connect("stdio transport requires `command`".into()))?;
                let transport =
                    StdioTransport::connect(command, &config.args, &config.env, default_timeout, on_notification)
                        .await?;
                Ok(Transport::Stdio(transport))
            }
            McpTransportKind::Http => {
                let url = config
                    .url
                    .as_deref()
                    .ok_or_else(|| TransportError::Connect("http transport requires `url`".into()))?;
                Ok(Transport::Http(Arc::new(HttpTransport::connect(url, default_timeout)?)))
            }
            McpTransportKind::Websocket => {
                let url = config
                    .url
                    .as_deref()
                    .ok_or_else(|| TransportError::Connect("websocket transport requires `url`".into()))?;
                let transport = WebSocketTransport::connect(url, default_timeout, on_notification).await?;
                Ok(Transport::WebSocket(transport))
            }
        }
    }

    /// `SendRequest(req) -> ResponseFuture` (spec §4.7), awaited directly.
    pub async fn send_request(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<serde_json::Value, TransportError> {
        match self {
            Transport::Stdio(transport) => transport.send_request(method, params).await,
            Transport::Http(transport) => transport.send_request(method, params).await,
            Transport::WebSocket(transport) => transport.send_request(method, params).await,
        }
    }

    /// `SendNotification(method, params)` (spec §4.7).
    pub async fn send_notification(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<(), TransportError> {
        match self {
            Transport::Stdio(transport) => transport.send_notification(method, params).await,
            Transport::Http(transport) => transport.send_notification(method, params).await,
            Transport::WebSocket(transport) => transport.send_notification(method, params).await,
        }
    }

    /// `IsConnected()` (spec §4.7).
    pub fn is_connected(&self) -> bool {
        match self {
            Transport::Stdio(transport) => transport.is_connected(),
            Transport::Http(transport) => transport.is_connected(),
            Transport::WebSocket(transport) => transport.is_connected(),
        }
    }

    /// `Disconnect()`/`Close()` (spec §4.7) — releases the process, socket,
    /// or pending-request table on every path, including ones reached after
    /// an error.
    pub async fn disconnect(&self) {
        match self {
            Transport::Stdio(transport) => transport.disconnect().await,
            Transport::Http(transport) => transport.disconnect().await,
            Transport::WebSocket(transport) => transport.disconnect().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[tokio::test]
    async fn stdio_without_command_fails_fast() {
        let config = McpServerConfig {
            transport: McpTransportKind::Stdio,
            command: None,
            args: vec![],
            env: HashMap::new(),
            url: None,
            enabled: true,
        };
        let err = Transport::connect(&config, Duration::from_secs(1), Arc::new(|_| {}))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Connect(_)));
    }

    #[tokio::test]
    async fn http_without_url_fails_fast() {
        let config = McpServerConfig {
            transport: McpTransportKind::Http,
            command: None,
            args: vec![],
            env: HashMap::new(),
            url: None,
            enabled: true,
        };
        let err = Transport::connect(&config, Duration::from_secs(1), Arc::new(|_| {}))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Connect(_)));
    }

    #[tokio::test]
    async fn stdio_echo_server_round_trips_a_request() {
        let config = McpServerConfig {
            transport: McpTransportKind::Stdio,
            command: Some("cat".to_string()),
            args: vec![],
            env: HashMap::new(),
            url: None,
            enabled: true,
        };
        let transport = Transport::connect(&config, Duration::from_millis(200), Arc::new(|_| {}))
            .await
            .unwrap();
        // `cat` echoes our request line back verbatim, which is itself a
        // well-formed `Request`, not a `Response` — so it's discarded as
        // malformed by our dispatcher and the call times out. This still
        // proves the transport connects, writes, and tears down cleanly.
        let result = transport.send_request("ping", None).await;
        assert!(matches!(result, Err(TransportError::Timeout)));
        transport.disconnect().await;
        assert!(!transport.is_connected());
    }
}
