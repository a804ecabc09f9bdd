//! HTTP transport: unary JSON-RPC request/response over POST (spec §4.7
//! "HTTP transport ... no server-initiated notifications").

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use reqwest::Client;

use cortex_types::{Request, RpcId};

use crate::error::TransportError;

pub struct HttpTransport {
    client: Client,
    url: String,
    next_id: AtomicU64,
    connected: AtomicBool,
}

impl HttpTransport {
    pub fn connect(url: impl Into<String>, default_timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(default_timeout)
            .build()
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
            next_id: AtomicU64::new(1),
            connected: AtomicBool::new(true),
        })
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    pub async fn send_request(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<serde_json::Value, TransportError> {
        if !self.is_connected() {
            return Err(TransportError::Disconnected);
        }
        let id = RpcId::Number(self.next_id.fetch_add(1, Ordering::Relaxed));
        let request = Request::new(id, method, params);

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TransportError::Timeout
                } else {
                    TransportError::Connect(e.to_string())
                }
            })?;

        let body: cortex_types::Response = response
            .json()
            .await
            .map_err(|e| TransportError::Malformed(e.to_string()))?;
        body.into_result().map_err(TransportError::Remote)
    }

    /// MCP's HTTP transport carries no server-initiated notifications (spec
    /// §4.7), so this only validates the call shape before discarding it.
    pub async fn send_notification(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<(), TransportError> {
        if !self.is_connected() {
            return Err(TransportError::Disconnected);
        }
        let body = cortex_types::Notification::new(method, params);
        self.client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        Ok(())
    }

    pub async fn disconnect(&self) {
        self.connected.store(false, Ordering::Release);
    }
}
