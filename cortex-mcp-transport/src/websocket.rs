//! WebSocket transport: full-duplex equivalent of stdio framing (spec §4.7
//! "WebSocket transport"), one JSON-RPC message per text frame.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use cortex_types::{Message, Notification, Request};

use crate::correlation::{id_as_u64, CorrelationTable, SharedCorrelationTable};
use crate::error::TransportError;
use crate::NotificationHandler;

type WsSink = futures::stream::SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, WsMessage>;

pub struct WebSocketTransport {
    sink: Mutex<WsSink>,
    pending: SharedCorrelationTable,
    connected: AtomicBool,
    reader: Mutex<Option<JoinHandle<()>>>,
    default_timeout: Duration,
}

impl WebSocketTransport {
    pub async fn connect(
        url: &str,
        default_timeout: Duration,
        on_notification: NotificationHandler,
    ) -> Result<Arc<Self>, TransportError> {
        let (stream, _response) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        let (sink, source) = stream.split();

        let transport = Arc::new(Self {
            sink: Mutex::new(sink),
            pending: Arc::new(CorrelationTable::new()),
            connected: AtomicBool::new(true),
            reader: Mutex::new(None),
            default_timeout,
        });

        let handle = tokio::spawn(read_loop(source, Arc::clone(&transport.pending), on_notification));
        *transport.reader.lock().await = Some(handle);

        Ok(transport)
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
        let (id, rx) = self.pending.register().await;
        let request = Request::new(id.clone(), method, params);
        self.write_frame(&request).await?;

        match tokio::time::timeout(self.default_timeout, rx).await {
            Ok(Ok(Ok(result))) => Ok(result),
            Ok(Ok(Err(rpc_error))) => Err(TransportError::Remote(rpc_error)),
            Ok(Err(_)) => Err(TransportError::Disconnected),
            Err(_) => {
                if let Some(numeric) = id_as_u64(&id) {
                    self.pending.remove(numeric).await;
                }
                Err(TransportError::Timeout)
            }
        }
    }

    pub async fn send_notification(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<(), TransportError> {
        if !self.is_connected() {
            return Err(TransportError::Disconnected);
        }
        let notification = Notification::new(method, params);
        self.write_frame(&notification).await
    }

    async fn write_frame(&self, message: &impl serde::Serialize) -> Result<(), TransportError> {
        let text = serde_json::to_string(message).map_err(|e| TransportError::Malformed(e.to_string()))?;
        let mut sink = self.sink.lock().await;
        sink.send(WsMessage::Text(text))
            .await
            .map_err(|e| TransportError::Io(std::io::Error::other(e.to_string())))
    }

    pub async fn disconnect(&self) {
        if !self.connected.swap(false, Ordering::AcqRel) {
            return;
        }
        self.pending.fail_all_pending().await;
        if let Some(handle) = self.reader.lock().await.take() {
            handle.abort();
        }
        let _ = self.sink.lock().await.close().await;
    }
}

async fn read_loop(
    mut source: futures::stream::SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>,
    pending: SharedCorrelationTable,
    on_notification: NotificationHandler,
) {
    while let Some(frame) = source.next().await {
        let frame = match frame {
            Ok(frame) => frame,
            Err(err) => {
                tracing::warn!(error = %err, "mcp websocket transport: read error");
                break;
            }
        };
        let text = match frame {
            WsMessage::Text(text) => text.to_string(),
            WsMessage::Close(_) => break,
            _ => continue,
        };
        dispatch_text(&text, &pending, &on_notification).await;
    }
    tracing::debug!("mcp websocket transport: connection closed");
    pending.fail_all_pending().await;
}

async fn dispatch_text(text: &str, pending: &SharedCorrelationTable, on_notification: &NotificationHandler) {
    match serde_json::from_str::<Message>(text) {
        Ok(Message::Response(response)) => {
            let id = response.id.clone();
            pending.complete(&id, response.into_result()).await;
        }
        Ok(Message::Notification(notification)) => {
            on_notification(notification);
        }
        Ok(Message::Request(request)) => {
            tracing::debug!(method = %request.method, "ignoring server-initiated request: not supported");
        }
        Err(err) => {
            tracing::debug!(error = %err, text, "discarding malformed mcp frame");
        }
    }
}
