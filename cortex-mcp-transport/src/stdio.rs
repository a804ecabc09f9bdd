//! Stdio transport: a spawned child process speaking newline-delimited
//! JSON-RPC over its stdin/stdout (spec §4.7 "Stdio transport").

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use cortex_types::{Message, Notification, Request};

use crate::correlation::{id_as_u64, CorrelationTable, SharedCorrelationTable};
use crate::error::TransportError;
use crate::NotificationHandler;

/// Spawns `command` with `args`/`env` and frames JSON-RPC as one message per
/// line, matching MCP's stdio convention.
pub struct StdioTransport {
    stdin: Mutex<ChildStdin>,
    child: Mutex<Option<Child>>,
    pending: SharedCorrelationTable,
    connected: AtomicBool,
    reader: Mutex<Option<JoinHandle<()>>>,
    default_timeout: Duration,
}

impl StdioTransport {
    pub async fn connect(
        command: &str,
        args: &[String],
        env: &HashMap<String, String>,
        default_timeout: Duration,
        on_notification: NotificationHandler,
    ) -> Result<Arc<Self>, TransportError> {
        let mut cmd = tokio::process::Command::new(command);
        cmd.args(args);
        for (key, value) in env {
            cmd.env(key, value);
        }
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd
            .spawn()
            .map_err(|source| TransportError::Connect(source.to_string()))?;

        let stdin = child.stdin.take().expect("piped stdin");
        let stdout = child.stdout.take().expect("piped stdout");
        let stderr = child.stderr.take().expect("piped stderr");

        let transport = Arc::new(Self {
            stdin: Mutex::new(stdin),
            child: Mutex::new(Some(child)),
            pending: Arc::new(CorrelationTable::new()),
            connected: AtomicBool::new(true),
            reader: Mutex::new(None),
            default_timeout,
        });

        let reader_handle = tokio::spawn(read_loop(
            BufReader::new(stdout),
            Arc::clone(&transport.pending),
            on_notification,
        ));
        tokio::spawn(drain_stderr(BufReader::new(stderr)));
        *transport.reader.lock().await = Some(reader_handle);

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
        self.write_line(&request).await?;

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
        self.write_line(&notification).await
    }

    async fn write_line(&self, message: &impl serde::Serialize) -> Result<(), TransportError> {
        let mut line = serde_json::to_string(message).map_err(|e| TransportError::Malformed(e.to_string()))?;
        line.push('\n');
        let mut stdin = self.stdin.lock().await;
        stdin.write_all(line.as_bytes()).await?;
        stdin.flush().await?;
        Ok(())
    }

    pub async fn disconnect(&self) {
        if !self.connected.swap(false, Ordering::AcqRel) {
            return;
        }
        self.pending.fail_all_pending().await;
        if let Some(handle) = self.reader.lock().await.take() {
            handle.abort();
        }
        if let Some(mut child) = self.child.lock().await.take() {
            let _ = child.kill().await;
        }
    }
}

async fn read_loop(
    mut stdout: BufReader<tokio::process::ChildStdout>,
    pending: SharedCorrelationTable,
    on_notification: NotificationHandler,
) {
    let mut buf = String::new();
    loop {
        buf.clear();
        match stdout.read_line(&mut buf).await {
            Ok(0) => {
                tracing::debug!("mcp stdio transport: stdout closed");
                pending.fail_all_pending().await;
                return;
            }
            Ok(_) => {}
            Err(err) => {
                tracing::warn!(error = %err, "mcp stdio transport: read error");
                pending.fail_all_pending().await;
                return;
            }
        }
        let line = buf.trim();
        if line.is_empty() {
            continue;
        }
        dispatch_line(line, &pending, &on_notification).await;
    }
}

async fn dispatch_line(line: &str, pending: &SharedCorrelationTable, on_notification: &NotificationHandler) {
    match serde_json::from_str::<Message>(line) {
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
            tracing::debug!(error = %err, line, "discarding malformed mcp line");
        }
    }
}

async fn drain_stderr(mut stderr: BufReader<tokio::process::ChildStderr>) {
    let mut buf = String::new();
    loop {
        buf.clear();
        match stderr.read_line(&mut buf).await {
            Ok(0) | Err(_) => return,
            Ok(_) => {
                let line = buf.trim();
                if !line.is_empty() {
                    tracing::debug!(target: "mcp_server_stderr", "{line}");
                }
            }
        }
    }
}
