//! Pending-request correlation table shared by the stdio and WebSocket
//! transports (spec §4.7 "A correlation table maps id -> pending completion").

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{oneshot, Mutex};

use cortex_types::{RpcError, RpcId};

use crate::error::TransportError;

type Completion = Result<serde_json::Value, RpcError>;

/// Generates process-local monotonic request ids and tracks one
/// `oneshot::Sender` per outstanding request.
#[derive(Default)]
pub(crate) struct CorrelationTable {
    next_id: AtomicU64,
    pending: Mutex<HashMap<u64, oneshot::Sender<Completion>>>,
}

impl CorrelationTable {
    pub(crate) fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Reserve the next request id and register its completion channel.
    pub(crate) async fn register(&self) -> (RpcId, oneshot::Receiver<Completion>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, tx);
        (RpcId::Number(id), rx)
    }

    /// Complete a pending entry with the result of a correlated `Response`.
    /// No-op if the id is unknown (already timed out, or a response for
    /// something we never sent) — matches spec §4.7's "log and discard"
    /// treatment of anything that doesn't map cleanly.
    pub(crate) async fn complete(&self, id: &RpcId, result: Completion) {
        let numeric = match id {
            RpcId::Number(n) => *n,
            RpcId::String(s) => match s.parse::<u64>() {
                Ok(n) => n,
                Err(_) => {
                    tracing::debug!(id = %id, "response id is not one of ours, discarding");
                    return;
                }
            },
        };
        if let Some(tx) = self.pending.lock().await.remove(&numeric) {
            let _ = tx.send(result);
        } else {
            tracing::debug!(id = %id, "no pending request for response id, discarding");
        }
    }

    /// Drop every pending entry, failing each with [`TransportError::Disconnected`]
    /// (spec §4.7 "resources released on disconnect/close on all paths").
    pub(crate) async fn fail_all_pending(&self) {
        let mut pending = self.pending.lock().await;
        for (_, tx) in pending.drain() {
            let _ = tx.send(Err(RpcError {
                code: -32000,
                message: TransportError::Disconnected.to_string(),
                data: None,
            }));
        }
    }

    /// Remove a single pending entry without completing it, used when its
    /// timeout timer fires first (spec §4.7 "on expiry, remove from the table").
    pub(crate) async fn remove(&self, id: u64) {
        self.pending.lock().await.remove(&id);
    }
}

pub(crate) fn id_as_u64(id: &RpcId) -> Option<u64> {
    match id {
        RpcId::Number(n) => Some(*n),
        RpcId::String(s) => s.parse().ok(),
    }
}

pub(crate) type SharedCorrelationTable = Arc<CorrelationTable>;

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_response_id_is_discarded_without_panicking() {
        let table = CorrelationTable::new();
        table.complete(&RpcId::Number(999), Ok(serde_json::json!({}))).await;
    }

    #[tokio::test]
    async fn registered_request_receives_its_completion() {
        let table = CorrelationTable::new();
        let (id, rx) = table.register().await;
        table.complete(&id, Ok(serde_json::json!({"ok": true}))).await;
        let result = rx.await.unwrap().unwrap();
        assert_eq!(result["ok"], true);
    }

    #[tokio::test]
    async fn fail_all_pending_resolves_every_waiter() {
        let table = CorrelationTable::new();
        let (_, rx1) = table.register().await;
        let (_, rx2) = table.register().await;
        table.fail_all_pending().await;
        assert!(rx1.await.unwrap().is_err());
        assert!(rx2.await.unwrap().is_err());
    }
}
