//! Shared error taxonomy (spec §7 "Error Handling").
//!
//! Every public-facing failure — inference, session, transport, MCP —
//! collapses into one [`ErrorPayload`] shape so callers get a uniform
//! surface regardless of which subsystem raised it. Subsystem crates
//! define their own `thiserror` enums and convert into this at the boundary.

use serde::{Deserialize, Serialize};

/// Stable classification of an [`ErrorPayload`], used by callers to decide
/// whether to retry and by the circuit breaker to decide whether a failure
/// counts against the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum ErrorKind {
    /// Malformed or out-of-range request (bad parameters, unknown role, ...).
    Validation,
    /// Model artifact could not be loaded (missing file, bad GGUF, checksum mismatch).
    Load,
    /// Tokenization or decode step failed inside the native runtime.
    Decode,
    /// Sampling step failed (grammar rejected every candidate, etc).
    Sample,
    /// Session pool could not hand out or reclaim a session.
    SessionLifecycle,
    /// The call's deadline elapsed before completion.
    Timeout,
    /// The caller cancelled the call.
    Cancelled,
    /// The circuit breaker is open and is rejecting calls fast.
    CircuitOpen,
    /// A bounded resource (pool slots, queue depth, cache capacity) is exhausted.
    ResourceExhausted,
    /// The MCP transport link failed (process exit, socket reset, connect timeout).
    Transport,
    /// A well-formed message violated JSON-RPC or MCP protocol expectations.
    Protocol,
    /// Anything not covered above.
    Other,
}

impl ErrorKind {
    /// Whether a failure of this kind should count against the circuit
    /// breaker's failure threshold (spec §4.5).
    ///
    /// Validation and Cancelled are caller-caused, not backend-caused, so
    /// they're excluded — a client sending garbage shouldn't trip the
    /// breaker for every other tenant.
    pub fn is_retryable(self) -> bool {
        !matches!(
            self,
            ErrorKind::Validation | ErrorKind::Cancelled | ErrorKind::CircuitOpen
        )
    }
}

/// Uniform error envelope returned across the inference and MCP boundaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("{kind:?}: {message}")]
pub struct ErrorPayload {
    /// Classification used for retry/breaker decisions.
    #[serde(rename = "type")]
    pub kind: ErrorKind,
    /// Human-readable message, safe to log and to surface to the caller.
    pub message: String,
    /// Whether the caller may reasonably retry this exact request.
    pub retryable: bool,
    /// Node/session/server identifier that originated the error, if known.
    #[serde(default)]
    pub origin_node: Option<String>,
    /// Extra structured context (invalid field name, exit code, ...).
    #[serde(default)]
    pub details: Option<serde_json::Value>,
}

impl ErrorPayload {
    /// Construct a payload, deriving `retryable` from `kind`.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            retryable: kind.is_retryable(),
            kind,
            message: message.into(),
            origin_node: None,
            details: None,
        }
    }

    /// Attach the node/session/server that originated the failure.
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin_node = Some(origin.into());
        self
    }

    /// Attach structured details.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_is_not_retryable() {
        let err = ErrorPayload::new(ErrorKind::Validation, "bad temperature");
        assert!(!err.retryable);
    }

    #[test]
    fn load_is_retryable() {
        let err = ErrorPayload::new(ErrorKind::Load, "file not found");
        assert!(err.retryable);
    }

    #[test]
    fn circuit_open_is_not_retryable() {
        let err = ErrorPayload::new(ErrorKind::CircuitOpen, "breaker open");
        assert!(!err.retryable);
    }

    #[test]
    fn serializes_kind_as_type_field() {
        let err = ErrorPayload::new(ErrorKind::Timeout, "deadline exceeded");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["type"], "timeout");
        assert!(json.get("kind").is_none());
    }

    #[test]
    fn builder_methods_set_optional_fields() {
        let err = ErrorPayload::new(ErrorKind::Transport, "pipe closed")
            .with_origin("server-1")
            .with_details(serde_json::json!({"exit_code": 1}));
        assert_eq!(err.origin_node.as_deref(), Some("server-1"));
        assert_eq!(err.details.unwrap()["exit_code"], 1);
    }
}
