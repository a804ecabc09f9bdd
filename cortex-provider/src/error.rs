//! Failure taxonomy and error enrichment (spec §4.6 "Error enrichment").

use cortex_breaker::BreakerError;
use cortex_executor::ExecutorError;
use cortex_native::NativeError;
use cortex_session::SessionError;
use cortex_types::{ErrorKind, ErrorPayload};

/// Union of every failure the provider facade can surface, before
/// enrichment into an [`ErrorPayload`].
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ProviderError {
    /// Leasing or constructing a session failed (C3).
    #[error("session error: {0}")]
    Session(#[from] SessionError),
    /// Prompt building or the decode loop failed (C4).
    #[error("executor error: {0}")]
    Executor(#[from] ExecutorError),
    /// The circuit breaker rejected the call (C5).
    #[error("circuit breaker: {0}")]
    CircuitOpen(#[from] BreakerError),
}

impl ProviderError {
    /// Whether this failure should count against the circuit breaker
    /// (spec §4.5 classification, delegated to each subsystem's own rule).
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::Session(err) => err.is_retryable(),
            ProviderError::Executor(err) => err.is_retryable(),
            ProviderError::CircuitOpen(err) => err.is_retryable(),
        }
    }

    fn kind(&self) -> ErrorKind {
        match self {
            ProviderError::Session(SessionError::ModelResolution { .. }) => ErrorKind::Load,
            ProviderError::Session(SessionError::Construction { .. }) => ErrorKind::Load,
            ProviderError::Session(SessionError::ResourceExhausted { .. }) => ErrorKind::ResourceExhausted,
            ProviderError::Session(SessionError::Lifecycle) => ErrorKind::SessionLifecycle,
            ProviderError::Executor(ExecutorError::Validation { .. }) => ErrorKind::Validation,
            ProviderError::Executor(ExecutorError::Timeout) => ErrorKind::Timeout,
            ProviderError::Executor(ExecutorError::Cancelled) => ErrorKind::Cancelled,
            ProviderError::Executor(ExecutorError::Native(native)) => match native {
                NativeError::Load { .. } => ErrorKind::Load,
                NativeError::Decode { .. } => ErrorKind::Decode,
                NativeError::Sample { .. } => ErrorKind::Sample,
                NativeError::Runtime { .. } => ErrorKind::Decode,
                NativeError::Other(_) => ErrorKind::Other,
            },
            ProviderError::CircuitOpen(_) => ErrorKind::CircuitOpen,
        }
    }

    /// Wrap this failure into the uniform [`ErrorPayload`] envelope,
    /// attaching `model`/`requestId` and, for session errors, `sessionId`
    /// (spec §4.6: "details map must include model, requestId, and for
    /// session errors also sessionId").
    pub fn into_payload(self, model: &str, request_id: &str, session_id: Option<&str>) -> ErrorPayload {
        let kind = self.kind();
        let retryable = self.is_retryable();
        let message = self.to_string();

        let mut details = serde_json::json!({
            "model": model,
            "requestId": request_id,
        });
        if let (ProviderError::Session(_), Some(session_id)) = (&self, session_id) {
            details["sessionId"] = serde_json::Value::String(session_id.to_string());
        }

        ErrorPayload {
            kind,
            message,
            retryable,
            origin_node: None,
            details: Some(details),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_maps_to_validation_kind_and_is_not_retryable() {
        let err = ProviderError::Executor(ExecutorError::Validation {
            reason: "bad top_k".into(),
        });
        let payload = err.into_payload("llama-3", "req-1", None);
        assert_eq!(payload.kind, ErrorKind::Validation);
        assert!(!payload.retryable);
        assert_eq!(payload.details.unwrap()["requestId"], "req-1");
    }

    #[test]
    fn session_error_attaches_session_id_when_given() {
        let err = ProviderError::Session(SessionError::Lifecycle);
        let payload = err.into_payload("llama-3", "req-1", Some("sess-9"));
        assert_eq!(payload.kind, ErrorKind::SessionLifecycle);
        assert_eq!(payload.details.unwrap()["sessionId"], "sess-9");
    }

    #[test]
    fn non_session_error_ignores_session_id() {
        let err = ProviderError::Executor(ExecutorError::Timeout);
        let payload = err.into_payload("llama-3", "req-1", Some("sess-9"));
        assert!(payload.details.unwrap().get("sessionId").is_none());
    }

    #[test]
    fn circuit_open_is_retryable() {
        let err = ProviderError::CircuitOpen(BreakerError::CircuitOpen { retry_after_ms: 500 });
        assert!(err.is_retryable());
        assert_eq!(err.kind(), ErrorKind::CircuitOpen);
    }
}
