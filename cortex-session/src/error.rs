//! Session lifecycle and lease failures (spec §4.3/§7).

/// Failures raised by the session pool.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum SessionError {
    /// Resolving or reading the model artifact failed.
    #[error("failed to resolve model {model_id}: {source}")]
    ModelResolution {
        /// Model id the caller asked for.
        model_id: String,
        #[source]
        source: cortex_gguf::GgufError,
    },
    /// `LoadModel`/`NewContext` failed while constructing a new session.
    #[error("failed to construct session for model {model_id}: {source}")]
    Construction {
        /// Model id the caller asked for.
        model_id: String,
        #[source]
        source: cortex_native::NativeError,
    },
    /// The pool is already at `maxSize`; no session was free and none could
    /// be constructed, so the lease fails immediately instead of queuing.
    #[error("pool for ({tenant_id}, {model_id}) exhausted: {in_use}/{max_size} sessions in use")]
    ResourceExhausted {
        /// Tenant the lease was requested for.
        tenant_id: String,
        /// Model the lease was requested for.
        model_id: String,
        /// Sessions currently leased or pooled.
        in_use: u32,
        /// Configured `maxSize`.
        max_size: u32,
    },
    /// The pool has been shut down; no further leases are granted.
    #[error("session pool is shut down")]
    Lifecycle,
}

impl SessionError {
    /// `ModelResolution` is a configuration fault (bad path, bad GGUF) and
    /// does not count against the circuit breaker; everything else reached
    /// a real construction attempt or reflects transient backpressure.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, SessionError::ModelResolution { .. })
    }
}
