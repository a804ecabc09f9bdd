//! Failure taxonomy for the native runtime binding (spec §4.1/§7).

/// Failures raised by the safe wrapper around the native LLM library.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum NativeError {
    /// `LoadModel` failed: missing path, bad magic, or the library
    /// returned a null model pointer.
    #[error("failed to load model from {path}: {reason}")]
    Load {
        /// Path that was attempted.
        path: String,
        /// What the native library reported.
        reason: String,
    },
    /// `NewContext` returned a null context pointer.
    #[error("failed to create context: {reason}")]
    Runtime {
        /// What the native library reported.
        reason: String,
    },
    /// `Decode` returned a nonzero native status code.
    #[error("decode failed with native status {code}")]
    Decode {
        /// Raw return code from `llama_decode`.
        code: i32,
    },
    /// Sampler construction failed (e.g. chain allocation returned null).
    #[error("failed to build sampler chain: {reason}")]
    Sample {
        /// What the native library reported.
        reason: String,
    },
    /// Anything not covered above.
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl NativeError {
    /// Whether this failure should count against the circuit breaker.
    /// `Load` is a configuration fault (spec §4.5: "LoadError does not
    /// count"); everything reached after a model is loaded is a genuine
    /// runtime failure and counts.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, NativeError::Load { .. })
    }
}
