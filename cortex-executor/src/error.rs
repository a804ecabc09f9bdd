//! Executor failure taxonomy (spec §4.4/§7).

/// Failures raised while building a prompt or running the decode loop.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ExecutorError {
    /// Sampling parameters fell outside their allowed range (spec §4.4 step 4).
    #[error("invalid sampling parameters: {reason}")]
    Validation { reason: String },
    /// Tokenization, decode, or sampler construction failed against the
    /// native runtime.
    #[error("native runtime failure: {0}")]
    Native(#[from] cortex_native::NativeError),
    /// The call's deadline elapsed before generation finished.
    #[error("inference call timed out")]
    Timeout,
    /// The caller cancelled the call before generation finished.
    #[error("inference call was cancelled")]
    Cancelled,
}

impl ExecutorError {
    /// `Validation` is a caller error and `Cancelled` is caller-initiated;
    /// neither counts against the circuit breaker (spec §4.5).
    pub fn is_retryable(&self) -> bool {
        match self {
            ExecutorError::Validation { .. } | ExecutorError::Cancelled => false,
            ExecutorError::Native(source) => source.is_retryable(),
            ExecutorError::Timeout => true,
        }
    }
}
