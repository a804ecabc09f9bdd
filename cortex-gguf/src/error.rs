//! GGUF parsing and model resolution errors.

/// Failure modes of [`crate::reader::read_gguf_metadata`] and
/// [`crate::resolve::resolve_model_path`].
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum GgufError {
    /// The file did not start with the `GGUF` magic bytes.
    #[error("not a GGUF file: bad magic {found:#010x}")]
    BadMagic {
        /// Magic bytes actually read.
        found: u32,
    },
    /// The file ended before a length-prefixed field could be fully read.
    #[error("unexpected end of file while reading {context}")]
    UnexpectedEof {
        /// What was being read when the file ran out.
        context: &'static str,
    },
    /// A metadata value carried a type id this reader has no size/decoder for.
    #[error("metadata value type {type_id} has no known size, cannot skip safely")]
    UnknownValueType {
        /// Raw GGUF value-type id.
        type_id: u32,
    },
    /// A string field's bytes were not valid UTF-8.
    #[error("invalid UTF-8 in {context}")]
    InvalidUtf8 {
        /// What field failed to decode.
        context: &'static str,
    },
    /// Underlying file IO failed.
    #[error("io error reading {path}: {source}")]
    Io {
        /// Path being read.
        path: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// Path resolution (spec §4.2) found no matching artifact for a model id.
    #[error("no model artifact found for id {model_id:?} under {base_dir}")]
    ModelNotFound {
        /// The id the caller asked to resolve.
        model_id: String,
        /// Base directory searched.
        base_dir: String,
    },
}

impl GgufError {
    /// Every GGUF failure is a load-time failure, always safe to retry once
    /// the underlying file/path issue is fixed — never counted against the
    /// circuit breaker, since it never reaches C1/C4.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
