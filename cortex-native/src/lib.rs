//! Safe, panic-safe wrapper over the llama.cpp native runtime (spec §4.1).
//!
//! Every handle here owns a raw pointer into the native library and frees
//! it exactly once via `Drop`; there is no teacher crate that talks to a
//! foreign library directly, so this binding is grounded on the `llama-cpp-sys-2`
//! FFI surface the wider pack already depends on for the same job.

pub mod backend;
pub mod context;
pub mod decode;
pub mod error;
pub mod model;
pub mod sampler;
pub mod tokenize;
pub mod token;

pub use backend::{ensure_backend_initialized, shutdown_backend, Backend};
pub use context::{ContextHandle, ContextParams};
pub use decode::decode;
pub use error::NativeError;
pub use model::{ModelHandle, ModelLoadParams};
pub use sampler::{MirostatParams, SamplerChain, SamplerParams};
pub use token::TokenId;
pub use tokenize::{detokenize, tokenize};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_load_params_default_matches_spec_defaults() {
        let params = ModelLoadParams::default();
        assert_eq!(params.gpu_layers, 0);
        assert!(params.use_mmap);
        assert!(!params.use_mlock);
    }

    #[test]
    fn load_missing_path_is_a_load_error_without_touching_native_library() {
        let backend = ensure_backend_initialized();
        let missing = std::path::Path::new("/nonexistent/model-that-does-not-exist.gguf");
        let err = ModelHandle::load(backend, missing, ModelLoadParams::default()).unwrap_err();
        assert!(!err.is_retryable());
    }
}
