//! `LoadModel`/`FreeModel`, `EosToken`, `IsEndOfGeneration` (spec §4.1).

use std::ffi::CString;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

use crate::backend::Backend;
use crate::error::NativeError;
use crate::token::TokenId;

/// Knobs accepted by `LoadModel` (spec §4.1).
#[derive(Debug, Clone, Copy)]
pub struct ModelLoadParams {
    /// Layers to offload to GPU; `-1` offloads as many as the device allows.
    pub gpu_layers: i32,
    /// Memory-map the model file instead of reading it into a heap buffer.
    pub use_mmap: bool,
    /// Lock the mapped pages in physical memory.
    pub use_mlock: bool,
}

impl Default for ModelLoadParams {
    fn default() -> Self {
        Self {
            gpu_layers: 0,
            use_mmap: true,
            use_mlock: false,
        }
    }
}

/// A loaded model. One per distinct `(modelId, gpuLayers/mmap/mlock)`
/// combination; shared (read-only) across every context/session that uses it.
pub struct ModelHandle {
    raw: *mut llama_cpp_sys_2::llama_model,
    vocab: *const llama_cpp_sys_2::llama_vocab,
    eos_token: TokenId,
}

// The underlying library treats a loaded model as immutable and safe to
// share for concurrent context creation/inference; only mutation happens
// through `llama_context`, which `ContextHandle` alone owns.
unsafe impl Send for ModelHandle {}
unsafe impl Sync for ModelHandle {}

impl ModelHandle {
    /// Load a GGUF model file (spec §4.1 `LoadModel`).
    pub fn load(_backend: Backend, path: &Path, params: ModelLoadParams) -> Result<Self, NativeError> {
        if !path.exists() {
            return Err(NativeError::Load {
                path: path.display().to_string(),
                reason: "path does not exist".to_string(),
            });
        }

        let path_cstr = CString::new(path.as_os_str().as_bytes()).map_err(|_| NativeError::Load {
            path: path.display().to_string(),
            reason: "path contains an interior NUL byte".to_string(),
        })?;

        let mut model_params = unsafe { llama_cpp_sys_2::llama_model_default_params() };
        model_params.n_gpu_layers = params.gpu_layers;
        model_params.use_mmap = params.use_mmap;
        model_params.use_mlock = params.use_mlock;

        let raw = unsafe {
            llama_cpp_sys_2::llama_model_load_from_file(path_cstr.as_ptr(), model_params)
        };
        if raw.is_null() {
            return Err(NativeError::Load {
                path: path.display().to_string(),
                reason: "native library returned a null model pointer".to_string(),
            });
        }

        let vocab = unsafe { llama_cpp_sys_2::llama_model_get_vocab(raw) };
        if vocab.is_null() {
            unsafe { llama_cpp_sys_2::llama_model_free(raw) };
            return Err(NativeError::Load {
                path: path.display().to_string(),
                reason: "model has no vocabulary".to_string(),
            });
        }

        let eos_token = unsafe { llama_cpp_sys_2::llama_vocab_eos(vocab) };

        Ok(Self {
            raw,
            vocab,
            eos_token,
        })
    }

    pub(crate) fn raw(&self) -> *mut llama_cpp_sys_2::llama_model {
        self.raw
    }

    pub(crate) fn vocab(&self) -> *const llama_cpp_sys_2::llama_vocab {
        self.vocab
    }

    /// `EosToken` (spec §4.1).
    pub fn eos_token(&self) -> TokenId {
        self.eos_token
    }

    /// `IsEndOfGeneration` (spec §4.1) — true for the model's EOS token and
    /// any other vocabulary-defined end-of-generation marker.
    pub fn is_end_of_generation(&self, token: TokenId) -> bool {
        unsafe { llama_cpp_sys_2::llama_vocab_is_eog(self.vocab, token) }
    }
}

impl Drop for ModelHandle {
    fn drop(&mut self) {
        if !self.raw.is_null() {
            unsafe { llama_cpp_sys_2::llama_model_free(self.raw) };
            self.raw = std::ptr::null_mut();
        }
    }
}
