//! `NewContext`/`FreeContext` (spec §4.1).

use std::sync::Arc;

use crate::error::NativeError;
use crate::model::ModelHandle;

/// Knobs accepted by `NewContext` (spec §4.1).
#[derive(Debug, Clone, Copy)]
pub struct ContextParams {
    /// Context window in tokens.
    pub context_size: u32,
    /// Tokens decoded per `llama_decode` call.
    pub batch_size: u32,
    /// CPU threads used for generation.
    pub threads: i32,
    /// RNG seed forwarded to sampler construction, not the context itself.
    pub seed: u32,
}

/// A decode context bound to one [`ModelHandle`]. Not `Sync` — spec §4.3
/// treats a session (and therefore its context) as a single-threaded
/// execution domain guarded by the session's latch.
pub struct ContextHandle {
    raw: *mut llama_cpp_sys_2::llama_context,
    batch_size: u32,
    // Kept alive for as long as the context exists; llama_free does not
    // touch the model, but a dangling model would still be unsound to
    // decode against.
    model: Arc<ModelHandle>,
}

unsafe impl Send for ContextHandle {}

impl ContextHandle {
    /// Create a decode context over `model` (spec §4.1 `NewContext`).
    pub fn new(model: Arc<ModelHandle>, params: ContextParams) -> Result<Self, NativeError> {
        let mut ctx_params = unsafe { llama_cpp_sys_2::llama_context_default_params() };
        ctx_params.n_ctx = params.context_size;
        ctx_params.n_batch = params.batch_size;
        ctx_params.n_ubatch = params.batch_size;
        ctx_params.n_threads = params.threads;
        ctx_params.n_threads_batch = params.threads;

        let raw = unsafe { llama_cpp_sys_2::llama_init_from_model(model.raw(), ctx_params) };
        if raw.is_null() {
            return Err(NativeError::Runtime {
                reason: "native library returned a null context pointer".to_string(),
            });
        }

        Ok(Self {
            raw,
            batch_size: params.batch_size,
            model,
        })
    }

    pub(crate) fn raw(&self) -> *mut llama_cpp_sys_2::llama_context {
        self.raw
    }

    pub(crate) fn batch_size(&self) -> u32 {
        self.batch_size
    }

    /// The model backing this context.
    pub fn model(&self) -> &ModelHandle {
        &self.model
    }

    /// Clear the context's KV cache, resetting it for reuse by a different
    /// inference without tearing down the native context (spec §4.3: a
    /// recycled session resets its position counter).
    pub fn clear_memory(&mut self) {
        unsafe {
            let memory = llama_cpp_sys_2::llama_get_memory(self.raw);
            llama_cpp_sys_2::llama_memory_clear(memory, true);
        }
    }
}

impl Drop for ContextHandle {
    fn drop(&mut self) {
        if !self.raw.is_null() {
            unsafe { llama_cpp_sys_2::llama_free(self.raw) };
            self.raw = std::ptr::null_mut();
        }
    }
}
