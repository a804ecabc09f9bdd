//! One-shot native backend initialization (spec §4.1 "Global initialization").

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Once;

static INIT: Once = Once::new();
static SHUT_DOWN: AtomicBool = AtomicBool::new(false);

/// Zero-sized proof that [`ensure_backend_initialized`] has run.
///
/// `ModelHandle::load` requires one of these so it's impossible to reach
/// `llama_model_load_from_file` without having called `llama_backend_init`
/// first.
#[derive(Debug, Clone, Copy)]
pub struct Backend(());

/// Initialize the native backend exactly once for the process lifetime.
///
/// Safe to call from every tenant's first load; only the first caller pays
/// for `llama_backend_init`, guarded by a `std::sync::Once` latch the way
/// `layer0::lifecycle`'s single-init guard does.
pub fn ensure_backend_initialized() -> Backend {
    INIT.call_once(|| {
        tracing::info!("initializing native inference backend");
        unsafe {
            llama_cpp_sys_2::llama_backend_init();
        }
    });
    Backend(())
}

/// Free the native backend. Idempotent; a no-op if the backend was never
/// initialized or has already been shut down.
///
/// Rust `static`s are never dropped, so unlike a scoped resource this must
/// be invoked explicitly by the owning process at shutdown (e.g. from the
/// CLI front end's teardown path) rather than relying on a `Drop` impl.
pub fn shutdown_backend() {
    if INIT.is_completed() && !SHUT_DOWN.swap(true, Ordering::SeqCst) {
        tracing::info!("freeing native inference backend");
        unsafe {
            llama_cpp_sys_2::llama_backend_free();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_backend_initialized_is_idempotent() {
        let _a = ensure_backend_initialized();
        let _b = ensure_backend_initialized();
    }
}
