//! The `Session` type itself (spec §3 "Session").

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use cortex_native::{ContextHandle, ModelHandle, TokenId};

/// Interior state guarded by the session's latch (spec: "a mutual-exclusion
/// latch"). `None` context means the session has been closed.
pub(crate) struct SessionInner {
    context: Option<ContextHandle>,
    /// Tokens already decoded into the context's KV cache.
    position: u32,
}

/// A pooled `(tenantId, modelId)` session wrapping one model+context pair.
///
/// Holding the latch (via [`Session::lock`]) is the only way to reach the
/// native handles, which makes "at most one inference holds the latch"
/// (spec §3 invariant) structural rather than merely documented.
pub struct Session {
    id: Uuid,
    tenant_id: String,
    model_id: String,
    model: Arc<ModelHandle>,
    created_at: Instant,
    last_used: StdMutex<Instant>,
    usage_count: AtomicU32,
    inner: Arc<Mutex<SessionInner>>,
}

impl Session {
    pub(crate) fn new(tenant_id: String, model_id: String, model: Arc<ModelHandle>, context: ContextHandle) -> Self {
        let now = Instant::now();
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            model_id,
            model,
            created_at: now,
            last_used: StdMutex::new(now),
            usage_count: AtomicU32::new(0),
            inner: Arc::new(Mutex::new(SessionInner {
                context: Some(context),
                position: 0,
            })),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn model(&self) -> &Arc<ModelHandle> {
        &self.model
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    pub fn last_used(&self) -> Instant {
        *self.last_used.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn usage_count(&self) -> u32 {
        self.usage_count.load(Ordering::Relaxed)
    }

    /// How long since this session was last leased or returned.
    pub fn idle_age(&self) -> Duration {
        self.last_used().elapsed()
    }

    /// Whether the session is eligible to stay in the pool: not currently
    /// leased (latch not held) and younger than `idle_ttl` (spec §3
    /// `canRecycle` invariant).
    pub fn can_recycle(&self, idle_ttl: Duration) -> bool {
        self.inner.try_lock().is_ok() && self.idle_age() < idle_ttl
    }

    /// Acquire the session's latch for the duration of one inference call.
    /// Resets the position counter and clears the KV cache, matching the
    /// "take it and reset its position counter" step of the lease protocol.
    pub async fn lock(self: &Arc<Self>) -> SessionGuard {
        let mut guard = Arc::clone(&self.inner).lock_owned().await;
        if let Some(context) = guard.context.as_mut() {
            context.clear_memory();
        }
        guard.position = 0;
        SessionGuard {
            session: Arc::clone(self),
            guard,
        }
    }

    /// Mark the session used: bump the usage counter and refresh `lastUsed`
    /// so the idle reaper doesn't reclaim it mid-queue.
    pub(crate) fn touch(&self) {
        *self.last_used.lock().unwrap_or_else(|e| e.into_inner()) = Instant::now();
        self.usage_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Close the session: free the native context, idempotently.
    pub(crate) async fn close(&self) {
        let mut guard = self.inner.lock().await;
        if guard.context.take().is_some() {
            tracing::debug!(session_id = %self.id, "closing session, freeing native context");
        }
    }

    /// Whether the native context has already been freed.
    pub(crate) async fn is_closed(&self) -> bool {
        self.inner.lock().await.context.is_none()
    }
}

/// Exclusive access to a leased session's context, held for the duration of
/// one inference call.
pub struct SessionGuard {
    session: Arc<Session>,
    guard: OwnedMutexGuard<SessionInner>,
}

impl SessionGuard {
    /// The session this guard was leased from.
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Tokens decoded into the context so far.
    pub fn position(&self) -> u32 {
        self.guard.position
    }

    /// Advance the recorded position after a successful `Decode` call.
    pub fn advance_position(&mut self, by: u32) {
        self.guard.position += by;
    }

    /// Decode `tokens` into the context at the current position, advancing it.
    pub fn decode(&mut self, tokens: &[TokenId]) -> Result<(), cortex_native::NativeError> {
        let context = self
            .guard
            .context
            .as_ref()
            .expect("decode called on a closed session");
        cortex_native::decode(context, tokens, self.guard.position as i32)?;
        self.guard.position += tokens.len() as u32;
        Ok(())
    }

    /// Sample the next token using `sampler` against this session's context.
    pub fn sample(&self, sampler: &cortex_native::SamplerChain) -> TokenId {
        let context = self
            .guard
            .context
            .as_ref()
            .expect("sample called on a closed session");
        sampler.sample(context)
    }
}
