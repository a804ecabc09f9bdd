//! `SessionManager`: the lease/return/reap/shutdown protocol of spec §4.3.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use cortex_config::pool::SessionPoolConfig;
use cortex_native::{ContextHandle, ContextParams};

use crate::error::SessionError;
use crate::model_cache::ModelCache;
use crate::pool::PoolEntry;
use crate::session::Session;

type PoolKey = (String, String);

/// Orchestrates per-`(tenantId, modelId)` session pools over a shared
/// [`ModelCache`]: lease, return, idle reaping, and shutdown (spec §4.3).
pub struct SessionManager {
    config: SessionPoolConfig,
    model_cache: Arc<ModelCache>,
    pools: Mutex<HashMap<PoolKey, Arc<PoolEntry>>>,
    shut_down: AtomicBool,
    reaper: Mutex<Option<JoinHandle<()>>>,
}

impl SessionManager {
    pub fn new(config: SessionPoolConfig, model_cache: Arc<ModelCache>) -> Arc<Self> {
        Arc::new(Self {
            config,
            model_cache,
            pools: Mutex::new(HashMap::new()),
            shut_down: AtomicBool::new(false),
            reaper: Mutex::new(None),
        })
    }

    /// Start the idle reaper background task (spec §4.3 "every ≥1 minute").
    /// Idempotent: calling it twice replaces the previous task handle.
    pub async fn spawn_idle_reaper(self: &Arc<Self>, interval: Duration) {
        let manager = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                manager.reap_idle().await;
            }
        });
        *self.reaper.lock().await = Some(handle);
    }

    async fn pool_for(&self, tenant_id: &str, model_id: &str) -> Arc<PoolEntry> {
        let key = (tenant_id.to_string(), model_id.to_string());
        let mut pools = self.pools.lock().await;
        Arc::clone(
            pools
                .entry(key)
                .or_insert_with(|| Arc::new(PoolEntry::new(self.config.max_size))),
        )
    }

    /// `GetSession` (spec §4.3 lease protocol). A pool at `maxSize` fails
    /// immediately with [`SessionError::ResourceExhausted`] rather than
    /// queuing the caller (spec §5: "fail fast ... do not queue").
    pub async fn get_session(&self, tenant_id: &str, model_id: &str) -> Result<Arc<Session>, SessionError> {
        if self.shut_down.load(Ordering::Acquire) {
            return Err(SessionError::Lifecycle);
        }

        let entry = self.pool_for(tenant_id, model_id).await;

        if let Some(session) = entry.try_take().await {
            session.touch();
            return Ok(session);
        }

        if entry.try_reserve() {
            return match self.construct_session(tenant_id, model_id).await {
                Ok(session) => {
                    session.touch();
                    Ok(session)
                }
                Err(err) => {
                    entry.release_reservation();
                    Err(err)
                }
            };
        }

        Err(SessionError::ResourceExhausted {
            tenant_id: tenant_id.to_string(),
            model_id: model_id.to_string(),
            in_use: entry.in_use(),
            max_size: entry.max_size(),
        })
    }

    async fn construct_session(&self, tenant_id: &str, model_id: &str) -> Result<Arc<Session>, SessionError> {
        let (model, metadata) = self.model_cache.get_or_load(model_id).await?;

        let context_params = ContextParams {
            context_size: metadata.context_window,
            batch_size: 512,
            threads: num_cpus::get() as i32,
            seed: 0,
        };
        let context = ContextHandle::new(Arc::clone(&model), context_params).map_err(|source| {
            SessionError::Construction {
                model_id: model_id.to_string(),
                source,
            }
        })?;

        Ok(Arc::new(Session::new(
            tenant_id.to_string(),
            model_id.to_string(),
            model,
            context,
        )))
    }

    /// `ReturnSession` (spec §4.3 return protocol).
    pub async fn return_session(&self, session: Arc<Session>) {
        let entry = self.pool_for(session.tenant_id(), session.model_id()).await;

        let recyclable = !self.shut_down.load(Ordering::Acquire) && session.can_recycle(self.config.idle_ttl);
        if recyclable {
            entry.give_back(session).await;
        } else {
            session.close().await;
            entry.retire();
        }
    }

    /// Idle reaper sweep: close any pooled session whose `lastUsed` predates
    /// `idleTtl` (spec §4.3 "Idle reaper").
    async fn reap_idle(&self) {
        let pools = self.pools.lock().await.values().cloned().collect::<Vec<_>>();
        for entry in pools {
            let candidates = entry.drain().await;
            let mut survivors = Vec::with_capacity(candidates.len());
            for session in candidates {
                if session.idle_age() > self.config.idle_ttl {
                    session.close().await;
                    entry.retire();
                } else {
                    survivors.push(session);
                }
            }
            entry.return_surviving(survivors).await;
        }
    }

    /// The model cache backing this manager, for capability/health reporting.
    pub fn model_cache(&self) -> &Arc<ModelCache> {
        &self.model_cache
    }

    /// Sessions currently pooled or leased, summed across every
    /// `(tenantId, modelId)` entry (spec §4.6 `Health().activeSessions`).
    pub async fn active_session_count(&self) -> u32 {
        self.pools.lock().await.values().map(|entry| entry.in_use()).sum()
    }

    /// Close every active and pooled session; subsequent leases fail with
    /// [`SessionError::Lifecycle`] (spec §4.3 "Shutdown").
    pub async fn shutdown(&self) {
        self.shut_down.store(true, Ordering::Release);
        if let Some(handle) = self.reaper.lock().await.take() {
            handle.abort();
        }
        let pools = self.pools.lock().await.values().cloned().collect::<Vec<_>>();
        for entry in pools {
            for session in entry.drain().await {
                session.close().await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn test_config() -> SessionPoolConfig {
        SessionPoolConfig {
            min_size: 0,
            max_size: 2,
            idle_ttl: Duration::from_secs(300),
        }
    }

    #[tokio::test]
    async fn lease_against_missing_model_is_model_resolution_error() {
        let backend = cortex_native::ensure_backend_initialized();
        let cache = Arc::new(ModelCache::new(
            PathBuf::from("/nonexistent/models/dir"),
            backend,
            cortex_native::ModelLoadParams::default(),
        ));
        let manager = SessionManager::new(test_config(), cache);
        let err = manager.get_session("tenant-a", "no-such-model").await.unwrap_err();
        assert!(matches!(err, SessionError::ModelResolution { .. }));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn shutdown_rejects_subsequent_leases() {
        let backend = cortex_native::ensure_backend_initialized();
        let cache = Arc::new(ModelCache::new(
            PathBuf::from("/nonexistent/models/dir"),
            backend,
            cortex_native::ModelLoadParams::default(),
        ));
        let manager = SessionManager::new(test_config(), cache);
        manager.shutdown().await;
        let err = manager.get_session("tenant-a", "model").await.unwrap_err();
        assert!(matches!(err, SessionError::Lifecycle));
    }
}
