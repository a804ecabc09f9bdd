//! Per-`(tenantId, modelId)` pool bookkeeping (spec §4.3).

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::session::Session;

/// Sessions held for one `(tenantId, modelId)` pair, plus the bookkeeping
/// needed to enforce `maxSize`.
pub(crate) struct PoolEntry {
    available: Mutex<VecDeque<Arc<Session>>>,
    /// Sessions either pooled or currently leased; bounded by `max_size`.
    total: AtomicU32,
    max_size: u32,
}

impl PoolEntry {
    pub(crate) fn new(max_size: u32) -> Self {
        Self {
            available: Mutex::new(VecDeque::new()),
            total: AtomicU32::new(0),
            max_size,
        }
    }

    /// Take a pooled session if one is free, without constructing anything.
    pub(crate) async fn try_take(&self) -> Option<Arc<Session>> {
        self.available.lock().await.pop_front()
    }

    /// Reserve a slot for a brand-new session, if the pool has room.
    /// Returns `true` if the caller should go on to construct one.
    pub(crate) fn try_reserve(&self) -> bool {
        self.total
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                (current < self.max_size).then_some(current + 1)
            })
            .is_ok()
    }

    /// Release a slot reserved by [`PoolEntry::try_reserve`] whose
    /// construction failed, so it doesn't leak pool capacity.
    pub(crate) fn release_reservation(&self) {
        self.total.fetch_sub(1, Ordering::AcqRel);
    }

    /// Put a leased session back in the available queue.
    pub(crate) async fn give_back(&self, session: Arc<Session>) {
        self.available.lock().await.push_back(session);
    }

    /// Drop a session from the pool entirely (closed, not recyclable),
    /// freeing its reserved slot.
    pub(crate) fn retire(&self) {
        self.total.fetch_sub(1, Ordering::AcqRel);
    }

    pub(crate) fn in_use(&self) -> u32 {
        self.total.load(Ordering::Acquire)
    }

    pub(crate) fn max_size(&self) -> u32 {
        self.max_size
    }

    /// Remove and return every pooled session, e.g. for idle reaping or shutdown.
    pub(crate) async fn drain(&self) -> Vec<Arc<Session>> {
        self.available.lock().await.drain(..).collect()
    }

    /// Reinsert sessions that survived an idle sweep, at the front so the
    /// most-recently-checked ones are reused first.
    pub(crate) async fn return_surviving(&self, sessions: Vec<Arc<Session>>) {
        let mut available = self.available.lock().await;
        for session in sessions {
            available.push_front(session);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn try_reserve_fails_once_max_size_is_reached() {
        let entry = PoolEntry::new(1);
        assert!(entry.try_reserve());
        assert!(!entry.try_reserve());
        assert_eq!(entry.in_use(), 1);
    }

    #[test]
    fn release_reservation_frees_the_slot_back_up() {
        let entry = PoolEntry::new(1);
        assert!(entry.try_reserve());
        entry.release_reservation();
        assert_eq!(entry.in_use(), 0);
        assert!(entry.try_reserve());
    }
}
