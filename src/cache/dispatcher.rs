//! Fire-and-forget dispatch of cache calls.

use super::AcceleratorCache;
use crate::domain::{SecretContent, SecretId};
use crate::observability::metrics;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::task::TaskTracker;
use tracing::{debug, warn, Instrument};

/// Runs cache writes on background tasks so callers never wait on, or fail
/// because of, the cache.
///
/// An invalidate for an id always lands after any set for that id that was
/// dispatched before it. Cloning is cheap and clones share the same task
/// tracker.
#[derive(Clone)]
pub struct CacheDispatcher {
    cache: Option<Arc<dyn AcceleratorCache>>,
    tracker: TaskTracker,
    // Held by a set task until its write finishes
    in_flight: Arc<DashMap<SecretId, Arc<Mutex<()>>>>,
}

impl std::fmt::Debug for CacheDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheDispatcher")
            .field("enabled", &self.is_enabled())
            .field("pending", &self.tracker.len())
            .finish()
    }
}

impl CacheDispatcher {
    pub fn new(cache: Arc<dyn AcceleratorCache>) -> Self {
        Self { cache: Some(cache), tracker: TaskTracker::new(), in_flight: Arc::default() }
    }

    /// Dispatcher with no cache behind it; every call is a no-op
    pub fn disabled() -> Self {
        Self { cache: None, tracker: TaskTracker::new(), in_flight: Arc::default() }
    }

    pub fn is_enabled(&self) -> bool {
        self.cache.is_some()
    }

    /// Number of cache calls still running
    pub fn pending(&self) -> usize {
        self.tracker.len()
    }

    pub fn spawn_set(&self, id: SecretId, content: SecretContent, ttl: Duration) {
        let Some(cache) = self.cache.clone() else {
            return;
        };

        // Taken before spawning so a later invalidate queues behind this write
        let lock = Arc::new(Mutex::new(()));
        let Ok(guard) = lock.clone().try_lock_owned() else {
            return;
        };
        self.in_flight.insert(id.clone(), lock.clone());

        let in_flight = self.in_flight.clone();
        let span = tracing::debug_span!("cache_set", secret_id = %id);
        self.tracker.spawn(
            async move {
                if let Err(e) = cache.set(&id, &content, ttl).await {
                    warn!(error = %e, "Failed to populate accelerator cache");
                    metrics::record_cache_error("set");
                }
                in_flight.remove_if(&id, |_, held| Arc::ptr_eq(held, &lock));
                drop(guard);
            }
            .instrument(span),
        );
    }

    pub fn spawn_invalidate(&self, id: SecretId) {
        let Some(cache) = self.cache.clone() else {
            return;
        };

        let pending_set = self.in_flight.get(&id).map(|held| held.value().clone());
        let span = tracing::debug_span!("cache_invalidate", secret_id = %id);
        self.tracker.spawn(
            async move {
                if let Some(pending_set) = pending_set {
                    drop(pending_set.lock().await);
                }
                if let Err(e) = cache.invalidate(&id).await {
                    warn!(error = %e, "Failed to invalidate accelerator cache entry");
                    metrics::record_cache_error("invalidate");
                }
            }
            .instrument(span),
        );
    }

    /// Wait up to `timeout` for in-flight cache calls.
    ///
    /// Returns `false` if calls were still pending when the timeout elapsed.
    pub async fn flush(&self, timeout: Duration) -> bool {
        self.tracker.close();
        let drained = tokio::time::timeout(timeout, self.tracker.wait()).await.is_ok();
        self.tracker.reopen();

        if drained {
            debug!("Accelerator cache flushed");
        } else {
            warn!(pending = self.tracker.len(), "Accelerator cache flush timed out");
        }

        drained
    }
}
