//! Cancellable retry timers keyed by media key.
//!
//! - One pending timer per key; re-scheduling replaces the earlier one
//! - A fired timer clears the key's error so the next decision re-evaluates it
//! - Timers are aborted on success, on `cancel`, and when the scheduler drops

use std::collections::HashMap;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::cache::{LoadStateCache, LoadStatus};
use crate::error::Result;
use crate::models::MediaKey;

/// Owns the retry timers scheduled by one controller.
pub struct RetryScheduler {
    cache: LoadStateCache,
    handle: Handle,
    pending: HashMap<MediaKey, JoinHandle<()>>,
}

impl RetryScheduler {
    /// Create a scheduler on the current tokio runtime.
    pub fn new(cache: LoadStateCache) -> Result<Self> {
        let handle = Handle::try_current()?;
        Ok(Self::with_handle(cache, handle))
    }

    pub fn with_handle(cache: LoadStateCache, handle: Handle) -> Self {
        Self {
            cache,
            handle,
            pending: HashMap::new(),
        }
    }

    /// Clear the error for `key` once `delay` has elapsed.
    pub fn schedule(&mut self, key: MediaKey, delay: Duration) {
        self.prune_finished();
        if let Some(previous) = self.pending.remove(&key) {
            previous.abort();
            trace!(%key, "Replaced pending retry timer");
        }

        let cache = self.cache.clone();
        let task_key = key.clone();
        let task = self.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            if cache.clear_error(&task_key) {
                debug!(key = %task_key, "Retry window opened");
            }
        });

        trace!(%key, delay_ms = delay.as_millis() as u64, "Scheduled retry");
        self.pending.insert(key, task);
    }

    /// Schedule a retry for a key that just failed, unless it is exhausted.
    ///
    /// Returns whether a timer was scheduled.
    pub fn schedule_after_failure(&mut self, key: &MediaKey) -> bool {
        let Some(entry) = self.cache.entry(key) else {
            return false;
        };
        let policy = self.cache.policy();
        if entry.status != LoadStatus::Error || policy.is_exhausted(entry.retry_count) {
            return false;
        }
        self.schedule(key.clone(), policy.backoff(entry.retry_count));
        true
    }

    /// Abort the pending timer for `key`. Returns whether one was pending.
    pub fn cancel(&mut self, key: &MediaKey) -> bool {
        match self.pending.remove(key) {
            Some(task) => {
                let was_pending = !task.is_finished();
                task.abort();
                was_pending
            }
            None => false,
        }
    }

    pub fn cancel_all(&mut self) {
        let count = self.pending.len();
        for (_, task) in self.pending.drain() {
            task.abort();
        }
        if count > 0 {
            debug!(count, "Cancelled retry timers");
        }
    }

    pub fn is_pending(&self, key: &MediaKey) -> bool {
        self.pending
            .get(key)
            .is_some_and(|task| !task.is_finished())
    }

    pub fn pending_count(&self) -> usize {
        self.pending
            .values()
            .filter(|task| !task.is_finished())
            .count()
    }

    fn prune_finished(&mut self) {
        self.pending.retain(|_, task| !task.is_finished());
    }
}

impl Drop for RetryScheduler {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

impl std::fmt::Debug for RetryScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryScheduler")
            .field("pending", &self.pending_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::RetryPolicy;

    fn key(name: &str) -> MediaKey {
        MediaKey::resolve("https://cdn.test/", name)
    }

    #[test]
    fn test_new_requires_runtime() {
        let cache = LoadStateCache::default();
        assert!(RetryScheduler::new(cache).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_clears_error_after_backoff() {
        let cache = LoadStateCache::new(RetryPolicy::default());
        let mut scheduler = RetryScheduler::new(cache.clone()).unwrap();
        let k = key("a.jpg");

        cache.mark_error(&k);
        assert!(scheduler.schedule_after_failure(&k));
        assert!(scheduler.is_pending(&k));

        tokio::time::sleep(Duration::from_millis(999)).await;
        assert_eq!(cache.status(&k), LoadStatus::Error);

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(cache.status(&k), LoadStatus::Idle);
        assert_eq!(scheduler.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_timer_for_exhausted_key() {
        let cache = LoadStateCache::new(RetryPolicy::default());
        let mut scheduler = RetryScheduler::new(cache.clone()).unwrap();
        let k = key("broken.jpg");

        for _ in 0..5 {
            cache.mark_error(&k);
        }

        assert!(!scheduler.schedule_after_failure(&k));
        assert_eq!(scheduler.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reschedule_replaces_previous_timer() {
        let cache = LoadStateCache::new(RetryPolicy::default());
        let mut scheduler = RetryScheduler::new(cache.clone()).unwrap();
        let k = key("a.jpg");
        cache.mark_error(&k);

        scheduler.schedule(k.clone(), Duration::from_secs(10));
        scheduler.schedule(k.clone(), Duration::from_secs(20));
        assert_eq!(scheduler.pending_count(), 1);

        tokio::time::sleep(Duration::from_secs(15)).await;
        assert_eq!(cache.status(&k), LoadStatus::Error);

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(cache.status(&k), LoadStatus::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_and_drop_abort_timers() {
        let cache = LoadStateCache::new(RetryPolicy::default());
        let a = key("a.jpg");
        let b = key("b.jpg");
        cache.mark_error(&a);
        cache.mark_error(&b);

        {
            let mut scheduler = RetryScheduler::new(cache.clone()).unwrap();
            scheduler.schedule_after_failure(&a);
            scheduler.schedule_after_failure(&b);
            assert!(scheduler.cancel(&a));
            assert!(!scheduler.cancel(&a));
        }

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(cache.status(&a), LoadStatus::Error);
        assert_eq!(cache.status(&b), LoadStatus::Error);
    }
}
