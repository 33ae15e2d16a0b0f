//! Shared load-state cache for media resources.
//!
//! - One entry per `MediaKey`, created on the first recorded event
//! - Entries are never evicted; the key space is bounded by the catalog
//! - Retry eligibility follows `RetryPolicy` (exponential backoff + ceiling)
//!
//! The cache is a cheap handle: clones share the same state, so every
//! controller and retry timer sees one consistent view.

pub mod entry;
pub mod policy;

pub use entry::{CacheEntry, CacheStats, LoadStatus};
pub use policy::{RetryPolicy, RetryState};

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;
use tracing::{debug, trace, warn};

use crate::clock::{Clock, TokioClock};
use crate::models::MediaKey;

#[derive(Default)]
struct CacheState {
    entries: HashMap<MediaKey, CacheEntry>,
    /// Retry counts of entries removed by `clear_error`. A cleared key is
    /// `Idle` again, but its next failure keeps counting towards the ceiling.
    cleared_failures: HashMap<MediaKey, u32>,
}

impl CacheState {
    fn prior_failures(&self, key: &MediaKey) -> u32 {
        self.entries
            .get(key)
            .map(|entry| entry.retry_count)
            .or_else(|| self.cleared_failures.get(key).copied())
            .unwrap_or(0)
    }
}

/// Process-wide map from media key to load status.
pub struct LoadStateCache {
    state: Arc<RwLock<CacheState>>,
    clock: Arc<dyn Clock>,
    policy: RetryPolicy,
}

impl LoadStateCache {
    /// Create a cache on tokio's clock.
    pub fn new(policy: RetryPolicy) -> Self {
        Self::with_clock(policy, Arc::new(TokioClock))
    }

    pub fn with_clock(policy: RetryPolicy, clock: Arc<dyn Clock>) -> Self {
        debug!(
            max_retry = policy.max_retry,
            base_delay_ms = policy.base_delay.as_millis() as u64,
            cap_delay_ms = policy.cap_delay.as_millis() as u64,
            "Initialized load-state cache"
        );
        Self {
            state: Arc::new(RwLock::new(CacheState::default())),
            clock,
            policy,
        }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Current instant on the cache's clock.
    pub fn now(&self) -> Instant {
        self.clock.now()
    }

    pub fn status(&self, key: &MediaKey) -> LoadStatus {
        self.state
            .read()
            .entries
            .get(key)
            .map_or(LoadStatus::Idle, |entry| entry.status)
    }

    /// Snapshot of the entry for `key`, if one exists.
    pub fn entry(&self, key: &MediaKey) -> Option<CacheEntry> {
        self.state.read().entries.get(key).copied()
    }

    pub fn is_loaded(&self, key: &MediaKey) -> bool {
        self.status(key) == LoadStatus::Loaded
    }

    /// Record a load attempt. Keeps the retry count.
    pub fn mark_loading(&self, key: &MediaKey) {
        let now = self.clock.now();
        let mut state = self.state.write();
        let retry_count = state.prior_failures(key);
        state.entries.insert(
            key.clone(),
            CacheEntry {
                status: LoadStatus::Loading,
                retry_count,
                last_attempt_at: now,
            },
        );
        trace!(%key, retry_count, "Media loading");
    }

    /// Record a successful load and reset the failure count.
    pub fn mark_loaded(&self, key: &MediaKey) {
        let mut state = self.state.write();
        state.cleared_failures.remove(key);
        match state.entries.get_mut(key) {
            Some(entry) => {
                entry.status = LoadStatus::Loaded;
                entry.retry_count = 0;
            }
            None => {
                // Loaded without a recorded attempt, e.g. served from the
                // browser cache. There is no attempt time to keep.
                let now = self.clock.now();
                state.entries.insert(
                    key.clone(),
                    CacheEntry {
                        status: LoadStatus::Loaded,
                        retry_count: 0,
                        last_attempt_at: now,
                    },
                );
            }
        }
        trace!(%key, "Media loaded");
    }

    /// Record a failed load. Returns the new retry count.
    pub fn mark_error(&self, key: &MediaKey) -> u32 {
        let now = self.clock.now();
        let mut state = self.state.write();
        let retry_count = state.prior_failures(key).saturating_add(1);
        state.cleared_failures.remove(key);
        state.entries.insert(
            key.clone(),
            CacheEntry {
                status: LoadStatus::Error,
                retry_count,
                last_attempt_at: now,
            },
        );
        drop(state);

        if self.policy.is_exhausted(retry_count) {
            warn!(%key, retry_count, "Media failed too many times, giving up");
        } else {
            debug!(
                %key,
                retry_count,
                backoff_ms = self.policy.backoff(retry_count).as_millis() as u64,
                "Media failed to load"
            );
        }
        retry_count
    }

    /// Retry eligibility for `key` at the current instant.
    pub fn retry_state(&self, key: &MediaKey) -> RetryState {
        let Some(entry) = self.entry(key) else {
            return RetryState::Ready;
        };
        if entry.status != LoadStatus::Error {
            return RetryState::Ready;
        }
        if self.policy.is_exhausted(entry.retry_count) {
            return RetryState::Exhausted;
        }

        let elapsed = self
            .clock
            .now()
            .saturating_duration_since(entry.last_attempt_at);
        let backoff = self.policy.backoff(entry.retry_count);
        if elapsed >= backoff {
            RetryState::Ready
        } else {
            RetryState::CoolingDown {
                remaining: backoff - elapsed,
            }
        }
    }

    pub fn can_retry(&self, key: &MediaKey) -> bool {
        self.retry_state(key).can_retry()
    }

    /// True once a key has failed `max_retry` times.
    pub fn has_max_retries(&self, key: &MediaKey) -> bool {
        self.retry_state(key) == RetryState::Exhausted
    }

    /// Drop an `Error` entry so the key reads as `Idle` again.
    ///
    /// Entries in any other status are left alone, so a retry timer that
    /// fires after a late success cannot erase it. Returns whether an entry
    /// was removed.
    pub fn clear_error(&self, key: &MediaKey) -> bool {
        let mut state = self.state.write();
        let Some(entry) = state.entries.get(key).copied() else {
            return false;
        };
        if entry.status != LoadStatus::Error {
            return false;
        }
        state.entries.remove(key);
        state.cleared_failures.insert(key.clone(), entry.retry_count);
        trace!(%key, retry_count = entry.retry_count, "Cleared media error");
        true
    }

    /// Forget everything about `key`, including its failure history.
    pub fn forget(&self, key: &MediaKey) {
        let mut state = self.state.write();
        state.entries.remove(key);
        state.cleared_failures.remove(key);
    }

    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.state.read();
        let mut stats = CacheStats::default();
        for entry in state.entries.values() {
            match entry.status {
                LoadStatus::Loading => stats.loading += 1,
                LoadStatus::Loaded => stats.loaded += 1,
                LoadStatus::Error => stats.error += 1,
                LoadStatus::Idle => {}
            }
        }
        stats
    }
}

impl Clone for LoadStateCache {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            clock: Arc::clone(&self.clock),
            policy: self.policy,
        }
    }
}

impl Default for LoadStateCache {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}

impl std::fmt::Debug for LoadStateCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadStateCache")
            .field("entries", &self.len())
            .field("policy", &self.policy)
            .finish()
    }
}
