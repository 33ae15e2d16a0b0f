use std::time::Instant;

/// Load status of a media key. Keys the cache has never seen are `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LoadStatus {
    #[default]
    Idle,
    Loading,
    Loaded,
    Error,
}

/// A single cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheEntry {
    pub status: LoadStatus,
    /// Consecutive failures; reset when the key loads.
    pub retry_count: u32,
    /// Last transition into `Loading` or `Error`.
    pub last_attempt_at: Instant,
}

/// Number of entries per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub loading: usize,
    pub loaded: usize,
    pub error: usize,
}

impl CacheStats {
    pub fn total(&self) -> usize {
        self.loading + self.loaded + self.error
    }
}
