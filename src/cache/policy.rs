use std::time::Duration;

/// Failed attempts after which a key is given up on.
pub const DEFAULT_MAX_RETRY: u32 = 5;

/// Delay before the first retry; doubles per failure.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1000);

/// Upper bound on the retry delay.
pub const DEFAULT_CAP_DELAY: Duration = Duration::from_millis(30_000);

/// Retry ceiling and exponential backoff parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retry: u32,
    pub base_delay: Duration,
    pub cap_delay: Duration,
}

impl RetryPolicy {
    /// `min(base * 2^(n-1), cap)`; zero before the first failure.
    pub fn backoff(&self, retry_count: u32) -> Duration {
        if retry_count == 0 {
            return Duration::ZERO;
        }
        // 2^31 ms already exceeds any sane cap.
        let shift = (retry_count - 1).min(31);
        self.base_delay
            .checked_mul(1u32 << shift)
            .map_or(self.cap_delay, |delay| delay.min(self.cap_delay))
    }

    pub fn is_exhausted(&self, retry_count: u32) -> bool {
        retry_count >= self.max_retry
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retry: DEFAULT_MAX_RETRY,
            base_delay: DEFAULT_BASE_DELAY,
            cap_delay: DEFAULT_CAP_DELAY,
        }
    }
}

/// Whether a key may be attempted again right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    Ready,
    CoolingDown { remaining: Duration },
    Exhausted,
}

impl RetryState {
    pub fn can_retry(self) -> bool {
        matches!(self, Self::Ready)
    }
}
