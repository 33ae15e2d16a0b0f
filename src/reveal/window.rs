/// Items revealed when a small container opens.
pub const DEFAULT_INITIAL_BATCH: usize = 25;

/// Items revealed when a container larger than `DEFAULT_LARGE_THRESHOLD` opens.
pub const DEFAULT_LARGE_INITIAL_BATCH: usize = 15;

pub const DEFAULT_LARGE_THRESHOLD: usize = 50;

/// Items added per scroll-proximity signal.
pub const DEFAULT_WINDOW_STEP: usize = 10;

/// Remaining distance to the end of rendered content that counts as "near".
pub const DEFAULT_SCROLL_THRESHOLD: f64 = 1000.0;

/// How a container reveals its items.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowPolicy {
    pub initial_batch: usize,
    pub large_initial_batch: usize,
    pub large_threshold: usize,
    pub step: usize,
    pub scroll_threshold: f64,
    /// Window list presentation as well. Off by default: list thumbnails
    /// are assumed cheap enough to load all at once.
    pub windowed_list: bool,
}

impl WindowPolicy {
    /// Number of items revealed right after a container opens.
    pub fn initial_count(&self, len: usize) -> usize {
        let batch = if len > self.large_threshold {
            self.large_initial_batch
        } else {
            self.initial_batch
        };
        batch.min(len)
    }

    pub fn is_near_end(&self, remaining: f64) -> bool {
        remaining < self.scroll_threshold
    }
}

impl Default for WindowPolicy {
    fn default() -> Self {
        Self {
            initial_batch: DEFAULT_INITIAL_BATCH,
            large_initial_batch: DEFAULT_LARGE_INITIAL_BATCH,
            large_threshold: DEFAULT_LARGE_THRESHOLD,
            step: DEFAULT_WINDOW_STEP,
            scroll_threshold: DEFAULT_SCROLL_THRESHOLD,
            windowed_list: false,
        }
    }
}

/// Revealed index range `start..end` of one container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VisibleWindow {
    pub start: usize,
    pub end: usize,
}

impl VisibleWindow {
    pub fn initial(len: usize, policy: &WindowPolicy) -> Self {
        Self {
            start: 0,
            end: policy.initial_count(len),
        }
    }

    pub fn contains(&self, index: usize) -> bool {
        index >= self.start && index < self.end
    }

    /// Last revealed index, if any.
    pub fn last(&self) -> Option<usize> {
        self.end.checked_sub(1).filter(|last| *last >= self.start)
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Grow by `step`, never past `len` and never shrinking.
    /// Returns whether the window grew.
    pub fn extend(&mut self, step: usize, len: usize) -> bool {
        let target = self.end.saturating_add(step).min(len);
        if target > self.end {
            self.end = target;
            true
        } else {
            false
        }
    }

    /// Drop revealed indices at or past `len`.
    pub fn clip(&mut self, len: usize) {
        self.end = self.end.min(len);
        self.start = self.start.min(self.end);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_count_thresholds() {
        let policy = WindowPolicy::default();
        assert_eq!(policy.initial_count(0), 0);
        assert_eq!(policy.initial_count(10), 10);
        assert_eq!(policy.initial_count(50), 25);
        assert_eq!(policy.initial_count(51), 15);
        assert_eq!(policy.initial_count(60), 15);
    }

    #[test]
    fn test_window_growth_is_monotonic_and_clipped() {
        let policy = WindowPolicy::default();
        let mut window = VisibleWindow::initial(32, &policy);
        assert_eq!(window.last(), Some(24));

        let mut previous = window.end;
        let mut grew = 0;
        while window.extend(policy.step, 32) {
            assert!(window.end > previous);
            assert!(window.end - previous <= policy.step);
            previous = window.end;
            grew += 1;
        }

        assert_eq!(grew, 1);
        assert_eq!(window.end, 32);
        assert!(!window.extend(policy.step, 10));
        assert_eq!(window.end, 32);
    }

    #[test]
    fn test_empty_window_has_no_last() {
        let window = VisibleWindow::default();
        assert!(window.is_empty());
        assert_eq!(window.last(), None);
        assert!(!window.contains(0));
    }

    #[test]
    fn test_clip_to_shorter_listing() {
        let mut window = VisibleWindow { start: 0, end: 35 };
        window.clip(20);
        assert_eq!(window.last(), Some(19));

        window.clip(100);
        assert_eq!(window.end, 20);

        window.clip(0);
        assert!(window.is_empty());
    }
}
