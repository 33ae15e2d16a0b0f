//! Focused viewer over an ordered sequence of media.
//!
//! - Navigation by index, next/previous, touch swipe and wheel (debounced)
//! - Preloads the neighbors of the current item independent of scrolling
//! - Funnels media load/error events into the shared load-state cache and
//!   schedules retries after the backoff

pub mod gesture;
pub mod neighborhood;

pub use gesture::{GestureDirection, GestureGate};
pub use neighborhood::PreloadNeighborhood;

use std::time::Duration;

use tracing::{debug, info, trace};

use crate::cache::LoadStateCache;
use crate::error::Result;
use crate::models::{CatalogItem, MediaKey, MediaKind};
use crate::retry::RetryScheduler;

use gesture::{DEFAULT_GESTURE_COOLDOWN, DEFAULT_SWIPE_THRESHOLD, DEFAULT_WHEEL_THRESHOLD};

/// Gesture tuning for the viewer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CarouselPolicy {
    pub gesture_cooldown: Duration,
    pub swipe_threshold: f64,
    pub wheel_threshold: f64,
}

impl Default for CarouselPolicy {
    fn default() -> Self {
        Self {
            gesture_cooldown: DEFAULT_GESTURE_COOLDOWN,
            swipe_threshold: DEFAULT_SWIPE_THRESHOLD,
            wheel_threshold: DEFAULT_WHEEL_THRESHOLD,
        }
    }
}

/// One slide in the viewer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CarouselItem {
    pub key: MediaKey,
    pub kind: MediaKind,
}

impl CarouselItem {
    pub fn new(key: MediaKey, kind: MediaKind) -> Self {
        Self { key, kind }
    }

    pub fn from_catalog(item: &CatalogItem, base: &str) -> Self {
        Self::new(item.media_key(base), item.kind)
    }
}

/// Resource hint for a slide's media element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreloadHint {
    /// Fetch eagerly even while off-screen.
    Auto,
    None,
}

pub struct CarouselController {
    items: Vec<CarouselItem>,
    cache: LoadStateCache,
    retries: RetryScheduler,
    gestures: GestureGate,
    current_index: usize,
    open: bool,
    playing: bool,
}

impl CarouselController {
    /// Create a viewer whose retry timers run on the current tokio runtime.
    pub fn new(
        items: Vec<CarouselItem>,
        cache: LoadStateCache,
        policy: CarouselPolicy,
    ) -> Result<Self> {
        let retries = RetryScheduler::new(cache.clone())?;
        Ok(Self::with_scheduler(items, cache, retries, policy))
    }

    pub fn with_scheduler(
        items: Vec<CarouselItem>,
        cache: LoadStateCache,
        retries: RetryScheduler,
        policy: CarouselPolicy,
    ) -> Self {
        Self {
            items,
            cache,
            retries,
            gestures: GestureGate::new(
                policy.gesture_cooldown,
                policy.swipe_threshold,
                policy.wheel_threshold,
            ),
            current_index: 0,
            open: false,
            playing: false,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current_item(&self) -> Option<&CarouselItem> {
        self.items.get(self.current_index)
    }

    pub fn current_key(&self) -> Option<&MediaKey> {
        self.current_item().map(|item| &item.key)
    }

    /// Whether the current slide's media has loaded, read from the cache.
    pub fn is_media_loaded(&self) -> bool {
        self.current_key()
            .is_some_and(|key| self.cache.is_loaded(key))
    }

    pub fn pending_retries(&self) -> usize {
        self.retries.pending_count()
    }

    /// Open the viewer at `index`. Out-of-range indices are ignored.
    pub fn open(&mut self, index: usize) -> bool {
        if index >= self.items.len() {
            return false;
        }
        self.current_index = index;
        self.open = true;
        info!(
            index,
            items = self.items.len(),
            loaded = self.is_media_loaded(),
            "Opening viewer"
        );
        true
    }

    /// Close and pause. The position is kept for the next open.
    pub fn close(&mut self) {
        if self.open {
            info!(index = self.current_index, "Closing viewer");
        }
        self.open = false;
        self.playing = false;
    }

    /// Jump to `index`. Out-of-range indices are ignored.
    pub fn navigate(&mut self, index: usize) -> bool {
        if index >= self.items.len() {
            trace!(index, items = self.items.len(), "Ignoring out-of-range navigation");
            return false;
        }
        self.current_index = index;
        self.playing = false;
        trace!(index, loaded = self.is_media_loaded(), "Navigated");
        true
    }

    pub fn next(&mut self) -> bool {
        match self.current_index.checked_add(1) {
            Some(index) => self.navigate(index),
            None => false,
        }
    }

    pub fn previous(&mut self) -> bool {
        match self.current_index.checked_sub(1) {
            Some(index) => self.navigate(index),
            None => false,
        }
    }

    /// Start playback of the current slide. Photos cannot play.
    pub fn play(&mut self) -> bool {
        let playable = self
            .current_item()
            .is_some_and(|item| item.kind.is_playable());
        if !self.open || !playable {
            return false;
        }
        self.playing = true;
        true
    }

    pub fn pause(&mut self) {
        self.playing = false;
    }

    pub fn toggle_playback(&mut self) -> bool {
        if self.playing {
            self.pause();
            false
        } else {
            self.play()
        }
    }

    pub fn touch_start(&mut self, x: f64) {
        self.gestures.touch_start(x);
    }

    pub fn touch_end(&mut self, x: f64) -> bool {
        match self.gestures.swipe_direction(x) {
            Some(direction) => self.gesture_navigate(direction),
            None => false,
        }
    }

    pub fn wheel(&mut self, delta_y: f64) -> bool {
        match self.gestures.wheel_direction(delta_y) {
            Some(direction) => self.gesture_navigate(direction),
            None => false,
        }
    }

    fn gesture_navigate(&mut self, direction: GestureDirection) -> bool {
        if !self.open {
            return false;
        }
        let target = match direction {
            GestureDirection::Next => self.current_index.checked_add(1),
            GestureDirection::Previous => self.current_index.checked_sub(1),
        };
        let Some(target) = target.filter(|index| *index < self.items.len()) else {
            return false;
        };
        if !self.gestures.try_fire(self.cache.now()) {
            trace!(?direction, "Gesture suppressed during cool-down");
            return false;
        }
        self.navigate(target)
    }

    pub fn preload_neighborhood(&self) -> PreloadNeighborhood {
        PreloadNeighborhood::around(self.current_index, self.items.len())
    }

    /// Loaded slides stay eligible anywhere. Other slides must be in the
    /// preload neighborhood, and a neighbor that is waiting out its retry
    /// backoff or has given up is left out, so a failing slide is only
    /// re-requested once its retry timer has cleared the error.
    pub fn should_preload(&self, index: usize) -> bool {
        let Some(item) = self.items.get(index) else {
            return false;
        };
        if self.cache.is_loaded(&item.key) {
            return true;
        }
        self.preload_neighborhood().contains(index) && self.cache.can_retry(&item.key)
    }

    pub fn preload_hint(&self, index: usize) -> PreloadHint {
        if self.should_preload(index) {
            PreloadHint::Auto
        } else {
            PreloadHint::None
        }
    }

    /// Media element for slide `index` started fetching.
    pub fn on_media_loading(&mut self, index: usize) {
        if let Some(item) = self.items.get(index) {
            self.cache.mark_loading(&item.key);
        }
    }

    /// Media element for slide `index` fired `load` / `loadedmetadata`.
    pub fn on_media_loaded(&mut self, index: usize) {
        let Some(item) = self.items.get(index) else {
            return;
        };
        self.cache.mark_loaded(&item.key);
        self.retries.cancel(&item.key);
    }

    /// Media element for slide `index` fired `error`. Schedules a retry
    /// unless the key is exhausted. Returns whether a retry was scheduled.
    pub fn on_media_error(&mut self, index: usize) -> bool {
        let Some(item) = self.items.get(index) else {
            return false;
        };
        let key = item.key.clone();
        let retry_count = self.cache.mark_error(&key);
        if index == self.current_index {
            self.playing = false;
        }
        let scheduled = self.retries.schedule_after_failure(&key);
        if !scheduled {
            debug!(%key, retry_count, "No retry scheduled");
        }
        scheduled
    }
}

impl std::fmt::Debug for CarouselController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CarouselController")
            .field("items", &self.items.len())
            .field("current_index", &self.current_index)
            .field("open", &self.open)
            .field("playing", &self.playing)
            .field("retries", &self.retries)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{LoadStatus, RetryPolicy};
    use crate::clock::ManualClock;
    use std::collections::BTreeSet;
    use std::sync::Arc;

    fn items(count: usize) -> Vec<CarouselItem> {
        (0..count)
            .map(|i| {
                let kind = if i % 2 == 0 {
                    MediaKind::Video
                } else {
                    MediaKind::Photo
                };
                CarouselItem::new(
                    MediaKey::resolve("https://cdn.test/", &format!("slide-{i}")),
                    kind,
                )
            })
            .collect()
    }

    fn manual_viewer(count: usize) -> (CarouselController, LoadStateCache, ManualClock) {
        let clock = ManualClock::new();
        let cache = LoadStateCache::with_clock(RetryPolicy::default(), Arc::new(clock.clone()));
        let viewer = CarouselController::new(items(count), cache.clone(), CarouselPolicy::default())
            .expect("runtime available");
        (viewer, cache, clock)
    }

    #[tokio::test]
    async fn test_open_close_keeps_position() {
        let (mut viewer, cache, _) = manual_viewer(10);
        assert!(!viewer.open(10));
        assert!(!viewer.is_open());

        cache.mark_loaded(&items(10)[4].key);
        assert!(viewer.open(4));
        assert!(viewer.is_media_loaded());
        assert!(viewer.play());

        viewer.close();
        assert!(!viewer.is_open());
        assert!(!viewer.is_playing());
        assert_eq!(viewer.current_index(), 4);
    }

    #[tokio::test]
    async fn test_navigation_bounds_and_pause() {
        let (mut viewer, cache, _) = manual_viewer(3);
        viewer.open(0);
        assert!(!viewer.previous());
        assert!(viewer.play());

        assert!(viewer.next());
        assert!(!viewer.is_playing());
        assert!(!viewer.is_media_loaded());

        cache.mark_loaded(&items(3)[2].key);
        assert!(viewer.navigate(2));
        assert!(viewer.is_media_loaded());
        assert!(!viewer.next());
        assert!(!viewer.navigate(7));
        assert_eq!(viewer.current_index(), 2);
    }

    #[tokio::test]
    async fn test_photos_do_not_play() {
        let (mut viewer, _, _) = manual_viewer(2);
        assert!(!viewer.play());

        viewer.open(1);
        assert!(!viewer.play());
        assert!(!viewer.toggle_playback());

        viewer.previous();
        assert!(viewer.toggle_playback());
        assert!(!viewer.toggle_playback());
        assert!(!viewer.is_playing());
    }

    #[tokio::test]
    async fn test_gestures_are_debounced() {
        let (mut viewer, _, clock) = manual_viewer(10);
        viewer.open(0);

        assert!(viewer.wheel(120.0));
        assert!(!viewer.wheel(120.0));
        viewer.touch_start(300.0);
        assert!(!viewer.touch_end(100.0));
        assert_eq!(viewer.current_index(), 1);

        clock.advance(Duration::from_millis(500));
        viewer.touch_start(300.0);
        assert!(viewer.touch_end(100.0));
        assert_eq!(viewer.current_index(), 2);

        // Explicit navigation is not debounced.
        assert!(viewer.next());
        assert_eq!(viewer.current_index(), 3);

        clock.advance(Duration::from_millis(500));
        assert!(viewer.wheel(-90.0));
        assert_eq!(viewer.current_index(), 2);
    }

    #[tokio::test]
    async fn test_gesture_at_boundary_does_not_start_cooldown() {
        let (mut viewer, _, _) = manual_viewer(3);
        viewer.open(0);

        assert!(!viewer.wheel(-120.0));
        assert!(viewer.wheel(120.0));
        assert_eq!(viewer.current_index(), 1);
    }

    #[tokio::test]
    async fn test_preload_neighborhood_and_hints() {
        let (mut viewer, cache, _) = manual_viewer(10);
        viewer.open(5);

        let expected: BTreeSet<usize> = [4, 5, 6].into_iter().collect();
        assert_eq!(viewer.preload_neighborhood().indices, expected);
        assert_eq!(viewer.preload_hint(6), PreloadHint::Auto);
        assert_eq!(viewer.preload_hint(8), PreloadHint::None);

        cache.mark_loaded(&items(10)[8].key);
        assert_eq!(viewer.preload_hint(8), PreloadHint::Auto);

        viewer.navigate(0);
        let expected: BTreeSet<usize> = [0, 1].into_iter().collect();
        assert_eq!(viewer.preload_neighborhood().indices, expected);
        viewer.navigate(9);
        let expected: BTreeSet<usize> = [8, 9].into_iter().collect();
        assert_eq!(viewer.preload_neighborhood().indices, expected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_schedules_retry_then_success() {
        let cache = LoadStateCache::new(RetryPolicy::default());
        let mut viewer =
            CarouselController::new(items(4), cache.clone(), CarouselPolicy::default()).unwrap();
        let key = items(4)[1].key.clone();
        viewer.open(1);

        viewer.on_media_loading(1);
        assert!(viewer.on_media_error(1));
        assert_eq!(cache.entry(&key).unwrap().retry_count, 1);
        assert!(!viewer.should_preload(1));
        assert_eq!(viewer.pending_retries(), 1);

        tokio::time::sleep(Duration::from_millis(1001)).await;
        assert_eq!(cache.status(&key), LoadStatus::Idle);
        assert!(viewer.should_preload(1));

        viewer.on_media_loading(1);
        viewer.on_media_loaded(1);
        let entry = cache.entry(&key).unwrap();
        assert_eq!(entry.status, LoadStatus::Loaded);
        assert_eq!(entry.retry_count, 0);
        assert!(viewer.is_media_loaded());
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_slide_does_not_block_siblings() {
        let cache = LoadStateCache::new(RetryPolicy::default());
        let mut viewer =
            CarouselController::new(items(3), cache.clone(), CarouselPolicy::default()).unwrap();
        viewer.open(1);

        let mut scheduled = 0;
        for _ in 0..5 {
            viewer.on_media_loading(1);
            if viewer.on_media_error(1) {
                scheduled += 1;
                tokio::time::sleep(Duration::from_secs(31)).await;
            }
        }

        assert_eq!(scheduled, 4);
        assert!(cache.has_max_retries(&items(3)[1].key));
        assert!(!viewer.should_preload(1));
        assert!(viewer.should_preload(0));
        assert!(viewer.should_preload(2));
        assert!(viewer.next());
        assert_eq!(viewer.current_index(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_cancels_pending_retry() {
        let cache = LoadStateCache::new(RetryPolicy::default());
        let mut viewer =
            CarouselController::new(items(2), cache.clone(), CarouselPolicy::default()).unwrap();
        viewer.open(0);

        viewer.on_media_error(0);
        viewer.on_media_loaded(0);
        assert_eq!(viewer.pending_retries(), 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(cache.status(&items(2)[0].key), LoadStatus::Loaded);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_viewer_cancels_retries() {
        let cache = LoadStateCache::new(RetryPolicy::default());
        let key = items(2)[0].key.clone();
        {
            let mut viewer =
                CarouselController::new(items(2), cache.clone(), CarouselPolicy::default())
                    .unwrap();
            viewer.open(0);
            assert!(viewer.on_media_error(0));
        }

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(cache.status(&key), LoadStatus::Error);
    }
}
