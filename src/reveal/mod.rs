//! Per-container reveal decisions.
//!
//! A listing asks `should_load(i)` for every item on every render. The answer
//! combines the container's open state, the shared load-state cache and the
//! visible window, which grows as scroll signals arrive.

pub mod container;
pub mod observer;
pub mod window;

pub use container::{ContainerState, Transition};
pub use observer::{
    ContainerId, SignalCallback, SignalHub, Subscription, VisibilitySignal, VisibilitySource,
};
pub use window::{VisibleWindow, WindowPolicy};

use flume::{Receiver, Sender};
use tracing::{debug, trace};

use crate::cache::{LoadStateCache, RetryState};
use crate::models::MediaKey;

/// How a container lays out its items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presentation {
    List,
    Grid,
}

/// Outcome of a reveal decision, with the reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealDecision {
    /// Eligible to request its media.
    Load,
    /// Already loaded; stays mounted regardless of the window.
    Sticky,
    /// The container has not signalled readiness yet.
    NotReady,
    /// Too many failed attempts.
    Exhausted,
    /// Failed recently; waiting out the backoff.
    CoolingDown,
    /// Grid item beyond the visible window.
    OutsideWindow,
    /// Index beyond the listing.
    NoSuchItem,
}

impl RevealDecision {
    pub fn is_load(self) -> bool {
        matches!(self, Self::Load | Self::Sticky)
    }
}

/// Reveal state of one container.
pub struct RevealController {
    id: ContainerId,
    presentation: Presentation,
    policy: WindowPolicy,
    cache: LoadStateCache,
    keys: Vec<MediaKey>,
    state: ContainerState,
    window: VisibleWindow,
    signal_tx: Sender<VisibilitySignal>,
    signal_rx: Receiver<VisibilitySignal>,
    subscription: Option<Subscription>,
}

impl RevealController {
    pub fn new(
        id: ContainerId,
        presentation: Presentation,
        keys: Vec<MediaKey>,
        cache: LoadStateCache,
        policy: WindowPolicy,
    ) -> Self {
        let (signal_tx, signal_rx) = flume::unbounded();
        Self {
            id,
            presentation,
            policy,
            cache,
            keys,
            state: ContainerState::INITIAL,
            window: VisibleWindow::default(),
            signal_tx,
            signal_rx,
            subscription: None,
        }
    }

    pub fn id(&self) -> &ContainerId {
        &self.id
    }

    pub fn presentation(&self) -> Presentation {
        self.presentation
    }

    pub fn state(&self) -> ContainerState {
        self.state
    }

    pub fn window(&self) -> VisibleWindow {
        self.window
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn key(&self, index: usize) -> Option<&MediaKey> {
        self.keys.get(index)
    }

    /// Items may request media once the container's content is mounted.
    pub fn ready_to_load(&self) -> bool {
        self.state.content_loaded()
    }

    /// Open the container. Only a closed→open toggle resets the window.
    pub fn open(&mut self) -> Transition {
        let (next, transition) = self.state.on_open();
        self.state = next;
        if transition == Transition::Opened {
            self.window = VisibleWindow::initial(self.keys.len(), &self.policy);
            debug!(
                container = %self.id,
                items = self.keys.len(),
                revealed = self.window.len(),
                "Container opened"
            );
        }
        transition
    }

    pub fn close(&mut self) -> Transition {
        let (next, transition) = self.state.on_close();
        self.state = next;
        if transition == Transition::Closed {
            debug!(container = %self.id, "Container closed");
        }
        transition
    }

    pub fn toggle(&mut self) -> Transition {
        if self.state.is_open() {
            self.close()
        } else {
            self.open()
        }
    }

    /// Content of an open container has been mounted; items may now load.
    pub fn mark_content_loaded(&mut self) -> Transition {
        let (next, transition) = self.state.on_content_loaded();
        self.state = next;
        if transition == Transition::ContentLoaded {
            trace!(container = %self.id, "Container content mounted");
        }
        transition
    }

    /// Decide whether item `index` may request its media right now.
    pub fn decide(&self, index: usize) -> RevealDecision {
        let Some(key) = self.keys.get(index) else {
            return RevealDecision::NoSuchItem;
        };
        if !self.ready_to_load() {
            return RevealDecision::NotReady;
        }

        let retry = self.cache.retry_state(key);
        if retry == RetryState::Exhausted {
            return RevealDecision::Exhausted;
        }
        if self.cache.is_loaded(key) {
            return RevealDecision::Sticky;
        }
        if let RetryState::CoolingDown { .. } = retry {
            return RevealDecision::CoolingDown;
        }

        if self.presentation == Presentation::List && !self.policy.windowed_list {
            return RevealDecision::Load;
        }
        if self.window.contains(index) {
            RevealDecision::Load
        } else {
            RevealDecision::OutsideWindow
        }
    }

    pub fn should_load(&self, index: usize) -> bool {
        self.decide(index).is_load()
    }

    /// Indices currently allowed to load, in order.
    pub fn loadable_indices(&self) -> Vec<usize> {
        (0..self.keys.len())
            .filter(|index| self.should_load(*index))
            .collect()
    }

    /// Scroll position update. Grows the window when the remaining distance
    /// drops under the threshold. Returns whether it grew.
    pub fn on_scroll(&mut self, remaining: f64) -> bool {
        if !self.policy.is_near_end(remaining) {
            return false;
        }
        self.extend_window()
    }

    /// Reveal the next step of items. Ignored while closed.
    pub fn extend_window(&mut self) -> bool {
        if !self.state.is_open() {
            return false;
        }
        let grew = self.window.extend(self.policy.step, self.keys.len());
        if grew {
            debug!(
                container = %self.id,
                revealed = self.window.len(),
                items = self.keys.len(),
                "Extended visible window"
            );
        }
        grew
    }

    pub fn apply_signal(&mut self, signal: VisibilitySignal) -> bool {
        match signal {
            VisibilitySignal::NearEnd { remaining } => self.on_scroll(remaining),
            VisibilitySignal::SentinelVisible => self.extend_window(),
        }
    }

    /// Subscribe to `source` for this container's signals. Signals queue up
    /// until `pump` runs on the owning loop.
    pub fn attach(&mut self, source: &dyn VisibilitySource) {
        let tx = self.signal_tx.clone();
        let subscription = source.subscribe(
            &self.id,
            Box::new(move |signal| {
                let _ = tx.send(signal);
            }),
        );
        // Replacing drops (and releases) any earlier subscription.
        self.subscription = Some(subscription);
    }

    pub fn detach(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
    }

    pub fn is_attached(&self) -> bool {
        self.subscription.is_some()
    }

    /// Apply every queued signal. Returns whether the window grew.
    pub fn pump(&mut self) -> bool {
        let mut grew = false;
        while let Ok(signal) = self.signal_rx.try_recv() {
            grew |= self.apply_signal(signal);
        }
        grew
    }

    /// Replace the listing, e.g. after an upload or a delete. The window is
    /// clipped to the new length; a longer listing only reveals more items
    /// through scroll signals.
    pub fn set_items(&mut self, keys: Vec<MediaKey>) {
        debug!(container = %self.id, from = self.keys.len(), to = keys.len(), "Listing replaced");
        self.keys = keys;
        self.window.clip(self.keys.len());
    }
}

impl std::fmt::Debug for RevealController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RevealController")
            .field("id", &self.id)
            .field("presentation", &self.presentation)
            .field("state", &self.state)
            .field("window", &self.window)
            .field("items", &self.keys.len())
            .finish()
    }
}
