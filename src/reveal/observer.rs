//! Scroll and intersection signals, decoupled from any UI toolkit.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

/// Identifies one container (folder, accordion section, listing).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContainerId(String);

impl ContainerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VisibilitySignal {
    /// Scroll position changed; `remaining` is the distance to the end of
    /// the rendered content.
    NearEnd { remaining: f64 },
    /// The end-of-list sentinel intersected the viewport.
    SentinelVisible,
}

pub type SignalCallback = Box<dyn Fn(VisibilitySignal) + Send + Sync>;

/// Anything that can deliver visibility signals for a container.
pub trait VisibilitySource {
    fn subscribe(&self, container: &ContainerId, on_signal: SignalCallback) -> Subscription;
}

/// Registration guard. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new<F>(release: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            release: Some(Box::new(release)),
        }
    }

    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.release.is_some())
            .finish()
    }
}

type Subscribers = HashMap<ContainerId, Vec<(u64, Arc<SignalCallback>)>>;

/// In-process signal fan-out: whoever observes the viewport calls `emit`.
#[derive(Clone, Default)]
pub struct SignalHub {
    subscribers: Arc<Mutex<Subscribers>>,
    next_id: Arc<AtomicU64>,
}

impl SignalHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `signal` to every subscriber of `container`.
    /// Returns the number of callbacks invoked.
    pub fn emit(&self, container: &ContainerId, signal: VisibilitySignal) -> usize {
        // Callbacks run outside the lock so they may subscribe or unsubscribe.
        let callbacks: Vec<Arc<SignalCallback>> = match self.subscribers.lock().get(container) {
            Some(list) => list.iter().map(|(_, cb)| Arc::clone(cb)).collect(),
            None => Vec::new(),
        };
        trace!(%container, ?signal, subscribers = callbacks.len(), "Emitting visibility signal");
        for callback in &callbacks {
            callback(signal);
        }
        callbacks.len()
    }

    pub fn subscriber_count(&self, container: &ContainerId) -> usize {
        self.subscribers
            .lock()
            .get(container)
            .map_or(0, |list| list.len())
    }
}

impl VisibilitySource for SignalHub {
    fn subscribe(&self, container: &ContainerId, on_signal: SignalCallback) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers
            .lock()
            .entry(container.clone())
            .or_default()
            .push((id, Arc::new(on_signal)));

        let subscribers = Arc::clone(&self.subscribers);
        let container = container.clone();
        Subscription::new(move || {
            let mut subscribers = subscribers.lock();
            if let Some(list) = subscribers.get_mut(&container) {
                list.retain(|(sub_id, _)| *sub_id != id);
                if list.is_empty() {
                    subscribers.remove(&container);
                }
            }
        })
    }
}

impl fmt::Debug for SignalHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignalHub")
            .field("containers", &self.subscribers.lock().len())
            .finish()
    }
}
