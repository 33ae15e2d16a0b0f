//! Client-side media load coordination.
//!
//! One shared [`LoadStateCache`] records what has loaded and what failed.
//! [`RevealController`]s decide which items of a list or grid may request
//! their media, and a [`CarouselController`] preloads the neighbours of the
//! focused slide. Failed keys back off exponentially and are given up on
//! after a fixed number of attempts.

pub mod cache;
pub mod carousel;
pub mod clock;
pub mod config;
pub mod error;
pub mod models;
pub mod retry;
pub mod reveal;
pub mod session;
pub mod sim;

pub use cache::{LoadStateCache, LoadStatus, RetryPolicy, RetryState};
pub use carousel::{CarouselController, CarouselItem, CarouselPolicy, PreloadHint};
pub use config::CoordinatorConfig;
pub use error::{Error, Result};
pub use models::{CatalogItem, MediaKey, MediaKind};
pub use retry::RetryScheduler;
pub use reveal::{
    ContainerId, Presentation, RevealController, RevealDecision, SignalHub, VisibilitySignal,
    VisibilitySource, WindowPolicy,
};
pub use session::MediaSession;
