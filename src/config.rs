//! Tunables, read from `MEDIALOAD_*` environment variables.
//!
//! Missing or unparsable values fall back to the defaults.

use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::cache::RetryPolicy;
use crate::carousel::CarouselPolicy;
use crate::reveal::WindowPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CoordinatorConfig {
    pub retry: RetryPolicy,
    pub window: WindowPolicy,
    pub carousel: CarouselPolicy,
}

impl CoordinatorConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a config from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(v) = positive::<u32>(&lookup, "MEDIALOAD_MAX_RETRY") {
            config.retry.max_retry = v;
        }
        if let Some(ms) = positive::<u64>(&lookup, "MEDIALOAD_BASE_DELAY_MS") {
            config.retry.base_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = positive::<u64>(&lookup, "MEDIALOAD_CAP_DELAY_MS") {
            config.retry.cap_delay = Duration::from_millis(ms);
        }

        if let Some(v) = positive::<usize>(&lookup, "MEDIALOAD_WINDOW_STEP") {
            config.window.step = v;
        }
        if let Some(v) = positive::<f64>(&lookup, "MEDIALOAD_SCROLL_THRESHOLD") {
            config.window.scroll_threshold = v;
        }
        if let Some(v) = positive::<usize>(&lookup, "MEDIALOAD_INITIAL_BATCH") {
            config.window.initial_batch = v;
        }
        if let Some(v) = positive::<usize>(&lookup, "MEDIALOAD_LARGE_INITIAL_BATCH") {
            config.window.large_initial_batch = v;
        }
        if let Some(v) = positive::<usize>(&lookup, "MEDIALOAD_LARGE_THRESHOLD") {
            config.window.large_threshold = v;
        }
        if let Some(v) = flag(&lookup, "MEDIALOAD_WINDOWED_LIST") {
            config.window.windowed_list = v;
        }

        if let Some(ms) = parse::<u64>(&lookup, "MEDIALOAD_GESTURE_COOLDOWN_MS") {
            config.carousel.gesture_cooldown = Duration::from_millis(ms);
        }

        config
    }
}

fn parse<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<T> {
    let raw = lookup(name)?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(name, value = %raw, "Ignoring unparsable setting");
            None
        }
    }
}

fn positive<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<T>
where
    T: FromStr + PartialOrd + Default,
{
    parse::<T>(lookup, name).filter(|v| *v > T::default())
}

fn flag(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<bool> {
    lookup(name).map(|v| {
        matches!(
            v.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}
