use std::time::{Duration, Instant};

/// Quiet period after a gesture-triggered navigation.
pub const DEFAULT_GESTURE_COOLDOWN: Duration = Duration::from_millis(500);

/// Minimum horizontal travel for a touch swipe to count.
pub const DEFAULT_SWIPE_THRESHOLD: f64 = 50.0;

/// Minimum wheel delta for a scroll to count.
pub const DEFAULT_WHEEL_THRESHOLD: f64 = 30.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureDirection {
    Next,
    Previous,
}

/// Turns raw touch/wheel input into at most one navigation per cool-down.
#[derive(Debug, Clone)]
pub struct GestureGate {
    cooldown: Duration,
    swipe_threshold: f64,
    wheel_threshold: f64,
    touch_origin: Option<f64>,
    last_fired: Option<Instant>,
}

impl GestureGate {
    pub fn new(cooldown: Duration, swipe_threshold: f64, wheel_threshold: f64) -> Self {
        Self {
            cooldown,
            swipe_threshold,
            wheel_threshold,
            touch_origin: None,
            last_fired: None,
        }
    }

    pub fn touch_start(&mut self, x: f64) {
        self.touch_origin = Some(x);
    }

    /// Finish a touch. Swiping left moves forward.
    pub fn swipe_direction(&mut self, x: f64) -> Option<GestureDirection> {
        let origin = self.touch_origin.take()?;
        let travel = origin - x;
        if travel.abs() <= self.swipe_threshold {
            return None;
        }
        Some(if travel > 0.0 {
            GestureDirection::Next
        } else {
            GestureDirection::Previous
        })
    }

    /// Scrolling down moves forward.
    pub fn wheel_direction(&self, delta_y: f64) -> Option<GestureDirection> {
        if delta_y.abs() <= self.wheel_threshold {
            return None;
        }
        Some(if delta_y > 0.0 {
            GestureDirection::Next
        } else {
            GestureDirection::Previous
        })
    }

    pub fn is_cooling_down(&self, now: Instant) -> bool {
        self.last_fired
            .is_some_and(|fired| now.saturating_duration_since(fired) < self.cooldown)
    }

    /// Claim the gesture slot. Returns false while cooling down.
    pub fn try_fire(&mut self, now: Instant) -> bool {
        if self.is_cooling_down(now) {
            return false;
        }
        self.last_fired = Some(now);
        true
    }
}

impl Default for GestureGate {
    fn default() -> Self {
        Self::new(
            DEFAULT_GESTURE_COOLDOWN,
            DEFAULT_SWIPE_THRESHOLD,
            DEFAULT_WHEEL_THRESHOLD,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_swipe_needs_threshold_travel() {
        let mut gate = GestureGate::default();
        gate.touch_start(200.0);
        assert_eq!(gate.swipe_direction(160.0), None);

        gate.touch_start(200.0);
        assert_eq!(gate.swipe_direction(100.0), Some(GestureDirection::Next));

        gate.touch_start(100.0);
        assert_eq!(gate.swipe_direction(300.0), Some(GestureDirection::Previous));

        // No touch in progress.
        assert_eq!(gate.swipe_direction(0.0), None);
    }

    #[test]
    fn test_wheel_direction() {
        let gate = GestureGate::default();
        assert_eq!(gate.wheel_direction(12.0), None);
        assert_eq!(gate.wheel_direction(80.0), Some(GestureDirection::Next));
        assert_eq!(gate.wheel_direction(-80.0), Some(GestureDirection::Previous));
    }

    #[test]
    fn test_cooldown_window() {
        let mut gate = GestureGate::default();
        let start = Instant::now();

        assert!(gate.try_fire(start));
        assert!(!gate.try_fire(start + Duration::from_millis(499)));
        assert!(gate.try_fire(start + Duration::from_millis(500)));
    }
}
