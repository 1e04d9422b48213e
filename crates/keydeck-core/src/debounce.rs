//! Single-shot debounce guard over a monotonic clock.

use std::time::{Duration, Instant};

/// Suppresses repeated events within a quiet window after the first.
///
/// The first request applies immediately and arms the window; requests
/// arriving inside the window are dropped, not queued. When the window
/// elapses the guard disarms and the next request applies immediately.
#[derive(Debug)]
pub struct Debounce {
    window: Duration,
    armed_at: Option<Instant>,
}

impl Debounce {
    /// Create a guard with the given quiet window.
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self { window, armed_at: None }
    }

    /// Try to apply an event at `now`.
    ///
    /// Returns `true` if the event should be applied (and re-arms the
    /// window), `false` if it falls inside the quiet window.
    pub fn try_apply(&mut self, now: Instant) -> bool {
        match self.armed_at {
            Some(armed) if now.duration_since(armed) < self.window => false,
            _ => {
                self.armed_at = Some(now);
                true
            }
        }
    }

    /// Disarm the guard.
    pub fn reset(&mut self) {
        self.armed_at = None;
    }
}
