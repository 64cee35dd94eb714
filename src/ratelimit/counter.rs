//! Fixed-window request counter.

use std::time::{Duration, Instant};

/// Length of every counting window.
pub const WINDOW: Duration = Duration::from_secs(1);

/// Counting state for a single fixed window.
///
/// Not synchronized on its own: the owner keeps `start` and `count` under one
/// lock so they are always observed and updated together.
#[derive(Debug, Clone, Copy)]
pub struct WindowCounter {
    /// When the current window started
    start: Instant,
    /// Requests admitted in the current window
    count: u32,
}

impl WindowCounter {
    /// Create an empty window starting at `now`.
    pub fn new(now: Instant) -> Self {
        Self { start: now, count: 0 }
    }

    /// Start a fresh window if a full window has elapsed since `start`.
    pub fn roll(&mut self, now: Instant) {
        if self.is_expired(now) {
            self.start = now;
            self.count = 0;
        }
    }

    /// Whether a full window has elapsed since `start`.
    pub fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.start) >= WINDOW
    }

    /// Count one request if the budget allows it.
    ///
    /// Returns `false` and leaves the count untouched when the window is full.
    pub fn try_admit(&mut self, budget: u32) -> bool {
        if self.count >= budget {
            return false;
        }
        self.count += 1;
        true
    }

    /// Requests admitted in the current window.
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Time left until the current window ends.
    pub fn until_reset(&self, now: Instant) -> Duration {
        WINDOW.saturating_sub(now.saturating_duration_since(self.start))
    }
}
