//! Process-wide rate limiter.

use parking_lot::Mutex;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

use super::backend::AdmissionControl;
use super::counter::WindowCounter;
use crate::error::RateLimitExceeded;

/// Fixed-window admission gate shared by every request.
///
/// Admits at most `budget` calls per one-second window. The first window
/// starts at construction and each later one starts at the first call made
/// after the previous window ended. Bursts that straddle a boundary can be
/// admitted at close to twice the budget over a short span.
///
/// This struct is thread-safe and can be shared across multiple tasks.
pub struct RateLimiter {
    /// Requests allowed per window
    budget: u32,
    /// Window start and count, always updated together
    window: Mutex<WindowCounter>,
}

impl RateLimiter {
    /// Create a new rate limiter admitting `budget` requests per second.
    pub fn new(budget: u32) -> Self {
        Self::starting_at(budget, Instant::now())
    }

    fn starting_at(budget: u32, now: Instant) -> Self {
        Self {
            budget,
            window: Mutex::new(WindowCounter::new(now)),
        }
    }

    /// Attempt to admit one unit of work now.
    pub fn allow(&self) -> Result<(), RateLimitExceeded> {
        self.allow_at(Instant::now())
    }

    /// Attempt to admit one unit of work at the given instant.
    pub(crate) fn allow_at(&self, now: Instant) -> Result<(), RateLimitExceeded> {
        let mut window = self.window.lock();
        window.roll(now);

        if window.try_admit(self.budget) {
            trace!(count = window.count(), budget = self.budget, "Request admitted");
            return Ok(());
        }

        let retry_after = window.until_reset(now);
        debug!(
            budget = self.budget,
            retry_after_ms = retry_after.as_millis() as u64,
            "Rate limit exceeded"
        );
        Err(RateLimitExceeded { retry_after })
    }

    /// Requests allowed per window.
    pub fn budget(&self) -> u32 {
        self.budget
    }

    /// Requests still available in the current window.
    ///
    /// Read-only: an expired window reports the full budget but is only
    /// replaced by the next call to [`allow`](Self::allow).
    pub fn remaining(&self) -> u32 {
        self.remaining_at(Instant::now())
    }

    fn remaining_at(&self, now: Instant) -> u32 {
        let window = self.window.lock();
        if window.is_expired(now) {
            return self.budget;
        }
        self.budget.saturating_sub(window.count())
    }

    /// Time until the current window ends, zero if it already has.
    pub fn duration_until_reset(&self) -> Duration {
        self.duration_until_reset_at(Instant::now())
    }

    fn duration_until_reset_at(&self, now: Instant) -> Duration {
        self.window.lock().until_reset(now)
    }
}

impl AdmissionControl for RateLimiter {
    fn allow(&self) -> Result<(), RateLimitExceeded> {
        RateLimiter::allow(self)
    }
}
