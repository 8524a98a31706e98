//! Time source for the session controller.
//!
//! Session timing uses the monotonic clock and quiet hours use local
//! wall-clock time. The controller's own pauses (the fade steps) go through
//! [`Clock::sleep`] so a test clock can advance time without blocking. The
//! player's settle delays after each command are taken by the sink itself.

use chrono::NaiveDateTime;
use std::time::{Duration, Instant};

pub trait Clock {
    /// Monotonic "now", used for session start and elapsed time.
    fn now(&self) -> Instant;
    /// Local wall-clock time, used for the quiet hours policy.
    fn local_time(&self) -> NaiveDateTime;
    /// Pause for `duration`.
    fn sleep(&self, duration: Duration);
}

/// Real clock backed by `Instant`, `chrono::Local` and `thread::sleep`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn local_time(&self) -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}
