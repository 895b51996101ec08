//! Heartbeat throttling for long-running fetch operations
//!
//! Batch fetches can complete hundreds of pages per second; forwarding
//! every completion to subscribers would flood them. The
//! [`HeartbeatManager`] lets at most one update through per configured
//! interval.

use super::ProgressUpdate;
use std::time::{Duration, Instant};

/// Injectable time source so throttle behavior is testable without sleeping
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// The default clock, backed by [`Instant::now`]
#[derive(Debug, Clone, Copy, Default)]
pub struct MonotonicClock;

impl Clock for MonotonicClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Callback invoked for updates that pass the throttle
pub type HeartbeatCallback = Box<dyn Fn(&ProgressUpdate) + Send + Sync>;

/// Throttles repeated progress callbacks to at most one per interval
///
/// The first call always sends (there is no `last_sent` yet), as does
/// the first call after [`HeartbeatManager::reset`]. With no callback
/// configured every call is a no-op returning `false`.
pub struct HeartbeatManager {
    interval: Duration,
    last_sent: Option<Instant>,
    force_next: bool,
    clock: Box<dyn Clock>,
    callback: Option<HeartbeatCallback>,
}

impl HeartbeatManager {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_sent: None,
            force_next: false,
            clock: Box::new(MonotonicClock),
            callback: None,
        }
    }

    /// Replaces the time source; used by tests with a manual clock
    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_callback(mut self, callback: HeartbeatCallback) -> Self {
        self.callback = Some(callback);
        self
    }

    /// Invokes the callback if at least `interval` has elapsed since the
    /// last send (or a send was forced via [`reset`](Self::reset)).
    /// Returns whether the callback was actually invoked.
    pub fn send_if_needed(&mut self, update: &ProgressUpdate) -> bool {
        let callback = match &self.callback {
            Some(cb) => cb,
            None => return false,
        };

        let now = self.clock.now();
        let due = self.force_next
            || match self.last_sent {
                Some(last) => now.duration_since(last) >= self.interval,
                None => true,
            };

        if !due {
            return false;
        }

        callback(update);
        self.last_sent = Some(now);
        self.force_next = false;
        true
    }

    /// Forces the next [`send_if_needed`](Self::send_if_needed) to send
    /// regardless of elapsed time. Called at stage boundaries so the
    /// first in-stage update is never swallowed.
    pub fn reset(&mut self) {
        self.force_next = true;
    }
}
