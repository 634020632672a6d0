//! Clock-driven timers. Callers pass `now` explicitly so the engine stays
//! single-threaded and tests stay deterministic.

use std::time::{Duration, Instant};

/// Coalesces bursts of edits into one write after a quiet interval.
#[derive(Debug, Clone)]
pub struct Debouncer {
    quiet: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            deadline: None,
        }
    }

    /// Record activity at `now`, pushing the deadline out.
    pub fn touch(&mut self, now: Instant) {
        self.deadline = Some(now + self.quiet);
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// True once per burst, when the quiet interval has elapsed.
    pub fn fire_if_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }
}

/// Fixed-interval timer for counter refreshes.
#[derive(Debug, Clone)]
pub struct PollTimer {
    interval: Duration,
    next: Option<Instant>,
}

impl PollTimer {
    /// A timer whose first poll is one interval after `start`.
    pub fn new(interval: Duration, start: Instant) -> Self {
        Self {
            interval,
            next: Some(start + interval),
        }
    }

    pub fn is_active(&self) -> bool {
        self.next.is_some()
    }

    /// True when a poll is due. The next poll is scheduled from `now`, so a
    /// slow caller never triggers a burst of catch-up polls.
    pub fn fire_if_due(&mut self, now: Instant) -> bool {
        match self.next {
            Some(next) if now >= next => {
                self.next = Some(now + self.interval);
                true
            }
            _ => false,
        }
    }

    pub fn cancel(&mut self) {
        self.next = None;
    }
}
