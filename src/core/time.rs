//! Time provider abstraction for testable time-dependent logic

#[cfg(test)]
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Abstraction over the monotonic clock for testable time budgets
pub trait TimeProvider: Send + Sync {
    /// Get the current monotonic time (for measuring intervals)
    fn now(&self) -> Instant;
}

/// Production time provider using the actual monotonic clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTimeProvider;

impl TimeProvider for SystemTimeProvider {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A wall-clock budget measured against a [`TimeProvider`]
///
/// The budget is exceeded once strictly more than `limit` has elapsed since
/// it was started.
pub struct Budget<'a> {
    clock: &'a dyn TimeProvider,
    started: Instant,
    limit: Duration,
}

impl<'a> Budget<'a> {
    pub fn start(clock: &'a dyn TimeProvider, limit: Duration) -> Self {
        Self {
            clock,
            started: clock.now(),
            limit,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.clock.now().saturating_duration_since(self.started)
    }

    pub fn exceeded(&self) -> bool {
        self.elapsed() > self.limit
    }
}

/// Absolute deadline for blocking waits
///
/// A timeout too large to represent as an `Instant` never expires.
#[derive(Debug, Clone, Copy)]
pub struct Deadline(Option<Instant>);

impl Deadline {
    pub fn after(timeout: Duration) -> Self {
        Self(Instant::now().checked_add(timeout))
    }

    /// Time left before the deadline, zero once it has passed
    pub fn remaining(&self) -> Duration {
        match self.0 {
            Some(at) => at.saturating_duration_since(Instant::now()),
            None => Duration::MAX,
        }
    }

    pub fn expired(&self) -> bool {
        self.remaining().is_zero()
    }
}

/// Mock time provider for deterministic testing
#[derive(Clone)]
#[cfg(test)]
pub struct MockTimeProvider {
    current_instant: Arc<Mutex<Instant>>,
}

#[cfg(test)]
impl MockTimeProvider {
    pub fn new() -> Self {
        Self {
            current_instant: Arc::new(Mutex::new(Instant::now())),
        }
    }

    /// Advance the monotonic time by the given duration
    pub fn advance_time(&self, duration: Duration) {
        let mut instant = self.current_instant.lock().unwrap();
        *instant += duration;
    }
}

#[cfg(test)]
impl TimeProvider for MockTimeProvider {
    fn now(&self) -> Instant {
        *self.current_instant.lock().unwrap()
    }
}
