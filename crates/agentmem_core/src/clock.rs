//! Time source used by the store and services.
//!
//! # Responsibility
//! - Provide "now" behind a trait so store paths never read the system clock
//!   directly.
//! - Offer a manually driven clock for deterministic tests and tooling.
//!
//! # Invariants
//! - All returned timestamps are UTC.

use chrono::{DateTime, Duration, Utc};
use std::sync::Mutex;

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to.
///
/// Every `now()` call returns the current instant and then advances it by the
/// configured `step`, so consecutive writes get strictly increasing stamps.
#[derive(Debug)]
pub struct ManualClock {
    state: Mutex<ManualState>,
}

#[derive(Debug)]
struct ManualState {
    current: DateTime<Utc>,
    step: Duration,
}

impl ManualClock {
    /// Creates a clock frozen at `start`.
    pub fn new(start: DateTime<Utc>) -> Self {
        Self::with_step(start, Duration::zero())
    }

    /// Creates a clock that advances by `step` after each reading.
    pub fn with_step(start: DateTime<Utc>, step: Duration) -> Self {
        Self {
            state: Mutex::new(ManualState {
                current: start,
                step,
            }),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut state = self.lock();
        state.current += by;
    }

    pub fn set(&self, at: DateTime<Utc>) {
        self.lock().current = at;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ManualState> {
        // A poisoned clock still holds a usable timestamp.
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        let mut state = self.lock();
        let now = state.current;
        state.current = now + state.step;
        now
    }
}
