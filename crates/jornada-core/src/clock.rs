//! Clock abstraction for deterministic message timestamps.

use chrono::{DateTime, Utc};

/// Abstraction over system time. Every appended message is stamped with
/// `now()`, so tests inject a fixed clock.
pub trait Clock: Send + Sync {
    /// Returns the current time.
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock that delegates to the system clock.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
