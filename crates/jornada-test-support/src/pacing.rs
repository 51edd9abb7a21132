//! Test pacer — records typing pauses instead of sleeping.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use jornada_core::pacing::Pacer;

/// A pacer that returns immediately and remembers every requested pause.
#[derive(Debug, Default)]
pub struct InstantPacer {
    pauses: Mutex<Vec<Duration>>,
}

impl InstantPacer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of all requested pauses, in order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn pauses(&self) -> Vec<Duration> {
        self.pauses.lock().unwrap().clone()
    }
}

#[async_trait]
impl Pacer for InstantPacer {
    async fn pause(&self, duration: Duration) {
        self.pauses.lock().unwrap().push(duration);
    }
}
