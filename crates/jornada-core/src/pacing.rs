//! Pacing abstraction for simulated typing delays.
//!
//! Scripted batches pause between bubbles to imitate someone typing. The
//! pause goes through this trait so tests can run a whole script instantly.

use std::time::Duration;

use async_trait::async_trait;

/// Abstraction over cooperative waiting.
#[async_trait]
pub trait Pacer: Send + Sync {
    /// Suspend for (roughly) `duration`.
    async fn pause(&self, duration: Duration);
}

/// Production pacer backed by `tokio::time::sleep`, with a scale factor so
/// deployments can speed the script up (a scale of `0.0` disables pauses).
#[derive(Debug, Clone, Copy)]
pub struct TokioPacer {
    scale: f64,
}

impl TokioPacer {
    /// Upper bound for the scale factor.
    pub const MAX_SCALE: f64 = 100.0;

    /// Creates a pacer that sleeps for `duration * scale`.
    ///
    /// Negative or non-finite scales are treated as `0.0`; scales above
    /// `MAX_SCALE` are clamped.
    #[must_use]
    pub fn new(scale: f64) -> Self {
        let scale = if scale.is_finite() && scale > 0.0 {
            scale.min(Self::MAX_SCALE)
        } else {
            0.0
        };
        Self { scale }
    }

    /// Returns the duration this pacer actually waits for `duration`.
    #[must_use]
    pub fn scaled(&self, duration: Duration) -> Duration {
        duration.mul_f64(self.scale)
    }
}

impl Default for TokioPacer {
    fn default() -> Self {
        Self::new(1.0)
    }
}

#[async_trait]
impl Pacer for TokioPacer {
    async fn pause(&self, duration: Duration) {
        let scaled = self.scaled(duration);
        if !scaled.is_zero() {
            tokio::time::sleep(scaled).await;
        }
    }
}
