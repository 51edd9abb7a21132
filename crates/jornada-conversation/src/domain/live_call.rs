//! Simulated live call: ringing, then active, then ended.

use std::time::Duration;

use serde::Serialize;

use super::events::ConversationEvent;

/// Phase of the call overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CallState {
    Ringing,
    Active,
    Ended,
}

/// The call overlay. Picks itself up after the ring timeout.
#[derive(Debug, Clone)]
pub struct LiveCall {
    state: CallState,
    ringing_for: Duration,
    ring_timeout: Duration,
}

impl LiveCall {
    /// A call that starts ringing now.
    #[must_use]
    pub fn ring(ring_timeout: Duration) -> Self {
        Self {
            state: CallState::Ringing,
            ringing_for: Duration::ZERO,
            ring_timeout,
        }
    }

    #[must_use]
    pub fn state(&self) -> CallState {
        self.state
    }

    /// Picks up a ringing call.
    pub fn accept(&mut self) {
        if self.state == CallState::Ringing {
            self.state = CallState::Active;
        }
    }

    /// Advances the ring clock; accepts once the timeout is reached.
    pub fn tick(&mut self, elapsed: Duration) {
        if self.state != CallState::Ringing {
            return;
        }
        self.ringing_for += elapsed;
        if self.ringing_for >= self.ring_timeout {
            self.accept();
        }
    }

    /// Hangs up. Yields `CallFinished` the first time only.
    pub fn end(&mut self) -> Option<ConversationEvent> {
        if self.state == CallState::Ended {
            return None;
        }
        self.state = CallState::Ended;
        Some(ConversationEvent::CallFinished)
    }
}
