//! Conversation steps.
//!
//! The step is the only state-machine variable. Its ordinal doubles as the
//! persisted "step index"; declaration order is conversation order, so the
//! derived `Ord` expresses "has the conversation moved forward".

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Named states of the funnel, in conversation order.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(into = "u8", try_from = "u8")]
pub enum Step {
    /// Landing screen; nothing has been said yet.
    #[default]
    Welcome,
    /// The voice note asked for the user's name.
    AwaitingName,
    /// Asked what motivates the user.
    AwaitingMotivation,
    /// Asked how long the problem has lasted.
    AwaitingDuration,
    /// Asked what the user has already tried.
    AwaitingAttempts,
    /// Asked when the user last felt connected.
    AwaitingConnection,
    /// Status teaser shown; waiting for the story viewer to be dismissed.
    StatusGate,
    /// Asked how the stories landed.
    AwaitingStoryReaction,
    /// Simulated call in progress; only the call ending moves on.
    OnCall,
    /// Trust-based offer on the table.
    AwaitingOffer,
    /// Payment revealed; waiting for an e-mail or phone number.
    AwaitingContact,
    /// Script exhausted; everything goes to the text generator.
    FreeChat,
}

impl Step {
    /// Every step, in order.
    pub const ALL: [Step; 12] = [
        Step::Welcome,
        Step::AwaitingName,
        Step::AwaitingMotivation,
        Step::AwaitingDuration,
        Step::AwaitingAttempts,
        Step::AwaitingConnection,
        Step::StatusGate,
        Step::AwaitingStoryReaction,
        Step::OnCall,
        Step::AwaitingOffer,
        Step::AwaitingContact,
        Step::FreeChat,
    ];

    /// The integer step index.
    #[must_use]
    pub fn index(self) -> u8 {
        self as u8
    }

    /// Stable snake_case name, for logs and API views.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Step::Welcome => "welcome",
            Step::AwaitingName => "awaiting_name",
            Step::AwaitingMotivation => "awaiting_motivation",
            Step::AwaitingDuration => "awaiting_duration",
            Step::AwaitingAttempts => "awaiting_attempts",
            Step::AwaitingConnection => "awaiting_connection",
            Step::StatusGate => "status_gate",
            Step::AwaitingStoryReaction => "awaiting_story_reaction",
            Step::OnCall => "on_call",
            Step::AwaitingOffer => "awaiting_offer",
            Step::AwaitingContact => "awaiting_contact",
            Step::FreeChat => "free_chat",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A persisted step index outside the known range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("unknown step index: {0}")]
pub struct UnknownStep(pub u8);

impl From<Step> for u8 {
    fn from(step: Step) -> Self {
        step.index()
    }
}

impl TryFrom<u8> for Step {
    type Error = UnknownStep;

    fn try_from(index: u8) -> Result<Self, Self::Error> {
        Step::ALL
            .get(usize::from(index))
            .copied()
            .ok_or(UnknownStep(index))
    }
}
