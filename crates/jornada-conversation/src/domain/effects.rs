//! Side effects requested by a transition, performed by the driver.

use std::time::Duration;

use super::messages::MessageDraft;

/// A single side effect, executed in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Show the typing indicator for a while.
    Pause(Duration),
    /// Append a message.
    Emit(MessageDraft),
    /// Withdraw quick replies from earlier messages.
    ClearOptions,
    /// Ask the generator for a response and append it as a bot bubble.
    Generate { prompt: String },
    /// Ask the classifier whether `input` corrects `previous_name`; the
    /// answer comes back as a `NameCorrectionChecked` event.
    CheckNameCorrection {
        previous_name: String,
        input: String,
    },
    /// Open the full-screen story viewer.
    OpenStories,
    /// Ring the simulated call; the conversation moves on after `Duration`.
    StartCallTimer(Duration),
    /// Take the call bubble off the screen.
    DismissLiveCall,
}
