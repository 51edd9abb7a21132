//! Events that drive the conversation.

use jornada_core::generation::NameCorrection;

use super::script::Keywords;

/// Something that happened to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationEvent {
    /// The user pressed "start" on the landing screen.
    Start,
    /// The user sent text (typed or a quick reply).
    UserText(String),
    /// The full-screen story viewer was dismissed.
    StoriesDismissed,
    /// The simulated call ended (timer elapsed or the video finished).
    CallFinished,
    /// The name-correction classifier answered for `input`.
    NameCorrectionChecked {
        input: String,
        correction: NameCorrection,
    },
}

impl ConversationEvent {
    /// Interprets raw text from the client.
    ///
    /// Blank text is ignored. The story-dismissed sentinel is an event, not
    /// something the user said.
    #[must_use]
    pub fn from_user_text(text: &str, keywords: &Keywords) -> Option<Self> {
        if text.trim().is_empty() {
            return None;
        }
        if text.trim() == keywords.stories_done.trim() {
            return Some(Self::StoriesDismissed);
        }
        Some(Self::UserText(text.to_owned()))
    }

    /// Short name for logs.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Start => "conversation.start",
            Self::UserText(_) => "conversation.user_text",
            Self::StoriesDismissed => "conversation.stories_dismissed",
            Self::CallFinished => "conversation.call_finished",
            Self::NameCorrectionChecked { .. } => "conversation.name_correction_checked",
        }
    }
}
