//! Chat messages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    /// The person chatting.
    User,
    /// The scripted mentor.
    Bot,
}

/// The closed set of bubble kinds a client knows how to render.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MessageKind {
    /// Plain text bubble.
    #[default]
    Text,
    /// Image card.
    Image,
    /// Video card.
    Video,
    /// Voice note.
    Audio,
    /// Call-to-action button.
    Button,
    /// Bonus list card.
    Bonuses,
    /// Testimonial quote.
    Testimonial,
    /// Status/story teaser.
    Status,
    /// Simulated incoming video call.
    LiveCall,
    /// Marker left after a call ends.
    CallSummary,
}

/// Kind-dependent extras. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_hint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poster_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub button_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub button_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call_duration: Option<String>,
}

/// A message that has not been appended yet (no identity, no timestamp).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageDraft {
    pub sender: Sender,
    pub kind: MessageKind,
    pub content: String,
    pub image_hint: Option<String>,
    pub options: Option<Vec<String>>,
    pub meta: Option<MessageMeta>,
}

impl MessageDraft {
    /// A plain text bubble from the bot.
    #[must_use]
    pub fn bot_text(content: impl Into<String>) -> Self {
        Self::text(Sender::Bot, content)
    }

    /// A plain text bubble from the user.
    #[must_use]
    pub fn user_text(content: impl Into<String>) -> Self {
        Self::text(Sender::User, content)
    }

    fn text(sender: Sender, content: impl Into<String>) -> Self {
        Self {
            sender,
            kind: MessageKind::Text,
            content: content.into(),
            image_hint: None,
            options: None,
            meta: None,
        }
    }
}

/// An appended message. Immutable apart from its quick-reply options, which
/// are withdrawn once the user answers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub sender: Sender,
    pub kind: MessageKind,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_hint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<MessageMeta>,
}

impl Message {
    /// Stamps a draft with an identity and a timestamp.
    #[must_use]
    pub fn from_draft(draft: MessageDraft, id: Uuid, timestamp: DateTime<Utc>) -> Self {
        Self {
            id,
            sender: draft.sender,
            kind: draft.kind,
            content: draft.content,
            timestamp,
            image_hint: draft.image_hint,
            options: draft.options,
            meta: draft.meta,
        }
    }

    /// Returns `true` if the message still offers quick replies.
    #[must_use]
    pub fn has_options(&self) -> bool {
        self.options.as_ref().is_some_and(|options| !options.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_kind_serializes_kebab_case() {
        let json = serde_json::to_value(MessageKind::LiveCall).unwrap();

        assert_eq!(json, "live-call");
    }

    #[test]
    fn test_message_omits_empty_extras() {
        let at = Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap();
        let message = Message::from_draft(MessageDraft::bot_text("oi"), Uuid::nil(), at);

        let json = serde_json::to_value(&message).unwrap();

        assert_eq!(json["sender"], "bot");
        assert_eq!(json["kind"], "text");
        assert!(json.get("options").is_none());
        assert!(json.get("meta").is_none());
    }

    #[test]
    fn test_has_options_ignores_empty_list() {
        let at = Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap();
        let mut draft = MessageDraft::bot_text("escolha");
        draft.options = Some(Vec::new());

        let message = Message::from_draft(draft, Uuid::nil(), at);

        assert!(!message.has_options());
    }
}
