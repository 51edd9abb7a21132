//! The chat session: messages, step, and captured answers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::messages::{Message, MessageDraft, MessageKind};
use super::steps::Step;

/// Free-text answers captured along the funnel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Answers {
    pub name: Option<String>,
    pub motivation: Option<String>,
    pub pain_duration: Option<String>,
    pub attempts: Option<String>,
    pub connection: Option<String>,
    pub contact: Option<String>,
}

/// Persisted layout of a session: the full message list and the step index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub messages: Vec<Message>,
    pub step: Step,
    #[serde(default)]
    pub answers: Answers,
}

/// One user's conversation. Owned by exactly one runtime at a time.
#[derive(Debug, Clone)]
pub struct ChatSession {
    key: String,
    step: Step,
    answers: Answers,
    messages: Vec<Message>,
}

impl ChatSession {
    /// Creates an empty session at the welcome screen.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            step: Step::Welcome,
            answers: Answers::default(),
            messages: Vec::new(),
        }
    }

    /// Rebuilds a session from its persisted snapshot.
    #[must_use]
    pub fn restore(key: impl Into<String>, snapshot: SessionSnapshot) -> Self {
        Self {
            key: key.into(),
            step: snapshot.step,
            answers: snapshot.answers,
            messages: snapshot.messages,
        }
    }

    /// Captures the persisted layout.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            messages: self.messages.clone(),
            step: self.step,
            answers: self.answers.clone(),
        }
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[must_use]
    pub fn step(&self) -> Step {
        self.step
    }

    #[must_use]
    pub fn answers(&self) -> &Answers {
        &self.answers
    }

    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Options of the most recent message that still offers quick replies.
    #[must_use]
    pub fn pending_options(&self) -> Option<&[String]> {
        self.messages
            .iter()
            .rev()
            .find(|message| message.has_options())
            .and_then(|message| message.options.as_deref())
    }

    /// Appends a message; messages are kept strictly in emission order.
    pub(crate) fn append(&mut self, draft: MessageDraft, at: DateTime<Utc>) -> &Message {
        self.messages
            .push(Message::from_draft(draft, Uuid::new_v4(), at));
        let last = self.messages.len() - 1;
        &self.messages[last]
    }

    /// Withdraws quick replies from every message.
    pub(crate) fn clear_options(&mut self) {
        for message in &mut self.messages {
            message.options = None;
        }
    }

    /// Removes the simulated-call bubble once the call is over.
    pub(crate) fn remove_live_calls(&mut self) {
        self.messages
            .retain(|message| message.kind != MessageKind::LiveCall);
    }

    /// Commits the outcome of a transition.
    pub(crate) fn commit(&mut self, step: Step, answers: Answers) {
        self.step = step;
        self.answers = answers;
    }
}
