//! Query handlers for the conversation context.
//!
//! Read-only views of a session for clients: the persisted conversation plus
//! whatever overlay (stories, call) the runtime is showing.

use jornada_core::error::DomainError;
use jornada_core::repository::SessionStore;
use serde::Serialize;
use tracing::debug;

use crate::application::command_handlers::load_session;
use crate::application::driver::Outcome;
use crate::domain::live_call::CallState;
use crate::domain::messages::Message;
use crate::domain::script::Notice;
use crate::domain::session::{Answers, ChatSession};
use crate::domain::steps::Step;
use crate::domain::stories::StoryView;

/// Read model of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionView {
    pub session_key: String,
    pub step: Step,
    pub step_name: &'static str,
    pub messages: Vec<Message>,
    pub answers: Answers,
    /// The assistant is "typing" right now.
    pub typing: bool,
    /// Quick replies offered by the latest message, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stories: Option<StoryView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call: Option<CallState>,
}

impl SessionView {
    /// Builds the view of `session` with no overlay shown.
    #[must_use]
    pub fn of(session: &ChatSession) -> Self {
        Self {
            session_key: session.key().to_owned(),
            step: session.step(),
            step_name: session.step().name(),
            messages: session.messages().to_vec(),
            answers: session.answers().clone(),
            typing: false,
            options: session.pending_options().map(<[String]>::to_vec),
            stories: None,
            call: None,
        }
    }
}

/// Response to one submitted input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TurnView {
    pub session: SessionView,
    /// Toasts to show, e.g. after a generation failure.
    pub notices: Vec<Notice>,
    /// Number of messages the input appended.
    pub appended: usize,
    pub open_stories: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call_timer_secs: Option<u64>,
}

impl TurnView {
    /// Combines the session view after an input with what the input produced.
    #[must_use]
    pub fn new(session: SessionView, outcome: Outcome) -> Self {
        Self {
            session,
            notices: outcome.notices,
            appended: outcome.appended,
            open_stories: outcome.open_stories,
            call_timer_secs: outcome.call_timer.map(|timer| timer.as_secs()),
        }
    }
}

/// Returns the persisted view of the session stored under `key`.
///
/// # Errors
///
/// Returns `DomainError::SessionNotFound` if nothing is stored under `key`,
/// or `DomainError::Infrastructure` if the store fails.
pub async fn get_session_view(
    key: &str,
    store: &dyn SessionStore,
) -> Result<SessionView, DomainError> {
    debug!(session_key = key, "loading session view");
    let session = load_session(key, store)
        .await?
        .ok_or_else(|| DomainError::SessionNotFound(key.to_owned()))?;
    Ok(SessionView::of(&session))
}
