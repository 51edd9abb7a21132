//! Command handlers for the conversation context.
//!
//! This module contains application-level command handler functions that
//! orchestrate domain logic: check the command against the session, drive
//! the event through the script, mirror the session to the store.

use jornada_core::command::Command;
use jornada_core::error::DomainError;
use jornada_core::repository::SessionStore;
use tracing::{info, warn};

use crate::application::driver::{ConversationDriver, Outcome, SessionObserver};
use crate::domain::commands::{DismissStories, FinishCall, SendMessage, StartConversation};
use crate::domain::events::ConversationEvent;
use crate::domain::session::{ChatSession, SessionSnapshot};

/// Reconstitutes a `ChatSession` from its persisted blob.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if the blob does not match the
/// snapshot layout.
pub(crate) fn reconstitute(
    key: &str,
    blob: serde_json::Value,
) -> Result<ChatSession, DomainError> {
    let snapshot: SessionSnapshot = serde_json::from_value(blob).map_err(|e| {
        DomainError::Infrastructure(format!("session deserialization failed: {e}"))
    })?;
    Ok(ChatSession::restore(key, snapshot))
}

/// Loads the session stored under `key`, if there is one.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if the store fails or the blob is
/// malformed.
pub async fn load_session(
    key: &str,
    store: &dyn SessionStore,
) -> Result<Option<ChatSession>, DomainError> {
    match store.load(key).await? {
        Some(blob) => reconstitute(key, blob).map(Some),
        None => Ok(None),
    }
}

/// Mirrors the session to the store. Best-effort: failures are logged and
/// the conversation carries on in memory.
pub async fn persist_session(session: &ChatSession, store: &dyn SessionStore) {
    let blob = match serde_json::to_value(session.snapshot()) {
        Ok(blob) => blob,
        Err(e) => {
            warn!(session_key = session.key(), error = %e, "failed to serialize session");
            return;
        }
    };
    if let Err(e) = store.save(session.key(), &blob).await {
        warn!(session_key = session.key(), error = %e, "failed to persist session");
    }
}

async fn execute(
    command: &dyn Command,
    event: Option<ConversationEvent>,
    session: &mut ChatSession,
    driver: &ConversationDriver,
    store: &dyn SessionStore,
    observer: &dyn SessionObserver,
) -> Result<Outcome, DomainError> {
    if command.session_key() != session.key() {
        return Err(DomainError::Validation(format!(
            "command for session {} routed to session {}",
            command.session_key(),
            session.key()
        )));
    }

    info!(
        correlation_id = %command.correlation_id(),
        command_type = command.command_type(),
        session_key = session.key(),
        step = %session.step(),
        "handling command"
    );

    let Some(event) = event else {
        return Ok(Outcome::unchanged(session.step()));
    };

    let outcome = driver.drive(session, event, observer).await;
    if outcome.appended > 0 || outcome.step_after != outcome.step_before {
        persist_session(session, store).await;
    }

    info!(
        correlation_id = %command.correlation_id(),
        step_before = %outcome.step_before,
        step_after = %outcome.step_after,
        appended = outcome.appended,
        "command handled"
    );
    Ok(outcome)
}

/// Handles the `StartConversation` command.
///
/// # Errors
///
/// Returns `DomainError::Validation` if the command targets another session.
pub async fn handle_start_conversation(
    command: &StartConversation,
    session: &mut ChatSession,
    driver: &ConversationDriver,
    store: &dyn SessionStore,
    observer: &dyn SessionObserver,
) -> Result<Outcome, DomainError> {
    execute(
        command,
        Some(ConversationEvent::Start),
        session,
        driver,
        store,
        observer,
    )
    .await
}

/// Handles the `SendMessage` command.
///
/// # Errors
///
/// Returns `DomainError::Validation` if the text is blank or the command
/// targets another session.
pub async fn handle_send_message(
    command: &SendMessage,
    session: &mut ChatSession,
    driver: &ConversationDriver,
    store: &dyn SessionStore,
    observer: &dyn SessionObserver,
) -> Result<Outcome, DomainError> {
    let event = ConversationEvent::from_user_text(&command.text, &driver.script().keywords)
        .ok_or_else(|| DomainError::Validation("message text must not be blank".to_owned()))?;
    execute(command, Some(event), session, driver, store, observer).await
}

/// Handles the `DismissStories` command.
///
/// # Errors
///
/// Returns `DomainError::Validation` if the command targets another session.
pub async fn handle_dismiss_stories(
    command: &DismissStories,
    session: &mut ChatSession,
    driver: &ConversationDriver,
    store: &dyn SessionStore,
    observer: &dyn SessionObserver,
) -> Result<Outcome, DomainError> {
    execute(
        command,
        Some(ConversationEvent::StoriesDismissed),
        session,
        driver,
        store,
        observer,
    )
    .await
}

/// Handles the `FinishCall` command. `call_finished` is the event produced
/// by the live call, or `None` when the call had already ended.
///
/// # Errors
///
/// Returns `DomainError::Validation` if the command targets another session.
pub async fn handle_finish_call(
    command: &FinishCall,
    call_finished: Option<ConversationEvent>,
    session: &mut ChatSession,
    driver: &ConversationDriver,
    store: &dyn SessionStore,
    observer: &dyn SessionObserver,
) -> Result<Outcome, DomainError> {
    execute(command, call_finished, session, driver, store, observer).await
}

/// Clears the persisted state of a session.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if the store fails.
pub async fn handle_reset_session(
    session_key: &str,
    store: &dyn SessionStore,
) -> Result<(), DomainError> {
    info!(session_key, "resetting session");
    store.remove(session_key).await
}
