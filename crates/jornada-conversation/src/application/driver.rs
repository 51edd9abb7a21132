//! Effect-executing conversation driver.
//!
//! Runs the pure transition function and performs the effects it asks for:
//! typing pauses, appending messages, and calls to the text generator. A
//! failed generator call appends one apology, raises one notice, and leaves
//! the step and answers as they were so the next input retries.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use jornada_core::clock::Clock;
use jornada_core::generation::{GenerationError, TextGenerator};
use jornada_core::pacing::Pacer;
use serde::Serialize;
use tracing::{debug, warn};

use crate::domain::effects::Effect;
use crate::domain::events::ConversationEvent;
use crate::domain::messages::MessageDraft;
use crate::domain::script::{Notice, Script};
use crate::domain::session::ChatSession;
use crate::domain::steps::Step;
use crate::domain::transition::transition;

/// Receives the session after every visible change.
pub trait SessionObserver: Send + Sync {
    /// Called after a message is appended/removed or the typing indicator
    /// toggles.
    fn session_changed(&self, session: &ChatSession, typing: bool);
}

/// Observer that ignores every change.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl SessionObserver for NoopObserver {
    fn session_changed(&self, _session: &ChatSession, _typing: bool) {}
}

/// What processing one event produced, beyond the appended messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outcome {
    /// Step before the event.
    pub step_before: Step,
    /// Step after the event.
    pub step_after: Step,
    /// Number of messages appended (net of removals).
    pub appended: usize,
    /// Toast notifications for the client.
    pub notices: Vec<Notice>,
    /// The client should open the story viewer.
    pub open_stories: bool,
    /// The simulated call started and will finish after this long.
    #[serde(skip)]
    pub call_timer: Option<Duration>,
}

impl Outcome {
    /// An outcome for input that changed nothing.
    #[must_use]
    pub fn unchanged(step: Step) -> Self {
        Self {
            step_before: step,
            step_after: step,
            appended: 0,
            notices: Vec::new(),
            open_stories: false,
            call_timer: None,
        }
    }

    /// Returns `true` if the step moved forward.
    #[must_use]
    pub fn advanced(&self) -> bool {
        self.step_after > self.step_before
    }
}

/// Drives a [`ChatSession`] through the script.
pub struct ConversationDriver {
    script: Arc<Script>,
    generator: Arc<dyn TextGenerator>,
    pacer: Arc<dyn Pacer>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for ConversationDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationDriver").finish_non_exhaustive()
    }
}

impl ConversationDriver {
    /// Creates a driver over `script` and its collaborators.
    #[must_use]
    pub fn new(
        script: Arc<Script>,
        generator: Arc<dyn TextGenerator>,
        pacer: Arc<dyn Pacer>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            script,
            generator,
            pacer,
            clock,
        }
    }

    #[must_use]
    pub fn script(&self) -> &Script {
        &self.script
    }

    /// Processes `event` and any follow-up events it causes.
    pub async fn drive(
        &self,
        session: &mut ChatSession,
        event: ConversationEvent,
        observer: &dyn SessionObserver,
    ) -> Outcome {
        let mut outcome = Outcome::unchanged(session.step());
        let messages_before = session.messages().len();
        let mut queue = VecDeque::from([event]);

        while let Some(event) = queue.pop_front() {
            let decided = transition(session.step(), session.answers(), &event, &self.script);
            debug!(
                session_key = session.key(),
                event_type = event.event_type(),
                step = %session.step(),
                next = %decided.next,
                effects = decided.effects.len(),
                "transition decided"
            );

            for effect in decided.effects {
                match self.perform(session, effect, &mut outcome, observer).await {
                    Ok(Some(follow_up)) => queue.push_back(follow_up),
                    Ok(None) => {}
                    Err(err) => {
                        self.report_failure(session, &err, &mut outcome, observer);
                        outcome.appended = session.messages().len().saturating_sub(messages_before);
                        return outcome;
                    }
                }
            }

            session.commit(decided.next, decided.answers);
        }

        outcome.step_after = session.step();
        outcome.appended = session.messages().len().saturating_sub(messages_before);
        observer.session_changed(session, false);
        outcome
    }

    async fn perform(
        &self,
        session: &mut ChatSession,
        effect: Effect,
        outcome: &mut Outcome,
        observer: &dyn SessionObserver,
    ) -> Result<Option<ConversationEvent>, GenerationError> {
        match effect {
            Effect::Pause(duration) => {
                observer.session_changed(session, true);
                self.pacer.pause(duration).await;
                observer.session_changed(session, false);
            }
            Effect::Emit(draft) => {
                session.append(draft, self.clock.now());
                observer.session_changed(session, false);
            }
            Effect::ClearOptions => session.clear_options(),
            Effect::Generate { prompt } => {
                observer.session_changed(session, true);
                let response = self.generator.generate(&prompt).await?;
                let response = response.trim();
                if response.is_empty() {
                    return Err(GenerationError::EmptyResponse);
                }
                session.append(MessageDraft::bot_text(response), self.clock.now());
                observer.session_changed(session, false);
            }
            Effect::CheckNameCorrection {
                previous_name,
                input,
            } => {
                let correction = self
                    .generator
                    .check_name_correction(&previous_name, &input)
                    .await?;
                return Ok(Some(ConversationEvent::NameCorrectionChecked { input, correction }));
            }
            Effect::OpenStories => outcome.open_stories = true,
            Effect::StartCallTimer(duration) => outcome.call_timer = Some(duration),
            Effect::DismissLiveCall => {
                session.remove_live_calls();
                observer.session_changed(session, false);
            }
        }
        Ok(None)
    }

    fn report_failure(
        &self,
        session: &mut ChatSession,
        err: &GenerationError,
        outcome: &mut Outcome,
        observer: &dyn SessionObserver,
    ) {
        warn!(
            session_key = session.key(),
            step = %session.step(),
            error = %err,
            "text generation failed; step left unchanged"
        );
        session.append(
            MessageDraft::bot_text(self.script.apology.clone()),
            self.clock.now(),
        );
        outcome.notices.push(self.script.failure_notice.clone());
        outcome.step_after = session.step();
        observer.session_changed(session, false);
    }
}
