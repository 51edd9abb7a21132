//! Per-session runtime.
//!
//! One actor task owns each [`ChatSession`]. Inputs arrive through an mpsc
//! inbox and are processed one at a time, so messages are appended strictly
//! in emission order. The actor also owns the story auto-play and call
//! timers; they hold only a weak sender and are aborted when the actor stops,
//! so a timer that fires after teardown never touches the session.
//!
//! A runtime spawned with an idle timeout stops itself once no input has
//! arrived for that long and no timer is pending. Its state is already in the
//! store, so the session can be restored later.

use std::sync::Arc;
use std::time::Duration;

use jornada_core::error::DomainError;
use jornada_core::repository::SessionStore;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::application::command_handlers::{
    handle_dismiss_stories, handle_finish_call, handle_send_message, handle_start_conversation,
};
use crate::application::driver::{ConversationDriver, Outcome, SessionObserver};
use crate::application::query_handlers::{SessionView, TurnView};
use crate::domain::commands::{DismissStories, FinishCall, SendMessage, StartConversation};
use crate::domain::events::ConversationEvent;
use crate::domain::live_call::LiveCall;
use crate::domain::session::ChatSession;
use crate::domain::steps::Step;
use crate::domain::stories::StoryViewer;

const INBOX_CAPACITY: usize = 32;

/// Something a client asks a session to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionInput {
    Start,
    Text(String),
    DismissStories,
    FinishCall,
    NextStory,
    PreviousStory,
}

#[derive(Debug)]
enum Request {
    Submit {
        correlation_id: Uuid,
        input: SessionInput,
        reply: oneshot::Sender<Result<TurnView, DomainError>>,
    },
    StoryTick(Duration),
    CallRang(Duration),
    CallElapsed,
    Shutdown,
}

/// Cloneable handle to a running session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    key: String,
    inbox: mpsc::Sender<Request>,
    view: watch::Receiver<SessionView>,
}

impl SessionHandle {
    /// Spawns the actor that owns `session`. It runs until shut down.
    #[must_use]
    pub fn spawn(
        session: ChatSession,
        driver: Arc<ConversationDriver>,
        store: Arc<dyn SessionStore>,
    ) -> Self {
        Self::spawn_with_idle_timeout(session, driver, store, None)
    }

    /// Spawns the actor that owns `session`, stopping it after `idle_timeout`
    /// without input.
    ///
    /// A session restored while on the call resumes the call timer.
    #[must_use]
    pub fn spawn_with_idle_timeout(
        session: ChatSession,
        driver: Arc<ConversationDriver>,
        store: Arc<dyn SessionStore>,
        idle_timeout: Option<Duration>,
    ) -> Self {
        let (inbox, requests) = mpsc::channel(INBOX_CAPACITY);
        let (publisher, view) = watch::channel(SessionView::of(&session));
        let key = session.key().to_owned();

        let mut actor = SessionActor {
            session,
            driver,
            store,
            publisher: Publisher(publisher),
            inbox: inbox.downgrade(),
            idle_timeout,
            stories: None,
            call: None,
            story_timer: None,
            call_timer: None,
        };
        if actor.session.step() == Step::OnCall {
            let duration = actor.driver.script().call_duration();
            actor.start_call(duration);
        }
        tokio::spawn(actor.run(requests));
        info!(session_key = %key, "session runtime started");

        Self { key, inbox, view }
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Delivers `input` and waits until it has been fully processed.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::SessionNotFound` if the runtime has stopped, or
    /// whatever the command handler rejected the input with.
    pub async fn submit(
        &self,
        correlation_id: Uuid,
        input: SessionInput,
    ) -> Result<TurnView, DomainError> {
        let (reply, response) = oneshot::channel();
        self.inbox
            .send(Request::Submit {
                correlation_id,
                input,
                reply,
            })
            .await
            .map_err(|_| self.stopped())?;
        response.await.map_err(|_| self.stopped())?
    }

    /// Queues `input` without waiting for it to be processed. Progress shows
    /// up in [`SessionHandle::view`]; a rejected input is only logged.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::SessionNotFound` if the runtime has stopped.
    pub async fn enqueue(
        &self,
        correlation_id: Uuid,
        input: SessionInput,
    ) -> Result<(), DomainError> {
        let (reply, _) = oneshot::channel();
        self.inbox
            .send(Request::Submit {
                correlation_id,
                input,
                reply,
            })
            .await
            .map_err(|_| self.stopped())
    }

    /// The latest published snapshot.
    #[must_use]
    pub fn view(&self) -> SessionView {
        self.view.borrow().clone()
    }

    /// A receiver that observes every published snapshot.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.view.clone()
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.inbox.is_closed()
    }

    /// Stops the runtime and waits until the actor has exited. Input already
    /// queued ahead of the shutdown is still processed.
    pub async fn shutdown(&self) {
        // Refused when the actor is already stopping; wait for it either way.
        let _ = self.inbox.send(Request::Shutdown).await;
        let mut view = self.view.clone();
        while view.changed().await.is_ok() {}
    }

    fn stopped(&self) -> DomainError {
        DomainError::SessionNotFound(self.key.clone())
    }
}

/// Publishes the session to watchers after every driver-visible change.
struct Publisher(watch::Sender<SessionView>);

impl SessionObserver for Publisher {
    fn session_changed(&self, session: &ChatSession, typing: bool) {
        self.0.send_modify(|view| {
            let stories = view.stories.take();
            let call = view.call;
            *view = SessionView::of(session);
            view.typing = typing;
            view.stories = stories;
            view.call = call;
        });
    }
}

struct SessionActor {
    session: ChatSession,
    driver: Arc<ConversationDriver>,
    store: Arc<dyn SessionStore>,
    publisher: Publisher,
    inbox: mpsc::WeakSender<Request>,
    idle_timeout: Option<Duration>,
    stories: Option<StoryViewer>,
    call: Option<LiveCall>,
    story_timer: Option<JoinHandle<()>>,
    call_timer: Option<JoinHandle<()>>,
}

impl SessionActor {
    async fn run(mut self, mut requests: mpsc::Receiver<Request>) {
        loop {
            let request = match self.idle_timeout {
                Some(idle) => match tokio::time::timeout(idle, requests.recv()).await {
                    Ok(request) => request,
                    Err(_) if self.has_pending_timer() => continue,
                    Err(_) => {
                        info!(
                            session_key = self.session.key(),
                            idle_secs = idle.as_secs(),
                            "session runtime idle"
                        );
                        // Refuse new input; anything already queued is still handled.
                        requests.close();
                        self.idle_timeout = None;
                        continue;
                    }
                },
                None => requests.recv().await,
            };
            let Some(request) = request else { break };

            match request {
                Request::Submit {
                    correlation_id,
                    input,
                    reply,
                } => {
                    let result = self.submit(correlation_id, input).await;
                    match reply.send(result) {
                        Ok(()) => {}
                        Err(Err(e)) => warn!(
                            session_key = self.session.key(),
                            %correlation_id,
                            error = %e,
                            "input rejected with nobody waiting for the reply"
                        ),
                        Err(Ok(_)) => debug!(
                            session_key = self.session.key(),
                            %correlation_id,
                            "nobody waiting for the reply"
                        ),
                    }
                }
                Request::StoryTick(elapsed) => self.on_story_tick(elapsed).await,
                Request::CallRang(elapsed) => {
                    if let Some(call) = self.call.as_mut() {
                        call.tick(elapsed);
                    }
                    self.publish_overlay();
                }
                Request::CallElapsed => {
                    self.call_timer = None;
                    let finished = self.end_call();
                    if let Err(e) = self.finish_call(Uuid::new_v4(), finished).await {
                        warn!(
                            session_key = self.session.key(),
                            error = %e,
                            "call timer could not finish the call"
                        );
                    }
                }
                Request::Shutdown => break,
            }
        }
        self.abort_timers();
        info!(session_key = self.session.key(), "session runtime stopped");
    }

    async fn submit(
        &mut self,
        correlation_id: Uuid,
        input: SessionInput,
    ) -> Result<TurnView, DomainError> {
        let key = self.session.key().to_owned();
        let outcome = match input {
            SessionInput::Start => {
                let command = StartConversation {
                    correlation_id,
                    session_key: key,
                };
                handle_start_conversation(
                    &command,
                    &mut self.session,
                    &self.driver,
                    &*self.store,
                    &self.publisher,
                )
                .await?
            }
            SessionInput::Text(text) => {
                let keywords = &self.driver.script().keywords;
                let dismisses = ConversationEvent::from_user_text(&text, keywords)
                    == Some(ConversationEvent::StoriesDismissed);
                if dismisses {
                    self.close_stories();
                }
                let command = SendMessage {
                    correlation_id,
                    session_key: key,
                    text,
                };
                handle_send_message(
                    &command,
                    &mut self.session,
                    &self.driver,
                    &*self.store,
                    &self.publisher,
                )
                .await?
            }
            SessionInput::DismissStories => {
                self.close_stories();
                self.dismiss_stories(correlation_id).await?
            }
            SessionInput::FinishCall => {
                let finished = self.end_call();
                self.finish_call(correlation_id, finished).await?
            }
            SessionInput::NextStory => self.navigate_stories(StoryViewer::next)?,
            SessionInput::PreviousStory => self.navigate_stories(StoryViewer::previous)?,
        };

        self.apply(&outcome);
        Ok(TurnView::new(self.publisher.0.borrow().clone(), outcome))
    }

    fn navigate_stories(&mut self, navigate: fn(&mut StoryViewer)) -> Result<Outcome, DomainError> {
        let viewer = self
            .stories
            .as_mut()
            .ok_or_else(|| DomainError::Validation("the story viewer is not open".to_owned()))?;
        navigate(viewer);
        Ok(Outcome::unchanged(self.session.step()))
    }

    async fn dismiss_stories(&mut self, correlation_id: Uuid) -> Result<Outcome, DomainError> {
        let command = DismissStories {
            correlation_id,
            session_key: self.session.key().to_owned(),
        };
        handle_dismiss_stories(
            &command,
            &mut self.session,
            &self.driver,
            &*self.store,
            &self.publisher,
        )
        .await
    }

    async fn finish_call(
        &mut self,
        correlation_id: Uuid,
        finished: Option<ConversationEvent>,
    ) -> Result<Outcome, DomainError> {
        let command = FinishCall {
            correlation_id,
            session_key: self.session.key().to_owned(),
        };
        let outcome = handle_finish_call(
            &command,
            finished,
            &mut self.session,
            &self.driver,
            &*self.store,
            &self.publisher,
        )
        .await?;
        self.publish_overlay();
        Ok(outcome)
    }

    /// Opens overlays and starts timers the outcome asked for.
    fn apply(&mut self, outcome: &Outcome) {
        if outcome.open_stories {
            self.open_stories();
        }
        if let Some(duration) = outcome.call_timer {
            self.start_call(duration);
        }
        self.publish_overlay();
    }

    fn open_stories(&mut self) {
        let script = self.driver.script();
        let per_story = script.story_duration();
        self.stories = Some(StoryViewer::open(script.stories.clone(), per_story));
        if let Some(timer) = self.story_timer.take() {
            timer.abort();
        }
        if let Some(per_story) = per_story {
            let inbox = self.inbox.clone();
            self.story_timer = Some(tokio::spawn(async move {
                loop {
                    tokio::time::sleep(per_story).await;
                    let Some(inbox) = inbox.upgrade() else { break };
                    if inbox.send(Request::StoryTick(per_story)).await.is_err() {
                        break;
                    }
                }
            }));
        }
        debug!(session_key = self.session.key(), "story viewer opened");
    }

    fn close_stories(&mut self) {
        if let Some(timer) = self.story_timer.take() {
            timer.abort();
        }
        if let Some(mut viewer) = self.stories.take() {
            viewer.close();
        }
    }

    async fn on_story_tick(&mut self, elapsed: Duration) {
        let finished = self
            .stories
            .as_mut()
            .and_then(|viewer| viewer.tick(elapsed));
        if finished.is_some() {
            self.close_stories();
            if let Err(e) = self.dismiss_stories(Uuid::new_v4()).await {
                warn!(
                    session_key = self.session.key(),
                    error = %e,
                    "story auto-play could not dismiss the viewer"
                );
            }
        }
        self.publish_overlay();
    }

    fn start_call(&mut self, duration: Duration) {
        let ring = self.driver.script().ring_timeout().min(duration);
        self.call = Some(LiveCall::ring(ring));
        if let Some(timer) = self.call_timer.take() {
            timer.abort();
        }
        let inbox = self.inbox.clone();
        self.call_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(ring).await;
            let Some(sender) = inbox.upgrade() else { return };
            if sender.send(Request::CallRang(ring)).await.is_err() {
                return;
            }
            drop(sender);
            tokio::time::sleep(duration.saturating_sub(ring)).await;
            if let Some(sender) = inbox.upgrade() {
                let _ = sender.send(Request::CallElapsed).await;
            }
        }));
        info!(
            session_key = self.session.key(),
            call_secs = duration.as_secs(),
            "simulated call started"
        );
    }

    /// Hangs up the call overlay. Without an overlay (e.g. after a restart
    /// the client finished the video), the finish is passed through as is.
    fn end_call(&mut self) -> Option<ConversationEvent> {
        if let Some(timer) = self.call_timer.take() {
            timer.abort();
        }
        match self.call.take() {
            Some(mut call) => call.end(),
            None => Some(ConversationEvent::CallFinished),
        }
    }

    fn publish_overlay(&self) {
        let stories = self.stories.as_ref().and_then(StoryViewer::view);
        let call = self.call.as_ref().map(LiveCall::state);
        self.publisher.0.send_modify(|view| {
            view.stories = stories;
            view.call = call;
        });
    }

    fn has_pending_timer(&self) -> bool {
        [&self.story_timer, &self.call_timer]
            .into_iter()
            .flatten()
            .any(|timer| !timer.is_finished())
    }

    fn abort_timers(&mut self) {
        for timer in [self.story_timer.take(), self.call_timer.take()]
            .into_iter()
            .flatten()
        {
            timer.abort();
        }
    }
}
