//! Registry of live session runtimes.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use jornada_conversation::application::command_handlers::{handle_reset_session, load_session};
use jornada_conversation::application::driver::ConversationDriver;
use jornada_conversation::application::runtime::SessionHandle;
use jornada_conversation::domain::session::ChatSession;
use jornada_core::error::DomainError;
use jornada_core::repository::{SessionStore, session_key};
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

/// Maps session ids to their runtimes. One runtime per session at a time.
///
/// Runtimes stop themselves after the idle timeout; their entries are pruned
/// the next time the map is touched, and the session is restored from the
/// store on its next request.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: Mutex<Sessions>,
    idle_timeout: Option<Duration>,
}

#[derive(Debug, Default)]
struct Sessions {
    running: HashMap<Uuid, SessionHandle>,
    /// Ids whose deletion is in progress; they cannot be restored.
    deleting: HashSet<Uuid>,
}

impl Sessions {
    /// Forgets runtimes that have stopped on their own.
    fn prune(&mut self) {
        let before = self.running.len();
        self.running.retain(|_, handle| handle.is_running());
        let pruned = before - self.running.len();
        if pruned > 0 {
            debug!(pruned, "pruned stopped session runtimes");
        }
    }
}

impl SessionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runtimes started from now on stop after `idle_timeout` without input.
    #[must_use]
    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = Some(idle_timeout);
        self
    }

    fn spawn(
        &self,
        session: ChatSession,
        driver: Arc<ConversationDriver>,
        store: Arc<dyn SessionStore>,
    ) -> SessionHandle {
        SessionHandle::spawn_with_idle_timeout(session, driver, store, self.idle_timeout)
    }

    /// Starts a runtime for a brand-new, empty session.
    pub async fn create(
        &self,
        session_id: Uuid,
        driver: Arc<ConversationDriver>,
        store: Arc<dyn SessionStore>,
    ) -> SessionHandle {
        let handle = self.spawn(ChatSession::new(session_key(session_id)), driver, store);
        let mut sessions = self.sessions.lock().await;
        sessions.prune();
        sessions.running.insert(session_id, handle.clone());
        handle
    }

    /// Returns the live runtime, restoring it from the store if needed.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::SessionNotFound` if the session was never
    /// created (or was deleted), or `DomainError::Infrastructure` if the
    /// store fails.
    pub async fn get_or_restore(
        &self,
        session_id: Uuid,
        driver: Arc<ConversationDriver>,
        store: Arc<dyn SessionStore>,
    ) -> Result<SessionHandle, DomainError> {
        let mut sessions = self.sessions.lock().await;
        sessions.prune();
        if let Some(handle) = sessions.running.get(&session_id) {
            return Ok(handle.clone());
        }

        let key = session_key(session_id);
        if sessions.deleting.contains(&session_id) {
            return Err(DomainError::SessionNotFound(key));
        }
        let session = load_session(&key, &*store)
            .await?
            .ok_or_else(|| DomainError::SessionNotFound(key.clone()))?;
        info!(%session_id, step = %session.step(), "restoring session from store");
        let handle = self.spawn(session, driver, store);
        sessions.running.insert(session_id, handle.clone());
        Ok(handle)
    }

    /// The live runtime, if one is running.
    pub async fn get(&self, session_id: Uuid) -> Option<SessionHandle> {
        self.sessions
            .lock()
            .await
            .running
            .get(&session_id)
            .filter(|handle| handle.is_running())
            .cloned()
    }

    /// Stops the runtime of `session_id` and clears its persisted state.
    /// Returns `true` if a runtime was running.
    ///
    /// Until the store is cleared the id is marked as deleting, so a
    /// concurrent request cannot restore the session from the old state.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the store fails.
    pub async fn delete(
        &self,
        session_id: Uuid,
        store: &dyn SessionStore,
    ) -> Result<bool, DomainError> {
        let handle = {
            let mut sessions = self.sessions.lock().await;
            sessions.deleting.insert(session_id);
            sessions.running.remove(&session_id)
        };
        let was_running = match handle {
            Some(handle) => {
                let running = handle.is_running();
                handle.shutdown().await;
                running
            }
            None => false,
        };
        let cleared = handle_reset_session(&session_key(session_id), store).await;
        self.sessions.lock().await.deleting.remove(&session_id);
        cleared.map(|()| was_running)
    }

    /// Number of running runtimes.
    pub async fn len(&self) -> usize {
        let mut sessions = self.sessions.lock().await;
        sessions.prune();
        sessions.running.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use jornada_conversation::application::runtime::SessionInput;
    use jornada_conversation::domain::script::Script;
    use jornada_conversation::domain::steps::Step;
    use jornada_test_support::{FixedClock, InMemorySessionStore, InstantPacer, ScriptedGenerator};

    fn driver() -> Arc<ConversationDriver> {
        Arc::new(ConversationDriver::new(
            Arc::new(Script::builtin().unwrap()),
            Arc::new(ScriptedGenerator::new("ok")),
            Arc::new(InstantPacer::new()),
            Arc::new(FixedClock::standard()),
        ))
    }

    #[tokio::test]
    async fn test_get_or_restore_unknown_session_is_not_found() {
        let registry = SessionRegistry::new();

        let result = registry
            .get_or_restore(Uuid::new_v4(), driver(), Arc::new(InMemorySessionStore::new()))
            .await;

        assert!(matches!(result, Err(DomainError::SessionNotFound(_))));
    }

    #[tokio::test]
    async fn test_get_or_restore_reloads_persisted_session() {
        // Arrange
        let session_id = Uuid::new_v4();
        let store = Arc::new(InMemorySessionStore::with_blob(
            &session_key(session_id),
            serde_json::json!({ "messages": [], "step": 4 }),
        ));
        let registry = SessionRegistry::new();

        // Act
        let handle = registry.get_or_restore(session_id, driver(), store).await.unwrap();

        // Assert
        assert_eq!(handle.view().step, Step::AwaitingAttempts);
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_delete_stops_runtime_and_clears_store() {
        // Arrange
        let registry = SessionRegistry::new();
        let store = Arc::new(InMemorySessionStore::new());
        let session_id = Uuid::new_v4();
        let handle = registry.create(session_id, driver(), store.clone()).await;
        handle.submit(Uuid::new_v4(), SessionInput::Start).await.unwrap();

        // Act
        let stopped = registry.delete(session_id, &*store).await.unwrap();

        // Assert
        assert!(stopped);
        assert!(!handle.is_running());
        assert!(registry.is_empty().await);
        assert!(registry.get(session_id).await.is_none());
        assert!(store.blob(&session_key(session_id)).is_none());
        assert!(!registry.delete(session_id, &*store).await.unwrap());
    }

    #[tokio::test]
    async fn test_concurrent_restore_cannot_revive_deleted_session() {
        // Arrange
        let registry = SessionRegistry::new();
        let store = Arc::new(InMemorySessionStore::new());
        let session_id = Uuid::new_v4();
        let handle = registry.create(session_id, driver(), store.clone()).await;
        handle.submit(Uuid::new_v4(), SessionInput::Start).await.unwrap();

        // Act
        let (deleted, _) = tokio::join!(
            registry.delete(session_id, &*store),
            registry.get_or_restore(session_id, driver(), store.clone()),
        );

        // Assert
        assert!(deleted.unwrap());
        assert!(registry.get(session_id).await.is_none());
        assert!(store.blob(&session_key(session_id)).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_session_is_evicted_and_restored_from_store() {
        // Arrange
        let registry = SessionRegistry::new().with_idle_timeout(Duration::from_secs(60));
        let store = Arc::new(InMemorySessionStore::new());
        let session_id = Uuid::new_v4();
        let handle = registry.create(session_id, driver(), store.clone()).await;
        handle.submit(Uuid::new_v4(), SessionInput::Start).await.unwrap();
        drop(handle);

        // Act
        tokio::time::sleep(Duration::from_secs(61)).await;
        let active_after_idle = registry.len().await;
        let restored = registry
            .get_or_restore(session_id, driver(), store)
            .await
            .unwrap();

        // Assert
        assert_eq!(active_after_idle, 0);
        assert!(restored.is_running());
        assert_eq!(restored.view().step, Step::AwaitingName);
        assert_eq!(restored.view().messages.len(), 2);
        assert_eq!(registry.len().await, 1);
    }
}
