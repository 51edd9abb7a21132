//! Shared application state.

use std::sync::Arc;
use std::time::Duration;

use jornada_conversation::application::driver::ConversationDriver;
use jornada_core::repository::SessionStore;

use crate::registry::SessionRegistry;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Runs conversations through the script.
    pub driver: Arc<ConversationDriver>,
    /// Persistent mirror of every session.
    pub store: Arc<dyn SessionStore>,
    /// Live session runtimes.
    pub sessions: Arc<SessionRegistry>,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(driver: Arc<ConversationDriver>, store: Arc<dyn SessionStore>) -> Self {
        Self {
            driver,
            store,
            sessions: Arc::new(SessionRegistry::new()),
        }
    }

    /// Stops session runtimes after `idle_timeout` without input.
    #[must_use]
    pub fn with_session_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.sessions = Arc::new(SessionRegistry::new().with_idle_timeout(idle_timeout));
        self
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("driver", &self.driver)
            .finish_non_exhaustive()
    }
}
