//! Test stores — mock `SessionStore` implementations for tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use jornada_core::error::DomainError;
use jornada_core::repository::SessionStore;

/// A session store backed by a `HashMap`. Counts saves so tests can assert
/// that state was mirrored.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    blobs: Mutex<HashMap<String, serde_json::Value>>,
    saves: Mutex<usize>,
}

impl InMemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds `value` under `key`.
    #[must_use]
    pub fn with_blob(key: &str, value: serde_json::Value) -> Self {
        let store = Self::default();
        store.blobs.lock().unwrap().insert(key.to_owned(), value);
        store
    }

    /// Returns the blob stored under `key`, if any.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn blob(&self, key: &str) -> Option<serde_json::Value> {
        self.blobs.lock().unwrap().get(key).cloned()
    }

    /// Returns how many times `save` was called.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn save_count(&self) -> usize {
        *self.saves.lock().unwrap()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn load(&self, key: &str) -> Result<Option<serde_json::Value>, DomainError> {
        Ok(self.blobs.lock().unwrap().get(key).cloned())
    }

    async fn save(&self, key: &str, value: &serde_json::Value) -> Result<(), DomainError> {
        self.blobs
            .lock()
            .unwrap()
            .insert(key.to_owned(), value.clone());
        *self.saves.lock().unwrap() += 1;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), DomainError> {
        self.blobs.lock().unwrap().remove(key);
        Ok(())
    }
}

/// A session store that always returns an infrastructure error. Useful for
/// testing best-effort persistence.
#[derive(Debug)]
pub struct FailingSessionStore;

#[async_trait]
impl SessionStore for FailingSessionStore {
    async fn load(&self, _key: &str) -> Result<Option<serde_json::Value>, DomainError> {
        Err(DomainError::Infrastructure("disk full".into()))
    }

    async fn save(&self, _key: &str, _value: &serde_json::Value) -> Result<(), DomainError> {
        Err(DomainError::Infrastructure("disk full".into()))
    }

    async fn remove(&self, _key: &str) -> Result<(), DomainError> {
        Err(DomainError::Infrastructure("disk full".into()))
    }
}
