//! Session store abstraction.
//!
//! Mirrors the browser's local storage: opaque JSON blobs under string keys,
//! with no versioning or migration.

use async_trait::async_trait;

use crate::error::DomainError;

/// Fixed key under which a single conversation snapshot is stored.
pub const SESSION_STATE_KEY: &str = "jornada-chat-state";

/// Returns the storage key for a named session (`jornada-chat-state:{id}`).
#[must_use]
pub fn session_key(session_id: impl std::fmt::Display) -> String {
    format!("{SESSION_STATE_KEY}:{session_id}")
}

/// Key/value store for serialized session snapshots.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load the blob stored under `key`, if any.
    async fn load(&self, key: &str) -> Result<Option<serde_json::Value>, DomainError>;

    /// Store `value` under `key`, replacing any previous blob.
    async fn save(&self, key: &str, value: &serde_json::Value) -> Result<(), DomainError>;

    /// Remove the blob stored under `key`. Removing a missing key succeeds.
    async fn remove(&self, key: &str) -> Result<(), DomainError>;
}
