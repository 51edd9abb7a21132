//! `SQLite` implementation of the `SessionStore` trait.

use async_trait::async_trait;
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;
use tracing::debug;

use jornada_core::error::DomainError;
use jornada_core::repository::SessionStore;

use crate::schema;

/// SQLite-backed session store.
#[derive(Debug, Clone)]
pub struct SqliteSessionStore {
    pool: SqlitePool,
}

fn infrastructure(context: &str, error: &sqlx::Error) -> DomainError {
    DomainError::Infrastructure(format!("{context}: {error}"))
}

impl SqliteSessionStore {
    /// Creates a new `SqliteSessionStore` over an existing pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Opens a pool for `database_url` and creates the schema.
    ///
    /// # Errors
    ///
    /// Returns `sqlx::Error` if the database cannot be opened or migrated.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        let store = Self::new(pool);
        store.migrate().await?;
        Ok(store)
    }

    /// Creates the key/value table if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns `sqlx::Error` if the statement fails.
    pub async fn migrate(&self) -> Result<(), sqlx::Error> {
        sqlx::query(schema::CREATE_LOCAL_STORAGE_TABLE)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn load(&self, key: &str) -> Result<Option<serde_json::Value>, DomainError> {
        let raw: Option<String> =
            sqlx::query_scalar("SELECT value FROM local_storage WHERE key = ?1")
                .bind(key)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| infrastructure("failed to load session", &e))?;

        raw.map(|raw| {
            serde_json::from_str(&raw).map_err(|e| {
                DomainError::Infrastructure(format!("stored session is not valid JSON: {e}"))
            })
        })
        .transpose()
    }

    async fn save(&self, key: &str, value: &serde_json::Value) -> Result<(), DomainError> {
        sqlx::query(
            "INSERT INTO local_storage (key, value, updated_at)
             VALUES (?1, ?2, CURRENT_TIMESTAMP)
             ON CONFLICT (key) DO UPDATE
             SET value = excluded.value, updated_at = excluded.updated_at",
        )
        .bind(key)
        .bind(value.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| infrastructure("failed to save session", &e))?;
        debug!(session_key = key, "session saved");
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), DomainError> {
        sqlx::query("DELETE FROM local_storage WHERE key = ?1")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| infrastructure("failed to remove session", &e))?;
        Ok(())
    }
}
