//! Integration tests for `SqliteSessionStore` against in-memory `SQLite`.

use jornada_core::error::DomainError;
use jornada_core::repository::SessionStore;
use jornada_store::sqlite_session_store::SqliteSessionStore;

async fn memory_store() -> SqliteSessionStore {
    // One connection: every connection to `sqlite::memory:` is its own database.
    SqliteSessionStore::connect("sqlite::memory:", 1).await.unwrap()
}

// --- load ---

#[tokio::test]
async fn test_load_returns_none_for_missing_key() {
    let store = memory_store().await;

    let loaded = store.load("jornada-chat-state").await.unwrap();

    assert!(loaded.is_none());
}

// --- save + load round-trip ---

#[tokio::test]
async fn test_save_and_load_round_trip() {
    // Arrange
    let store = memory_store().await;
    let blob = serde_json::json!({
        "messages": [{ "content": "Olá!", "timestamp": "2026-01-15T10:00:00Z" }],
        "step": 3
    });

    // Act
    store.save("jornada-chat-state", &blob).await.unwrap();
    let loaded = store.load("jornada-chat-state").await.unwrap();

    // Assert
    assert_eq!(loaded, Some(blob));
}

#[tokio::test]
async fn test_save_replaces_previous_blob() {
    // Arrange
    let store = memory_store().await;
    store
        .save("k", &serde_json::json!({ "step": 1 }))
        .await
        .unwrap();

    // Act
    store
        .save("k", &serde_json::json!({ "step": 2 }))
        .await
        .unwrap();

    // Assert
    let loaded = store.load("k").await.unwrap().unwrap();
    assert_eq!(loaded["step"], 2);
}

#[tokio::test]
async fn test_keys_are_independent() {
    let store = memory_store().await;

    store.save("a", &serde_json::json!({ "step": 1 })).await.unwrap();
    store.save("b", &serde_json::json!({ "step": 7 })).await.unwrap();

    assert_eq!(store.load("a").await.unwrap().unwrap()["step"], 1);
    assert_eq!(store.load("b").await.unwrap().unwrap()["step"], 7);
}

// --- remove ---

#[tokio::test]
async fn test_remove_deletes_blob_and_tolerates_missing_key() {
    // Arrange
    let store = memory_store().await;
    store.save("k", &serde_json::json!({ "step": 1 })).await.unwrap();

    // Act
    store.remove("k").await.unwrap();
    store.remove("k").await.unwrap();

    // Assert
    assert!(store.load("k").await.unwrap().is_none());
}

// --- corrupted rows ---

#[tokio::test]
async fn test_load_rejects_non_json_value() {
    // Arrange
    let store = memory_store().await;
    sqlx::query("INSERT INTO local_storage (key, value) VALUES ('k', 'not json')")
        .execute(store.pool())
        .await
        .unwrap();

    // Act
    let result = store.load("k").await;

    // Assert
    assert!(matches!(result, Err(DomainError::Infrastructure(_))));
}

#[tokio::test]
async fn test_migrate_is_idempotent() {
    let store = memory_store().await;

    store.migrate().await.unwrap();

    assert!(store.load("k").await.unwrap().is_none());
}
