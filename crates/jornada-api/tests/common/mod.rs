//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use jornada_conversation::application::driver::ConversationDriver;
use jornada_conversation::domain::script::Script;
use jornada_core::generation::TextGenerator;
use jornada_store::sqlite_session_store::SqliteSessionStore;
use jornada_test_support::{FixedClock, InstantPacer, ScriptedGenerator};
use tower::ServiceExt;

use jornada_api::state::AppState;

/// A store over a private in-memory `SQLite` database.
pub async fn memory_store() -> SqliteSessionStore {
    SqliteSessionStore::connect("sqlite::memory:", 1).await.unwrap()
}

/// Build the full app with instant pacing, a fixed clock and canned
/// generator replies. Uses the same router as `main.rs`.
pub fn build_test_app(store: SqliteSessionStore) -> Router {
    build_test_app_with_generator(store, Arc::new(ScriptedGenerator::new("Eu te entendo.")))
}

/// Build the full app with a custom generator.
pub fn build_test_app_with_generator(
    store: SqliteSessionStore,
    generator: Arc<dyn TextGenerator>,
) -> Router {
    let driver = ConversationDriver::new(
        Arc::new(Script::builtin().unwrap()),
        generator,
        Arc::new(InstantPacer::new()),
        Arc::new(FixedClock::standard()),
    );
    jornada_api::app(AppState::new(Arc::new(driver), Arc::new(store)))
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if body_bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body_bytes).unwrap()
    };

    (status, json)
}

/// Send a POST request with a JSON body and return the response.
pub async fn post_json(
    app: Router,
    uri: &str,
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap();

    send(app, request).await
}

/// Send a POST request without a body and return the response.
pub async fn post_empty(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    send(app, request).await
}

/// Send a GET request and return the response.
pub async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    send(app, request).await
}

/// Send a DELETE request and return the response.
pub async fn delete(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("DELETE")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    send(app, request).await
}
