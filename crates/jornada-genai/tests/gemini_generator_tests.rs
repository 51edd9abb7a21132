//! Integration tests for `GeminiGenerator` against a local stand-in server.

use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use jornada_core::generation::{GenerationError, TextGenerator};
use jornada_genai::{GeminiConfig, GeminiGenerator};
use serde_json::Value;

#[derive(Clone)]
struct Stub {
    status: StatusCode,
    reply: Value,
    seen: Arc<Mutex<Vec<(Option<String>, Value)>>>,
}

async fn generate_content(
    State(stub): State<Stub>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let key = headers
        .get("x-goog-api-key")
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);
    stub.seen.lock().unwrap().push((key, body));
    (stub.status, Json(stub.reply.clone()))
}

/// Serves `reply` for the `gemini-test` model and returns a generator
/// pointed at it, plus the recorded requests.
async fn spawn_stub(
    status: StatusCode,
    reply: Value,
) -> (GeminiGenerator, Arc<Mutex<Vec<(Option<String>, Value)>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let stub = Stub {
        status,
        reply,
        seen: seen.clone(),
    };
    let app = Router::new()
        .route(
            "/v1beta/models/gemini-test:generateContent",
            post(generate_content),
        )
        .with_state(stub);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let config = GeminiConfig::new("test-key")
        .with_model("gemini-test")
        .with_base_url(format!("http://{addr}"));
    (GeminiGenerator::new(config).unwrap(), seen)
}

fn reply_with(text: &str) -> Value {
    serde_json::json!({
        "candidates": [{ "content": { "role": "model", "parts": [{ "text": text }] } }]
    })
}

#[tokio::test]
async fn test_generate_returns_candidate_text() {
    // Arrange
    let (generator, seen) = spawn_stub(StatusCode::OK, reply_with("  Sinto muito, Ana.  ")).await;

    // Act
    let text = generator.generate("O usuário Ana tem a seguinte motivação").await.unwrap();

    // Assert
    assert_eq!(text, "Sinto muito, Ana.");
    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    let (key, body) = &seen[0];
    assert_eq!(key.as_deref(), Some("test-key"));
    assert_eq!(
        body["contents"][0]["parts"][0]["text"],
        "O usuário Ana tem a seguinte motivação"
    );
    assert!(body.get("generationConfig").is_none());
}

#[tokio::test]
async fn test_check_name_correction_parses_json_reply() {
    // Arrange
    let (generator, seen) = spawn_stub(
        StatusCode::OK,
        reply_with("{\"isCorrectingName\": true, \"newName\": \"Júlia\"}"),
    )
    .await;

    // Act
    let correction = generator
        .check_name_correction("Ju", "na verdade é Júlia")
        .await
        .unwrap();

    // Assert
    assert!(correction.is_correcting_name);
    assert_eq!(correction.corrected_name(), Some("Júlia"));
    let seen = seen.lock().unwrap();
    assert_eq!(seen[0].1["generationConfig"]["responseMimeType"], "application/json");
}

#[tokio::test]
async fn test_check_name_correction_accepts_fenced_json() {
    let (generator, _) = spawn_stub(
        StatusCode::OK,
        reply_with("```json\n{\"isCorrectingName\": false, \"newName\": null}\n```"),
    )
    .await;

    let correction = generator.check_name_correction("Ana", "quero paz").await.unwrap();

    assert!(!correction.is_correcting_name);
    assert_eq!(correction.corrected_name(), None);
}

#[tokio::test]
async fn test_check_name_correction_rejects_prose() {
    let (generator, _) = spawn_stub(StatusCode::OK, reply_with("Sim, é uma correção.")).await;

    let result = generator.check_name_correction("Ana", "é Júlia").await;

    assert!(matches!(result, Err(GenerationError::MalformedResponse(_))));
}

#[tokio::test]
async fn test_error_status_becomes_request_error() {
    let (generator, _) = spawn_stub(
        StatusCode::TOO_MANY_REQUESTS,
        serde_json::json!({ "error": { "message": "quota" } }),
    )
    .await;

    let result = generator.generate("oi").await;

    match result {
        Err(GenerationError::Request(message)) => assert!(message.starts_with("HTTP 429")),
        other => panic!("expected Request error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_reply_without_candidates_is_empty() {
    let (generator, _) = spawn_stub(StatusCode::OK, serde_json::json!({ "candidates": [] })).await;

    let result = generator.generate("oi").await;

    assert!(matches!(result, Err(GenerationError::EmptyResponse)));
}

#[tokio::test]
async fn test_unreachable_server_is_request_error() {
    // Bind then drop to get a port nobody listens on.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let generator = GeminiGenerator::new(
        GeminiConfig::new("k")
            .with_model("gemini-test")
            .with_base_url(format!("http://{addr}")),
    )
    .unwrap();

    let result = generator.generate("oi").await;

    assert!(matches!(result, Err(GenerationError::Request(_))));
}
