//! Routes for conversations.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use jornada_conversation::application::query_handlers::{self, SessionView, TurnView};
use jornada_conversation::application::runtime::{SessionHandle, SessionInput};
use jornada_core::error::DomainError;
use jornada_core::repository::session_key;

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for POST /{id}/messages.
#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    /// Typed text or the label of a quick reply.
    pub text: String,
}

/// Query parameters accepted by every input route.
#[derive(Debug, Deserialize)]
pub struct SubmitParams {
    /// `false` answers 202 with the current snapshot as soon as the input is
    /// queued; clients then poll GET /{id} for the paced replies.
    #[serde(default = "wait_by_default")]
    pub wait: bool,
}

fn wait_by_default() -> bool {
    true
}

/// Response body after an input was processed.
#[derive(Debug, Serialize)]
pub struct TurnResponse {
    pub session_id: Uuid,
    #[serde(flatten)]
    pub turn: TurnView,
}

/// Response body for GET /{id} and for queued inputs.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session_id: Uuid,
    #[serde(flatten)]
    pub session: SessionView,
}

async fn submit(
    state: &AppState,
    session_id: Uuid,
    params: &SubmitParams,
    input: SessionInput,
) -> Result<Response, ApiError> {
    let correlation_id = Uuid::new_v4();
    info!(%correlation_id, wait = params.wait, ?input, "submitting input");

    if !params.wait && matches!(&input, SessionInput::Text(text) if text.trim().is_empty()) {
        return Err(DomainError::Validation("message text must not be empty".to_owned()).into());
    }

    let handle = state
        .sessions
        .get_or_restore(session_id, state.driver.clone(), state.store.clone())
        .await?;
    match deliver(&handle, session_id, correlation_id, input.clone(), params.wait).await {
        Err(DomainError::SessionNotFound(_)) if !handle.is_running() => {
            // The runtime went idle between lookup and delivery.
            let handle = state
                .sessions
                .get_or_restore(session_id, state.driver.clone(), state.store.clone())
                .await?;
            Ok(deliver(&handle, session_id, correlation_id, input, params.wait).await?)
        }
        result => Ok(result?),
    }
}

async fn deliver(
    handle: &SessionHandle,
    session_id: Uuid,
    correlation_id: Uuid,
    input: SessionInput,
    wait: bool,
) -> Result<Response, DomainError> {
    if wait {
        let turn = handle.submit(correlation_id, input).await?;
        Ok(Json(TurnResponse { session_id, turn }).into_response())
    } else {
        handle.enqueue(correlation_id, input).await?;
        let session = handle.view();
        Ok((StatusCode::ACCEPTED, Json(SessionResponse { session_id, session })).into_response())
    }
}

/// POST /
#[instrument(skip(state))]
async fn create_conversation(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<TurnResponse>), ApiError> {
    let session_id = Uuid::new_v4();
    let correlation_id = Uuid::new_v4();
    info!(%session_id, %correlation_id, "creating conversation");

    let handle = state
        .sessions
        .create(session_id, state.driver.clone(), state.store.clone())
        .await;
    let turn = handle.submit(correlation_id, SessionInput::Start).await?;

    Ok((StatusCode::CREATED, Json(TurnResponse { session_id, turn })))
}

/// GET /{id}
#[instrument(skip(state))]
async fn get_conversation(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionResponse>, ApiError> {
    let session = match state.sessions.get(session_id).await {
        Some(handle) => handle.view(),
        None => {
            query_handlers::get_session_view(&session_key(session_id), &*state.store).await?
        }
    };

    Ok(Json(SessionResponse {
        session_id,
        session,
    }))
}

/// DELETE /{id}
#[instrument(skip(state))]
async fn delete_conversation(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let was_running = state.sessions.delete(session_id, &*state.store).await?;
    info!(%session_id, was_running, "conversation deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// POST /{id}/messages
#[instrument(skip(state, request))]
async fn send_message(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Query(params): Query<SubmitParams>,
    Json(request): Json<SendMessageRequest>,
) -> Result<Response, ApiError> {
    submit(&state, session_id, &params, SessionInput::Text(request.text)).await
}

/// POST /{id}/stories/dismiss
#[instrument(skip(state))]
async fn dismiss_stories(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Query(params): Query<SubmitParams>,
) -> Result<Response, ApiError> {
    submit(&state, session_id, &params, SessionInput::DismissStories).await
}

/// POST /{id}/stories/next
#[instrument(skip(state))]
async fn next_story(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Query(params): Query<SubmitParams>,
) -> Result<Response, ApiError> {
    submit(&state, session_id, &params, SessionInput::NextStory).await
}

/// POST /{id}/stories/previous
#[instrument(skip(state))]
async fn previous_story(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Query(params): Query<SubmitParams>,
) -> Result<Response, ApiError> {
    submit(&state, session_id, &params, SessionInput::PreviousStory).await
}

/// POST /{id}/call/finish
#[instrument(skip(state))]
async fn finish_call(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Query(params): Query<SubmitParams>,
) -> Result<Response, ApiError> {
    submit(&state, session_id, &params, SessionInput::FinishCall).await
}

/// Returns the router for conversations.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_conversation))
        .route("/{id}", get(get_conversation).delete(delete_conversation))
        .route("/{id}/messages", post(send_message))
        .route("/{id}/stories/dismiss", post(dismiss_stories))
        .route("/{id}/stories/next", post(next_story))
        .route("/{id}/stories/previous", post(previous_story))
        .route("/{id}/call/finish", post(finish_call))
}
