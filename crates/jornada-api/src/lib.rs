//! Jornada — HTTP API server library.

pub mod config;
pub mod error;
pub mod registry;
pub mod routes;
pub mod state;
pub mod telemetry;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Builds the full application router.
pub fn app(state: AppState) -> Router {
    // TODO: Replace CorsLayer::permissive() with the funnel's own origin once it is hosted.
    Router::new()
        .merge(routes::health::router())
        .nest("/api/v1/conversations", routes::conversations::router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
