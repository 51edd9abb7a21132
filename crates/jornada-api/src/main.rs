//! Jornada API server entry point.

use std::sync::Arc;

use jornada_api::config::AppConfig;
use jornada_api::error::AppError;
use jornada_api::state::AppState;
use jornada_api::telemetry;
use jornada_conversation::application::driver::ConversationDriver;
use jornada_conversation::domain::script::Script;
use jornada_core::clock::SystemClock;
use jornada_core::pacing::TokioPacer;
use jornada_genai::GeminiGenerator;
use jornada_store::sqlite_session_store::SqliteSessionStore;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Read configuration from environment.
    let config = AppConfig::from_env()?;

    // Initialize tracing subscriber.
    let telemetry = telemetry::init(config.otlp_endpoint.as_deref())?;

    tracing::info!(?config, "Starting Jornada API server");

    // Load the conversation script.
    let script = match &config.script_path {
        Some(path) => Script::from_path(path)?,
        None => Script::builtin()?,
    };

    // Open the session store.
    let store = SqliteSessionStore::connect(&config.database_url, 5).await?;

    // Build application state.
    let driver = ConversationDriver::new(
        Arc::new(script),
        Arc::new(GeminiGenerator::new(config.gemini.clone())?),
        Arc::new(TokioPacer::new(config.pacing_scale)),
        Arc::new(SystemClock),
    );
    let app_state = AppState::new(Arc::new(driver), Arc::new(store))
        .with_session_idle_timeout(config.session_idle_timeout);
    let app = jornada_api::app(app_state);

    // Start server.
    let addr = config.socket_addr()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %e, "failed to listen for shutdown signal");
            }
        })
        .await?;

    tracing::info!("Server stopped");
    telemetry.shutdown();

    Ok(())
}
