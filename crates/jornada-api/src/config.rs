//! Server configuration read from the environment.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use jornada_genai::GeminiConfig;
use jornada_genai::config::{DEFAULT_BASE_URL, DEFAULT_MODEL};

use crate::error::AppError;

const DEFAULT_DATABASE_URL: &str = "sqlite://jornada.db?mode=rwc";
const DEFAULT_SESSION_IDLE_SECS: u64 = 30 * 60;

/// Everything `main` needs to start the server.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub gemini: GeminiConfig,
    /// YAML script replacing the built-in one.
    pub script_path: Option<PathBuf>,
    /// Multiplier for typing pauses; `0` disables them.
    pub pacing_scale: f64,
    /// How long a session runtime may sit without input before it is stopped.
    pub session_idle_timeout: Duration,
    pub otlp_endpoint: Option<String>,
}

impl AppConfig {
    /// Reads the configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a required variable is missing or a
    /// value does not parse.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the configuration through `lookup`, which returns the value of
    /// a variable if it is set.
    ///
    /// # Errors
    ///
    /// As [`AppConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let api_key = var("GEMINI_API_KEY").ok_or_else(|| {
            AppError::Config("GEMINI_API_KEY environment variable must be set".to_string())
        })?;
        let port = match var("PORT") {
            Some(port) => port
                .parse()
                .map_err(|e| AppError::Config(format!("PORT must be a valid u16: {e}")))?,
            None => 3000,
        };
        let pacing_scale = match var("PACING_SCALE") {
            Some(scale) => scale
                .parse::<f64>()
                .ok()
                .filter(|scale| scale.is_finite() && *scale >= 0.0)
                .ok_or_else(|| {
                    AppError::Config(format!(
                        "PACING_SCALE must be a non-negative number, got `{scale}`"
                    ))
                })?,
            None => 1.0,
        };
        let session_idle_secs = match var("SESSION_IDLE_SECS") {
            Some(secs) => secs
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or_else(|| {
                    AppError::Config(format!(
                        "SESSION_IDLE_SECS must be a positive number of seconds, got `{secs}`"
                    ))
                })?,
            None => DEFAULT_SESSION_IDLE_SECS,
        };

        Ok(Self {
            host: var("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            database_url: var("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            gemini: GeminiConfig::new(api_key)
                .with_model(var("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()))
                .with_base_url(
                    var("GEMINI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
                ),
            script_path: var("SCRIPT_PATH").map(PathBuf::from),
            pacing_scale,
            session_idle_timeout: Duration::from_secs(session_idle_secs),
            otlp_endpoint: var("OTEL_EXPORTER_OTLP_ENDPOINT"),
        })
    }

    /// The address to listen on.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `HOST:PORT` is not a socket address.
    pub fn socket_addr(&self) -> Result<SocketAddr, AppError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| AppError::Config(format!("invalid HOST:PORT combination: {e}")))
    }
}
