//! Jornada — text generation through the Gemini `generateContent` API.

pub mod config;
pub mod gemini;
pub mod prompts;

pub use config::GeminiConfig;
pub use gemini::GeminiGenerator;
