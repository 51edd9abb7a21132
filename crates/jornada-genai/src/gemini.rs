//! Gemini implementation of the `TextGenerator` trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use jornada_core::generation::{GenerationError, NameCorrection, TextGenerator};

use crate::config::GeminiConfig;
use crate::prompts;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part<'a>>,
}

impl<'a> Content<'a> {
    fn system(text: &'a str) -> Self {
        Self {
            role: None,
            parts: vec![Part { text }],
        }
    }

    fn user(text: &'a str) -> Self {
        Self {
            role: Some("user"),
            parts: vec![Part { text }],
        }
    }
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate.
    fn into_text(self) -> Option<String> {
        let content = self.candidates.into_iter().next()?.content?;
        let text: String = content.parts.into_iter().map(|part| part.text).collect();
        (!text.trim().is_empty()).then_some(text)
    }
}

/// Text generator backed by Gemini.
#[derive(Debug, Clone)]
pub struct GeminiGenerator {
    client: reqwest::Client,
    config: GeminiConfig,
}

impl GeminiGenerator {
    /// Creates a generator with its own HTTP client.
    ///
    /// # Errors
    ///
    /// Returns `GenerationError::Request` if the HTTP client cannot be built.
    pub fn new(config: GeminiConfig) -> Result<Self, GenerationError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GenerationError::Request(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    #[must_use]
    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    async fn generate_content(
        &self,
        request: &GenerateContentRequest<'_>,
    ) -> Result<String, GenerationError> {
        let response = self
            .client
            .post(self.config.endpoint())
            .header("x-goog-api-key", &self.config.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| GenerationError::Request(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GenerationError::Request(e.to_string()))?;

        if !status.is_success() {
            warn!(
                status = status.as_u16(),
                model = %self.config.model,
                "gemini returned an error status"
            );
            return Err(GenerationError::Request(format!("HTTP {}: {body}", status.as_u16())));
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&body).map_err(|e| {
            GenerationError::MalformedResponse(format!("failed to parse response: {e}"))
        })?;
        parsed.into_text().ok_or(GenerationError::EmptyResponse)
    }
}

/// Strips a Markdown code fence some models wrap JSON answers in.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[async_trait]
impl TextGenerator for GeminiGenerator {
    #[instrument(skip(self, prompt), fields(model = %self.config.model, prompt_len = prompt.len()))]
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let request = GenerateContentRequest {
            system_instruction: Content::system(prompts::PERSONA),
            contents: vec![Content::user(prompt)],
            generation_config: None,
        };
        let text = self.generate_content(&request).await?;
        debug!(response_len = text.len(), "generated reply");
        Ok(text.trim().to_owned())
    }

    #[instrument(skip(self, previous_name, current_input), fields(model = %self.config.model))]
    async fn check_name_correction(
        &self,
        previous_name: &str,
        current_input: &str,
    ) -> Result<NameCorrection, GenerationError> {
        let prompt = prompts::name_correction_prompt(previous_name, current_input);
        let request = GenerateContentRequest {
            system_instruction: Content::system(prompts::NAME_CORRECTION_INSTRUCTION),
            contents: vec![Content::user(&prompt)],
            generation_config: Some(GenerationConfig {
                response_mime_type: "application/json",
            }),
        };
        let text = self.generate_content(&request).await?;
        let correction: NameCorrection =
            serde_json::from_str(strip_code_fence(&text)).map_err(|e| {
                GenerationError::MalformedResponse(format!("invalid classifier output: {e}"))
            })?;
        debug!(is_correcting_name = correction.is_correcting_name, "classified name correction");
        Ok(correction)
    }
}
