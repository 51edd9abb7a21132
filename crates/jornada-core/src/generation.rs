//! External text-generation collaborator.
//!
//! The conversation engine treats the generative service as a black box:
//! a prompt goes in, a response string comes out, and the call may fail.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures reported by a [`TextGenerator`].
#[derive(Debug, Error)]
pub enum GenerationError {
    /// The service could not be reached or returned a non-success status.
    #[error("request failed: {0}")]
    Request(String),

    /// The service answered, but the body could not be interpreted.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The service answered with no usable text.
    #[error("empty response")]
    EmptyResponse,
}

/// Result of asking whether the user is correcting the name they gave earlier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NameCorrection {
    /// Whether the input reads as a correction of the stored name.
    pub is_correcting_name: bool,
    /// The corrected name, when one was given.
    #[serde(default)]
    pub new_name: Option<String>,
}

impl NameCorrection {
    /// A result that reports no correction.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// A result that reports a correction to `name`.
    #[must_use]
    pub fn to(name: impl Into<String>) -> Self {
        Self {
            is_correcting_name: true,
            new_name: Some(name.into()),
        }
    }

    /// Returns the corrected name if this result is a usable correction.
    ///
    /// A positive classification without a non-blank name is not actionable.
    #[must_use]
    pub fn corrected_name(&self) -> Option<&str> {
        if !self.is_correcting_name {
            return None;
        }
        self.new_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }
}

/// The "generate personalized response" collaborator.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate a free-form response for `prompt`.
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;

    /// Classify whether `current_input` corrects `previous_name`.
    async fn check_name_correction(
        &self,
        previous_name: &str,
        current_input: &str,
    ) -> Result<NameCorrection, GenerationError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_corrected_name_requires_positive_classification() {
        let correction = NameCorrection {
            is_correcting_name: false,
            new_name: Some("Ana".to_owned()),
        };

        assert_eq!(correction.corrected_name(), None);
    }

    #[test]
    fn test_corrected_name_ignores_blank_names() {
        let correction = NameCorrection {
            is_correcting_name: true,
            new_name: Some("   ".to_owned()),
        };

        assert_eq!(correction.corrected_name(), None);
    }

    #[test]
    fn test_corrected_name_trims_whitespace() {
        assert_eq!(NameCorrection::to("  Ana ").corrected_name(), Some("Ana"));
    }

    #[test]
    fn test_name_correction_deserializes_camel_case() {
        let json = serde_json::json!({ "isCorrectingName": true, "newName": "Bia" });

        let correction: NameCorrection = serde_json::from_value(json).unwrap();

        assert_eq!(correction, NameCorrection::to("Bia"));
    }

    #[test]
    fn test_name_correction_defaults_missing_name() {
        let json = serde_json::json!({ "isCorrectingName": false });

        let correction: NameCorrection = serde_json::from_value(json).unwrap();

        assert_eq!(correction, NameCorrection::none());
    }
}
