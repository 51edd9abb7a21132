//! Test generators — mock `TextGenerator` implementations for tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use jornada_core::generation::{GenerationError, NameCorrection, TextGenerator};

/// A generator that answers every prompt with the same text and replays a
/// queue of name-correction results (then reports "no correction"). Records
/// every call.
#[derive(Debug)]
pub struct ScriptedGenerator {
    response: String,
    corrections: Mutex<VecDeque<NameCorrection>>,
    prompts: Mutex<Vec<String>>,
    classifications: Mutex<Vec<(String, String)>>,
}

impl ScriptedGenerator {
    /// Create a generator that answers every prompt with `response`.
    #[must_use]
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            corrections: Mutex::new(VecDeque::new()),
            prompts: Mutex::new(Vec::new()),
            classifications: Mutex::new(Vec::new()),
        }
    }

    /// Queue classifier results, returned in order.
    #[must_use]
    pub fn with_corrections(self, corrections: Vec<NameCorrection>) -> Self {
        *self.corrections.lock().unwrap() = corrections.into();
        self
    }

    /// Returns every prompt passed to `generate`, in order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    /// Returns every `(previous_name, input)` pair classified, in order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn classifications(&self) -> Vec<(String, String)> {
        self.classifications.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        self.prompts.lock().unwrap().push(prompt.to_owned());
        Ok(self.response.clone())
    }

    async fn check_name_correction(
        &self,
        previous_name: &str,
        current_input: &str,
    ) -> Result<NameCorrection, GenerationError> {
        self.classifications
            .lock()
            .unwrap()
            .push((previous_name.to_owned(), current_input.to_owned()));
        Ok(self
            .corrections
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_default())
    }
}

/// A generator whose every call fails. Useful for testing the apology path.
#[derive(Debug)]
pub struct FailingGenerator;

#[async_trait]
impl TextGenerator for FailingGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String, GenerationError> {
        Err(GenerationError::Request("connection refused".into()))
    }

    async fn check_name_correction(
        &self,
        _previous_name: &str,
        _current_input: &str,
    ) -> Result<NameCorrection, GenerationError> {
        Err(GenerationError::Request("connection refused".into()))
    }
}
