//! Conversation script: the authored content the driver plays back.
//!
//! The script is pure data. Transitions decide *which* batch to play; the
//! batches themselves (texts, media, pauses, prompts, keywords) live here and
//! are loaded from YAML. A built-in script ships with the crate.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::messages::{MessageDraft, MessageKind, MessageMeta, Sender};
use super::session::Answers;

const BUILTIN_SCRIPT: &str = include_str!("../../scripts/jornada.yaml");

/// Errors raised while loading a script.
#[derive(Debug, Error)]
pub enum ScriptError {
    /// The script file could not be read.
    #[error("failed to read script: {0}")]
    Io(#[from] std::io::Error),

    /// The YAML did not match the script schema.
    #[error("failed to parse script: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// The script parsed but cannot drive a conversation.
    #[error("invalid script: {0}")]
    Invalid(String),
}

/// Toast-style notification shown when the generator fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Notice {
    pub title: String,
    pub description: String,
}

/// One slide of the status story viewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Story {
    pub image: String,
    #[serde(default)]
    pub image_hint: Option<String>,
    pub text: String,
}

/// Keyword sets the transitions match user text against.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Keywords {
    /// Small-talk replies that are not a name ("tudo bem").
    pub filler: Vec<String>,
    /// Acceptance of the offer.
    pub affirmative: Vec<String>,
    /// Questions about how payment works.
    pub question: Vec<String>,
    /// Quick reply that opens the story viewer.
    pub stories_open: String,
    /// Text a legacy client sends when the story viewer is dismissed.
    pub stories_done: String,
}

fn bot() -> Sender {
    Sender::Bot
}

/// A scripted bubble preceded by a typing pause.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Beat {
    #[serde(default)]
    pub pause_ms: u64,
    #[serde(default = "bot")]
    pub sender: Sender,
    #[serde(default)]
    pub kind: MessageKind,
    pub content: String,
    #[serde(default)]
    pub image_hint: Option<String>,
    #[serde(default)]
    pub options: Option<Vec<String>>,
    #[serde(default)]
    pub meta: Option<MessageMeta>,
}

impl Beat {
    /// Typing pause before the bubble.
    #[must_use]
    pub fn pause(&self) -> Duration {
        Duration::from_millis(self.pause_ms)
    }

    /// Renders the bubble with placeholders filled in.
    #[must_use]
    pub fn render(&self, answers: &Answers, input: Option<&str>) -> MessageDraft {
        MessageDraft {
            sender: self.sender,
            kind: self.kind,
            content: render(&self.content, answers, input),
            image_hint: self.image_hint.clone(),
            options: self.options.clone(),
            meta: self.meta.clone(),
        }
    }
}

/// A bubble whose text comes from the generator.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GeneratedBeat {
    #[serde(default)]
    pub pause_ms: u64,
    /// Prompt template sent to the generator.
    pub prompt: String,
}

impl GeneratedBeat {
    /// Typing pause before the generator is called.
    #[must_use]
    pub fn pause(&self) -> Duration {
        Duration::from_millis(self.pause_ms)
    }

    /// Renders the prompt with placeholders filled in.
    #[must_use]
    pub fn prompt(&self, answers: &Answers, input: Option<&str>) -> String {
        render(&self.prompt, answers, input)
    }
}

/// The full conversation script.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Script {
    pub call_duration_secs: u64,
    pub ring_secs: u64,
    /// Seconds each story stays on screen; `0` means user-paced only.
    pub story_secs: u64,
    pub apology: String,
    pub failure_notice: Notice,
    pub keywords: Keywords,
    pub greeting: Vec<Beat>,
    pub name_filler: Vec<Beat>,
    pub name_captured: Vec<Beat>,
    pub name_correction_ack: Vec<Beat>,
    pub motivation_reask: Vec<Beat>,
    pub motivation_empathy: GeneratedBeat,
    pub motivation_followup: Vec<Beat>,
    pub duration_captured: Vec<Beat>,
    pub attempts_empathy: GeneratedBeat,
    pub attempts_followup: Vec<Beat>,
    pub connection_captured: Vec<Beat>,
    pub stories: Vec<Story>,
    pub stories_viewed: Vec<Beat>,
    pub call_intro: Vec<Beat>,
    pub call_followup: Vec<Beat>,
    pub offer_accepted: Vec<Beat>,
    pub offer_explained: Vec<Beat>,
    pub offer_reprompt: Vec<Beat>,
    pub contact_captured: Vec<Beat>,
    pub free_chat: GeneratedBeat,
}

impl Script {
    /// The script shipped with the crate.
    ///
    /// # Errors
    ///
    /// Returns `ScriptError` if the embedded YAML is malformed or invalid.
    pub fn builtin() -> Result<Self, ScriptError> {
        Self::from_yaml_str(BUILTIN_SCRIPT)
    }

    /// Parses and validates a script from YAML text.
    ///
    /// # Errors
    ///
    /// Returns `ScriptError::Parse` for schema mismatches and
    /// `ScriptError::Invalid` for scripts that cannot drive a conversation.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ScriptError> {
        let script: Script = serde_yaml::from_str(yaml)?;
        script.validate()?;
        Ok(script)
    }

    /// Reads, parses and validates a script file.
    ///
    /// # Errors
    ///
    /// Returns `ScriptError::Io` if the file cannot be read, otherwise as
    /// [`Script::from_yaml_str`].
    pub fn from_path(path: &Path) -> Result<Self, ScriptError> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&yaml)
    }

    /// How long the simulated call lasts before the conversation moves on.
    #[must_use]
    pub fn call_duration(&self) -> Duration {
        Duration::from_secs(self.call_duration_secs)
    }

    /// How long the call rings before it is picked up automatically.
    #[must_use]
    pub fn ring_timeout(&self) -> Duration {
        Duration::from_secs(self.ring_secs)
    }

    /// Auto-advance interval of the story viewer, if any.
    #[must_use]
    pub fn story_duration(&self) -> Option<Duration> {
        (self.story_secs > 0).then(|| Duration::from_secs(self.story_secs))
    }

    fn validate(&self) -> Result<(), ScriptError> {
        let batches: [(&str, &[Beat]); 16] = [
            ("greeting", &self.greeting),
            ("name_filler", &self.name_filler),
            ("name_captured", &self.name_captured),
            ("name_correction_ack", &self.name_correction_ack),
            ("motivation_reask", &self.motivation_reask),
            ("motivation_followup", &self.motivation_followup),
            ("duration_captured", &self.duration_captured),
            ("attempts_followup", &self.attempts_followup),
            ("connection_captured", &self.connection_captured),
            ("stories_viewed", &self.stories_viewed),
            ("call_intro", &self.call_intro),
            ("call_followup", &self.call_followup),
            ("offer_accepted", &self.offer_accepted),
            ("offer_explained", &self.offer_explained),
            ("offer_reprompt", &self.offer_reprompt),
            ("contact_captured", &self.contact_captured),
        ];
        if let Some((name, _)) = batches.iter().find(|(_, beats)| beats.is_empty()) {
            return Err(ScriptError::Invalid(format!("batch `{name}` is empty")));
        }
        if !self
            .call_intro
            .iter()
            .any(|beat| beat.kind == MessageKind::LiveCall)
        {
            return Err(ScriptError::Invalid(
                "batch `call_intro` must contain a live-call message".to_owned(),
            ));
        }
        if self.call_duration_secs <= self.ring_secs {
            return Err(ScriptError::Invalid(
                "call_duration_secs must exceed ring_secs".to_owned(),
            ));
        }
        if self.stories.is_empty() {
            return Err(ScriptError::Invalid("no stories".to_owned()));
        }
        let keywords = &self.keywords;
        if keywords.affirmative.is_empty() || keywords.question.is_empty() {
            return Err(ScriptError::Invalid(
                "offer keyword sets must not be empty".to_owned(),
            ));
        }
        if keywords.stories_open.trim().is_empty() || keywords.stories_done.trim().is_empty() {
            return Err(ScriptError::Invalid(
                "story replies must not be blank".to_owned(),
            ));
        }
        Ok(())
    }
}

/// Fills `{name}`-style placeholders from the captured answers. Missing
/// answers render as empty text.
#[must_use]
pub fn render(template: &str, answers: &Answers, input: Option<&str>) -> String {
    let lookup = |placeholder: &str| match placeholder {
        "name" => Some(answers.name.as_deref()),
        "motivation" => Some(answers.motivation.as_deref()),
        "duration" => Some(answers.pain_duration.as_deref()),
        "attempts" => Some(answers.attempts.as_deref()),
        "connection" => Some(answers.connection.as_deref()),
        "contact" => Some(answers.contact.as_deref()),
        "input" => Some(input),
        _ => None,
    };

    // Single pass over the template: substituted values are never rescanned.
    let mut text = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        text.push_str(&rest[..start]);
        let tail = &rest[start..];
        let token = tail[1..]
            .find('}')
            .and_then(|end| lookup(&tail[1..=end]).map(|value| (end, value)));
        match token {
            Some((end, value)) => {
                text.push_str(value.unwrap_or_default());
                rest = &tail[end + 2..];
            }
            None => {
                text.push('{');
                rest = &tail[1..];
            }
        }
    }
    text.push_str(rest);
    text
}
