//! Commands for the conversation context.

use jornada_core::command::Command;
use uuid::Uuid;

/// Command to start the scripted conversation.
#[derive(Debug, Clone)]
pub struct StartConversation {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The session to start.
    pub session_key: String,
}

/// Command to deliver text the user typed or picked.
#[derive(Debug, Clone)]
pub struct SendMessage {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The session the text belongs to.
    pub session_key: String,
    /// Raw text as sent by the client.
    pub text: String,
}

/// Command to report that the story viewer was dismissed.
#[derive(Debug, Clone)]
pub struct DismissStories {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The session whose viewer closed.
    pub session_key: String,
}

/// Command to end the simulated call.
#[derive(Debug, Clone)]
pub struct FinishCall {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The session whose call ended.
    pub session_key: String,
}

macro_rules! impl_command {
    ($ty:ty, $name:literal) => {
        impl Command for $ty {
            fn command_type(&self) -> &'static str {
                $name
            }

            fn correlation_id(&self) -> Uuid {
                self.correlation_id
            }

            fn session_key(&self) -> &str {
                &self.session_key
            }
        }
    };
}

impl_command!(StartConversation, "conversation.start");
impl_command!(SendMessage, "conversation.send_message");
impl_command!(DismissStories, "conversation.dismiss_stories");
impl_command!(FinishCall, "conversation.finish_call");
