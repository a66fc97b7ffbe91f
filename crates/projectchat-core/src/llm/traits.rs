use crate::error::ProjectChatError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Sampling parameters held fixed for every request of a session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_tokens: 1024,
            temperature: 0.7,
        }
    }
}

/// One "generate a streamed reply" call.
///
/// `system` is `None` when no project context is in play; clients must then
/// omit the system instruction entirely rather than send an empty one.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub system: Option<String>,
    pub messages: Vec<Message>,
    pub params: GenerationParams,
}

/// Events emitted during streaming LLM responses.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// A fragment of reply text, in arrival order.
    TextDelta(String),
    /// Any other named event kind (message_start, ping, ...). Carries the kind only.
    Lifecycle(String),
    /// The backend signalled the end of the message.
    Done,
    Error(String),
}

/// The LLM client trait. Implementations stream a reply for a full conversation.
#[async_trait::async_trait]
pub trait LlmClient: Send + Sync {
    async fn chat_stream(
        &self,
        request: &ChatRequest,
    ) -> Result<futures::channel::mpsc::UnboundedReceiver<StreamEvent>, ProjectChatError>;
}
