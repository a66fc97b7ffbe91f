pub mod config;
pub mod error;
pub mod llm;
pub mod project;
pub mod session;

// Re-export key types
pub use config::Settings;
pub use error::{ProjectChatError, Result};
pub use llm::{ChatRequest, ClaudeClient, GenerationParams, LlmClient, Message, Role, StreamEvent};
pub use project::{Project, ProjectRecord, ProjectStore};
pub use session::{ConversationHistory, ConversationSession, SessionEvent, SessionState, TurnOutcome};
