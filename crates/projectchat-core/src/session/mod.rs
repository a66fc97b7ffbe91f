mod core;
mod history;

pub use self::core::{is_exit_command, ConversationSession, SessionEvent, SessionState, TurnOutcome};
pub use history::ConversationHistory;
