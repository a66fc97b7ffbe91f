// Library interface for projectchat-cli
// This allows integration tests to access the command and rendering modules.

pub mod app;
pub mod commands;
pub mod render;

pub use commands::{handle_command, Cli, Command, CommandResult};
pub use render::ConsoleRenderer;
