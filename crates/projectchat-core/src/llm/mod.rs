mod traits;
mod claude;

pub use traits::*;
pub use claude::{ClaudeClient, DEFAULT_BASE_URL, DEFAULT_MODEL};
