/// Builds a context string from a system prompt and labeled file blocks.
///
/// Parts are joined with a blank line; empty prompts contribute nothing.
#[derive(Debug, Default)]
pub struct ContextBuilder {
    parts: Vec<String>,
}

impl ContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        let prompt = prompt.into();
        if !prompt.is_empty() {
            self.parts.push(prompt);
        }
        self
    }

    pub fn add_context_file(mut self, name: &str, content: impl Into<String>) -> Self {
        self.parts
            .push(format!("Content of {name}:\n{}", content.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn build(self) -> String {
        self.parts.join("\n\n")
    }
}
