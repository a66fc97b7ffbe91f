use crate::error::ProjectChatError;
use crate::llm::{ChatRequest, GenerationParams, LlmClient, StreamEvent};
use crate::session::history::ConversationHistory;
use futures::StreamExt;
use std::future::Future;

/// Where a session is in its turn lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Requesting,
    Streaming,
    Committing,
    Terminated,
}

/// Events emitted while a turn runs, in order, for the caller to render.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    ReplyStart,
    TextDelta(String),
    ReplyComplete,
    Error(String),
}

/// How a single call to [`ConversationSession::handle_input`] ended.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    /// The exit sentinel was entered; the session is terminated.
    Exit,
    /// The full reply was streamed and committed to history.
    Replied(String),
    /// The turn failed; only the user message was recorded.
    Failed(String),
}

/// True when the whole message is `exit`, ignoring ASCII case.
pub fn is_exit_command(input: &str) -> bool {
    input.eq_ignore_ascii_case("exit")
}

/// One interactive run against the model, primed with a fixed context.
pub struct ConversationSession {
    llm: Box<dyn LlmClient>,
    context: Option<String>,
    params: GenerationParams,
    history: ConversationHistory,
    state: SessionState,
}

impl ConversationSession {
    /// `context` is `None` when no project is selected; requests then carry no system instruction.
    pub fn new(llm: Box<dyn LlmClient>, context: Option<String>) -> Self {
        Self {
            llm,
            context,
            params: GenerationParams::default(),
            history: ConversationHistory::new(),
            state: SessionState::Idle,
        }
    }

    pub fn with_params(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }

    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    pub fn params(&self) -> GenerationParams {
        self.params
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_terminated(&self) -> bool {
        self.state == SessionState::Terminated
    }

    /// End the session without a turn, e.g. on end of input.
    pub fn terminate(&mut self) {
        self.state = SessionState::Terminated;
    }

    /// Run one turn to completion.
    pub async fn handle_input<F>(&mut self, input: &str, sink: F) -> TurnOutcome
    where
        F: FnMut(SessionEvent),
    {
        self.handle_input_until(input, std::future::pending::<()>(), sink)
            .await
    }

    /// Run one turn, aborting it if `interrupt` resolves before the reply is complete.
    pub async fn handle_input_until<I, F>(
        &mut self,
        input: &str,
        interrupt: I,
        mut sink: F,
    ) -> TurnOutcome
    where
        I: Future<Output = ()>,
        F: FnMut(SessionEvent),
    {
        if self.is_terminated() {
            return TurnOutcome::Exit;
        }
        if is_exit_command(input) {
            tracing::debug!(turns = self.history.reply_count(), "session terminated by user");
            self.terminate();
            return TurnOutcome::Exit;
        }

        // Recorded before the request so a failed turn still keeps it.
        self.history.add_user_message(input);
        self.state = SessionState::Requesting;
        sink(SessionEvent::ReplyStart);

        let result = {
            let turn = self.stream_reply(&mut sink);
            tokio::select! {
                result = turn => result,
                _ = interrupt => Err(ProjectChatError::Interrupted),
            }
        };

        match result {
            Ok(reply) => {
                self.state = SessionState::Committing;
                self.history.add_assistant_message(reply.clone());
                self.state = SessionState::Idle;
                sink(SessionEvent::ReplyComplete);
                TurnOutcome::Replied(reply)
            }
            Err(e) => {
                tracing::warn!("turn failed: {e}");
                self.state = SessionState::Idle;
                let message = e.to_string();
                sink(SessionEvent::Error(message.clone()));
                TurnOutcome::Failed(message)
            }
        }
    }

    async fn stream_reply<F>(&mut self, sink: &mut F) -> Result<String, ProjectChatError>
    where
        F: FnMut(SessionEvent),
    {
        let request = ChatRequest {
            system: self.context.clone(),
            messages: self.history.messages().to_vec(),
            params: self.params,
        };

        let mut stream = self.llm.chat_stream(&request).await?;
        let mut content = String::new();

        while let Some(event) = stream.next().await {
            self.state = SessionState::Streaming;
            match event {
                StreamEvent::TextDelta(delta) => {
                    content.push_str(&delta);
                    sink(SessionEvent::TextDelta(delta));
                }
                StreamEvent::Lifecycle(kind) => {
                    tracing::trace!(kind = %kind, "ignoring stream event");
                }
                StreamEvent::Done => return Ok(content),
                StreamEvent::Error(err) => return Err(ProjectChatError::Backend(err)),
            }
        }

        Err(ProjectChatError::Backend(
            "stream closed before the reply completed".to_string(),
        ))
    }
}
