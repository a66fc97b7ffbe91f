use futures::channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};
use projectchat_core::{
    ChatRequest, ConversationSession, GenerationParams, LlmClient, ProjectChatError, Role,
    SessionEvent, SessionState, StreamEvent, TurnOutcome,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// What the mock does for one request.
enum Script {
    /// Send these events, then close the channel.
    Events(Vec<StreamEvent>),
    /// Send these events and keep the channel open forever.
    Hang(Vec<StreamEvent>),
    /// Fail the request before any stream is returned.
    Reject(String),
}

/// Mock LLM that replays scripted responses and records every request.
#[derive(Clone)]
struct MockLlm {
    scripts: Arc<Mutex<Vec<Script>>>,
    requests: Arc<Mutex<Vec<ChatRequest>>>,
    held: Arc<Mutex<Vec<UnboundedSender<StreamEvent>>>>,
}

impl MockLlm {
    fn new(mut scripts: Vec<Script>) -> Self {
        scripts.reverse();
        Self {
            scripts: Arc::new(Mutex::new(scripts)),
            requests: Arc::new(Mutex::new(Vec::new())),
            held: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl LlmClient for MockLlm {
    async fn chat_stream(
        &self,
        request: &ChatRequest,
    ) -> Result<UnboundedReceiver<StreamEvent>, ProjectChatError> {
        self.requests.lock().unwrap().push(request.clone());
        let script = self
            .scripts
            .lock()
            .unwrap()
            .pop()
            .unwrap_or_else(|| Script::Events(vec![StreamEvent::Done]));

        let (tx, rx) = unbounded();
        match script {
            Script::Events(events) => {
                for event in events {
                    tx.unbounded_send(event).unwrap();
                }
            }
            Script::Hang(events) => {
                for event in events {
                    tx.unbounded_send(event).unwrap();
                }
                self.held.lock().unwrap().push(tx);
            }
            Script::Reject(message) => return Err(ProjectChatError::Backend(message)),
        }
        Ok(rx)
    }
}

fn text(s: &str) -> StreamEvent {
    StreamEvent::TextDelta(s.to_string())
}

fn session(mock: &MockLlm, context: Option<&str>) -> ConversationSession {
    ConversationSession::new(Box::new(mock.clone()), context.map(str::to_string))
}

// ========================================================================
// Successful turns
// ========================================================================

#[tokio::test]
async fn test_streamed_reply_is_committed() {
    let mock = MockLlm::new(vec![Script::Events(vec![
        StreamEvent::Lifecycle("message_start".to_string()),
        text("Hel"),
        StreamEvent::Lifecycle("ping".to_string()),
        text("lo"),
        StreamEvent::Done,
    ])]);
    let mut session = session(&mock, Some("ctx"));
    let mut events = Vec::new();

    let outcome = session.handle_input("Hi", |e| events.push(e)).await;

    assert_eq!(outcome, TurnOutcome::Replied("Hello".to_string()));
    assert_eq!(
        events,
        vec![
            SessionEvent::ReplyStart,
            SessionEvent::TextDelta("Hel".to_string()),
            SessionEvent::TextDelta("lo".to_string()),
            SessionEvent::ReplyComplete,
        ]
    );
    let messages = session.history().messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, Role::User);
    assert_eq!(messages[0].content, "Hi");
    assert_eq!(messages[1].role, Role::Assistant);
    assert_eq!(messages[1].content, "Hello");
    assert_eq!(session.state(), SessionState::Idle);
}

#[tokio::test]
async fn test_each_request_carries_full_history_and_fixed_context() {
    let mock = MockLlm::new(vec![
        Script::Events(vec![text("one"), StreamEvent::Done]),
        Script::Events(vec![text("two"), StreamEvent::Done]),
    ]);
    let params = GenerationParams {
        max_tokens: 256,
        temperature: 0.2,
    };
    let mut session = session(&mock, Some("Be terse.")).with_params(params);

    session.handle_input("first", |_| {}).await;
    session.handle_input("second", |_| {}).await;

    let requests = mock.requests();
    assert_eq!(requests.len(), 2);
    for request in &requests {
        assert_eq!(request.system.as_deref(), Some("Be terse."));
        assert_eq!(request.params, params);
    }
    let second: Vec<(Role, &str)> = requests[1]
        .messages
        .iter()
        .map(|m| (m.role, m.content.as_str()))
        .collect();
    assert_eq!(
        second,
        vec![
            (Role::User, "first"),
            (Role::Assistant, "one"),
            (Role::User, "second"),
        ]
    );
}

#[tokio::test]
async fn test_no_project_means_no_system_instruction() {
    let mock = MockLlm::new(vec![Script::Events(vec![StreamEvent::Done])]);
    let mut session = session(&mock, None);

    session.handle_input("hello", |_| {}).await;

    assert!(mock.requests()[0].system.is_none());
}

// ========================================================================
// Exit sentinel
// ========================================================================

#[tokio::test]
async fn test_exit_sentinel_terminates_without_contacting_backend() {
    for word in ["exit", "EXIT", "Exit"] {
        let mock = MockLlm::new(vec![]);
        let mut session = session(&mock, None);
        let mut events = Vec::new();

        let outcome = session.handle_input(word, |e| events.push(e)).await;

        assert_eq!(outcome, TurnOutcome::Exit);
        assert!(session.is_terminated());
        assert!(session.history().is_empty());
        assert!(mock.requests().is_empty());
        assert!(events.is_empty());
    }
}

#[tokio::test]
async fn test_exit_with_extra_text_is_an_ordinary_turn() {
    let mock = MockLlm::new(vec![Script::Events(vec![text("ok"), StreamEvent::Done])]);
    let mut session = session(&mock, None);

    let outcome = session.handle_input(" exit ", |_| {}).await;

    assert_eq!(outcome, TurnOutcome::Replied("ok".to_string()));
    assert!(!session.is_terminated());
    assert_eq!(session.history().messages()[0].content, " exit ");
    assert_eq!(mock.requests().len(), 1);
}

#[tokio::test]
async fn test_terminated_session_ignores_further_input() {
    let mock = MockLlm::new(vec![]);
    let mut session = session(&mock, None);
    session.handle_input("exit", |_| {}).await;

    let outcome = session.handle_input("hello?", |_| {}).await;

    assert_eq!(outcome, TurnOutcome::Exit);
    assert!(session.history().is_empty());
    assert!(mock.requests().is_empty());
}

// ========================================================================
// Failed turns never commit partial replies
// ========================================================================

async fn assert_failed_turn_keeps_only_user_message(script: Script) {
    let mock = MockLlm::new(vec![script]);
    let mut session = session(&mock, None);
    let mut events = Vec::new();

    let outcome = session.handle_input("question", |e| events.push(e)).await;

    assert!(matches!(outcome, TurnOutcome::Failed(_)), "{outcome:?}");
    assert!(matches!(events.last(), Some(SessionEvent::Error(_))));
    let messages = session.history().messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].role, Role::User);
    assert_eq!(messages[0].content, "question");
    assert_eq!(session.state(), SessionState::Idle);
}

#[tokio::test]
async fn test_request_rejected() {
    assert_failed_turn_keeps_only_user_message(Script::Reject("401".to_string())).await;
}

#[tokio::test]
async fn test_error_before_any_text() {
    assert_failed_turn_keeps_only_user_message(Script::Events(vec![StreamEvent::Error(
        "overloaded".to_string(),
    )]))
    .await;
}

#[tokio::test]
async fn test_error_mid_stream() {
    assert_failed_turn_keeps_only_user_message(Script::Events(vec![
        text("partial "),
        text("answer"),
        StreamEvent::Error("connection reset".to_string()),
        text("never seen"),
    ]))
    .await;
}

#[tokio::test]
async fn test_stream_closed_without_done() {
    assert_failed_turn_keeps_only_user_message(Script::Events(vec![text("cut off")])).await;
}

#[tokio::test]
async fn test_interrupt_aborts_turn() {
    let mock = MockLlm::new(vec![Script::Hang(vec![text("thinking...")])]);
    let mut session = session(&mock, None);
    let mut events = Vec::new();

    let outcome = session
        .handle_input_until(
            "question",
            tokio::time::sleep(Duration::from_millis(20)),
            |e| events.push(e),
        )
        .await;

    assert_eq!(outcome, TurnOutcome::Failed("Interrupted".to_string()));
    assert!(events.contains(&SessionEvent::TextDelta("thinking...".to_string())));
    assert_eq!(session.history().len(), 1);
}

#[tokio::test]
async fn test_session_recovers_after_failed_turn() {
    let mock = MockLlm::new(vec![
        Script::Events(vec![text("half"), StreamEvent::Error("boom".to_string())]),
        Script::Events(vec![text("fine"), StreamEvent::Done]),
    ]);
    let mut session = session(&mock, None);

    session.handle_input("one", |_| {}).await;
    let outcome = session.handle_input("two", |_| {}).await;

    assert_eq!(outcome, TurnOutcome::Replied("fine".to_string()));
    let contents: Vec<&str> = session
        .history()
        .messages()
        .iter()
        .map(|m| m.content.as_str())
        .collect();
    assert_eq!(contents, vec!["one", "two", "fine"]);
    // The retry request saw the unanswered first turn.
    assert_eq!(mock.requests()[1].messages.len(), 2);
}
