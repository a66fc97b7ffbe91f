use crate::error::ProjectChatError;
use crate::llm::traits::*;
use futures::channel::mpsc;
use serde_json::Value;

const ANTHROPIC_VERSION: &str = "2023-06-01";
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
pub const DEFAULT_MODEL: &str = "claude-3-opus-20240229";

pub struct ClaudeClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl ClaudeClient {
    /// The credential is handed in by the caller; the client never reads the environment.
    pub fn new(api_key: impl Into<String>) -> Result<Self, ProjectChatError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ProjectChatError::Config("API key is empty".to_string()));
        }
        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_request_body(&self, request: &ChatRequest) -> Value {
        let messages: Vec<Value> = request
            .messages
            .iter()
            .map(|m| {
                serde_json::json!({
                    "role": m.role,
                    "content": m.content,
                })
            })
            .collect();

        let mut body = serde_json::json!({
            "model": self.model,
            "max_tokens": request.params.max_tokens,
            "temperature": request.params.temperature,
            "messages": messages,
            "stream": true,
        });

        if let Some(system) = request.system.as_deref().filter(|s| !s.is_empty()) {
            body["system"] = Value::String(system.to_string());
        }

        body
    }
}

/// Splits a raw SSE byte stream into `data:` payloads.
///
/// Bytes are buffered until a full line is available so multi-byte
/// characters split across network chunks decode intact.
#[derive(Default)]
struct SseLineBuffer {
    pending: Vec<u8>,
}

impl SseLineBuffer {
    fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(bytes);
        let mut payloads = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            payloads.extend(data_payload(&line));
        }
        payloads
    }

    /// Drain an unterminated final line once the byte stream has ended.
    fn finish(&mut self) -> Option<String> {
        let line = std::mem::take(&mut self.pending);
        data_payload(&line)
    }
}

fn data_payload(line: &[u8]) -> Option<String> {
    let line = String::from_utf8_lossy(line);
    line.trim()
        .strip_prefix("data:")
        .map(|data| data.trim_start().to_string())
}

/// Map one SSE `data:` payload onto a [`StreamEvent`].
///
/// Returns `None` for payloads that are not JSON objects with a `type`.
pub(crate) fn parse_sse_data(data: &str) -> Option<StreamEvent> {
    let event: Value = serde_json::from_str(data).ok()?;
    let event_type = event.get("type").and_then(|t| t.as_str())?;

    let parsed = match event_type {
        "content_block_delta" => {
            let delta = event.get("delta");
            let text = delta
                .filter(|d| d.get("type").and_then(|t| t.as_str()) == Some("text_delta"))
                .and_then(|d| d.get("text"))
                .and_then(|t| t.as_str());
            match text {
                Some(text) => StreamEvent::TextDelta(text.to_string()),
                None => StreamEvent::Lifecycle(event_type.to_string()),
            }
        }
        "message_stop" => StreamEvent::Done,
        "error" => {
            let message = event
                .get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .unwrap_or("unknown stream error");
            StreamEvent::Error(message.to_string())
        }
        other => StreamEvent::Lifecycle(other.to_string()),
    };
    Some(parsed)
}

/// Parse and send one payload. Returns true once the stream should stop.
fn forward(tx: &mpsc::UnboundedSender<StreamEvent>, data: &str) -> bool {
    let Some(event) = parse_sse_data(data) else {
        return false;
    };
    let terminal = matches!(event, StreamEvent::Done | StreamEvent::Error(_));
    tx.unbounded_send(event).is_err() || terminal
}

#[async_trait::async_trait]
impl LlmClient for ClaudeClient {
    async fn chat_stream(
        &self,
        request: &ChatRequest,
    ) -> Result<mpsc::UnboundedReceiver<StreamEvent>, ProjectChatError> {
        let url = format!("{}/v1/messages", self.base_url);
        let request_body = self.build_request_body(request);

        tracing::debug!(
            model = %self.model,
            messages = request.messages.len(),
            has_system = request.system.is_some(),
            "sending streaming request"
        );

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&request_body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ProjectChatError::Backend(format!(
                "Claude API error ({}): {}",
                status, text
            )));
        }

        let (tx, rx) = mpsc::unbounded();

        let mut stream = response.bytes_stream();
        tokio::spawn(async move {
            use futures::StreamExt;
            let mut lines = SseLineBuffer::default();

            while let Some(chunk) = stream.next().await {
                let chunk = match chunk {
                    Ok(c) => c,
                    Err(e) => {
                        let _ = tx.unbounded_send(StreamEvent::Error(e.to_string()));
                        return;
                    }
                };

                for data in lines.push(&chunk) {
                    if forward(&tx, &data) {
                        return;
                    }
                }
            }

            if let Some(data) = lines.finish() {
                if forward(&tx, &data) {
                    return;
                }
            }

            let _ = tx.unbounded_send(StreamEvent::Error(
                "stream ended before message_stop".to_string(),
            ));
        });

        Ok(rx)
    }
}
