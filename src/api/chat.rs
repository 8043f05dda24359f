//! Chat endpoints: synchronous `/chat` and the streaming gateway
//! `/chat/stream`.
//!
//! The streaming gateway is a producer/consumer pair: the agent run is
//! spawned as a producer task that pushes [`AgentEvent`]s onto a bounded
//! channel, and the response body drains the channel into line-delimited
//! `text/event-stream` frames. The terminal `[DONE]` frame is emitted exactly
//! once, on every path, including failures.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use futures::Stream;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::mpsc;

use crate::agent::{Agent, AgentError, AgentEvent};

use super::{error_response, AppState};

/// Frames buffered between the agent task and the transport.
const EVENT_BUFFER: usize = 32;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    response: String,
}

fn validate_message(req: ChatRequest) -> Result<String, Response> {
    match req.message {
        Some(message) if !message.trim().is_empty() => Ok(message),
        _ => Err(error_response(
            StatusCode::BAD_REQUEST,
            "Message is required.",
        )),
    }
}

/// `POST /chat` - run the agent to completion and return the final answer.
pub async fn chat(State(state): State<Arc<AppState>>, Json(req): Json<ChatRequest>) -> Response {
    let message = match validate_message(req) {
        Ok(m) => m,
        Err(resp) => return resp,
    };

    match state.agent().run(&message).await {
        Ok(response) => Json(ChatResponse { response }).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "chat run failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// `POST /chat/stream` - relay the run's events as a server-push stream.
pub async fn chat_stream(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> Response {
    let message = match validate_message(req) {
        Ok(m) => m,
        Err(resp) => return resp,
    };

    let (tx, rx) = mpsc::channel::<AgentEvent>(EVENT_BUFFER);
    tokio::spawn(run_with_terminal_marker(state.agent(), message, tx));

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, "text/event-stream".parse().unwrap());
    headers.insert(header::CACHE_CONTROL, "no-cache".parse().unwrap());

    (headers, Body::from_stream(frame_stream(rx))).into_response()
}

/// Failure boundary around one streaming run.
///
/// Whatever the run does, the terminal marker goes out before the channel is
/// dropped; failures additionally surface as an error frame. A run aborted by
/// the consumer hanging up is not an error.
async fn run_with_terminal_marker(agent: Agent, message: String, tx: mpsc::Sender<AgentEvent>) {
    match agent.run_streaming(&message, tx.clone()).await {
        Ok(_) => {}
        Err(AgentError::ChannelClosed) => {
            tracing::debug!("client disconnected mid-stream");
            return;
        }
        Err(e) => {
            tracing::error!(error = %e, "streaming run failed");
            let _ = tx
                .send(AgentEvent::Error {
                    message: e.to_string(),
                })
                .await;
        }
    }
    let _ = tx.send(AgentEvent::Done).await;
}

/// Encode one event as an SSE data block.
fn frame(event: &AgentEvent) -> Bytes {
    let payload = match event {
        AgentEvent::Token { content } => json!({ "token": content }).to_string(),
        AgentEvent::ToolOutput { content } => json!({ "tool_output": content }).to_string(),
        AgentEvent::Error { message } => json!({ "error": message }).to_string(),
        AgentEvent::Done => "[DONE]".to_string(),
    };
    Bytes::from(format!("data: {}\n\n", payload))
}

/// Drain the event channel into framed chunks, one chunk per event so the
/// transport flushes each frame immediately.
fn frame_stream(
    mut rx: mpsc::Receiver<AgentEvent>,
) -> impl Stream<Item = Result<Bytes, Infallible>> {
    async_stream::stream! {
        while let Some(event) = rx.recv().await {
            let done = matches!(event, AgentEvent::Done);
            yield Ok(frame(&event));
            if done {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::llm::{
        AssistantTurn, ChatMessage, DeltaStream, LlmClient, LlmError, StreamDelta, ToolDef,
    };
    use crate::store::InMemoryStudentStore;
    use crate::tools::ToolRegistry;
    use async_trait::async_trait;
    use futures::StreamExt;

    /// Model stub that streams a fixed answer.
    struct AnsweringLlm(&'static str);

    #[async_trait]
    impl LlmClient for AnsweringLlm {
        async fn chat_completion(
            &self,
            _model: &str,
            _messages: &[ChatMessage],
            _tools: Option<&[ToolDef]>,
        ) -> Result<AssistantTurn, LlmError> {
            Ok(AssistantTurn {
                content: Some(self.0.to_string()),
                tool_calls: vec![],
            })
        }

        async fn chat_completion_stream(
            &self,
            _model: &str,
            _messages: &[ChatMessage],
            _tools: Option<&[ToolDef]>,
        ) -> Result<DeltaStream, LlmError> {
            let deltas = vec![Ok(StreamDelta::Token(self.0.to_string()))];
            Ok(Box::pin(futures::stream::iter(deltas)))
        }
    }

    /// Model stub that always fails.
    struct BrokenLlm;

    #[async_trait]
    impl LlmClient for BrokenLlm {
        async fn chat_completion(
            &self,
            _model: &str,
            _messages: &[ChatMessage],
            _tools: Option<&[ToolDef]>,
        ) -> Result<AssistantTurn, LlmError> {
            Err(LlmError::Request("connection refused".to_string()))
        }

        async fn chat_completion_stream(
            &self,
            _model: &str,
            _messages: &[ChatMessage],
            _tools: Option<&[ToolDef]>,
        ) -> Result<DeltaStream, LlmError> {
            Err(LlmError::Request("connection refused".to_string()))
        }
    }

    fn agent_over(llm: Arc<dyn LlmClient>) -> Agent {
        let config = Config::new("test-key".to_string(), "test-model".to_string());
        let store = Arc::new(InMemoryStudentStore::new());
        let tools = Arc::new(ToolRegistry::new(store).unwrap());
        Agent::new(config, llm, tools)
    }

    async fn collect_events(llm: Arc<dyn LlmClient>) -> Vec<AgentEvent> {
        let (tx, mut rx) = mpsc::channel(16);
        run_with_terminal_marker(agent_over(llm), "hello".to_string(), tx).await;

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn terminal_marker_is_always_last_on_success() {
        let events = collect_events(Arc::new(AnsweringLlm("Hi there"))).await;
        let done_count = events
            .iter()
            .filter(|e| matches!(e, AgentEvent::Done))
            .count();
        assert_eq!(done_count, 1);
        assert_eq!(events.last(), Some(&AgentEvent::Done));
    }

    #[tokio::test]
    async fn failed_run_emits_error_frame_then_terminal_marker() {
        let events = collect_events(Arc::new(BrokenLlm)).await;
        assert_eq!(events.len(), 2);
        assert!(matches!(&events[0], AgentEvent::Error { message } if message.contains("connection refused")));
        assert_eq!(events[1], AgentEvent::Done);
    }

    #[tokio::test]
    async fn frames_use_the_wire_format() {
        let token = frame(&AgentEvent::Token {
            content: "Hel".to_string(),
        });
        assert_eq!(&token[..], b"data: {\"token\":\"Hel\"}\n\n");

        let tool = frame(&AgentEvent::ToolOutput {
            content: "42".to_string(),
        });
        assert_eq!(&tool[..], b"data: {\"tool_output\":\"42\"}\n\n");

        assert_eq!(&frame(&AgentEvent::Done)[..], b"data: [DONE]\n\n");
    }

    #[tokio::test]
    async fn frame_stream_ends_after_the_terminal_marker() {
        let (tx, rx) = mpsc::channel(4);
        tx.send(AgentEvent::Token {
            content: "x".to_string(),
        })
        .await
        .unwrap();
        tx.send(AgentEvent::Done).await.unwrap();

        let frames: Vec<_> = frame_stream(rx).collect().await;
        assert_eq!(frames.len(), 2);
        let last = frames.last().unwrap().as_ref().unwrap();
        assert_eq!(&last[..], b"data: [DONE]\n\n");
    }
}
