//! Model adapter: chat messages, tool schemas, and the `LlmClient` seam.
//!
//! The remote model is an opaque collaborator: given a transcript and the
//! declared tool schemas it returns either a final textual answer or one or
//! more tool call requests. Every call is stateless; the full transcript and
//! the full schema set are sent each time.

mod openai;

pub use openai::OpenAiClient;

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Message role in the OpenAI chat format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// One transcript entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    pub fn assistant(content: Option<String>, tool_calls: Option<Vec<ToolCall>>) -> Self {
        Self {
            role: Role::Assistant,
            content,
            tool_calls,
            tool_call_id: None,
        }
    }

    /// A tool result tagged with the originating call id.
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: Some(tool_call_id.into()),
        }
    }
}

/// A model-issued request to execute a tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub function: ToolCallFunction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallFunction {
    pub name: String,
    /// JSON-encoded argument object.
    pub arguments: String,
}

/// Tool schema declared to the model (OpenAI function-calling format).
#[derive(Debug, Clone, Serialize)]
pub struct ToolDef {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub function: ToolFunctionDef,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolFunctionDef {
    pub name: String,
    pub description: String,
    /// JSON Schema object describing the named parameters.
    pub parameters: Value,
}

/// One assistant turn: a final answer, tool requests, or both. A turn with
/// no tool requests ends the run.
#[derive(Debug, Clone, Default)]
pub struct AssistantTurn {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCall>,
}

/// Incremental fragment of an in-flight assistant turn.
#[derive(Debug, Clone)]
pub enum StreamDelta {
    /// Partial answer text.
    Token(String),
    /// Partial tool call data, merged by index via [`ToolCallAccumulator`].
    ToolCalls(Vec<ToolCallDelta>),
}

/// Tool call fragment as streamed by the Chat Completions API.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToolCallDelta {
    pub index: Option<usize>,
    pub id: Option<String>,
    #[serde(default)]
    pub function: Option<ToolCallFunctionDelta>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToolCallFunctionDelta {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub arguments: String,
}

/// Merges streamed tool call deltas into complete [`ToolCall`]s.
///
/// The API streams each call's name and argument string in pieces, keyed by
/// a per-turn index; fragments for the same index are concatenated.
#[derive(Debug, Default)]
pub struct ToolCallAccumulator {
    partial: Vec<PartialCall>,
}

#[derive(Debug, Default)]
struct PartialCall {
    id: String,
    name: String,
    arguments: String,
}

impl ToolCallAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, delta: ToolCallDelta) {
        let index = delta.index.unwrap_or(self.partial.len().saturating_sub(1));
        while self.partial.len() <= index {
            self.partial.push(PartialCall::default());
        }
        let slot = &mut self.partial[index];
        if let Some(id) = delta.id {
            slot.id.push_str(&id);
        }
        if let Some(function) = delta.function {
            slot.name.push_str(&function.name);
            slot.arguments.push_str(&function.arguments);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.partial.is_empty()
    }

    pub fn finish(self) -> Vec<ToolCall> {
        self.partial
            .into_iter()
            .map(|p| ToolCall {
                id: p.id,
                kind: "function".to_string(),
                function: ToolCallFunction {
                    name: p.name,
                    arguments: p.arguments,
                },
            })
            .collect()
    }
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Model request failed: {0}")]
    Request(String),

    #[error("Model API error (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("Failed to parse model response: {0}")]
    Parse(String),

    #[error("Model returned an empty response")]
    EmptyResponse,
}

/// Stream of assistant-turn fragments.
pub type DeltaStream = Pin<Box<dyn Stream<Item = Result<StreamDelta, LlmError>> + Send>>;

/// Remote chat model seam.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// One blocking model consultation over the full transcript.
    async fn chat_completion(
        &self,
        model: &str,
        messages: &[ChatMessage],
        tools: Option<&[ToolDef]>,
    ) -> Result<AssistantTurn, LlmError>;

    /// Streaming variant: yields partial tokens and tool call deltas as they
    /// arrive. Used only by the streaming gateway.
    async fn chat_completion_stream(
        &self,
        model: &str,
        messages: &[ChatMessage],
        tools: Option<&[ToolDef]>,
    ) -> Result<DeltaStream, LlmError>;
}
