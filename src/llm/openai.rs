//! OpenAI-compatible Chat Completions client.
//!
//! Requests are sent at temperature 0 so repeated runs over an identical
//! transcript are as reproducible as the remote model allows.

use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};

use super::{
    AssistantTurn, ChatMessage, DeltaStream, LlmClient, LlmError, StreamDelta, ToolCall,
    ToolCallDelta, ToolDef,
};

pub struct OpenAiClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl OpenAiClient {
    pub fn new(api_key: String, base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    async fn send(
        &self,
        model: &str,
        messages: &[ChatMessage],
        tools: Option<&[ToolDef]>,
        stream: bool,
    ) -> Result<reqwest::Response, LlmError> {
        let body = RequestBody {
            model,
            messages,
            tools,
            temperature: 0.0,
            stream,
        };

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

#[derive(Serialize)]
struct RequestBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<&'a [ToolDef]>,
    temperature: f32,
    stream: bool,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ToolCall>>,
}

#[derive(Deserialize)]
struct StreamChunk {
    choices: Vec<StreamChoice>,
}

#[derive(Deserialize)]
struct StreamChoice {
    delta: StreamChoiceDelta,
}

#[derive(Default, Deserialize)]
struct StreamChoiceDelta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<ToolCallDelta>,
}

/// Extract the payload of an SSE `data:` line, if any.
fn sse_payload(line: &str) -> Option<&str> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.strip_prefix("data:").unwrap_or(trimmed).trim())
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn chat_completion(
        &self,
        model: &str,
        messages: &[ChatMessage],
        tools: Option<&[ToolDef]>,
    ) -> Result<AssistantTurn, LlmError> {
        let response = self.send(model, messages, tools, false).await?;
        let text = response
            .text()
            .await
            .map_err(|e| LlmError::Request(e.to_string()))?;

        let parsed: CompletionResponse =
            serde_json::from_str(&text).map_err(|e| LlmError::Parse(format!("{}: {}", e, text)))?;
        let choice = parsed.choices.into_iter().next().ok_or(LlmError::EmptyResponse)?;

        Ok(AssistantTurn {
            content: choice.message.content,
            tool_calls: choice.message.tool_calls.unwrap_or_default(),
        })
    }

    async fn chat_completion_stream(
        &self,
        model: &str,
        messages: &[ChatMessage],
        tools: Option<&[ToolDef]>,
    ) -> Result<DeltaStream, LlmError> {
        let response = self.send(model, messages, tools, true).await?;
        let mut byte_stream = response.bytes_stream();

        let stream = async_stream::try_stream! {
            let mut buf = Vec::<u8>::new();
            loop {
                let chunk = match byte_stream.next().await {
                    Some(Ok(bytes)) => bytes,
                    Some(Err(e)) => Err(LlmError::Request(e.to_string()))?,
                    None => break,
                };

                buf.extend_from_slice(&chunk);
                let mut start = 0usize;
                for i in 0..buf.len() {
                    if buf[i] != b'\n' {
                        continue;
                    }
                    let line = String::from_utf8_lossy(&buf[start..i]).into_owned();
                    start = i + 1;

                    let Some(payload) = sse_payload(&line) else {
                        continue;
                    };
                    if payload == "[DONE]" {
                        continue;
                    }

                    let chunk: StreamChunk = match serde_json::from_str(payload) {
                        Ok(c) => c,
                        Err(e) => {
                            tracing::warn!(error = %e, payload, "failed to parse stream chunk");
                            continue;
                        }
                    };

                    for choice in chunk.choices {
                        if let Some(content) = choice.delta.content {
                            if !content.is_empty() {
                                yield StreamDelta::Token(content);
                            }
                        }
                        if !choice.delta.tool_calls.is_empty() {
                            yield StreamDelta::ToolCalls(choice.delta.tool_calls);
                        }
                    }
                }
                if start > 0 {
                    buf.drain(0..start);
                }
            }
        };

        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sse_payload_strips_data_prefix() {
        assert_eq!(sse_payload("data: {\"x\":1}"), Some("{\"x\":1}"));
        assert_eq!(sse_payload("data: [DONE]"), Some("[DONE]"));
        assert_eq!(sse_payload("   "), None);
    }

    #[test]
    fn stream_chunk_parses_token_and_tool_deltas() {
        let payload = r#"{"choices":[{"delta":{"content":"Hel"}}]}"#;
        let chunk: StreamChunk = serde_json::from_str(payload).unwrap();
        assert_eq!(chunk.choices[0].delta.content.as_deref(), Some("Hel"));

        let payload = r#"{"choices":[{"delta":{"tool_calls":[{"index":0,"id":"call_1","function":{"name":"get_student","arguments":""}}]}}]}"#;
        let chunk: StreamChunk = serde_json::from_str(payload).unwrap();
        let delta = &chunk.choices[0].delta.tool_calls[0];
        assert_eq!(delta.id.as_deref(), Some("call_1"));
        assert_eq!(delta.function.as_ref().unwrap().name, "get_student");
    }
}
