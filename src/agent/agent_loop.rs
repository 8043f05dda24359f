//! Core agent loop implementation.
//!
//! One run owns a private transcript and alternates between consulting the
//! model and executing the tool it requests, until the model's latest turn
//! carries no tool request. Runs are bounded by the configured step budget.

use std::sync::Arc;

use futures::StreamExt;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::config::Config;
use crate::llm::{
    ChatMessage, LlmClient, LlmError, StreamDelta, ToolCall, ToolCallAccumulator,
};
use crate::tools::ToolRegistry;

use super::prompt::build_system_prompt;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("Step budget of {limit} model calls exceeded without a final answer")]
    StepBudgetExceeded { limit: usize },

    #[error("Model produced a turn with no content and no tool calls")]
    EmptyResponse,

    #[error("Event channel closed by the consumer")]
    ChannelClosed,
}

/// Step-by-step events surfaced to the streaming gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentEvent {
    /// Partial answer text from the model.
    Token { content: String },
    /// A tool finished executing; carries its string result.
    ToolOutput { content: String },
    /// The run failed; emitted before the terminal marker.
    Error { message: String },
    /// End of run. Exactly one per stream, always last.
    Done,
}

/// The campus admin agent.
pub struct Agent {
    config: Config,
    llm: Arc<dyn LlmClient>,
    tools: Arc<ToolRegistry>,
}

impl Agent {
    pub fn new(config: Config, llm: Arc<dyn LlmClient>, tools: Arc<ToolRegistry>) -> Self {
        Self { config, llm, tools }
    }

    /// Run one synchronous turn-taking session and return the final answer.
    pub async fn run(&self, message: &str) -> Result<String, AgentError> {
        let run_id = Uuid::new_v4();
        let mut messages = self.seed_transcript(message);
        let tool_defs = self.tools.tool_defs();

        for iteration in 0..self.config.max_iterations {
            tracing::debug!(%run_id, iteration = iteration + 1, "agent iteration");

            let turn = self
                .llm
                .chat_completion(&self.config.default_model, &messages, Some(&tool_defs))
                .await?;

            let mut requests = turn.tool_calls.into_iter();
            let Some(call) = requests.next() else {
                return turn.content.ok_or(AgentError::EmptyResponse);
            };

            let (assistant, tool_result, _) = self
                .execute_call(run_id, turn.content, call, requests.len())
                .await;
            messages.push(assistant);
            messages.push(tool_result);
        }

        Err(AgentError::StepBudgetExceeded {
            limit: self.config.max_iterations,
        })
    }

    /// Run one session, forwarding partial tokens and tool outputs onto `tx`
    /// as they happen. A closed channel (client disconnect) aborts the run.
    pub async fn run_streaming(
        &self,
        message: &str,
        tx: mpsc::Sender<AgentEvent>,
    ) -> Result<String, AgentError> {
        let run_id = Uuid::new_v4();
        let mut messages = self.seed_transcript(message);
        let tool_defs = self.tools.tool_defs();

        for iteration in 0..self.config.max_iterations {
            tracing::debug!(%run_id, iteration = iteration + 1, "agent iteration (streaming)");

            let mut stream = self
                .llm
                .chat_completion_stream(&self.config.default_model, &messages, Some(&tool_defs))
                .await?;

            let mut content = String::new();
            let mut calls = ToolCallAccumulator::new();

            while let Some(delta) = stream.next().await {
                match delta? {
                    StreamDelta::Token(fragment) => {
                        content.push_str(&fragment);
                        tx.send(AgentEvent::Token { content: fragment })
                            .await
                            .map_err(|_| AgentError::ChannelClosed)?;
                    }
                    StreamDelta::ToolCalls(deltas) => {
                        for delta in deltas {
                            calls.push(delta);
                        }
                    }
                }
            }

            let content = if content.is_empty() { None } else { Some(content) };
            let mut requests = calls.finish().into_iter();
            let Some(call) = requests.next() else {
                return content.ok_or(AgentError::EmptyResponse);
            };

            let (assistant, tool_result, result) = self
                .execute_call(run_id, content, call, requests.len())
                .await;
            messages.push(assistant);
            messages.push(tool_result);
            tx.send(AgentEvent::ToolOutput { content: result })
                .await
                .map_err(|_| AgentError::ChannelClosed)?;
        }

        Err(AgentError::StepBudgetExceeded {
            limit: self.config.max_iterations,
        })
    }

    fn seed_transcript(&self, message: &str) -> Vec<ChatMessage> {
        vec![
            ChatMessage::system(build_system_prompt(&self.tools)),
            ChatMessage::user(message),
        ]
    }

    /// Execute one requested tool call and build the transcript entries.
    ///
    /// Policy: one tool call per model turn. When the model requests several,
    /// only the first is recorded on the assistant message and executed; the
    /// rest (`dropped`) are discarded with a warning so the transcript stays
    /// consistent (every recorded request gets exactly one result).
    async fn execute_call(
        &self,
        run_id: Uuid,
        content: Option<String>,
        call: ToolCall,
        dropped: usize,
    ) -> (ChatMessage, ChatMessage, String) {
        if dropped > 0 {
            tracing::warn!(
                %run_id,
                dropped,
                "model requested multiple tools in one turn; executing only the first"
            );
        }

        let result = self.execute_tool_call(run_id, &call).await;
        let assistant = ChatMessage::assistant(content, Some(vec![call.clone()]));
        let tool_result = ChatMessage::tool_result(call.id, result.clone());
        (assistant, tool_result, result)
    }

    async fn execute_tool_call(&self, run_id: Uuid, call: &ToolCall) -> String {
        let args: Value = serde_json::from_str(&call.function.arguments).unwrap_or(Value::Null);

        tracing::debug!(
            %run_id,
            tool = %call.function.name,
            args = %call.function.arguments,
            "executing tool"
        );

        let result = self.tools.execute(&call.function.name, args).await;

        tracing::debug!(
            %run_id,
            tool = %call.function.name,
            result = %truncate_for_log(&result, 500),
            "tool finished"
        );

        result
    }
}

/// Truncate a string for logging purposes, never splitting a character.
fn truncate_for_log(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    let mut cut = max_len;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}... [truncated]", &s[..cut])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{
        AssistantTurn, DeltaStream, ToolCallDelta, ToolCallFunction, ToolCallFunctionDelta, ToolDef,
    };
    use crate::store::{InMemoryStudentStore, StudentStore};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Scripted model: returns canned turns in order; repeats the last one
    /// if consulted again.
    struct ScriptedLlm {
        turns: Mutex<Vec<AssistantTurn>>,
        calls: AtomicUsize,
    }

    impl ScriptedLlm {
        fn new(turns: Vec<AssistantTurn>) -> Self {
            Self {
                turns: Mutex::new(turns),
                calls: AtomicUsize::new(0),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn next_turn(&self) -> AssistantTurn {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut turns = self.turns.lock().unwrap();
            if turns.len() > 1 {
                turns.remove(0)
            } else {
                turns[0].clone()
            }
        }
    }

    #[async_trait]
    impl LlmClient for ScriptedLlm {
        async fn chat_completion(
            &self,
            _model: &str,
            _messages: &[ChatMessage],
            _tools: Option<&[ToolDef]>,
        ) -> Result<AssistantTurn, LlmError> {
            Ok(self.next_turn())
        }

        async fn chat_completion_stream(
            &self,
            _model: &str,
            _messages: &[ChatMessage],
            _tools: Option<&[ToolDef]>,
        ) -> Result<DeltaStream, LlmError> {
            let turn = self.next_turn();
            let mut deltas: Vec<Result<StreamDelta, LlmError>> = Vec::new();
            if let Some(content) = turn.content {
                // Stream the answer one word at a time.
                for (i, word) in content.split(' ').enumerate() {
                    let fragment = if i == 0 {
                        word.to_string()
                    } else {
                        format!(" {}", word)
                    };
                    deltas.push(Ok(StreamDelta::Token(fragment)));
                }
            }
            if !turn.tool_calls.is_empty() {
                let call_deltas = turn
                    .tool_calls
                    .iter()
                    .enumerate()
                    .map(|(i, c)| ToolCallDelta {
                        index: Some(i),
                        id: Some(c.id.clone()),
                        function: Some(ToolCallFunctionDelta {
                            name: c.function.name.clone(),
                            arguments: c.function.arguments.clone(),
                        }),
                    })
                    .collect();
                deltas.push(Ok(StreamDelta::ToolCalls(call_deltas)));
            }
            Ok(Box::pin(futures::stream::iter(deltas)))
        }
    }

    fn tool_call(id: &str, name: &str, args: Value) -> ToolCall {
        ToolCall {
            id: id.to_string(),
            kind: "function".to_string(),
            function: ToolCallFunction {
                name: name.to_string(),
                arguments: args.to_string(),
            },
        }
    }

    fn final_turn(text: &str) -> AssistantTurn {
        AssistantTurn {
            content: Some(text.to_string()),
            tool_calls: vec![],
        }
    }

    fn tool_turn(calls: Vec<ToolCall>) -> AssistantTurn {
        AssistantTurn {
            content: None,
            tool_calls: calls,
        }
    }

    fn agent_with(
        llm: Arc<ScriptedLlm>,
        store: Arc<dyn StudentStore>,
        max_iterations: usize,
    ) -> Agent {
        let mut config = Config::new("test-key".to_string(), "test-model".to_string());
        config.max_iterations = max_iterations;
        let tools = Arc::new(ToolRegistry::new(store).unwrap());
        Agent::new(config, llm, tools)
    }

    #[tokio::test]
    async fn direct_answer_terminates_in_one_model_call() {
        let llm = Arc::new(ScriptedLlm::new(vec![final_turn(
            "The library is open from 9:00 AM to 9:00 PM on weekdays.",
        )]));
        let agent = agent_with(llm.clone(), Arc::new(InMemoryStudentStore::new()), 8);

        let answer = agent.run("what are library hours?").await.unwrap();
        assert!(answer.contains("9:00 AM"));
        assert_eq!(llm.call_count(), 1);
    }

    #[tokio::test]
    async fn tool_request_then_answer_takes_two_model_calls() {
        let llm = Arc::new(ScriptedLlm::new(vec![
            tool_turn(vec![tool_call("call_1", "get_library_hours", json!({}))]),
            final_turn("The library is open 9 to 9 on weekdays."),
        ]));
        let agent = agent_with(llm.clone(), Arc::new(InMemoryStudentStore::new()), 8);

        let answer = agent.run("what are library hours?").await.unwrap();
        assert!(answer.contains("9 to 9"));
        assert_eq!(llm.call_count(), 2);
    }

    #[tokio::test]
    async fn add_student_scenario_persists_record() {
        let store: Arc<dyn StudentStore> = Arc::new(InMemoryStudentStore::new());
        let llm = Arc::new(ScriptedLlm::new(vec![
            tool_turn(vec![tool_call(
                "call_1",
                "add_student",
                json!({
                    "id": "23-9999",
                    "name": "Omar",
                    "department": "Data Science",
                    "email": "omar@x.edu"
                }),
            )]),
            final_turn("Omar has been added successfully."),
        ]));
        let agent = agent_with(llm, store.clone(), 8);

        let answer = agent
            .run("Add student 23-9999 named Omar in Data Science, email omar@x.edu")
            .await
            .unwrap();
        assert!(answer.contains("added"));

        let record = store.get("23-9999").await.unwrap();
        assert_eq!(record.name, "Omar");
        assert_eq!(record.department, "Data Science");
    }

    #[tokio::test]
    async fn unknown_tool_is_fed_back_not_fatal() {
        let llm = Arc::new(ScriptedLlm::new(vec![
            tool_turn(vec![tool_call("call_1", "enroll_wizard", json!({}))]),
            final_turn("I could not find that capability."),
        ]));
        let agent = agent_with(llm.clone(), Arc::new(InMemoryStudentStore::new()), 8);

        let answer = agent.run("do something strange").await.unwrap();
        assert!(answer.contains("could not find"));
        assert_eq!(llm.call_count(), 2);
    }

    #[tokio::test]
    async fn endless_tool_requests_hit_the_step_budget() {
        let llm = Arc::new(ScriptedLlm::new(vec![tool_turn(vec![tool_call(
            "call_1",
            "get_total_students",
            json!({}),
        )])]));
        let agent = agent_with(llm.clone(), Arc::new(InMemoryStudentStore::new()), 3);

        let err = agent.run("loop forever").await.unwrap_err();
        assert!(matches!(err, AgentError::StepBudgetExceeded { limit: 3 }));
        assert_eq!(llm.call_count(), 3);
    }

    #[tokio::test]
    async fn multi_call_turn_executes_only_the_first_request() {
        let store: Arc<dyn StudentStore> = Arc::new(InMemoryStudentStore::new());
        let llm = Arc::new(ScriptedLlm::new(vec![
            tool_turn(vec![
                tool_call(
                    "call_1",
                    "add_student",
                    json!({
                        "id": "23-0001",
                        "name": "First",
                        "department": "CS",
                        "email": "first@x.edu"
                    }),
                ),
                tool_call(
                    "call_2",
                    "add_student",
                    json!({
                        "id": "23-0002",
                        "name": "Second",
                        "department": "CS",
                        "email": "second@x.edu"
                    }),
                ),
            ]),
            final_turn("Done."),
        ]));
        let agent = agent_with(llm, store.clone(), 8);

        agent.run("add both students").await.unwrap();
        assert!(store.get("23-0001").await.is_ok());
        assert!(store.get("23-0002").await.is_err());
    }

    #[tokio::test]
    async fn streaming_run_forwards_tokens_and_tool_outputs_in_order() {
        let llm = Arc::new(ScriptedLlm::new(vec![
            tool_turn(vec![tool_call("call_1", "get_library_hours", json!({}))]),
            final_turn("Open 9 to 9."),
        ]));
        let agent = agent_with(llm, Arc::new(InMemoryStudentStore::new()), 8);

        let (tx, mut rx) = mpsc::channel(16);
        let answer = agent.run_streaming("library hours?", tx).await.unwrap();
        assert_eq!(answer, "Open 9 to 9.");

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }

        // One tool output, then answer tokens; concatenated tokens rebuild
        // the final answer.
        let tool_outputs: Vec<_> = events
            .iter()
            .filter(|e| matches!(e, AgentEvent::ToolOutput { .. }))
            .collect();
        assert_eq!(tool_outputs.len(), 1);

        let rebuilt: String = events
            .iter()
            .filter_map(|e| match e {
                AgentEvent::Token { content } => Some(content.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(rebuilt, "Open 9 to 9.");
    }

    #[test]
    fn log_truncation_backs_off_to_a_char_boundary() {
        // 499 ASCII bytes followed by a three-byte character straddling the
        // cut point.
        let mut s = "a".repeat(499);
        s.push('€');

        let truncated = truncate_for_log(&s, 500);
        assert_eq!(truncated, format!("{}... [truncated]", "a".repeat(499)));

        let short = truncate_for_log("Ayesha Khan", 500);
        assert_eq!(short, "Ayesha Khan");
    }

    #[tokio::test]
    async fn streaming_run_aborts_when_consumer_hangs_up() {
        let llm = Arc::new(ScriptedLlm::new(vec![final_turn("A long answer here.")]));
        let agent = agent_with(llm, Arc::new(InMemoryStudentStore::new()), 8);

        let (tx, rx) = mpsc::channel(1);
        drop(rx);

        let err = agent.run_streaming("hello", tx).await.unwrap_err();
        assert!(matches!(err, AgentError::ChannelClosed));
    }
}
