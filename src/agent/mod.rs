//! Agent module - the core conversational agent logic.
//!
//! The agent follows a "tools in a loop" pattern:
//! 1. Seed the transcript with the system prompt and the user message
//! 2. Call the model with the declared tool schemas
//! 3. If the model requests a tool call, execute it and feed the result back
//! 4. Repeat until the model produces a final answer or the step budget runs out

mod agent_loop;
mod prompt;

pub use agent_loop::{Agent, AgentError, AgentEvent};
pub use prompt::build_system_prompt;
