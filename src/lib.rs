//! # Campus Agent
//!
//! A campus-administration chat agent: an LLM-driven conversational layer
//! over a student roster, exposed over HTTP.
//!
//! This library provides:
//! - An HTTP API with synchronous and streaming chat endpoints
//! - A tool-based agent loop over roster CRUD, analytics, and campus FAQs
//! - An OpenAI-compatible model adapter
//!
//! ## Architecture
//!
//! The agent follows the "tools in a loop" pattern:
//! 1. Receive a message via the API
//! 2. Build a transcript with the system prompt and declared tool schemas
//! 3. Call the model; if it requests a tool, execute it and feed the result back
//! 4. Repeat until the model answers directly or the step budget is exhausted
//!
//! The streaming endpoint relays partial tokens and tool outputs to the
//! client as they happen, terminated by a single `[DONE]` frame.

pub mod agent;
pub mod api;
pub mod config;
pub mod llm;
pub mod store;
pub mod tools;

pub use config::Config;
