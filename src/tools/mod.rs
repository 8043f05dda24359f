//! Tool registry: the closed set of operations the model may request.
//!
//! Handlers never fail across the registry boundary. Any failure path is
//! converted to a string starting with `"Error: "` so the agent loop, the
//! HTTP layer, and the model itself can inspect results by prefix.

mod analytics;
pub(crate) mod campus;
mod email;
mod students;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::llm::{ToolDef, ToolFunctionDef};
use crate::store::{StoreError, StudentStore};

/// A named, schema-declared operation the model may request.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON Schema object describing the named parameters.
    fn parameters_schema(&self) -> Value;

    /// Execute with already-parsed arguments. Domain failures (missing
    /// record, duplicate id) are returned as `Ok` error strings; `Err` is
    /// reserved for malformed arguments and is converted to an error string
    /// by the registry.
    async fn execute(&self, args: Value) -> anyhow::Result<String>;
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Duplicate tool name: {0}")]
    DuplicateName(String),

    #[error("Tool {0} declares a non-object parameter schema")]
    InvalidSchema(String),
}

/// Closed mapping from tool name to handler, validated at startup.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Build the registry over the injected student store.
    ///
    /// # Errors
    ///
    /// Fails if two tools share a name or a tool declares a parameter schema
    /// that is not a JSON Schema object.
    pub fn new(store: Arc<dyn StudentStore>) -> Result<Self, RegistryError> {
        let all: Vec<Arc<dyn Tool>> = vec![
            Arc::new(students::ListStudents::new(store.clone())),
            Arc::new(students::GetStudent::new(store.clone())),
            Arc::new(students::AddStudent::new(store.clone())),
            Arc::new(students::UpdateStudent::new(store.clone())),
            Arc::new(students::DeleteStudent::new(store.clone())),
            Arc::new(analytics::GetTotalStudents::new(store.clone())),
            Arc::new(analytics::GetStudentsByDepartment::new(store.clone())),
            Arc::new(analytics::GetRecentOnboardedStudents::new(store.clone())),
            Arc::new(analytics::GetActiveStudentsLast7Days::new(store.clone())),
            Arc::new(campus::GetCafeteriaTimings),
            Arc::new(campus::GetLibraryHours),
            Arc::new(campus::GetEventSchedule),
            Arc::new(email::SendEmail::new(store)),
        ];

        let mut tools = HashMap::new();
        for tool in all {
            let schema = tool.parameters_schema();
            if schema.get("type").and_then(Value::as_str) != Some("object") {
                return Err(RegistryError::InvalidSchema(tool.name().to_string()));
            }
            let name = tool.name().to_string();
            if tools.contains_key(&name) {
                return Err(RegistryError::DuplicateName(name));
            }
            tools.insert(name, tool);
        }

        Ok(Self { tools })
    }

    /// Execute a tool by name. Never fails: unknown names and handler errors
    /// come back as `"Error: ..."` strings.
    pub async fn execute(&self, name: &str, args: Value) -> String {
        let Some(tool) = self.tools.get(name) else {
            return format!("Error: Unknown tool '{}'.", name);
        };

        match tool.execute(args).await {
            Ok(result) => result,
            Err(e) => format!("Error: {}", e),
        }
    }

    /// Schemas for the model adapter, in deterministic order.
    pub fn tool_defs(&self) -> Vec<ToolDef> {
        let mut tools: Vec<&Arc<dyn Tool>> = self.tools.values().collect();
        tools.sort_by_key(|t| t.name().to_string());
        tools
            .into_iter()
            .map(|t| ToolDef {
                kind: "function",
                function: ToolFunctionDef {
                    name: t.name().to_string(),
                    description: t.description().to_string(),
                    parameters: t.parameters_schema(),
                },
            })
            .collect()
    }

    /// (name, description) pairs for the system prompt, sorted by name.
    pub fn list(&self) -> Vec<(String, String)> {
        let mut entries: Vec<(String, String)> = self
            .tools
            .values()
            .map(|t| (t.name().to_string(), t.description().to_string()))
            .collect();
        entries.sort();
        entries
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// Required string argument, or a malformed-arguments error.
pub(crate) fn required_str(args: &Value, key: &str) -> anyhow::Result<String> {
    args[key]
        .as_str()
        .map(|s| s.to_string())
        .ok_or_else(|| anyhow::anyhow!("Missing '{}' argument", key))
}

/// Uniform error string for store failures, matching the `Error: ` prefix
/// contract.
pub(crate) fn store_error_string(e: &StoreError) -> String {
    format!("Error: {}.", e)
}
