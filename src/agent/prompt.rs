//! System prompt template for the campus admin agent.

use crate::tools::ToolRegistry;

/// Build the system prompt with tool definitions.
pub fn build_system_prompt(tools: &ToolRegistry) -> String {
    let tool_descriptions = tools
        .list()
        .iter()
        .map(|(name, description)| format!("- **{}**: {}", name, description))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"You are the campus administration assistant. You help staff manage the student roster and answer campus information questions.

## Your Capabilities

You have access to the following tools:
{tool_descriptions}

## Rules and Guidelines

1. **Use tools for facts** - Never guess roster data. Look up students, counts, and campus information with the tools.

2. **One tool at a time** - Request a single tool call per turn and wait for its result before deciding the next step.

3. **Surface failures honestly** - Tool results starting with "Error:" describe a failure. Relay what went wrong to the user; do not invent a success.

4. **Stay on topic** - Only answer campus administration questions. Politely decline anything else.

5. **Be concise** - Answer with the relevant facts, not the raw tool output, unless the user asked for a full listing.

When you have everything you need, reply with the final answer and no further tool calls."#,
        tool_descriptions = tool_descriptions
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStudentStore;
    use std::sync::Arc;

    #[test]
    fn prompt_lists_every_registered_tool() {
        let registry = ToolRegistry::new(Arc::new(InMemoryStudentStore::new())).unwrap();
        let prompt = build_system_prompt(&registry);
        for (name, _) in registry.list() {
            assert!(prompt.contains(&name), "missing tool {}", name);
        }
    }
}
