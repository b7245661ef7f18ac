use super::args::ArgumentSchema;
use super::traits::Tool;
use super::types::{ToolOutcome, ToolResult, ToolSpec};
use crate::error::ToolError;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

struct Entry {
    tool: Arc<dyn Tool>,
    schema: ArgumentSchema,
}

/// Fixed name → handler map with argument checks in front of every call.
///
/// Dispatch never fails: unknown names, rejected arguments and tool errors
/// all come back as failed [`ToolResult`]s so the conversation can carry on.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Entry>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> anyhow::Result<()> {
        let name = tool.name().to_string();
        let schema = ArgumentSchema::compile(&name, &tool.parameters_schema())?;
        self.tools.insert(name, Entry { tool, schema });
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name).map(|entry| &entry.tool)
    }

    /// Return sorted list of registered tool names.
    pub fn tool_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Specs for every tool, ordered by name.
    pub fn specs(&self) -> Vec<ToolSpec> {
        self.tool_names()
            .into_iter()
            .filter_map(|name| self.tools.get(name))
            .map(|entry| entry.tool.spec())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    fn lookup(&self, name: &str) -> Result<&Entry, ToolError> {
        self.tools.get(name).ok_or_else(|| ToolError::UnknownTool {
            name: name.to_string(),
        })
    }

    async fn try_execute(&self, name: &str, args: Value) -> Result<ToolOutcome, ToolError> {
        let entry = self.lookup(name)?;
        entry.schema.check(name, &args)?;
        entry.tool.execute(args).await
    }

    /// Check arguments and run the named tool.
    pub async fn execute(&self, name: &str, args: Value) -> ToolOutcome {
        match self.try_execute(name, args).await {
            Ok(outcome) => outcome,
            Err(error) => {
                tracing::warn!(tool = name, error = %error, "tool call failed");
                ToolOutcome::Complete(error_result(&error))
            }
        }
    }

    /// Finish a suspended call with the human's answer.
    pub async fn resume(&self, name: &str, payload: Value, answer: &str) -> ToolResult {
        let result = match self.lookup(name) {
            Ok(entry) => entry.tool.resume(payload, answer).await,
            Err(error) => Err(error),
        };
        result.unwrap_or_else(|error| {
            tracing::warn!(tool = name, error = %error, "tool resume failed");
            error_result(&error)
        })
    }
}

fn error_result(error: &ToolError) -> ToolResult {
    ToolResult::failure(format!("Error: {error}"))
}
