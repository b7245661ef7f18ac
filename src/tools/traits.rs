use super::types::{ToolOutcome, ToolResult, ToolSpec};
use crate::error::ToolError;
use std::future::Future;
use std::pin::Pin;

/// Core tool trait. Implement for any capability.
pub trait Tool: Send + Sync {
    /// Tool name (used in LLM function calling)
    fn name(&self) -> &str;

    /// Human-readable description
    fn description(&self) -> &str;

    /// JSON schema for parameters
    fn parameters_schema(&self) -> serde_json::Value;

    /// Execute the tool with schema-checked arguments.
    fn execute<'a>(
        &'a self,
        args: serde_json::Value,
    ) -> Pin<Box<dyn Future<Output = Result<ToolOutcome, ToolError>> + Send + 'a>>;

    /// Finish a suspended call once the human has answered.
    fn resume<'a>(
        &'a self,
        _payload: serde_json::Value,
        _answer: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<ToolResult, ToolError>> + Send + 'a>> {
        let name = self.name().to_string();
        Box::pin(async move {
            Err(ToolError::Execution {
                name,
                message: "tool does not support confirmation".into(),
            })
        })
    }

    /// Get the full spec for LLM registration
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}
