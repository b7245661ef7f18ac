use super::traits::Tool;
use super::types::{ToolOutcome, ToolResult};
use crate::error::ToolError;
use serde_json::json;
use std::future::Future;
use std::pin::Pin;

pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Current local date and time.
///
/// The chatbot knows this tool as `get_date_time`; the stock agent uses
/// `get_current_datetime`.
pub struct DateTimeTool {
    name: &'static str,
}

impl DateTimeTool {
    pub const NAME: &'static str = "get_date_time";
    pub const STOCK_NAME: &'static str = "get_current_datetime";

    pub fn new() -> Self {
        Self { name: Self::NAME }
    }

    pub fn named(name: &'static str) -> Self {
        Self { name }
    }

    pub fn now() -> String {
        chrono::Local::now().format(DATETIME_FORMAT).to_string()
    }
}

impl Default for DateTimeTool {
    fn default() -> Self {
        Self::new()
    }
}

impl Tool for DateTimeTool {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        "Get the current date and time as YYYY-MM-DD HH:MM:SS."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({"type": "object", "properties": {}})
    }

    fn execute<'a>(
        &'a self,
        _args: serde_json::Value,
    ) -> Pin<Box<dyn Future<Output = Result<ToolOutcome, ToolError>> + Send + 'a>> {
        Box::pin(async move { Ok(ToolResult::ok(Self::now()).into()) })
    }
}
