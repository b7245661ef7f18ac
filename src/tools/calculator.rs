use super::args::parse_args;
use super::arithmetic::evaluate;
use super::traits::Tool;
use super::types::{ToolOutcome, ToolResult};
use crate::error::ToolError;
use serde::Deserialize;
use serde_json::json;
use std::future::Future;
use std::pin::Pin;

#[derive(Deserialize)]
struct CalculatorArgs {
    expression: String,
}

/// Arithmetic over numbers, `+ - * /` and parentheses. Nothing else runs.
pub struct CalculatorTool;

impl CalculatorTool {
    pub const NAME: &'static str = "calculator_tool";

    /// Render whole results without a trailing `.0`.
    fn format(value: f64) -> String {
        if value.fract() == 0.0 && value.abs() < 1e15 {
            format!("{value:.0}")
        } else {
            value.to_string()
        }
    }
}

impl Tool for CalculatorTool {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Evaluate a basic arithmetic expression. Supports +, -, *, / and parentheses."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "expression": {
                    "type": "string",
                    "description": "Arithmetic expression, e.g. \"(2 + 3) * 4\""
                }
            },
            "required": ["expression"]
        })
    }

    fn execute<'a>(
        &'a self,
        args: serde_json::Value,
    ) -> Pin<Box<dyn Future<Output = Result<ToolOutcome, ToolError>> + Send + 'a>> {
        Box::pin(async move {
            let args: CalculatorArgs = parse_args(Self::NAME, args)?;
            let result = match evaluate(&args.expression) {
                Ok(value) => ToolResult::ok(Self::format(value)),
                Err(e) => ToolResult::failure(format!("Error: {e}")),
            };
            Ok(result.into())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn run(expression: &str) -> ToolResult {
        match CalculatorTool
            .execute(json!({"expression": expression}))
            .await
            .unwrap()
        {
            ToolOutcome::Complete(result) => result,
            ToolOutcome::Suspend(_) => panic!("calculator never suspends"),
        }
    }

    #[tokio::test]
    async fn evaluates_expressions() {
        assert_eq!(run("2 + 3 * 4").await.content(), "14");
        assert_eq!(run("7 / 2").await.content(), "3.5");
        assert_eq!(run("-(4 - 10)").await.content(), "6");
    }

    #[tokio::test]
    async fn injection_attempt_is_error_text() {
        let result = run("__import__('os').system('ls')").await;
        assert!(!result.success);
        assert!(result.content().starts_with("Error: invalid character"));
    }

    #[tokio::test]
    async fn division_by_zero_is_error_text() {
        let result = run("1 / 0").await;
        assert!(!result.success);
        assert_eq!(result.content(), "Error: division by zero");
    }

    #[test]
    fn spec_names_the_expression_argument() {
        let spec = CalculatorTool.spec();
        assert_eq!(spec.name, "calculator_tool");
        assert_eq!(spec.parameters["required"][0], "expression");
    }
}
