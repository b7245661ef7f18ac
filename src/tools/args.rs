use crate::error::ToolError;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Compiled argument schema for one tool.
pub struct ArgumentSchema {
    validator: jsonschema::Validator,
}

impl ArgumentSchema {
    pub fn compile(tool: &str, schema: &Value) -> anyhow::Result<Self> {
        let validator = jsonschema::validator_for(schema)
            .map_err(|e| anyhow::anyhow!("tool {tool} declares an invalid schema: {e}"))?;
        Ok(Self { validator })
    }

    /// First violation, phrased for the model.
    pub fn check(&self, tool: &str, args: &Value) -> Result<(), ToolError> {
        match self.validator.iter_errors(args).next() {
            None => Ok(()),
            Some(error) => {
                let path = error.instance_path.to_string();
                let message = if path.is_empty() {
                    error.to_string()
                } else {
                    format!("{path}: {error}")
                };
                Err(ToolError::InvalidArgument {
                    name: tool.to_string(),
                    message,
                })
            }
        }
    }
}

/// Decode checked arguments into the tool's typed struct.
pub fn parse_args<T: DeserializeOwned>(tool: &str, args: Value) -> Result<T, ToolError> {
    serde_json::from_value(args).map_err(|e| ToolError::InvalidArgument {
        name: tool.to_string(),
        message: e.to_string(),
    })
}
