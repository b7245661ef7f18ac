//! Schema-checked JSON replies.

use serde::de::DeserializeOwned;
use serde_json::Value;

/// A reply type the model must produce as a JSON object.
pub trait StructuredOutput: DeserializeOwned + Send {
    /// JSON schema shown to the model. Replies are checked against it before
    /// decoding.
    fn schema() -> Value;

    /// Checks the schema cannot express.
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

/// Locate the JSON object in a model reply: a ```json fence if present,
/// otherwise the outermost `{ ... }` span.
pub fn extract_json_object(reply: &str) -> Option<&str> {
    if let Some(fence_start) = reply.find("```") {
        let after_fence = &reply[fence_start + 3..];
        let body_start = after_fence.find('\n').map_or(0, |i| i + 1);
        let body = &after_fence[body_start..];
        if let Some(fence_end) = body.find("```") {
            let candidate = body[..fence_end].trim();
            if candidate.starts_with('{') {
                return Some(candidate);
            }
        }
    }

    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    (end > start).then(|| &reply[start..=end])
}

/// Decode and validate one reply; the error names the violation.
pub fn parse_structured<T: StructuredOutput>(reply: &str) -> Result<T, String> {
    let json = extract_json_object(reply).ok_or_else(|| "reply contained no JSON object".to_string())?;
    let value: Value = serde_json::from_str(json).map_err(|e| format!("invalid JSON: {e}"))?;
    check_schema(&T::schema(), &value)?;
    let parsed: T = serde_json::from_value(value).map_err(|e| format!("invalid JSON: {e}"))?;
    parsed.validate()?;
    Ok(parsed)
}

fn check_schema(schema: &Value, value: &Value) -> Result<(), String> {
    let validator =
        jsonschema::validator_for(schema).map_err(|e| format!("reply schema is invalid: {e}"))?;
    match validator.iter_errors(value).next() {
        None => Ok(()),
        Some(error) => {
            let path = error.instance_path.to_string();
            Err(if path.is_empty() {
                error.to_string()
            } else {
                format!("{path}: {error}")
            })
        }
    }
}

pub fn schema_prompt<T: StructuredOutput>(prompt: &str) -> String {
    format!(
        "{prompt}\n\nRespond with a single JSON object matching this JSON schema:\n{}\nReturn JSON only.",
        T::schema()
    )
}

pub fn corrective_prompt<T: StructuredOutput>(prompt: &str, violation: &str) -> String {
    format!(
        "{}\n\nYour previous reply was rejected: {violation}. \
         Reply again with JSON only that satisfies the schema.",
        schema_prompt::<T>(prompt)
    )
}
