use super::types::{ContentBlock, MessageRole, ProviderMessage, ProviderResponse};
use crate::tools::ToolSpec;
use std::future::Future;
use std::pin::Pin;

/// Flatten a transcript into labelled lines for providers without native
/// message arrays.
pub fn messages_to_text(messages: &[ProviderMessage]) -> String {
    messages
        .iter()
        .filter_map(|msg| {
            let role_label = match msg.role {
                MessageRole::User => "User:",
                MessageRole::Assistant => "Assistant:",
                MessageRole::System => "System:",
                MessageRole::Tool => "Tool:",
            };
            let text_parts: Vec<&str> = msg
                .content
                .iter()
                .filter_map(|block| match block {
                    ContentBlock::Text { text } => Some(text.as_str()),
                    ContentBlock::ToolResult { content, .. } => Some(content.as_str()),
                    ContentBlock::ToolUse { .. } => None,
                })
                .collect();
            if text_parts.is_empty() {
                None
            } else {
                Some(format!("{} {}", role_label, text_parts.join(" ")))
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Provider capabilities reported at runtime.
#[derive(Debug, Clone, Default)]
pub struct ProviderCapabilities {
    pub tool_calling: bool,
}

pub trait Provider: Send + Sync {
    /// Provider identifier (e.g. "groq", "ollama").
    fn name(&self) -> &str;

    /// Runtime capability flags.
    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities::default()
    }

    fn chat_with_system<'a>(
        &'a self,
        system_prompt: Option<&'a str>,
        message: &'a str,
        model: &'a str,
        temperature: f64,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send + 'a>>;

    fn chat_with_system_full<'a>(
        &'a self,
        system_prompt: Option<&'a str>,
        message: &'a str,
        model: &'a str,
        temperature: f64,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<ProviderResponse>> + Send + 'a>> {
        Box::pin(async move {
            let text = self
                .chat_with_system(system_prompt, message, model, temperature)
                .await?;
            Ok(ProviderResponse::text_only(text))
        })
    }

    fn chat_with_tools<'a>(
        &'a self,
        system_prompt: Option<&'a str>,
        messages: &'a [ProviderMessage],
        _tools: &'a [ToolSpec],
        model: &'a str,
        temperature: f64,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<ProviderResponse>> + Send + 'a>> {
        Box::pin(async move {
            let text = messages_to_text(messages);
            self.chat_with_system_full(system_prompt, &text, model, temperature)
                .await
        })
    }

    fn supports_tool_calling(&self) -> bool {
        self.capabilities().tool_calling
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_to_text_labels_roles() {
        let messages = vec![
            ProviderMessage::user("What is AAPL at?"),
            ProviderMessage::tool_result("call_1", "189.23", false),
            ProviderMessage::assistant("Apple closed at 189.23."),
        ];
        assert_eq!(
            messages_to_text(&messages),
            "User: What is AAPL at?\nTool: 189.23\nAssistant: Apple closed at 189.23."
        );
    }

    #[test]
    fn messages_to_text_skips_tool_use_blocks() {
        let messages = vec![ProviderMessage {
            role: MessageRole::Assistant,
            content: vec![ContentBlock::ToolUse {
                id: "call_1".into(),
                name: "search_web".into(),
                input: serde_json::json!({"query": "rust"}),
            }],
        }];
        assert_eq!(messages_to_text(&messages), "");
    }

    #[test]
    fn default_capabilities_are_off() {
        assert!(!ProviderCapabilities::default().tool_calling);
    }
}
