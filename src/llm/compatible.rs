//! Generic OpenAI-compatible provider.
//! Groq, OpenAI, OpenRouter and most hosted APIs follow the same
//! `/chat/completions` format, including native function calling.

use super::openai_types::{
    ChatRequest, ChatResponse, Message, OpenAiTool, OpenAiToolCall, OpenAiToolCallFunction,
    OpenAiToolDefinition,
};
use super::{
    ContentBlock, MessageRole, ProviderMessage, ProviderResponse, StopReason, api_error,
    build_provider_client, scrub_secret_patterns,
    traits::{Provider, ProviderCapabilities},
};
use crate::tools::ToolSpec;
use anyhow::Context;
use reqwest::Client;
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;

pub struct OpenAiCompatibleProvider {
    pub(crate) name: String,
    pub(crate) base_url: String,
    pub(crate) api_key: Option<String>,
    /// Pre-computed `"Bearer <key>"` header value.
    cached_auth_header: Option<String>,
    chat_url: String,
    client: Client,
}

impl OpenAiCompatibleProvider {
    pub fn new(name: &str, base_url: &str, api_key: Option<&str>) -> Self {
        let base_url = base_url.trim_end_matches('/').to_string();
        let chat_url = if base_url.ends_with("chat/completions") {
            base_url.clone()
        } else {
            format!("{base_url}/chat/completions")
        };

        Self {
            name: name.to_string(),
            base_url,
            api_key: api_key.map(ToString::to_string),
            cached_auth_header: api_key.map(|k| format!("Bearer {k}")),
            chat_url,
            client: build_provider_client(),
        }
    }

    fn map_provider_message(provider_message: &ProviderMessage) -> Vec<Message> {
        let mut text_parts = Vec::new();
        let mut assistant_tool_calls = Vec::new();
        let mut tool_messages = Vec::new();

        for block in &provider_message.content {
            match block {
                ContentBlock::Text { text } => {
                    text_parts.push(scrub_secret_patterns(text).into_owned());
                }
                ContentBlock::ToolUse { id, name, input } => {
                    assistant_tool_calls.push(OpenAiToolCall {
                        id: id.clone(),
                        r#type: "function".to_string(),
                        function: OpenAiToolCallFunction {
                            name: name.clone(),
                            arguments: input.to_string(),
                        },
                    });
                }
                ContentBlock::ToolResult {
                    tool_use_id,
                    content,
                    is_error: _,
                } => {
                    tool_messages.push(Message {
                        role: "tool",
                        content: Some(scrub_secret_patterns(content).into_owned()),
                        tool_call_id: Some(tool_use_id.clone()),
                        tool_calls: None,
                    });
                }
            }
        }

        let text_content = if text_parts.is_empty() {
            None
        } else {
            Some(text_parts.join("\n"))
        };

        let mut messages = Vec::new();
        match provider_message.role {
            MessageRole::Assistant => {
                if text_content.is_some() || !assistant_tool_calls.is_empty() {
                    messages.push(Message {
                        role: "assistant",
                        content: text_content,
                        tool_call_id: None,
                        tool_calls: if assistant_tool_calls.is_empty() {
                            None
                        } else {
                            Some(assistant_tool_calls)
                        },
                    });
                }
            }
            MessageRole::User | MessageRole::Tool => {
                if let Some(content) = text_content {
                    messages.push(Message::text("user", content));
                }
            }
            MessageRole::System => {
                if let Some(content) = text_content {
                    messages.push(Message::text("system", content));
                }
            }
        }

        messages.extend(tool_messages);
        messages
    }

    fn build_openai_tools(tools: &[ToolSpec]) -> Option<Vec<OpenAiTool>> {
        if tools.is_empty() {
            return None;
        }
        Some(
            tools
                .iter()
                .map(|tool| OpenAiTool {
                    r#type: "function",
                    function: OpenAiToolDefinition {
                        name: tool.name.clone(),
                        description: tool.description.clone(),
                        parameters: tool.parameters.clone(),
                    },
                })
                .collect(),
        )
    }

    fn build_request(
        system_prompt: Option<&str>,
        messages: &[ProviderMessage],
        tools: &[ToolSpec],
        model: &str,
        temperature: f64,
    ) -> ChatRequest {
        let mut openai_messages = Vec::with_capacity(messages.len() + 1);

        if let Some(sys) = system_prompt {
            openai_messages.push(Message::text(
                "system",
                scrub_secret_patterns(sys).into_owned(),
            ));
        }

        for provider_message in messages {
            openai_messages.extend(Self::map_provider_message(provider_message));
        }

        ChatRequest {
            model: model.to_string(),
            messages: openai_messages,
            temperature,
            tools: Self::build_openai_tools(tools),
        }
    }

    fn map_finish_reason(finish_reason: Option<&str>) -> StopReason {
        match finish_reason {
            Some("stop") => StopReason::EndTurn,
            Some("tool_calls") => StopReason::ToolUse,
            Some("length") => StopReason::MaxTokens,
            Some(_) | None => StopReason::Error,
        }
    }

    /// Unparseable arguments pass through as a JSON string so the tool's
    /// schema check rejects them and the model sees why.
    fn parse_tool_calls(provider_name: &str, tool_calls: Option<Vec<OpenAiToolCall>>) -> Vec<ContentBlock> {
        tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tool_call| {
                let raw = tool_call.function.arguments.trim();
                let input = if raw.is_empty() {
                    Value::Object(serde_json::Map::new())
                } else {
                    serde_json::from_str(raw).unwrap_or_else(|e| {
                        tracing::warn!(
                            provider = provider_name,
                            tool = %tool_call.function.name,
                            error = %e,
                            "tool call arguments were not valid JSON"
                        );
                        Value::String(raw.to_string())
                    })
                };
                ContentBlock::ToolUse {
                    id: tool_call.id,
                    name: tool_call.function.name,
                    input,
                }
            })
            .collect()
    }

    fn finish_response(&self, chat_response: ChatResponse) -> anyhow::Result<ProviderResponse> {
        let ChatResponse {
            choices,
            usage,
            model,
        } = chat_response;
        let choice = choices
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("No response from {}", self.name))?;

        let content_blocks = Self::parse_tool_calls(&self.name, choice.message.tool_calls);
        let text = choice.message.content.unwrap_or_default();
        if text.is_empty() && content_blocks.is_empty() {
            anyhow::bail!("{} returned an empty message", self.name);
        }

        let mut response = match usage {
            Some(usage) => {
                ProviderResponse::with_usage(text, usage.prompt_tokens, usage.completion_tokens)
            }
            None => ProviderResponse::text_only(text),
        };
        response.stop_reason = Some(if content_blocks.is_empty() {
            Self::map_finish_reason(choice.finish_reason.as_deref())
        } else {
            StopReason::ToolUse
        });
        response.content_blocks = content_blocks;
        if let Some(api_model) = model {
            response = response.with_model(api_model);
        }
        Ok(response)
    }

    async fn call_api(&self, request: &ChatRequest) -> anyhow::Result<ProviderResponse> {
        let auth_header = self.cached_auth_header.as_ref().ok_or_else(|| {
            anyhow::anyhow!(
                "{} API key not set. Set GRAPHMIND_API_KEY or edit config.toml.",
                self.name
            )
        })?;

        let response = self
            .client
            .post(&self.chat_url)
            .header("Authorization", auth_header)
            .json(request)
            .send()
            .await
            .with_context(|| format!("{} chat completions request failed", self.name))?;

        if !response.status().is_success() {
            return Err(api_error(&self.name, response).await);
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .with_context(|| format!("{} chat completions JSON decode failed", self.name))?;
        self.finish_response(chat_response)
    }
}

impl Provider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities { tool_calling: true }
    }

    fn chat_with_system<'a>(
        &'a self,
        system_prompt: Option<&'a str>,
        message: &'a str,
        model: &'a str,
        temperature: f64,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send + 'a>> {
        Box::pin(async move {
            self.chat_with_system_full(system_prompt, message, model, temperature)
                .await
                .map(|response| response.text)
        })
    }

    fn chat_with_system_full<'a>(
        &'a self,
        system_prompt: Option<&'a str>,
        message: &'a str,
        model: &'a str,
        temperature: f64,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<ProviderResponse>> + Send + 'a>> {
        Box::pin(async move {
            let messages = [ProviderMessage::user(message)];
            let request = Self::build_request(system_prompt, &messages, &[], model, temperature);
            self.call_api(&request).await
        })
    }

    fn chat_with_tools<'a>(
        &'a self,
        system_prompt: Option<&'a str>,
        messages: &'a [ProviderMessage],
        tools: &'a [ToolSpec],
        model: &'a str,
        temperature: f64,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<ProviderResponse>> + Send + 'a>> {
        Box::pin(async move {
            let request = Self::build_request(system_prompt, messages, tools, model, temperature);
            self.call_api(&request).await
        })
    }
}
