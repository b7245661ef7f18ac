//! Canned provider for unit tests.

use super::traits::{Provider, ProviderCapabilities};
use super::types::{ContentBlock, ProviderMessage, ProviderResponse, StopReason};
use crate::tools::ToolSpec;
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;

/// Replays queued responses in order and records what it was sent.
#[derive(Default)]
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<ProviderResponse>>,
    pub prompts: Mutex<Vec<String>>,
    pub conversations: Mutex<Vec<Vec<ProviderMessage>>>,
    pub offered_tools: Mutex<Vec<Vec<String>>>,
}

impl ScriptedProvider {
    pub fn new(replies: Vec<ProviderResponse>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            ..Self::default()
        }
    }

    pub fn texts(replies: &[&str]) -> Self {
        Self::new(
            replies
                .iter()
                .map(|text| ProviderResponse::text_only((*text).to_string()))
                .collect(),
        )
    }

    pub fn prompt_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    fn next(&self) -> anyhow::Result<ProviderResponse> {
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("script exhausted"))
    }
}

/// Assistant reply requesting the given `(id, tool, arguments)` calls.
pub fn tool_calls(calls: &[(&str, &str, serde_json::Value)]) -> ProviderResponse {
    ProviderResponse {
        content_blocks: calls
            .iter()
            .map(|(id, name, input)| ContentBlock::ToolUse {
                id: (*id).to_string(),
                name: (*name).to_string(),
                input: input.clone(),
            })
            .collect(),
        stop_reason: Some(StopReason::ToolUse),
        ..ProviderResponse::text_only(String::new())
    }
}

impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities { tool_calling: true }
    }

    fn chat_with_system<'a>(
        &'a self,
        _system_prompt: Option<&'a str>,
        message: &'a str,
        _model: &'a str,
        _temperature: f64,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send + 'a>> {
        self.prompts.lock().unwrap().push(message.to_string());
        let reply = self.next().map(|response| response.text);
        Box::pin(async move { reply })
    }

    fn chat_with_tools<'a>(
        &'a self,
        _system_prompt: Option<&'a str>,
        messages: &'a [ProviderMessage],
        tools: &'a [ToolSpec],
        _model: &'a str,
        _temperature: f64,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<ProviderResponse>> + Send + 'a>> {
        self.conversations.lock().unwrap().push(messages.to_vec());
        self.offered_tools
            .lock()
            .unwrap()
            .push(tools.iter().map(|spec| spec.name.clone()).collect());
        let reply = self.next();
        Box::pin(async move { reply })
    }
}
