#![allow(dead_code)]

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use graphmind::llm::{
    ContentBlock, ModelAdapter, Provider, ProviderCapabilities, ProviderMessage, ProviderResponse,
    StopReason,
};
use graphmind::tools::ToolSpec;

/// Replays canned replies and records every prompt and conversation it saw.
#[derive(Default)]
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<ProviderResponse>>,
    prompts: Mutex<Vec<String>>,
    conversations: Mutex<Vec<Vec<ProviderMessage>>>,
}

impl ScriptedProvider {
    pub fn new(replies: Vec<ProviderResponse>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            ..Self::default()
        })
    }

    pub fn texts(replies: &[&str]) -> Arc<Self> {
        Self::new(replies.iter().map(|r| text(r)).collect())
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().expect("prompts lock").clone()
    }

    pub fn conversations(&self) -> Vec<Vec<ProviderMessage>> {
        self.conversations.lock().expect("conversations lock").clone()
    }

    pub fn remaining(&self) -> usize {
        self.replies.lock().expect("replies lock").len()
    }

    fn next(&self) -> anyhow::Result<ProviderResponse> {
        self.replies
            .lock()
            .expect("replies lock")
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("script exhausted"))
    }
}

pub fn text(reply: &str) -> ProviderResponse {
    ProviderResponse::text_only(reply.to_string())
}

/// Assistant turn asking for one tool call.
pub fn call(id: &str, name: &str, input: serde_json::Value) -> ProviderResponse {
    ProviderResponse {
        content_blocks: vec![ContentBlock::ToolUse {
            id: id.to_string(),
            name: name.to_string(),
            input,
        }],
        stop_reason: Some(StopReason::ToolUse),
        ..ProviderResponse::text_only(String::new())
    }
}

pub fn adapter(provider: Arc<ScriptedProvider>, temperature: f64) -> ModelAdapter {
    ModelAdapter::new(provider, "scripted-model", temperature, Duration::from_secs(5))
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
        self.prompts.lock().expect("prompts lock").push(message.to_string());
        let reply = self.next().map(|r| r.text);
        Box::pin(async move { reply })
    }

    fn chat_with_tools<'a>(
        &'a self,
        _system_prompt: Option<&'a str>,
        messages: &'a [ProviderMessage],
        _tools: &'a [ToolSpec],
        _model: &'a str,
        _temperature: f64,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<ProviderResponse>> + Send + 'a>> {
        self.conversations
            .lock()
            .expect("conversations lock")
            .push(messages.to_vec());
        let reply = self.next();
        Box::pin(async move { reply })
    }
}
