//! Tool-augmented conversation: `agent → [tools → agent]* → END`.
//!
//! The agent node asks the model for the next assistant message, offering the
//! registry's tools. When that message carries tool calls, the tools node runs
//! them in order and appends one tool message per call before handing back to
//! the agent. A tool that needs a human (trades) suspends the run; the
//! remaining calls run after the answer arrives.

use crate::error::{GraphError, GraphmindError, Result, ToolError};
use crate::graph::{CompiledGraph, END, Node, NodeFuture, NodeOutput, StateGraph};
use crate::llm::{ContentBlock, MessageRole, ModelAdapter, ProviderMessage, ToolCall};
use crate::tools::{ToolOutcome, ToolRegistry};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;

pub const AGENT_NODE: &str = "agent";
pub const TOOLS_NODE: &str = "tools";

pub const STOCK_SYSTEM_PROMPT: &str = "You are a stock market trading agent. Your goal is to help users make informed decisions about buying and selling stocks.\n\
Answer the user queries using the available tools to get stock prices, buy stocks, sell stocks, and get the current date and time.\n\
Be accurate and concise in your responses.";

/// Which conversational agent a session talks to.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AgentProfile {
    /// Web search, clock and calculator.
    Chatbot,
    /// Quotes and human-confirmed trades.
    #[serde(rename = "stocks")]
    #[strum(serialize = "stocks")]
    StockTrader,
}

impl AgentProfile {
    pub fn system_prompt(self) -> Option<&'static str> {
        match self {
            Self::Chatbot => None,
            Self::StockTrader => Some(STOCK_SYSTEM_PROMPT),
        }
    }
}

/// Append-only message history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    pub messages: Vec<ProviderMessage>,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_user(&mut self, text: impl Into<String>) {
        self.messages.push(ProviderMessage::user(text));
    }

    pub fn last_message(&self) -> Option<&ProviderMessage> {
        self.messages.last()
    }

    /// Text of the newest assistant message that says something.
    pub fn last_reply(&self) -> Option<String> {
        self.messages
            .iter()
            .rev()
            .filter(|msg| msg.role == MessageRole::Assistant)
            .map(ProviderMessage::text)
            .find(|text| !text.trim().is_empty())
    }

    /// Calls from the newest assistant message that have no tool result yet.
    pub fn unanswered_calls(&self) -> Vec<ToolCall> {
        let Some(index) = self
            .messages
            .iter()
            .rposition(|msg| msg.role == MessageRole::Assistant)
        else {
            return Vec::new();
        };

        let answered: HashSet<&str> = self.messages[index + 1..]
            .iter()
            .flat_map(|msg| msg.content.iter())
            .filter_map(|block| match block {
                ContentBlock::ToolResult { tool_use_id, .. } => Some(tool_use_id.as_str()),
                _ => None,
            })
            .collect();

        self.messages[index]
            .tool_calls()
            .into_iter()
            .filter(|call| !answered.contains(call.id.as_str()))
            .collect()
    }
}

/// Route to the tools node iff the last assistant message asked for tools.
pub fn tools_condition(state: &ConversationState) -> String {
    match state.last_message() {
        Some(msg) if msg.role == MessageRole::Assistant && msg.has_tool_calls() => {
            TOOLS_NODE.to_string()
        }
        _ => END.to_string(),
    }
}

/// Calls the model with the full history and the registry's tool specs.
pub struct AgentNode {
    model: ModelAdapter,
    system_prompt: Option<String>,
    tools: Arc<ToolRegistry>,
}

impl AgentNode {
    pub fn new(model: ModelAdapter, system_prompt: Option<String>, tools: Arc<ToolRegistry>) -> Self {
        Self {
            model,
            system_prompt,
            tools,
        }
    }
}

impl Node<ConversationState> for AgentNode {
    fn run<'a>(&'a self, mut state: ConversationState) -> NodeFuture<'a, ConversationState> {
        Box::pin(async move {
            let specs = self.tools.specs();
            let response = self
                .model
                .invoke_messages(self.system_prompt.as_deref(), &state.messages, &specs)
                .await?;
            tracing::debug!(
                node = AGENT_NODE,
                tool_calls = response.content_blocks.len(),
                tokens = response.total_tokens(),
                "agent replied"
            );
            state.messages.push(response.to_assistant_message());
            Ok(NodeOutput::Continue(state))
        })
    }
}

/// What the tools node stores while a call waits for the human.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SuspendedCall {
    call_id: String,
    tool: String,
    payload: Value,
}

/// Executes every pending tool call in order.
pub struct ToolsNode {
    tools: Arc<ToolRegistry>,
}

impl ToolsNode {
    pub fn new(tools: Arc<ToolRegistry>) -> Self {
        Self { tools }
    }

    async fn drain(&self, mut state: ConversationState) -> Result<NodeOutput<ConversationState>> {
        for call in state.unanswered_calls() {
            tracing::info!(tool = %call.name, call_id = %call.id, "executing tool call");
            match self.tools.execute(&call.name, call.arguments.clone()).await {
                ToolOutcome::Complete(result) => {
                    state.messages.push(ProviderMessage::tool_result(
                        call.id,
                        result.content(),
                        !result.success,
                    ));
                }
                ToolOutcome::Suspend(suspension) => {
                    let payload = serde_json::to_value(SuspendedCall {
                        call_id: call.id,
                        tool: call.name,
                        payload: suspension.payload,
                    })
                    .map_err(|e| GraphmindError::Other(e.into()))?;
                    return Ok(NodeOutput::Suspend {
                        state,
                        question: suspension.question,
                        payload,
                    });
                }
            }
        }
        Ok(NodeOutput::Continue(state))
    }
}

impl Node<ConversationState> for ToolsNode {
    fn run<'a>(&'a self, state: ConversationState) -> NodeFuture<'a, ConversationState> {
        Box::pin(self.drain(state))
    }

    fn resume<'a>(
        &'a self,
        mut state: ConversationState,
        payload: Value,
        answer: &'a str,
    ) -> Option<NodeFuture<'a, ConversationState>> {
        Some(Box::pin(async move {
            let suspended: SuspendedCall =
                serde_json::from_value(payload).map_err(|e| ToolError::InvalidArgument {
                    name: TOOLS_NODE.to_string(),
                    message: format!("corrupt continuation: {e}"),
                })?;
            let result = self
                .tools
                .resume(&suspended.tool, suspended.payload, answer)
                .await;
            state.messages.push(ProviderMessage::tool_result(
                suspended.call_id,
                result.content(),
                !result.success,
            ));
            self.drain(state).await
        }))
    }
}

/// Wire `agent ⇄ tools` with the given model, prompt and toolset.
pub fn build_conversation_graph(
    model: ModelAdapter,
    system_prompt: Option<String>,
    tools: Arc<ToolRegistry>,
    max_steps: usize,
) -> Result<CompiledGraph<ConversationState>> {
    let mut graph = StateGraph::new();
    graph
        .add_node(
            AGENT_NODE,
            AgentNode::new(model, system_prompt, tools.clone()),
        )
        .add_node(TOOLS_NODE, ToolsNode::new(tools))
        .add_conditional_edges(
            AGENT_NODE,
            tools_condition,
            [(TOOLS_NODE, TOOLS_NODE), (END, END)],
        )
        .add_edge(TOOLS_NODE, AGENT_NODE)
        .set_entry_point(AGENT_NODE)
        .set_max_steps(max_steps);
    graph
        .compile()
        .map_err(|e| GraphmindError::Graph(GraphError::from(e)))
}
