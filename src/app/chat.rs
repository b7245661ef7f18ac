//! Conversational sessions: submit text, answer confirmations, read back.

use crate::error::{GraphmindError, Result, SessionError};
use crate::graph::{CompiledGraph, Continuation, Resumed, RunOutcome};
use crate::llm::{MessageRole, ProviderMessage};
use crate::session::{
    PendingConfirmation, SessionManager, SessionRecord, WorkflowKind, new_session_id,
};
use crate::workflows::{AgentProfile, ConversationState};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DisplayRole {
    User,
    Agent,
}

/// One line of the visible transcript. Tool traffic is not shown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayMessage {
    pub role: DisplayRole,
    pub content: String,
}

impl DisplayMessage {
    fn from_provider(message: &ProviderMessage) -> Option<Self> {
        let role = match message.role {
            MessageRole::User => DisplayRole::User,
            MessageRole::Assistant => DisplayRole::Agent,
            MessageRole::System | MessageRole::Tool => return None,
        };
        let content = message.text();
        if content.trim().is_empty() {
            return None;
        }
        Some(Self { role, content })
    }
}

/// What the surface renders after an interaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    pub session_id: String,
    /// New messages, oldest first (the whole history for `transcript`).
    pub messages: Vec<DisplayMessage>,
    /// Set while free-text input is disabled.
    pub pending: Option<PendingConfirmation>,
}

impl ChatReply {
    pub fn is_awaiting(&self) -> bool {
        self.pending.as_ref().is_some_and(|p| p.awaiting)
    }
}

pub fn workflow_kind(profile: AgentProfile) -> WorkflowKind {
    match profile {
        AgentProfile::Chatbot => WorkflowKind::Chatbot,
        AgentProfile::StockTrader => WorkflowKind::Stocks,
    }
}

fn visible(messages: &[ProviderMessage]) -> Vec<DisplayMessage> {
    messages
        .iter()
        .filter_map(DisplayMessage::from_provider)
        .collect()
}

fn to_json<T: Serialize>(value: &T) -> Result<serde_json::Value> {
    serde_json::to_value(value).map_err(|e| GraphmindError::Other(e.into()))
}

fn from_json<T: serde::de::DeserializeOwned>(value: serde_json::Value, what: &str) -> Result<T> {
    serde_json::from_value(value).map_err(|e| {
        GraphmindError::Session(SessionError::Storage(format!("corrupt {what}: {e}")))
    })
}

/// Visible history of a stored conversation, without a model at hand.
pub fn transcript_of(record: SessionRecord) -> Result<ChatReply> {
    let state: ConversationState = from_json(record.state, "conversation state")?;
    Ok(ChatReply {
        session_id: record.id,
        messages: visible(&state.messages),
        pending: record.pending,
    })
}

/// Runs one agent profile against persisted sessions.
pub struct ChatService {
    profile: AgentProfile,
    graph: CompiledGraph<ConversationState>,
    sessions: Arc<SessionManager>,
}

impl ChatService {
    pub fn new(
        profile: AgentProfile,
        graph: CompiledGraph<ConversationState>,
        sessions: Arc<SessionManager>,
    ) -> Self {
        Self {
            profile,
            graph,
            sessions,
        }
    }

    pub fn profile(&self) -> AgentProfile {
        self.profile
    }

    fn kind(&self) -> WorkflowKind {
        workflow_kind(self.profile)
    }

    /// Create an empty session and return its id.
    pub async fn start_session(&self) -> Result<String> {
        let id = new_session_id();
        let record = SessionRecord::new(&id, self.kind(), to_json(&ConversationState::new())?);
        self.sessions.save(&record).await?;
        tracing::info!(session_id = %id, profile = %self.profile, "session started");
        Ok(id)
    }

    /// Send a user message. Rejected while a confirmation is pending.
    pub async fn submit(&self, session_id: &str, text: &str) -> Result<ChatReply> {
        let text = text.trim();
        if text.is_empty() {
            return Err(GraphmindError::Other(anyhow::anyhow!("message is empty")));
        }

        let _guard = self.sessions.lock(session_id).await;
        let mut record = match self.sessions.load(session_id).await? {
            Some(record) => {
                crate::session::manager::check_kind(&record, self.kind())?;
                record
            }
            None => SessionRecord::new(session_id, self.kind(), to_json(&ConversationState::new())?),
        };
        if record.is_awaiting() {
            return Err(SessionError::AwaitingConfirmation(session_id.to_string()).into());
        }

        let mut state: ConversationState = from_json(record.state.clone(), "conversation state")?;
        let seen = state.messages.len();
        state.push_user(text);
        tracing::info!(session_id, profile = %self.profile, "user message submitted");

        let outcome = self.graph.invoke(state).await?;
        self.finish(&mut record, outcome, seen).await
    }

    /// Answer the pending yes/no question.
    pub async fn confirm(&self, session_id: &str, approve: bool) -> Result<ChatReply> {
        let _guard = self.sessions.lock(session_id).await;
        let mut record = self.sessions.require(session_id, self.kind()).await?;
        let Some(continuation) = record.continuation.clone().filter(|_| record.is_awaiting()) else {
            return Err(SessionError::NoPendingConfirmation(session_id.to_string()).into());
        };

        let token: Continuation<ConversationState> = from_json(continuation, "continuation")?;
        let seen = token.state.messages.len();
        let answer = if approve { "yes" } else { "no" };
        tracing::info!(session_id, answer, "confirmation received");

        let checkpoint = match self.graph.resume_node(token, answer).await? {
            Resumed::Settled(outcome) => return self.finish(&mut record, outcome, seen).await,
            Resumed::Pending(checkpoint) => checkpoint,
        };

        // The answered tool has acted (a trade may be booked). Store its
        // result and drop the question before the model runs again, so a
        // failed follow-up turn cannot replay the confirmation.
        record.state = to_json(&checkpoint.state)?;
        record.pending = None;
        record.continuation = None;
        record.touch();
        self.sessions.save(&record).await?;

        let outcome = self.graph.proceed(checkpoint).await?;
        self.finish(&mut record, outcome, seen).await
    }

    /// Full visible history plus any pending question.
    pub async fn transcript(&self, session_id: &str) -> Result<ChatReply> {
        let record = self.sessions.require(session_id, self.kind()).await?;
        transcript_of(record)
    }

    async fn finish(
        &self,
        record: &mut SessionRecord,
        outcome: RunOutcome<ConversationState>,
        seen: usize,
    ) -> Result<ChatReply> {
        let messages = match outcome {
            RunOutcome::Completed(state) => {
                record.state = to_json(&state)?;
                record.pending = None;
                record.continuation = None;
                visible(&state.messages[seen.min(state.messages.len())..])
            }
            RunOutcome::AwaitingInput { question, token } => {
                record.state = to_json(&token.state)?;
                record.pending = Some(PendingConfirmation::new(question));
                record.continuation = Some(to_json(&token)?);
                visible(&token.state.messages[seen.min(token.state.messages.len())..])
            }
        };
        record.touch();
        self.sessions.save(record).await?;

        Ok(ChatReply {
            session_id: record.id.clone(),
            messages,
            pending: record.pending.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ToolsConfig;
    use crate::llm::scripted::{ScriptedProvider, tool_calls};
    use crate::llm::{ModelAdapter, ProviderResponse};
    use crate::session::InMemorySessionStore;
    use crate::tools::{PaperLedger, market_data, stock_tools};
    use crate::workflows::{STOCK_SYSTEM_PROMPT, build_conversation_graph};
    use serde_json::json;
    use std::time::Duration;

    fn service(provider: Arc<ScriptedProvider>, ledger: Arc<PaperLedger>) -> ChatService {
        let sessions = Arc::new(SessionManager::new(Arc::new(InMemorySessionStore::new())));
        service_on(provider, ledger, sessions)
    }

    fn service_on(
        provider: Arc<ScriptedProvider>,
        ledger: Arc<PaperLedger>,
        sessions: Arc<SessionManager>,
    ) -> ChatService {
        let model = ModelAdapter::new(provider, "test", 0.3, Duration::from_secs(5));
        let tools = stock_tools(market_data(&ToolsConfig::default()), ledger).unwrap();
        let graph =
            build_conversation_graph(model, Some(STOCK_SYSTEM_PROMPT.into()), Arc::new(tools), 25)
                .unwrap();
        ChatService::new(AgentProfile::StockTrader, graph, sessions)
    }

    fn buy_call() -> ProviderResponse {
        tool_calls(&[(
            "b1",
            "buy_stocks",
            json!({"ticker_symbol": "NVDA", "quantity": 5, "total_price": 600.25}),
        )])
    }

    #[tokio::test]
    async fn free_text_is_blocked_until_confirmed() {
        let ledger = Arc::new(PaperLedger::new());
        let provider = Arc::new(ScriptedProvider::new(vec![
            buy_call(),
            ProviderResponse::text_only("Bought.".into()),
        ]));
        let chat = service(provider, ledger.clone());
        let id = chat.start_session().await.unwrap();

        let reply = chat.submit(&id, "buy 5 nvda").await.unwrap();
        assert!(reply.is_awaiting());
        assert_eq!(
            reply.pending.as_ref().unwrap().prompt,
            "Do you want to buy 5 shares of NVDA for $600.25? (yes/no)"
        );
        assert_eq!(reply.messages[0].content, "buy 5 nvda");

        let blocked = chat.submit(&id, "hello?").await.unwrap_err();
        assert!(matches!(
            blocked,
            GraphmindError::Session(SessionError::AwaitingConfirmation(_))
        ));

        let done = chat.confirm(&id, true).await.unwrap();
        assert!(!done.is_awaiting());
        assert_eq!(done.messages.last().unwrap().content, "Bought.");
        assert_eq!(ledger.position("NVDA"), 5);

        let transcript = chat.transcript(&id).await.unwrap();
        let roles: Vec<DisplayRole> = transcript.messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![DisplayRole::User, DisplayRole::Agent]);
        assert!(transcript.pending.is_none());
    }

    #[tokio::test]
    async fn failed_turn_after_confirmation_books_trade_once() {
        let ledger = Arc::new(PaperLedger::new());
        let sessions = Arc::new(SessionManager::new(Arc::new(InMemorySessionStore::new())));
        // only the tool call is scripted: the turn after the trade fails
        let provider = Arc::new(ScriptedProvider::new(vec![buy_call()]));
        let chat = service_on(provider, ledger.clone(), sessions.clone());
        let id = chat.start_session().await.unwrap();
        chat.submit(&id, "buy 5 nvda").await.unwrap();

        let err = chat.confirm(&id, true).await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(ledger.position("NVDA"), 5);

        let again = chat.confirm(&id, true).await.unwrap_err();
        assert!(matches!(
            again,
            GraphmindError::Session(SessionError::NoPendingConfirmation(_))
        ));
        assert_eq!(ledger.position("NVDA"), 5);
        assert_eq!(ledger.trades().len(), 1);
        assert!(chat.transcript(&id).await.unwrap().pending.is_none());

        // the booked trade is in history for the next turn
        let provider = Arc::new(ScriptedProvider::texts(&["Your 5 NVDA shares are booked."]));
        let chat = service_on(provider.clone(), ledger.clone(), sessions);
        let reply = chat.submit(&id, "did it go through?").await.unwrap();
        assert_eq!(
            reply.messages.last().unwrap().content,
            "Your 5 NVDA shares are booked."
        );
        let seen = crate::llm::messages_to_text(&provider.conversations.lock().unwrap()[0]);
        assert!(seen.contains("✅ You bought 5 shares of NVDA for $600.25."));
        assert_eq!(ledger.position("NVDA"), 5);
    }

    #[tokio::test]
    async fn confirm_without_pending_is_rejected() {
        let provider = Arc::new(ScriptedProvider::texts(&["Hi!"]));
        let chat = service(provider, Arc::new(PaperLedger::new()));
        let id = chat.start_session().await.unwrap();
        chat.submit(&id, "hello").await.unwrap();

        let err = chat.confirm(&id, true).await.unwrap_err();
        assert!(matches!(
            err,
            GraphmindError::Session(SessionError::NoPendingConfirmation(_))
        ));
    }

    #[tokio::test]
    async fn declining_leaves_ledger_untouched() {
        let ledger = Arc::new(PaperLedger::new());
        let provider = Arc::new(ScriptedProvider::new(vec![
            buy_call(),
            ProviderResponse::text_only("No problem, cancelled.".into()),
        ]));
        let chat = service(provider, ledger.clone());
        let reply = chat.submit("fixed-id", "buy nvda").await.unwrap();
        assert_eq!(reply.session_id, "fixed-id");

        let done = chat.confirm("fixed-id", false).await.unwrap();
        assert_eq!(done.messages.last().unwrap().content, "No problem, cancelled.");
        assert!(ledger.trades().is_empty());
    }

    #[tokio::test]
    async fn model_outage_keeps_previous_snapshot() {
        let provider = Arc::new(ScriptedProvider::texts(&["First answer."]));
        let chat = service(provider, Arc::new(PaperLedger::new()));
        let id = chat.start_session().await.unwrap();
        chat.submit(&id, "one").await.unwrap();

        // script exhausted: the provider now fails like a dropped connection
        let err = chat.submit(&id, "two").await.unwrap_err();
        assert!(err.is_retryable());

        let transcript = chat.transcript(&id).await.unwrap();
        assert_eq!(transcript.messages.len(), 2);
    }
}
