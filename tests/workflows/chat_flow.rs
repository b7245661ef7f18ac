use graphmind::app::DisplayRole;
use graphmind::error::{GraphmindError, SessionError};
use graphmind::llm::messages_to_text;
use graphmind::workflows::AgentProfile;
use serde_json::json;

use super::memory_context;
use super::scripted_provider::{ScriptedProvider, adapter, call, text};

#[tokio::test]
async fn chatbot_uses_calculator_then_answers() {
    let provider = ScriptedProvider::new(vec![
        call("c1", "calculator_tool", json!({"expression": "2 + 3 * 4"})),
        text("2 + 3 * 4 is 14."),
    ]);
    let chat = memory_context()
        .chat_service_with(AgentProfile::Chatbot, adapter(provider.clone(), 0.8))
        .expect("chat service");

    let id = chat.start_session().await.expect("session");
    let reply = chat.submit(&id, "what is 2 + 3 * 4?").await.expect("submit");

    assert!(reply.pending.is_none());
    let last = reply.messages.last().expect("agent reply");
    assert_eq!(last.role, DisplayRole::Agent);
    assert_eq!(last.content, "2 + 3 * 4 is 14.");

    let conversations = provider.conversations();
    assert_eq!(conversations.len(), 2);
    assert!(messages_to_text(&conversations[1]).contains("Tool: 14"));
}

#[tokio::test]
async fn unknown_tool_and_bad_expression_become_error_text() {
    let provider = ScriptedProvider::new(vec![
        call("c1", "launch_rocket", json!({})),
        call("c2", "calculator_tool", json!({"expression": "__import__('os')"})),
        text("Sorry, I can't do that."),
    ]);
    let chat = memory_context()
        .chat_service_with(AgentProfile::Chatbot, adapter(provider.clone(), 0.8))
        .expect("chat service");

    let reply = chat.submit("s-errors", "do something odd").await.expect("submit");
    assert_eq!(
        reply.messages.last().map(|m| m.content.as_str()),
        Some("Sorry, I can't do that.")
    );

    let conversations = provider.conversations();
    let seen = messages_to_text(&conversations[2]);
    assert!(seen.contains("Error: unknown tool: launch_rocket"));
    assert!(seen.contains("Error: invalid character"));
}

#[tokio::test]
async fn stock_trade_waits_for_confirmation() {
    let provider = ScriptedProvider::new(vec![
        call(
            "t1",
            "sell_stocks",
            json!({"ticker_symbol": "MSFT", "quantity": 2, "total_price": 800}),
        ),
        text("Done, the sale went through."),
    ]);
    let ctx = memory_context();
    let chat = ctx
        .chat_service_with(AgentProfile::StockTrader, adapter(provider.clone(), 0.3))
        .expect("chat service");

    let id = chat.start_session().await.expect("session");
    let reply = chat.submit(&id, "sell 2 msft for 800").await.expect("submit");
    let pending = reply.pending.expect("pending confirmation");
    assert_eq!(
        pending.prompt,
        "Do you want to sell 2 shares of MSFT for $800.0? (yes/no)"
    );

    let err = chat.submit(&id, "never mind").await.expect_err("input disabled");
    assert!(matches!(
        err,
        GraphmindError::Session(SessionError::AwaitingConfirmation(_))
    ));

    let done = chat.confirm(&id, true).await.expect("confirm");
    assert!(done.pending.is_none());
    assert_eq!(ctx.ledger().position("MSFT"), -2);

    let conversations = provider.conversations();
    assert!(
        messages_to_text(&conversations[1]).contains("✅ You sold 2 shares of MSFT for $800.0.")
    );
}

#[tokio::test]
async fn invalid_quantity_never_suspends() {
    let provider = ScriptedProvider::new(vec![
        call(
            "t1",
            "buy_stocks",
            json!({"ticker_symbol": "AAPL", "quantity": 0, "total_price": 100}),
        ),
        text("The quantity has to be positive."),
    ]);
    let ctx = memory_context();
    let chat = ctx
        .chat_service_with(AgentProfile::StockTrader, adapter(provider.clone(), 0.3))
        .expect("chat service");

    let reply = chat.submit("s-qty", "buy 0 apple").await.expect("submit");
    assert!(reply.pending.is_none());
    assert!(ctx.ledger().trades().is_empty());
    assert!(
        messages_to_text(&provider.conversations()[1])
            .contains("❌ Error: Quantity must be positive")
    );
}
