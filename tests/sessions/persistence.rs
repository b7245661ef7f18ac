use graphmind::app::DisplayRole;
use graphmind::session::WorkflowKind;
use graphmind::workflows::AgentProfile;
use serde_json::json;

use super::scripted_provider::{ScriptedProvider, adapter, call, text};
use super::{sqlite_context, temp_dir};

#[tokio::test]
async fn pending_confirmation_survives_reopen() {
    let tmp = temp_dir();
    let id = {
        let provider = ScriptedProvider::new(vec![call(
            "b1",
            "buy_stocks",
            json!({"ticker_symbol": "AAPL", "quantity": 10, "total_price": 1500}),
        )]);
        let ctx = sqlite_context(tmp.path()).await;
        let chat = ctx
            .chat_service_with(AgentProfile::StockTrader, adapter(provider, 0.3))
            .expect("chat service");
        let id = chat.start_session().await.expect("session");
        let reply = chat.submit(&id, "buy 10 apple for 1500").await.expect("submit");
        assert!(reply.is_awaiting());
        id
    };

    // a fresh process: new store handle, new provider, new ledger
    let provider = ScriptedProvider::new(vec![text("Your order is in.")]);
    let ctx = sqlite_context(tmp.path()).await;
    let chat = ctx
        .chat_service_with(AgentProfile::StockTrader, adapter(provider.clone(), 0.3))
        .expect("chat service");

    let transcript = chat.transcript(&id).await.expect("transcript");
    assert_eq!(
        transcript.pending.as_ref().map(|p| p.prompt.as_str()),
        Some("Do you want to buy 10 shares of AAPL for $1500.0? (yes/no)")
    );

    let done = chat.confirm(&id, true).await.expect("confirm");
    assert!(!done.is_awaiting());
    assert_eq!(ctx.ledger().position("AAPL"), 10);

    // the agent node before the suspension did not run again
    assert_eq!(provider.conversations().len(), 1);
    assert_eq!(provider.remaining(), 0);

    let roles: Vec<DisplayRole> = chat
        .transcript(&id)
        .await
        .expect("transcript")
        .messages
        .iter()
        .map(|m| m.role)
        .collect();
    assert_eq!(roles, vec![DisplayRole::User, DisplayRole::Agent]);
}

#[tokio::test]
async fn blog_runs_are_listed_and_deletable() {
    let tmp = temp_dir();
    let provider = ScriptedProvider::texts(&[
        "outline",
        "draft",
        r#"{"score": 7.0, "feedback": "fine"}"#,
    ]);
    let ctx = sqlite_context(tmp.path()).await;
    let blog = ctx
        .blog_service_with(adapter(provider, 0.7))
        .expect("blog service");
    let report = blog.generate("SQLite").await.expect("generate");
    assert_eq!(report.quality, "Good");

    let reopened = sqlite_context(tmp.path()).await;
    let sessions = reopened.sessions();
    assert_eq!(
        sessions.list().await.expect("list"),
        vec![report.session_id.clone()]
    );
    let record = sessions
        .load(&report.session_id)
        .await
        .expect("load")
        .expect("record present");
    assert_eq!(record.kind, WorkflowKind::Blog);

    assert!(sessions.delete(&report.session_id).await.expect("delete"));
    assert!(!sessions.delete(&report.session_id).await.expect("delete again"));
    assert!(sessions.list().await.expect("list").is_empty());
}

#[tokio::test]
async fn concurrent_submits_to_one_session_are_serialized() {
    let tmp = temp_dir();
    let provider = ScriptedProvider::texts(&["first", "second"]);
    let ctx = sqlite_context(tmp.path()).await;
    let chat = ctx
        .chat_service_with(AgentProfile::Chatbot, adapter(provider, 0.8))
        .expect("chat service");
    let id = chat.start_session().await.expect("session");

    let (a, b) = tokio::join!(chat.submit(&id, "one"), chat.submit(&id, "two"));
    a.expect("first submit");
    b.expect("second submit");

    // both turns landed; neither overwrote the other
    let transcript = chat.transcript(&id).await.expect("transcript");
    assert_eq!(transcript.messages.len(), 4);
}
