#[path = "support/scripted_provider.rs"]
mod scripted_provider;

#[path = "workflows/chat_flow.rs"]
mod chat_flow;
#[path = "workflows/refinement_flow.rs"]
mod refinement_flow;

use std::sync::Arc;

use graphmind::Config;
use graphmind::app::AppContext;
use graphmind::session::{InMemorySessionStore, SessionManager};

pub(crate) fn memory_context() -> AppContext {
    let sessions = Arc::new(SessionManager::new(Arc::new(InMemorySessionStore::new())));
    AppContext::with_sessions(Arc::new(Config::default()), sessions)
}
