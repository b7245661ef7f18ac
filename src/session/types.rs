use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Which workflow a session snapshot belongs to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum WorkflowKind {
    Chatbot,
    Stocks,
    Blog,
}

/// A yes/no question the session is blocked on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingConfirmation {
    pub prompt: String,
    pub awaiting: bool,
}

impl PendingConfirmation {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            awaiting: true,
        }
    }
}

/// One persisted workflow snapshot, keyed by session id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: String,
    pub kind: WorkflowKind,
    /// Serialized workflow state.
    pub state: Value,
    pub pending: Option<PendingConfirmation>,
    /// Serialized graph continuation while `pending` is set.
    pub continuation: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn new(id: impl Into<String>, kind: WorkflowKind, state: Value) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            kind,
            state,
            pending: None,
            continuation: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_awaiting(&self) -> bool {
        self.pending.as_ref().is_some_and(|p| p.awaiting)
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

pub fn new_session_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_record_is_not_awaiting() {
        let mut record = SessionRecord::new("s1", WorkflowKind::Stocks, Value::Null);
        assert!(!record.is_awaiting());
        record.pending = Some(PendingConfirmation::new("Do you want to buy?"));
        assert!(record.is_awaiting());
    }

    #[test]
    fn kind_names_are_lowercase() {
        assert_eq!(WorkflowKind::Chatbot.to_string(), "chatbot");
        assert_eq!("blog".parse::<WorkflowKind>().unwrap(), WorkflowKind::Blog);
    }

    #[test]
    fn session_ids_are_unique() {
        assert_ne!(new_session_id(), new_session_id());
    }
}
