use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Everything needed to pick a suspended run back up. Plain data, so it can
/// be stored with the session and resumed from another process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Continuation<S> {
    /// Node that suspended; `resume` re-enters it.
    pub node: String,
    pub state: S,
    pub payload: Value,
    /// Node executions already spent in this run.
    pub steps: usize,
}

/// State between a finished node and the next one. Lets a caller persist
/// the effects of a resumed node before the rest of the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint<S> {
    /// Node that runs next; never `END`.
    pub next: String,
    pub state: S,
    pub steps: usize,
}

/// Result of re-entering a suspended node on its own.
#[derive(Debug, Clone, PartialEq)]
pub enum Resumed<S> {
    /// The node finished the run or suspended again.
    Settled(RunOutcome<S>),
    /// The node finished and routing picked another node.
    Pending(Checkpoint<S>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome<S> {
    Completed(S),
    AwaitingInput {
        question: String,
        token: Continuation<S>,
    },
}

impl<S> RunOutcome<S> {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    /// Current state, whether finished or suspended.
    pub fn state(&self) -> &S {
        match self {
            Self::Completed(state) => state,
            Self::AwaitingInput { token, .. } => &token.state,
        }
    }

    pub fn into_state(self) -> S {
        match self {
            Self::Completed(state) => state,
            Self::AwaitingInput { token, .. } => token.state,
        }
    }
}
