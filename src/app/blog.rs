//! One-shot blog generation on top of the refinement graph.

use crate::error::{GraphmindError, Result};
use crate::graph::{CompiledGraph, RunOutcome};
use crate::session::{SessionManager, SessionRecord, WorkflowKind, new_session_id};
use crate::workflows::RefinementState;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::sync::Arc;

/// Label shown next to the final score.
pub fn quality_label(score: f64) -> &'static str {
    if score >= 8.0 {
        "Excellent"
    } else if score >= 7.0 {
        "Good"
    } else {
        "Needs Improvement"
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlogReport {
    pub session_id: String,
    pub topic: String,
    pub outline: String,
    pub draft: String,
    pub score: f64,
    pub feedback: String,
    pub revisions: u32,
    pub quality: String,
}

impl BlogReport {
    fn from_state(session_id: String, state: RefinementState) -> Self {
        Self {
            session_id,
            quality: quality_label(state.score).to_string(),
            topic: state.topic,
            outline: state.outline,
            draft: state.draft,
            score: state.score,
            feedback: state.feedback,
            revisions: state.revisions,
        }
    }

    pub fn from_record(record: SessionRecord) -> Result<Self> {
        let state: RefinementState = serde_json::from_value(record.state)
            .map_err(|e| GraphmindError::Other(e.into()))?;
        Ok(Self::from_state(record.id, state))
    }

    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "# {}\n", self.topic);
        let _ = writeln!(
            out,
            "**Score:** {:.1}/10 ({}) after {} draft(s)\n",
            self.score, self.quality, self.revisions
        );
        let _ = writeln!(out, "## Outline\n\n{}\n", self.outline.trim());
        let _ = writeln!(out, "## Blog\n\n{}\n", self.draft.trim());
        if !self.feedback.trim().is_empty() {
            let _ = writeln!(out, "## Judge feedback\n\n{}", self.feedback.trim());
        }
        out
    }
}

pub struct BlogService {
    graph: CompiledGraph<RefinementState>,
    sessions: Arc<SessionManager>,
}

impl BlogService {
    pub fn new(graph: CompiledGraph<RefinementState>, sessions: Arc<SessionManager>) -> Self {
        Self { graph, sessions }
    }

    /// Outline, draft and score `topic` until it passes or the revision
    /// budget runs out. The finished run is stored as a `blog` session.
    pub async fn generate(&self, topic: &str) -> Result<BlogReport> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(GraphmindError::Other(anyhow::anyhow!("topic is empty")));
        }

        let session_id = new_session_id();
        tracing::info!(session_id = %session_id, topic, "blog generation started");

        let state = match self.graph.invoke(RefinementState::new(topic)).await? {
            RunOutcome::Completed(state) => state,
            RunOutcome::AwaitingInput { token, .. } => {
                return Err(GraphmindError::Other(anyhow::anyhow!(
                    "refinement unexpectedly suspended at {}",
                    token.node
                )));
            }
        };

        let state_json = serde_json::to_value(&state).map_err(|e| GraphmindError::Other(e.into()))?;
        let record = SessionRecord::new(&session_id, WorkflowKind::Blog, state_json);
        self.sessions.save(&record).await?;

        let report = BlogReport::from_state(session_id, state);
        tracing::info!(
            session_id = %report.session_id,
            score = report.score,
            revisions = report.revisions,
            quality = %report.quality,
            "blog generation finished"
        );
        Ok(report)
    }

    /// Rebuild the report for a stored blog session.
    pub async fn report(&self, session_id: &str) -> Result<BlogReport> {
        let record = self.sessions.require(session_id, WorkflowKind::Blog).await?;
        BlogReport::from_record(record)
    }
}
