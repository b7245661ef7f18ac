//! Outline → draft → score, looping back to draft while the score is low.

use crate::error::{GraphError, GraphmindError, Result};
use crate::graph::{CompiledGraph, END, Node, NodeFuture, NodeOutput, StateGraph};
use crate::llm::{ModelAdapter, StructuredOutput};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

pub const OUTLINE_NODE: &str = "outline_node";
pub const DRAFT_NODE: &str = "blog_node";
pub const SCORE_NODE: &str = "score_node";

/// Drafts scoring below this go back for another pass.
pub const PASS_THRESHOLD: f64 = 7.0;

pub const OPTIMIZE: &str = "optimize";
pub const FINISH: &str = "end";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RefinementState {
    pub topic: String,
    pub outline: String,
    pub draft: String,
    pub score: f64,
    pub feedback: String,
    /// Completed draft passes.
    pub revisions: u32,
}

impl RefinementState {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RefinementSettings {
    pub threshold: f64,
    pub max_revisions: u32,
    pub max_steps: usize,
}

impl Default for RefinementSettings {
    fn default() -> Self {
        Self {
            threshold: PASS_THRESHOLD,
            max_revisions: 3,
            max_steps: crate::graph::DEFAULT_MAX_STEPS,
        }
    }
}

impl RefinementSettings {
    /// Node executions the graph may take: `max_steps`, raised to fit a run
    /// that spends the whole revision budget (one outline plus a draft and a
    /// score per revision).
    pub fn step_ceiling(&self) -> usize {
        let revisions = usize::try_from(self.max_revisions).unwrap_or(usize::MAX);
        let full_run = revisions.saturating_mul(2).saturating_add(1);
        self.max_steps.max(full_run)
    }
}

/// Judge verdict on one draft.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BlogEvaluation {
    pub score: f64,
    pub feedback: String,
}

impl StructuredOutput for BlogEvaluation {
    fn schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "score": {"type": "number", "minimum": 0, "maximum": 10},
                "feedback": {"type": "string", "description": "What needs improvement in the blog"}
            },
            "required": ["score", "feedback"]
        })
    }

    fn validate(&self) -> std::result::Result<(), String> {
        if self.feedback.trim().is_empty() {
            return Err("feedback must not be empty".into());
        }
        Ok(())
    }
}

/// `"optimize"` below 7.0, `"end"` from 7.0 up.
pub fn blog_optimizer(score: f64) -> &'static str {
    optimize_below(score, PASS_THRESHOLD)
}

pub fn optimize_below(score: f64, threshold: f64) -> &'static str {
    if score < threshold { OPTIMIZE } else { FINISH }
}

/// Router after scoring: stop once the revision budget is spent, else follow
/// the score.
pub fn route_after_score(state: &RefinementState, settings: &RefinementSettings) -> &'static str {
    if state.revisions >= settings.max_revisions {
        FINISH
    } else {
        optimize_below(state.score, settings.threshold)
    }
}

pub fn outline_prompt(topic: &str) -> String {
    format!("Create a detailed blog outline on: {topic}")
}

pub fn draft_prompt(outline: &str, feedback: &str) -> String {
    if feedback.trim().is_empty() {
        format!("Write a detailed blog based on this outline:\n\n{outline}")
    } else {
        format!(
            "Improve the blog using this feedback:\n\nFeedback:\n{feedback}\n\nBlog outline:\n{outline}\n\nRewrite the blog better."
        )
    }
}

pub fn score_prompt(outline: &str, draft: &str) -> String {
    format!(
        "Evaluate the blog based on how well it follows the outline.\n\nOutline:\n{outline}\n\nBlog:\n{draft}\n\n\
         Return JSON only:\n{{\"score\": number between 0 and 10, \"feedback\": \"how to improve\"}}"
    )
}

struct OutlineNode {
    writer: ModelAdapter,
}

impl Node<RefinementState> for OutlineNode {
    fn run<'a>(&'a self, mut state: RefinementState) -> NodeFuture<'a, RefinementState> {
        Box::pin(async move {
            state.outline = self.writer.invoke_text(&outline_prompt(&state.topic)).await?;
            tracing::info!(node = OUTLINE_NODE, topic = %state.topic, "outline written");
            Ok(NodeOutput::Continue(state))
        })
    }
}

struct DraftNode {
    writer: ModelAdapter,
}

impl Node<RefinementState> for DraftNode {
    fn run<'a>(&'a self, mut state: RefinementState) -> NodeFuture<'a, RefinementState> {
        Box::pin(async move {
            let prompt = draft_prompt(&state.outline, &state.feedback);
            state.draft = self.writer.invoke_text(&prompt).await?;
            state.revisions += 1;
            tracing::info!(node = DRAFT_NODE, revision = state.revisions, "draft written");
            Ok(NodeOutput::Continue(state))
        })
    }
}

struct ScoreNode {
    judge: ModelAdapter,
}

impl Node<RefinementState> for ScoreNode {
    fn run<'a>(&'a self, mut state: RefinementState) -> NodeFuture<'a, RefinementState> {
        Box::pin(async move {
            let verdict: BlogEvaluation = self
                .judge
                .invoke_structured(&score_prompt(&state.outline, &state.draft))
                .await?;
            tracing::info!(
                node = SCORE_NODE,
                score = verdict.score,
                revision = state.revisions,
                "draft scored"
            );
            state.score = verdict.score;
            state.feedback = verdict.feedback;
            Ok(NodeOutput::Continue(state))
        })
    }
}

/// `writer` drafts (warm temperature); `judge` scores (temperature 0).
pub fn build_refinement_graph(
    writer: ModelAdapter,
    judge: ModelAdapter,
    settings: RefinementSettings,
) -> Result<CompiledGraph<RefinementState>> {
    let mut graph = StateGraph::new();
    graph
        .add_node(
            OUTLINE_NODE,
            OutlineNode {
                writer: writer.clone(),
            },
        )
        .add_node(DRAFT_NODE, DraftNode { writer })
        .add_node(SCORE_NODE, ScoreNode { judge })
        .add_edge(OUTLINE_NODE, DRAFT_NODE)
        .add_edge(DRAFT_NODE, SCORE_NODE)
        .add_conditional_edges(
            SCORE_NODE,
            move |state: &RefinementState| route_after_score(state, &settings).to_string(),
            [(OPTIMIZE, DRAFT_NODE), (FINISH, END)],
        )
        .set_entry_point(OUTLINE_NODE)
        .set_max_steps(settings.step_ceiling());
    graph
        .compile()
        .map_err(|e| GraphmindError::Graph(GraphError::from(e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::parse_structured;
    use crate::llm::scripted::ScriptedProvider;
    use std::sync::Arc;
    use std::time::Duration;

    fn graph(provider: &Arc<ScriptedProvider>, settings: RefinementSettings) -> CompiledGraph<RefinementState> {
        let writer = ModelAdapter::new(provider.clone(), "writer", 0.7, Duration::from_secs(5));
        let judge = writer.with_temperature(0.0);
        build_refinement_graph(writer, judge, settings).unwrap()
    }

    #[test]
    fn optimizer_threshold_is_exclusive() {
        assert_eq!(blog_optimizer(6.99), "optimize");
        assert_eq!(blog_optimizer(7.0), "end");
        assert_eq!(blog_optimizer(0.0), "optimize");
        assert_eq!(blog_optimizer(10.0), "end");
    }

    #[test]
    fn draft_prompt_only_mentions_feedback_when_present() {
        let first = draft_prompt("1. Intro", "");
        assert!(first.starts_with("Write a detailed blog based on this outline:"));
        assert!(!first.contains("Feedback"));

        let second = draft_prompt("1. Intro", "add more examples");
        assert!(second.contains("Feedback:\nadd more examples"));
        assert!(second.ends_with("Rewrite the blog better."));
    }

    #[test]
    fn evaluation_bounds_are_enforced() {
        let out_of_range = parse_structured::<BlogEvaluation>(r#"{"score": 11, "feedback": "x"}"#).unwrap_err();
        assert!(out_of_range.starts_with("/score:"));
        let negative = parse_structured::<BlogEvaluation>(r#"{"score": -1, "feedback": "x"}"#).unwrap_err();
        assert!(negative.contains("minimum"));
        let blank = parse_structured::<BlogEvaluation>(r#"{"score": 5, "feedback": "  "}"#).unwrap_err();
        assert_eq!(blank, "feedback must not be empty");
        let ok = parse_structured::<BlogEvaluation>(r#"{"score": 10, "feedback": "ship it"}"#).unwrap();
        assert!((ok.score - 10.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn good_first_draft_stops_after_one_pass() {
        let provider = Arc::new(ScriptedProvider::texts(&[
            "1. Intro\n2. Body",
            "A fine blog.",
            r#"{"score": 9, "feedback": "minor polish"}"#,
        ]));
        let state = graph(&provider, RefinementSettings::default())
            .invoke(RefinementState::new("Rust"))
            .await
            .unwrap()
            .into_state();
        assert_eq!(state.revisions, 1);
        assert!((state.score - 9.0).abs() < f64::EPSILON);
        assert_eq!(provider.prompt_count(), 3);
        assert_eq!(provider.prompts.lock().unwrap()[0], "Create a detailed blog outline on: Rust");
    }

    #[tokio::test]
    async fn revision_budget_ends_a_low_scoring_loop() {
        let mut script = vec!["outline"];
        for _ in 0..3 {
            script.push("weak draft");
            script.push(r#"{"score": 2, "feedback": "try harder"}"#);
        }
        let provider = Arc::new(ScriptedProvider::texts(&script));
        let state = graph(&provider, RefinementSettings::default())
            .invoke(RefinementState::new("Anything"))
            .await
            .unwrap()
            .into_state();
        assert_eq!(state.revisions, 3);
        assert!(state.score < PASS_THRESHOLD);
        assert_eq!(provider.prompt_count(), 7);
    }

    #[test]
    fn step_ceiling_covers_the_revision_budget() {
        let settings = RefinementSettings::default();
        assert_eq!(settings.step_ceiling(), 25);
        let long = RefinementSettings {
            max_revisions: 15,
            ..RefinementSettings::default()
        };
        assert_eq!(long.step_ceiling(), 31);
    }

    #[tokio::test]
    async fn long_revision_budget_runs_to_completion() {
        let mut script = vec!["outline"];
        for _ in 0..15 {
            script.push("weak draft");
            script.push(r#"{"score": 1, "feedback": "start over"}"#);
        }
        let provider = Arc::new(ScriptedProvider::texts(&script));
        let settings = RefinementSettings {
            max_revisions: 15,
            ..RefinementSettings::default()
        };
        let state = graph(&provider, settings)
            .invoke(RefinementState::new("Anything"))
            .await
            .unwrap()
            .into_state();
        assert_eq!(state.revisions, 15);
        assert_eq!(provider.prompt_count(), 31);
    }

    #[tokio::test]
    async fn judge_failure_surfaces_as_node_error() {
        let provider = Arc::new(ScriptedProvider::texts(&[
            "outline",
            "draft",
            "I think it's about a seven.",
            "Still no JSON, sorry.",
        ]));
        let err = graph(&provider, RefinementSettings::default())
            .invoke(RefinementState::new("Anything"))
            .await
            .unwrap_err();
        match err {
            GraphError::NodeFailed { node, source } => {
                assert_eq!(node, SCORE_NODE);
                assert!(matches!(
                    *source,
                    GraphmindError::Model(crate::error::ModelError::SchemaValidation { attempts: 2, .. })
                ));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
