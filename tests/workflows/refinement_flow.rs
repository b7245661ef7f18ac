use graphmind::error::{GraphError, GraphmindError, ModelError};
use graphmind::workflows::{RefinementSettings, RefinementState, blog_optimizer, build_refinement_graph};

use super::memory_context;
use super::scripted_provider::{ScriptedProvider, adapter};

#[tokio::test]
async fn cats_vs_dogs_revises_once_then_passes() {
    let provider = ScriptedProvider::texts(&[
        "1. Temperament\n2. Care\n3. Verdict",
        "Cats are independent. Dogs are loyal.",
        r#"{"score": 5.5, "feedback": "add more examples"}"#,
        "Cats nap 16 hours a day; dogs need two walks.",
        r#"{"score": 8.0, "feedback": "well supported"}"#,
    ]);
    let blog = memory_context()
        .blog_service_with(adapter(provider.clone(), 0.7))
        .expect("blog service");

    let report = blog.generate("Cats vs Dogs").await.expect("generate");

    assert!(!report.outline.is_empty());
    assert_eq!(report.draft, "Cats nap 16 hours a day; dogs need two walks.");
    assert!((report.score - 8.0).abs() < f64::EPSILON);
    assert_eq!(report.revisions, 2);
    assert_eq!(report.quality, "Excellent");

    let prompts = provider.prompts();
    assert_eq!(prompts.len(), 5);
    assert!(prompts[0].contains("Cats vs Dogs"));
    assert!(!prompts[1].contains("add more examples"));
    assert!(prompts[3].contains("add more examples"));
    assert!(prompts[3].contains("1. Temperament"));
}

#[test]
fn optimizer_threshold_is_inclusive_at_seven() {
    assert_eq!(blog_optimizer(5.5), "optimize");
    assert_eq!(blog_optimizer(6.99), "optimize");
    assert_eq!(blog_optimizer(7.0), "end");
    assert_eq!(blog_optimizer(8.0), "end");
}

#[tokio::test]
async fn stubborn_judge_stops_at_revision_budget() {
    let mut replies = vec!["outline"];
    for _ in 0..3 {
        replies.push("draft");
        replies.push(r#"{"score": 2, "feedback": "still weak"}"#);
    }
    let provider = ScriptedProvider::texts(&replies);
    let writer = adapter(provider.clone(), 0.7);
    let graph = build_refinement_graph(
        writer.clone(),
        writer.with_temperature(0.0),
        RefinementSettings::default(),
    )
    .expect("compile");

    let state = graph
        .invoke(RefinementState::new("Rust ownership"))
        .await
        .expect("run")
        .into_state();

    assert_eq!(state.revisions, 3);
    assert!((state.score - 2.0).abs() < f64::EPSILON);
    assert_eq!(provider.remaining(), 0);
}

#[tokio::test]
async fn malformed_score_is_retried_once() {
    let provider = ScriptedProvider::texts(&[
        "outline",
        "draft",
        "I'd give it a solid eight!",
        r#"{"score": 9, "feedback": "great"}"#,
    ]);
    let blog = memory_context()
        .blog_service_with(adapter(provider.clone(), 0.7))
        .expect("blog service");

    let report = blog.generate("Async Rust").await.expect("generate");
    assert!((report.score - 9.0).abs() < f64::EPSILON);
    assert_eq!(report.revisions, 1);
    assert_eq!(provider.prompts().len(), 4);
}

#[tokio::test]
async fn two_bad_scores_surface_schema_error() {
    let provider = ScriptedProvider::texts(&["outline", "draft", "no json", "still none"]);
    let blog = memory_context()
        .blog_service_with(adapter(provider, 0.7))
        .expect("blog service");

    let err = blog.generate("Tokio").await.expect_err("should fail");
    let GraphmindError::Graph(GraphError::NodeFailed { node, source }) = err else {
        panic!("unexpected error: {err}");
    };
    assert_eq!(node, "score_node");
    assert!(matches!(
        *source,
        GraphmindError::Model(ModelError::SchemaValidation { attempts: 2, .. })
    ));
}
