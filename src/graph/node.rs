use crate::error::Result;
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;

pub type NodeFuture<'a, S> = Pin<Box<dyn Future<Output = Result<NodeOutput<S>>> + Send + 'a>>;

/// What a node hands back to the runner.
#[derive(Debug)]
pub enum NodeOutput<S> {
    /// Follow this node's route with the new state.
    Continue(S),
    /// Stop the run and wait for a human answer.
    Suspend {
        state: S,
        question: String,
        payload: Value,
    },
}

/// One step in a graph: state in, state (or a suspension) out.
pub trait Node<S>: Send + Sync {
    fn run<'a>(&'a self, state: S) -> NodeFuture<'a, S>;

    /// Re-enter after a suspension. `None` for nodes that never suspend.
    fn resume<'a>(&'a self, _state: S, _payload: Value, _answer: &'a str) -> Option<NodeFuture<'a, S>> {
        None
    }
}

/// Node backed by an async closure.
pub struct FnNode<F>(F);

pub fn node_fn<S, F, Fut>(f: F) -> FnNode<F>
where
    F: Fn(S) -> Fut + Send + Sync,
    Fut: Future<Output = Result<S>> + Send + 'static,
{
    FnNode(f)
}

impl<S, F, Fut> Node<S> for FnNode<F>
where
    S: Send + 'static,
    F: Fn(S) -> Fut + Send + Sync,
    Fut: Future<Output = Result<S>> + Send + 'static,
{
    fn run<'a>(&'a self, state: S) -> NodeFuture<'a, S> {
        let fut = (self.0)(state);
        Box::pin(async move { fut.await.map(NodeOutput::Continue) })
    }
}
