use super::continuation::{Checkpoint, Continuation, Resumed, RunOutcome};
use super::node::{Node, NodeOutput};
use super::state_graph::Router;
use super::END;
use crate::error::{CompilationError, GraphError, GraphmindError};
use std::collections::HashMap;
use std::sync::Arc;

pub(super) enum Route<S> {
    Edge(String),
    Conditional {
        router: Router<S>,
        paths: HashMap<String, String>,
    },
}

enum Step<S> {
    Next(String, S),
    Done(RunOutcome<S>),
}

/// Immutable, validated graph. Built by `StateGraph::compile`.
pub struct CompiledGraph<S> {
    pub(super) nodes: HashMap<String, Arc<dyn Node<S>>>,
    pub(super) routes: HashMap<String, Route<S>>,
    pub(super) entry: String,
    pub(super) max_steps: usize,
}

impl<S> std::fmt::Debug for CompiledGraph<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut nodes: Vec<&String> = self.nodes.keys().collect();
        nodes.sort_unstable();
        f.debug_struct("CompiledGraph")
            .field("entry", &self.entry)
            .field("nodes", &nodes)
            .field("max_steps", &self.max_steps)
            .finish()
    }
}

impl<S> CompiledGraph<S>
where
    S: Send + 'static,
{
    pub fn entry_point(&self) -> &str {
        &self.entry
    }

    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    /// Run from the entry point until `END` or a suspension.
    pub async fn invoke(&self, state: S) -> Result<RunOutcome<S>, GraphError> {
        self.drive(self.entry.clone(), state, 0).await
    }

    /// Answer a suspension. Only the suspended node runs again; nothing
    /// before it is repeated.
    pub async fn resume(
        &self,
        token: Continuation<S>,
        answer: &str,
    ) -> Result<RunOutcome<S>, GraphError> {
        match self.resume_node(token, answer).await? {
            Resumed::Settled(outcome) => Ok(outcome),
            Resumed::Pending(checkpoint) => self.proceed(checkpoint).await,
        }
    }

    /// Run only the suspended node and stop at the next routing decision.
    pub async fn resume_node(
        &self,
        token: Continuation<S>,
        answer: &str,
    ) -> Result<Resumed<S>, GraphError> {
        let Continuation {
            node: id,
            state,
            payload,
            steps,
        } = token;

        let node = self
            .nodes
            .get(&id)
            .ok_or_else(|| GraphError::ResumeMismatch { node: id.clone() })?;
        let steps = self.count_step(steps)?;
        tracing::debug!(node = %id, step = steps, "resuming node");

        let future = node
            .resume(state, payload, answer)
            .ok_or_else(|| GraphError::ResumeMismatch { node: id.clone() })?;
        let output = future.await.map_err(|source| node_failed(&id, source))?;

        Ok(match self.after(&id, output, steps)? {
            Step::Done(outcome) => Resumed::Settled(outcome),
            Step::Next(next, state) => Resumed::Pending(Checkpoint { next, state, steps }),
        })
    }

    /// Continue a run from a checkpoint left by [`Self::resume_node`].
    pub async fn proceed(&self, checkpoint: Checkpoint<S>) -> Result<RunOutcome<S>, GraphError> {
        let Checkpoint { next, state, steps } = checkpoint;
        self.drive(next, state, steps).await
    }

    async fn drive(
        &self,
        mut current: String,
        mut state: S,
        mut steps: usize,
    ) -> Result<RunOutcome<S>, GraphError> {
        loop {
            steps = self.count_step(steps)?;
            let node = self
                .nodes
                .get(&current)
                .ok_or_else(|| CompilationError::NodeNotFound(current.clone()))?;
            tracing::debug!(node = %current, step = steps, "running node");

            let output = node
                .run(state)
                .await
                .map_err(|source| node_failed(&current, source))?;

            match self.after(&current, output, steps)? {
                Step::Done(outcome) => return Ok(outcome),
                Step::Next(next, next_state) => {
                    current = next;
                    state = next_state;
                }
            }
        }
    }

    fn count_step(&self, steps: usize) -> Result<usize, GraphError> {
        if steps >= self.max_steps {
            tracing::warn!(limit = self.max_steps, "step limit reached");
            return Err(GraphError::StepLimitExceeded {
                limit: self.max_steps,
            });
        }
        Ok(steps + 1)
    }

    fn after(&self, node: &str, output: NodeOutput<S>, steps: usize) -> Result<Step<S>, GraphError> {
        match output {
            NodeOutput::Suspend {
                state,
                question,
                payload,
            } => {
                tracing::info!(node, "run suspended for input");
                Ok(Step::Done(RunOutcome::AwaitingInput {
                    question,
                    token: Continuation {
                        node: node.to_string(),
                        state,
                        payload,
                        steps,
                    },
                }))
            }
            NodeOutput::Continue(state) => {
                let next = self.next_node(node, &state)?;
                if next == END {
                    Ok(Step::Done(RunOutcome::Completed(state)))
                } else {
                    Ok(Step::Next(next, state))
                }
            }
        }
    }

    fn next_node(&self, node: &str, state: &S) -> Result<String, GraphError> {
        match self.routes.get(node) {
            Some(Route::Edge(to)) => Ok(to.clone()),
            Some(Route::Conditional { router, paths }) => {
                let key = router(state);
                paths
                    .get(&key)
                    .cloned()
                    .ok_or_else(|| GraphError::UnmappedRoute {
                        node: node.to_string(),
                        key,
                    })
            }
            None => Err(CompilationError::DanglingNode(node.to_string()).into()),
        }
    }
}

fn node_failed(node: &str, source: GraphmindError) -> GraphError {
    GraphError::NodeFailed {
        node: node.to_string(),
        source: Box::new(source),
    }
}
