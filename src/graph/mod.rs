//! Workflow graph engine.
//!
//! Build a [`StateGraph`] from named nodes, plain and conditional edges and an
//! entry point, then `compile` it into a [`CompiledGraph`]. Runs are
//! sequential: each node's output state is the next node's input. A node may
//! suspend with a question, in which case the run returns a serializable
//! [`Continuation`] that `resume` re-enters at exactly that node.

mod compiled;
mod continuation;
mod node;
mod state_graph;

pub use compiled::CompiledGraph;
pub use continuation::{Checkpoint, Continuation, Resumed, RunOutcome};
pub use node::{FnNode, Node, NodeFuture, NodeOutput, node_fn};
pub use state_graph::{Router, StateGraph};

/// Terminal marker usable as an edge target or path-map value.
pub const END: &str = "__end__";

/// Default ceiling on node executions per run.
pub const DEFAULT_MAX_STEPS: usize = 25;
