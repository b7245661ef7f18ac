use super::compiled::{CompiledGraph, Route};
use super::node::Node;
use super::{DEFAULT_MAX_STEPS, END};
use crate::error::CompilationError;
use std::collections::HashMap;
use std::sync::Arc;

/// Inspects the state after a node and names the path to take.
pub type Router<S> = Arc<dyn Fn(&S) -> String + Send + Sync>;

/// Graph builder. Generic over the workflow state `S`.
///
/// Every node needs exactly one outgoing route: a plain edge or a set of
/// conditional edges. Targets may be [`END`].
pub struct StateGraph<S> {
    nodes: HashMap<String, Arc<dyn Node<S>>>,
    routes: HashMap<String, Route<S>>,
    duplicates: Vec<String>,
    entry: Option<String>,
    max_steps: usize,
}

impl<S> Default for StateGraph<S>
where
    S: Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<S> StateGraph<S>
where
    S: Send + 'static,
{
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            routes: HashMap::new(),
            duplicates: Vec::new(),
            entry: None,
            max_steps: DEFAULT_MAX_STEPS,
        }
    }

    /// Adds a node. Replaces if same id.
    pub fn add_node(&mut self, id: impl Into<String>, node: impl Node<S> + 'static) -> &mut Self {
        self.nodes.insert(id.into(), Arc::new(node));
        self
    }

    /// Always go from `from` to `to` (a node id or [`END`]).
    pub fn add_edge(&mut self, from: impl Into<String>, to: impl Into<String>) -> &mut Self {
        self.set_route(from.into(), Route::Edge(to.into()));
        self
    }

    /// After `from`, call `router` and follow `path_map[key]`.
    pub fn add_conditional_edges<F, I, K, V>(
        &mut self,
        from: impl Into<String>,
        router: F,
        path_map: I,
    ) -> &mut Self
    where
        F: Fn(&S) -> String + Send + Sync + 'static,
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let paths = path_map
            .into_iter()
            .map(|(key, target)| (key.into(), target.into()))
            .collect();
        self.set_route(
            from.into(),
            Route::Conditional {
                router: Arc::new(router),
                paths,
            },
        );
        self
    }

    pub fn set_entry_point(&mut self, id: impl Into<String>) -> &mut Self {
        self.entry = Some(id.into());
        self
    }

    /// Override the per-run node execution ceiling.
    pub fn set_max_steps(&mut self, max_steps: usize) -> &mut Self {
        self.max_steps = max_steps.max(1);
        self
    }

    fn set_route(&mut self, from: String, route: Route<S>) {
        if self.routes.contains_key(&from) {
            self.duplicates.push(from.clone());
        }
        self.routes.insert(from, route);
    }

    /// Validate the wiring and freeze it into a runnable graph.
    pub fn compile(self) -> Result<CompiledGraph<S>, CompilationError> {
        let entry = self.entry.ok_or(CompilationError::MissingEntryPoint)?;
        if !self.nodes.contains_key(&entry) {
            return Err(CompilationError::NodeNotFound(entry));
        }
        if let Some(id) = self.duplicates.into_iter().next() {
            return Err(CompilationError::DuplicateRoute(id));
        }

        let mut sources: Vec<&String> = self.routes.keys().collect();
        sources.sort_unstable();
        for from in sources {
            if !self.nodes.contains_key(from) {
                return Err(CompilationError::NodeNotFound(from.clone()));
            }
            let mut targets: Vec<&String> = match &self.routes[from] {
                Route::Edge(to) => vec![to],
                Route::Conditional { paths, .. } => paths.values().collect(),
            };
            targets.sort_unstable();
            if let Some(missing) = targets
                .into_iter()
                .find(|to| to.as_str() != END && !self.nodes.contains_key(*to))
            {
                return Err(CompilationError::NodeNotFound(missing.clone()));
            }
        }

        let mut ids: Vec<&String> = self.nodes.keys().collect();
        ids.sort_unstable();
        if let Some(dangling) = ids.into_iter().find(|id| !self.routes.contains_key(*id)) {
            return Err(CompilationError::DanglingNode(dangling.clone()));
        }

        Ok(CompiledGraph {
            nodes: self.nodes,
            routes: self.routes,
            entry,
            max_steps: self.max_steps,
        })
    }
}
