use thiserror::Error;

// ─── Top-level error hierarchy ───────────────────────────────────────────────

/// Structured error hierarchy for `graphmind`.
///
/// Each subsystem defines its own error variant. Library callers can match on
/// these to decide recovery strategy; provider and loader code continues to
/// use `anyhow::Result` for ad-hoc context chains.
#[derive(Debug, Error)]
pub enum GraphmindError {
    // ── Config ───────────────────────────────────────────────────────────
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    // ── Model invocation ────────────────────────────────────────────────
    #[error("model: {0}")]
    Model(#[from] ModelError),

    // ── Tools ───────────────────────────────────────────────────────────
    #[error("tool: {0}")]
    Tool(#[from] ToolError),

    // ── Workflow graph ──────────────────────────────────────────────────
    #[error("graph: {0}")]
    Graph(#[from] GraphError),

    // ── Session ─────────────────────────────────────────────────────────
    #[error("session: {0}")]
    Session(#[from] SessionError),

    // ── Generic fallthrough (wraps anyhow for interop) ──────────────────
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl GraphmindError {
    /// Whether the user can simply try the same request again.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Model(ModelError::Unavailable { .. }) => true,
            Self::Graph(GraphError::NodeFailed { source, .. }) => source.is_retryable(),
            _ => false,
        }
    }
}

// ─── Config errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load config: {0}")]
    Load(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

// ─── Model errors ────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ModelError {
    /// Timeout or transport failure. Callers decide whether to retry.
    #[error("model {provider} unavailable: {message}")]
    Unavailable { provider: String, message: String },

    /// Structured reply did not satisfy the declared schema.
    #[error("structured output rejected after {attempts} attempt(s): {message}")]
    SchemaValidation { attempts: u32, message: String },
}

// ─── Tool errors ─────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("unknown tool: {name}")]
    UnknownTool { name: String },

    #[error("tool {name} rejected arguments: {message}")]
    InvalidArgument { name: String, message: String },

    #[error("tool {name} execution failed: {message}")]
    Execution { name: String, message: String },
}

// ─── Graph errors ────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("compilation failed: {0}")]
    Compilation(#[from] CompilationError),

    #[error("router on node {node} returned unmapped key '{key}'")]
    UnmappedRoute { node: String, key: String },

    #[error("run exceeded step limit of {limit}")]
    StepLimitExceeded { limit: usize },

    #[error("node {node} failed: {source}")]
    NodeFailed {
        node: String,
        #[source]
        source: Box<GraphmindError>,
    },

    #[error("continuation targets node {node}, which cannot resume")]
    ResumeMismatch { node: String },
}

/// Static validation failures raised by `StateGraph::compile`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompilationError {
    #[error("graph has no entry point")]
    MissingEntryPoint,

    #[error("node not found: {0}")]
    NodeNotFound(String),

    #[error("node {0} has no outgoing route")]
    DanglingNode(String),

    #[error("node {0} has more than one outgoing route")]
    DuplicateRoute(String),
}

// ─── Session errors ──────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session not found: {0}")]
    NotFound(String),

    #[error("session {0} is awaiting a yes/no confirmation")]
    AwaitingConfirmation(String),

    #[error("session {0} has no pending confirmation")]
    NoPendingConfirmation(String),

    #[error("session {id} belongs to the {actual} workflow, not {expected}")]
    WorkflowMismatch {
        id: String,
        expected: String,
        actual: String,
    },

    #[error("store: {0}")]
    Storage(String),
}

pub type Result<T, E = GraphmindError> = std::result::Result<T, E>;
