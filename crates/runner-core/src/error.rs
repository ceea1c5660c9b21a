// Error types for planning and node execution

use thiserror::Error;

/// Result type alias for planner operations
pub type PlanResult<T> = std::result::Result<T, PlanError>;

/// Errors raised while validating or ordering a workflow graph
#[derive(Debug, Error)]
pub enum PlanError {
    /// No node in the graph has zero incoming edges
    #[error("workflow has no trigger node")]
    NoTrigger,

    /// The graph contains a cycle
    #[error("workflow graph contains a cycle")]
    Cycle,

    /// An edge references a node id that doesn't exist
    #[error("edge references unknown node: {0}")]
    DanglingEdge(String),

    /// The graph has no nodes at all
    #[error("workflow has no nodes")]
    Empty,
}

/// Result type alias for executor operations
pub type ExecutorResult<T> = std::result::Result<T, ExecutorError>;

/// Errors raised while dispatching or running a single node
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// Config was missing a required key or had the wrong shape
    #[error("validation error: {0}")]
    Validation(String),

    /// The underlying transport failed (connection reset, DNS, etc.)
    #[error("transport error: {0}")]
    Transport(String),

    /// The request exceeded its configured timeout
    #[error("timeout error: {0}")]
    Timeout(String),

    /// No executor is registered for the node's type
    #[error("no executor registered for node type: {0}")]
    Missing(String),

    /// Anything else, propagated from a dependency
    #[error("executor error: {0}")]
    Other(#[from] anyhow::Error),
}

impl ExecutorError {
    pub fn validation(msg: impl Into<String>) -> Self {
        ExecutorError::Validation(msg.into())
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        ExecutorError::Transport(msg.into())
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        ExecutorError::Timeout(msg.into())
    }
}
