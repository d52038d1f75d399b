//! Error types for graph construction, validation, and execution.
//!
//! All errors implement `std::error::Error` via the `thiserror` crate.
//! Construction mistakes (duplicate nodes, dangling edges, missing entry
//! point) surface at [`compile`](crate::StateGraph::compile) time; only
//! routing and node failures can occur during a run.

use thiserror::Error;

/// Convenience result type using [`GraphError`].
pub type Result<T> = std::result::Result<T, GraphError>;

/// Errors produced by graph building, compilation, and execution.
#[derive(Debug, Error)]
pub enum GraphError {
    /// A node name was registered twice on the same graph.
    #[error("duplicate node '{0}'")]
    DuplicateNode(String),

    /// An edge or entry point references a node that was never registered.
    #[error("unknown node '{node}' referenced by {context}")]
    UnknownNode {
        /// The unregistered node name.
        node: String,
        /// Where the reference came from (edge source, branch label, ...).
        context: String,
    },

    /// `compile()` was called before `set_entry_point()`.
    #[error("graph has no entry point")]
    NoEntryPoint,

    /// `set_entry_point()` was called more than once.
    #[error("entry point already set to '{existing}', cannot set to '{new}'")]
    EntryPointAlreadySet {
        /// The entry point registered first.
        existing: String,
        /// The rejected second registration.
        new: String,
    },

    /// A registered node cannot be reached from the entry point.
    #[error("node '{0}' is unreachable from the entry point")]
    UnreachableNode(String),

    /// A conditional selector returned a label with no mapped target.
    #[error("node '{node}' routed to unmapped label '{label}'")]
    UnroutableState {
        /// Node whose conditional edge was being evaluated.
        node: String,
        /// The label the selector returned.
        label: String,
    },

    /// A node's executor returned an error.
    #[error("node '{node}' execution failed: {error}")]
    NodeExecution {
        /// Name of the node that failed.
        node: String,
        /// Error message from the executor.
        error: String,
    },

    /// The walk exceeded the configured step limit (likely a cycle).
    #[error("graph execution exceeded step limit of {limit}")]
    StepLimitExceeded {
        /// The configured limit.
        limit: usize,
    },

    /// State could not be serialized or deserialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl GraphError {
    /// Create a node execution error with context.
    pub fn node_execution(node: impl Into<String>, error: impl Into<String>) -> Self {
        Self::NodeExecution {
            node: node.into(),
            error: error.into(),
        }
    }

    /// Create an unknown-node error with context.
    pub fn unknown_node(node: impl Into<String>, context: impl Into<String>) -> Self {
        Self::UnknownNode {
            node: node.into(),
            context: context.into(),
        }
    }
}
