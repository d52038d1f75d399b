//! Workflow-layer error taxonomy.
//!
//! Three channels, kept deliberately distinct:
//!
//! - [`StepError`] — a single step operation's failure, tagged retryable or
//!   fatal so the retry loop can pattern-match instead of inspecting strings.
//! - [`WorkflowError`] — the normalized top-level error. Everything that
//!   escapes a workflow's `execute()` is one of these variants.
//! - `state.error` — not a type at all: a string recorded into the state by
//!   a node for data-level failures (bad input, degraded results). The run
//!   completes normally and the caller branches on the field.

use stategraph::{ChatError, GraphError};
use thiserror::Error;

use crate::config::ConfigError;

/// A single step operation's failure.
#[derive(Debug, Error)]
pub enum StepError {
    /// Transient; the retry loop may attempt the operation again.
    #[error("{0}")]
    Retryable(String),

    /// Permanent; retrying would fail identically.
    #[error("{0}")]
    Fatal(String),
}

impl StepError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, StepError::Retryable(_))
    }
}

impl From<ChatError> for StepError {
    fn from(err: ChatError) -> Self {
        if err.is_retryable() {
            StepError::Retryable(err.to_string())
        } else {
            StepError::Fatal(err.to_string())
        }
    }
}

/// Top-level workflow failure.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// A retryable step failed on every allowed attempt.
    #[error("workflow '{workflow}' step '{step}' failed after {attempts} attempts: {source}")]
    RetriesExhausted {
        workflow: String,
        step: String,
        attempts: u32,
        source: StepError,
    },

    /// A step failed with a fatal error.
    #[error("workflow '{workflow}' step '{step}' failed: {source}")]
    Step {
        workflow: String,
        step: String,
        source: StepError,
    },

    /// The graph engine itself failed (routing, node execution, step limit).
    #[error("workflow '{workflow}' execution failed: {source}")]
    Graph {
        workflow: String,
        source: GraphError,
    },

    /// Workflow state could not cross the typed/JSON boundary.
    #[error("workflow '{workflow}' state conversion failed: {source}")]
    State {
        workflow: String,
        source: serde_json::Error,
    },

    /// The supplied configuration failed validation.
    #[error("invalid configuration: {0}")]
    Configuration(#[from] ConfigError),
}
