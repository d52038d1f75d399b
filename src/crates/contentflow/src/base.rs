//! Shared workflow machinery.
//!
//! [`WorkflowCore`] binds a workflow's name, retry policy, and logger into
//! the unit every concrete workflow composes: typed execution over the graph
//! engine ([`run`](WorkflowCore::run)), the retry loop closing over this
//! workflow's policy ([`with_retry`](WorkflowCore::with_retry)), and the
//! error-recording helper ([`handle_step_error`](WorkflowCore::handle_step_error)).
//!
//! Retry semantics: retryability is checked on **every** attempt. A
//! [`StepError::Fatal`] aborts the loop immediately; a
//! [`StepError::Retryable`] sleeps the policy's backoff delay and tries
//! again, up to `max_retries` retries after the initial attempt.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use stategraph::{CompiledGraph, RetryPolicy};

use crate::error::{StepError, WorkflowError};
use crate::logging::WorkflowLogger;

/// Name, retry policy, and logger shared by every node of one workflow.
#[derive(Clone, Debug)]
pub struct WorkflowCore {
    name: String,
    retry: RetryPolicy,
    logger: WorkflowLogger,
}

impl WorkflowCore {
    pub fn new(name: impl Into<String>, retry: RetryPolicy) -> Self {
        let name = name.into();
        let logger = WorkflowLogger::new(name.clone());
        Self {
            name,
            retry,
            logger,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn logger(&self) -> &WorkflowLogger {
        &self.logger
    }

    /// Execute the compiled graph with a typed state.
    ///
    /// Serializes the input, walks the graph, and deserializes the final
    /// state. Engine and conversion failures map onto [`WorkflowError`];
    /// data-level failures come back as a populated `error` field on the
    /// returned state instead.
    pub async fn run<TState>(
        &self,
        graph: &CompiledGraph,
        input: TState,
    ) -> Result<TState, WorkflowError>
    where
        TState: Serialize + DeserializeOwned,
    {
        self.logger.workflow_start();
        let state = serde_json::to_value(input).map_err(|e| WorkflowError::State {
            workflow: self.name.clone(),
            source: e,
        })?;
        let result = graph.invoke(state).await.map_err(|e| WorkflowError::Graph {
            workflow: self.name.clone(),
            source: e,
        })?;
        let output = serde_json::from_value(result).map_err(|e| WorkflowError::State {
            workflow: self.name.clone(),
            source: e,
        })?;
        self.logger.workflow_complete();
        Ok(output)
    }

    /// Run a fallible step operation under this workflow's retry policy.
    ///
    /// Each retry logs the attempt number, the upcoming delay, and the error.
    pub async fn with_retry<T, F, Fut>(&self, step: &str, op: F) -> Result<T, WorkflowError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T, StepError>>,
    {
        let mut attempt: u32 = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err @ StepError::Fatal(_)) => {
                    self.logger.step_error(step, &err.to_string());
                    return Err(WorkflowError::Step {
                        workflow: self.name.clone(),
                        step: step.to_string(),
                        source: err,
                    });
                }
                Err(err @ StepError::Retryable(_)) => {
                    if !self.retry.should_retry(attempt) {
                        self.logger.step_error(step, &err.to_string());
                        return Err(WorkflowError::RetriesExhausted {
                            workflow: self.name.clone(),
                            step: step.to_string(),
                            attempts: attempt + 1,
                            source: err,
                        });
                    }
                    let delay = self.retry.delay_for(attempt);
                    self.logger.retry_attempt(
                        step,
                        attempt + 1,
                        delay.as_millis() as u64,
                        &err.to_string(),
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Record a step failure into the state's non-throwing error channel.
    ///
    /// Returns the partial update `{"error": "Error in <step>: <message>"}`.
    pub fn handle_step_error(&self, step: &str, err: &dyn std::fmt::Display) -> Value {
        let message = format!("Error in {step}: {err}");
        self.logger.step_error(step, &message);
        json!({ "error": message })
    }
}

async fn sleep(delay: Duration) {
    tokio::time::sleep(delay).await;
}

/// Whether a node recorded a failure earlier in the run.
///
/// Every node's first action is to pass the state through unchanged when
/// this returns true, so a soft failure short-circuits the remaining
/// pipeline without throwing.
pub(crate) fn error_is_set(state: &Value) -> bool {
    state.get("error").is_some_and(|e| !e.is_null())
}

/// Strip a surrounding markdown code fence from a model reply.
///
/// Models frequently wrap JSON replies in ```` ```json ```` fences despite
/// being asked not to; the payload inside is otherwise usable.
pub(crate) fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let inner = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```JSON"))
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    inner.trim().strip_suffix("```").unwrap_or(inner).trim()
}

/// Parse a model reply as JSON, treating failure as retryable.
pub(crate) fn parse_json_reply<T: DeserializeOwned>(raw: &str) -> Result<T, StepError> {
    serde_json::from_str(strip_code_fences(raw))
        .map_err(|e| StepError::Retryable(format!("failed to parse model reply as JSON: {e}")))
}
