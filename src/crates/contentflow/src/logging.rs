//! Structured workflow logging.
//!
//! Each workflow instance carries a [`WorkflowLogger`] handle constructed
//! with its name; every event it emits is tagged with the workflow (and,
//! where relevant, step) so log lines from nested workflow runs remain
//! attributable. The handle emits plain `tracing` events and never installs
//! or mutates a global subscriber.
//!
//! Binary callers that want output installed call [`init`] once with the
//! configured level and format.

use serde_json::Value;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::{LogFormat, LoggingConfig};

/// Per-workflow logging handle.
#[derive(Clone, Debug)]
pub struct WorkflowLogger {
    workflow: String,
}

impl WorkflowLogger {
    /// Create a handle tagged with the given workflow name.
    pub fn new(workflow: impl Into<String>) -> Self {
        Self {
            workflow: workflow.into(),
        }
    }

    /// The workflow this handle is tagged with.
    pub fn workflow(&self) -> &str {
        &self.workflow
    }

    pub fn workflow_start(&self) {
        info!(workflow = %self.workflow, "workflow started");
    }

    pub fn workflow_complete(&self) {
        info!(workflow = %self.workflow, "workflow completed");
    }

    pub fn step(&self, step: &str) {
        debug!(workflow = %self.workflow, step, "step");
    }

    /// Step event carrying structured context.
    pub fn step_data(&self, step: &str, data: &Value) {
        debug!(workflow = %self.workflow, step, %data, "step");
    }

    pub fn step_warn(&self, step: &str, message: &str) {
        warn!(workflow = %self.workflow, step, message, "step warning");
    }

    pub fn step_error(&self, step: &str, message: &str) {
        error!(workflow = %self.workflow, step, message, "step error");
    }

    /// Retry attempt event: attempt number, upcoming delay, and the error.
    pub fn retry_attempt(&self, step: &str, attempt: u32, delay_ms: u64, message: &str) {
        warn!(
            workflow = %self.workflow,
            step,
            attempt,
            delay_ms,
            message,
            "retrying step"
        );
    }
}

/// Install a global `tracing` subscriber from the logging configuration.
///
/// Intended for binary entry points; safe to call more than once (later
/// calls are no-ops). Library code only emits events and never calls this.
pub fn init(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_str()));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let result = match config.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.try_init(),
    };
    // a subscriber may already be installed by the host application
    let _ = result;
}
