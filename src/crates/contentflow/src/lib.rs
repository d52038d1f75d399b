//! Content workflows over the `stategraph` engine.
//!
//! Three pipelines for turning raw transcripts and notes into publishable
//! content:
//!
//! - [`TranscriptAnalysisWorkflow`] — summary, key points, scored tags, and
//!   sentiment for a single transcript.
//! - [`ContentGenerationWorkflow`] — templated content (thread, carousel,
//!   newsletter, blog, video script) from analyzed transcripts.
//! - [`MultiSourceWorkflow`] — analyze, combine, and generate across
//!   heterogeneous sources.
//!
//! [`WorkflowOrchestrator`] wraps all three behind one configurable entry
//! point. Workflows report data-level failures through the `error` field of
//! their returned state; `Err` from `execute` is reserved for engine,
//! serialization, and configuration problems.

pub mod base;
pub mod config;
pub mod content_generation;
pub mod error;
pub mod logging;
pub mod multi_source;
pub mod orchestrator;
pub mod provider;
pub mod testing;
pub mod transcript_analysis;

pub use config::{
    ApiKeys, ConfigError, ConfigOverrides, LogFormat, LoggingConfig, LogLevel, ModelSettings,
    Provider, TemperatureSettings, TokenSettings, WorkflowConfig,
};
pub use content_generation::{
    ContentBody, ContentGenerationState, ContentGenerationWorkflow, GeneratedContent, Template,
    TemplateType, TranscriptInput, TranscriptSummary,
};
pub use error::{StepError, WorkflowError};
pub use multi_source::{
    CombineStrategy, FinalOutput, MultiSourceState, MultiSourceWorkflow, ProcessedSource,
    ProcessingOptions, Source, SourceType,
};
pub use orchestrator::WorkflowOrchestrator;
pub use provider::{Phase, PhaseModel};
pub use transcript_analysis::{Analysis, TranscriptAnalysisState, TranscriptAnalysisWorkflow};
