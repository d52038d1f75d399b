//! Multi-source processing workflow.
//!
//! Composes the other two pipelines: each source is (optionally) analyzed
//! with [`TranscriptAnalysisWorkflow`], the results are combined under a
//! strategy, and [`ContentGenerationWorkflow`] produces the final artifact.
//!
//! ```text
//! validateSources ─┬─ analyze ──→ analyzeSources ──→ combineSources ──→ generateOutput
//!                  └─ combine ──────────────────────────────↑
//! ```
//!
//! Per-source analysis failures are tolerated: the source is carried forward
//! without analysis and the run continues.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use stategraph::{
    ChannelType, CompiledGraph, Message, Result as GraphResult, RetryPolicy, StateGraph, END,
};

use crate::base::{error_is_set, WorkflowCore};
use crate::config::WorkflowConfig;
use crate::content_generation::{
    ContentGenerationState, ContentGenerationWorkflow, GeneratedContent, Template, TemplateType,
    TranscriptInput, TranscriptSummary,
};
use crate::error::WorkflowError;
use crate::transcript_analysis::{
    Analysis, TranscriptAnalysisState, TranscriptAnalysisWorkflow,
};

const WORKFLOW_NAME: &str = "MultiSource";

/// Characters of a non-transcript source kept as its pseudo-summary.
const PSEUDO_SUMMARY_CHARS: usize = 200;

/// Kind of input source.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Transcript,
    Note,
    Outline,
}

/// How combined content is assembled from the processed sources.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CombineStrategy {
    Merge,
    Sequential,
    Thematic,
}

/// One input source.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: SourceType,
    pub content: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

/// Processing knobs; every field has a default so callers can omit any of
/// them.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProcessingOptions {
    pub analyze_first: bool,
    pub combine_strategy: CombineStrategy,
    pub output_template: TemplateType,
}

impl Default for ProcessingOptions {
    fn default() -> Self {
        Self {
            analyze_first: true,
            combine_strategy: CombineStrategy::Merge,
            output_template: TemplateType::Blog,
        }
    }
}

/// A source plus its (possibly absent) analysis.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedSource {
    pub id: String,
    pub original: Source,
    pub analysis: Option<Analysis>,
}

/// Final artifact of a multi-source run.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalOutput {
    pub combined: Option<GeneratedContent>,
    pub individual: Vec<ProcessedSource>,
}

/// State threaded through the multi-source pipeline.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MultiSourceState {
    pub messages: Vec<Message>,
    pub sources: Vec<Source>,
    pub processing_options: ProcessingOptions,
    pub processed_sources: Vec<ProcessedSource>,
    pub final_output: Option<FinalOutput>,
    pub error: Option<String>,
    pub metadata: Map<String, Value>,
}

/// Orchestrating pipeline over multiple heterogeneous sources.
pub struct MultiSourceWorkflow {
    core: Arc<WorkflowCore>,
    graph: CompiledGraph,
}

impl MultiSourceWorkflow {
    /// Build the workflow with sub-workflows resolved from configuration.
    pub fn new(config: &WorkflowConfig) -> Result<Self, WorkflowError> {
        Self::with_workflows(
            config.retry.clone(),
            Arc::new(TranscriptAnalysisWorkflow::new(config)?),
            Arc::new(ContentGenerationWorkflow::new(config)?),
        )
    }

    /// Build the workflow around explicit sub-workflows.
    pub fn with_workflows(
        retry: RetryPolicy,
        analysis: Arc<TranscriptAnalysisWorkflow>,
        generation: Arc<ContentGenerationWorkflow>,
    ) -> Result<Self, WorkflowError> {
        let core = Arc::new(WorkflowCore::new(WORKFLOW_NAME, retry));
        let graph =
            build_graph(core.clone(), analysis, generation).map_err(|e| WorkflowError::Graph {
                workflow: WORKFLOW_NAME.to_string(),
                source: e,
            })?;
        Ok(Self { core, graph })
    }

    /// Run the pipeline to completion.
    pub async fn execute(&self, input: MultiSourceState) -> Result<MultiSourceState, WorkflowError> {
        self.core.run(&self.graph, input).await
    }
}

fn build_graph(
    core: Arc<WorkflowCore>,
    analysis: Arc<TranscriptAnalysisWorkflow>,
    generation: Arc<ContentGenerationWorkflow>,
) -> GraphResult<CompiledGraph> {
    let mut graph = StateGraph::new();

    graph
        .add_channel("messages", ChannelType::LastValue, None)
        .add_channel("sources", ChannelType::LastValue, None)
        .add_channel("processingOptions", ChannelType::LastValue, None)
        .add_channel("processedSources", ChannelType::LastValue, None)
        .add_channel("finalOutput", ChannelType::LastValue, None)
        .add_channel("error", ChannelType::LastValue, None)
        .add_channel("metadata", ChannelType::ShallowMerge, None);

    let validate_core = core.clone();
    graph.add_node("validateSources", move |state| {
        let core = validate_core.clone();
        Box::pin(async move { validate_sources(core, state).await })
    });

    let analyze_core = core.clone();
    graph.add_node("analyzeSources", move |state| {
        let core = analyze_core.clone();
        let analysis = analysis.clone();
        Box::pin(async move { analyze_sources(core, analysis, state).await })
    });

    let combine_core = core.clone();
    graph.add_node("combineSources", move |state| {
        let core = combine_core.clone();
        Box::pin(async move { combine_sources(core, state).await })
    });

    let output_core = core;
    graph.add_node("generateOutput", move |state| {
        let core = output_core.clone();
        let generation = generation.clone();
        Box::pin(async move { generate_output(core, generation, state).await })
    });

    let branches = [
        ("analyze".to_string(), "analyzeSources".to_string()),
        ("combine".to_string(), "combineSources".to_string()),
    ]
    .into_iter()
    .collect();

    graph
        .set_entry_point("validateSources")
        .add_conditional_edges(
            "validateSources",
            |state| {
                let analyze_first = state["processingOptions"]["analyzeFirst"]
                    .as_bool()
                    .unwrap_or(true);
                if analyze_first { "analyze" } else { "combine" }.to_string()
            },
            branches,
        )
        .add_edge("analyzeSources", "combineSources")
        .add_edge("combineSources", "generateOutput")
        .add_edge("generateOutput", END);

    graph.compile()
}

async fn validate_sources(core: Arc<WorkflowCore>, state: Value) -> GraphResult<Value> {
    if error_is_set(&state) {
        return Ok(json!({}));
    }
    let parsed: MultiSourceState = serde_json::from_value(state)?;
    core.logger().step_data(
        "validateSources",
        &json!({
            "sourceCount": parsed.sources.len(),
            "options": parsed.processing_options,
        }),
    );

    if parsed.sources.is_empty() {
        return Ok(core.handle_step_error("validateSources", &"No sources provided"));
    }
    Ok(json!({}))
}

async fn analyze_sources(
    core: Arc<WorkflowCore>,
    analysis_workflow: Arc<TranscriptAnalysisWorkflow>,
    state: Value,
) -> GraphResult<Value> {
    if error_is_set(&state) {
        return Ok(json!({}));
    }
    let parsed: MultiSourceState = serde_json::from_value(state)?;
    core.logger()
        .step_data("analyzeSources", &json!({ "sourceCount": parsed.sources.len() }));

    let mut processed = Vec::with_capacity(parsed.sources.len());
    for source in parsed.sources {
        let analysis = match source.kind {
            SourceType::Transcript => {
                match analysis_workflow
                    .execute(TranscriptAnalysisState::for_transcript(&source.content))
                    .await
                {
                    Ok(result) => result.analysis,
                    Err(err) => {
                        core.logger().step_warn(
                            "analyzeSources",
                            &format!("Failed to analyze source {}: {err}", source.id),
                        );
                        None
                    }
                }
            }
            // Notes and outlines skip analysis; a leading excerpt plus any
            // caller-supplied tags stand in for it.
            SourceType::Note | SourceType::Outline => Some(pseudo_analysis(&source)),
        };
        processed.push(ProcessedSource {
            id: source.id.clone(),
            original: source,
            analysis,
        });
    }

    Ok(json!({ "processedSources": processed }))
}

fn pseudo_analysis(source: &Source) -> Analysis {
    let excerpt: String = source
        .content
        .chars()
        .take(PSEUDO_SUMMARY_CHARS)
        .collect();
    let tags = source
        .metadata
        .get("tags")
        .and_then(Value::as_array)
        .map(|tags| {
            tags.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    Analysis {
        summary: format!("{excerpt}..."),
        tags,
        ..Analysis::default()
    }
}

async fn combine_sources(core: Arc<WorkflowCore>, state: Value) -> GraphResult<Value> {
    if error_is_set(&state) {
        return Ok(json!({}));
    }
    let parsed: MultiSourceState = serde_json::from_value(state)?;
    core.logger().step_data(
        "combineSources",
        &json!({ "strategy": parsed.processing_options.combine_strategy }),
    );

    let sources = processed_or_raw(&parsed);
    let combined = match parsed.processing_options.combine_strategy {
        CombineStrategy::Merge => merge_strategy(&sources),
        CombineStrategy::Sequential => sequential_strategy(&sources),
        CombineStrategy::Thematic => thematic_strategy(&sources),
    };

    Ok(json!({ "metadata": { "combinedContent": combined } }))
}

/// The processed sources when analysis ran, otherwise the raw sources
/// wrapped without analysis.
fn processed_or_raw(state: &MultiSourceState) -> Vec<ProcessedSource> {
    if !state.processed_sources.is_empty() {
        return state.processed_sources.clone();
    }
    state
        .sources
        .iter()
        .map(|source| ProcessedSource {
            id: source.id.clone(),
            original: source.clone(),
            analysis: None,
        })
        .collect()
}

fn merge_strategy(sources: &[ProcessedSource]) -> Value {
    let content = sources
        .iter()
        .map(|s| s.original.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n---\n\n");
    let tags: BTreeSet<&str> = sources
        .iter()
        .filter_map(|s| s.analysis.as_ref())
        .flat_map(|a| a.tags.iter().map(String::as_str))
        .collect();
    let key_points: Vec<&str> = sources
        .iter()
        .filter_map(|s| s.analysis.as_ref())
        .flat_map(|a| a.key_points.iter().map(String::as_str))
        .collect();

    json!({
        "content": content,
        "metadata": {
            "tags": tags,
            "keyPoints": key_points,
            "sourceCount": sources.len(),
        },
    })
}

fn sequential_strategy(sources: &[ProcessedSource]) -> Value {
    let sections: Vec<Value> = sources
        .iter()
        .enumerate()
        .map(|(index, source)| {
            let title = source
                .original
                .metadata
                .get("title")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("Section {}", index + 1));
            json!({
                "order": index + 1,
                "title": title,
                "content": source.original.content,
                "summary": source.analysis.as_ref().map(|a| a.summary.clone()),
            })
        })
        .collect();

    json!({
        "sections": sections,
        "metadata": {
            "structure": "sequential",
            "sectionCount": sections.len(),
        },
    })
}

fn thematic_strategy(sources: &[ProcessedSource]) -> Value {
    let mut themes: Map<String, Value> = Map::new();
    for source in sources {
        let tags: Vec<String> = match source.analysis.as_ref() {
            Some(analysis) if !analysis.tags.is_empty() => analysis.tags.clone(),
            _ => vec!["uncategorized".to_string()],
        };
        for tag in tags {
            let bucket = themes
                .entry(tag)
                .or_insert_with(|| Value::Array(Vec::new()));
            if let Value::Array(items) = bucket {
                items.push(json!(source));
            }
        }
    }

    let theme_count = themes.len();
    json!({
        "themes": themes,
        "metadata": {
            "structure": "thematic",
            "themeCount": theme_count,
        },
    })
}

async fn generate_output(
    core: Arc<WorkflowCore>,
    generation_workflow: Arc<ContentGenerationWorkflow>,
    state: Value,
) -> GraphResult<Value> {
    if error_is_set(&state) {
        return Ok(json!({}));
    }
    let parsed: MultiSourceState = serde_json::from_value(state)?;
    core.logger().step("generateOutput");

    if !parsed.metadata.contains_key("combinedContent") {
        return Ok(core.handle_step_error("generateOutput", &"No combined content available"));
    }

    let transcripts: Vec<TranscriptInput> = if parsed.processed_sources.is_empty() {
        parsed
            .sources
            .iter()
            .map(|source| TranscriptInput {
                id: source.id.clone(),
                content: source.content.clone(),
                analysis: None,
            })
            .collect()
    } else {
        parsed
            .processed_sources
            .iter()
            .map(|processed| TranscriptInput {
                id: processed.id.clone(),
                content: processed.original.content.clone(),
                analysis: processed.analysis.as_ref().map(|a| TranscriptSummary {
                    summary: a.summary.clone(),
                    key_points: a.key_points.clone(),
                    tags: a.tags.clone(),
                }),
            })
            .collect()
    };

    let template_type = parsed.processing_options.output_template;
    let generation_input = ContentGenerationState {
        transcripts,
        template: Template::of(template_type),
        ..Default::default()
    };

    let result = match generation_workflow.execute(generation_input).await {
        Ok(result) => result,
        Err(err) => return Ok(core.handle_step_error("generateOutput", &err)),
    };
    if let Some(err) = result.error {
        return Ok(core.handle_step_error("generateOutput", &err));
    }

    let final_output = FinalOutput {
        combined: result.generated_content,
        individual: parsed.processed_sources,
    };
    let mut messages = parsed.messages;
    messages.push(Message::ai(format!(
        "Multi-source processing completed. Generated {} from {} sources.",
        template_type.as_str(),
        parsed.sources.len()
    )));

    Ok(json!({
        "finalOutput": final_output,
        "messages": messages,
    }))
}
