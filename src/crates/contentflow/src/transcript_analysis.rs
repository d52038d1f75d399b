//! Transcript analysis workflow.
//!
//! Four-step pipeline over a single transcript:
//!
//! ```text
//! validateInput → analyzeTranscript → extractTags → summarize
//! ```
//!
//! Analysis and tag extraction use the analysis model tier; the closing
//! summary uses the cheaper summarization tier. Data-level failures (empty
//! or out-of-bounds transcript, exhausted model retries) are recorded into
//! `state.error` and every later node passes the state through untouched.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use stategraph::{
    ChannelType, CompiledGraph, Message, Result as GraphResult, RetryPolicy, StateGraph, END,
};

use crate::base::{error_is_set, parse_json_reply, WorkflowCore};
use crate::config::WorkflowConfig;
use crate::error::{StepError, WorkflowError};
use crate::provider::{Phase, PhaseModel};

const WORKFLOW_NAME: &str = "TranscriptAnalysis";

/// Shortest transcript worth analyzing, in characters.
const MIN_TRANSCRIPT_CHARS: usize = 50;
/// Longest accepted transcript, in characters.
const MAX_TRANSCRIPT_CHARS: usize = 50_000;

/// State threaded through the transcript analysis pipeline.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TranscriptAnalysisState {
    pub messages: Vec<Message>,
    pub transcript: String,
    pub analysis: Option<Analysis>,
    pub error: Option<String>,
    pub metadata: Map<String, Value>,
}

impl TranscriptAnalysisState {
    /// Start state for analyzing the given transcript.
    pub fn for_transcript(transcript: impl Into<String>) -> Self {
        Self {
            transcript: transcript.into(),
            ..Self::default()
        }
    }
}

/// Structured result of a transcript analysis.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Analysis {
    pub summary: String,
    pub key_points: Vec<String>,
    pub tags: Vec<String>,
    pub tag_scores: HashMap<String, f64>,
    /// One of `positive`, `negative`, `neutral`, `mixed`.
    pub sentiment: String,
    pub content_type: String,
    pub content_score: Option<f64>,
}

/// Model reply shape for the analysis step.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalysisReply {
    summary: String,
    #[serde(default)]
    key_points: Vec<String>,
    #[serde(default)]
    sentiment: String,
    #[serde(default)]
    content_type: String,
}

/// Model reply shape for the tag extraction step.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TagReply {
    tags: BTreeMap<String, f64>,
    #[serde(default)]
    content_score: Option<f64>,
}

/// Single-transcript NLP pipeline.
pub struct TranscriptAnalysisWorkflow {
    core: Arc<WorkflowCore>,
    graph: CompiledGraph,
}

impl TranscriptAnalysisWorkflow {
    /// Build the workflow with models resolved from configuration.
    pub fn new(config: &WorkflowConfig) -> Result<Self, WorkflowError> {
        Self::with_models(
            config.retry.clone(),
            PhaseModel::from_config(config, Phase::Analysis),
            PhaseModel::from_config(config, Phase::Summarization),
        )
    }

    /// Build the workflow around explicit phase models.
    pub fn with_models(
        retry: RetryPolicy,
        analysis: PhaseModel,
        summarization: PhaseModel,
    ) -> Result<Self, WorkflowError> {
        let core = Arc::new(WorkflowCore::new(WORKFLOW_NAME, retry));
        let graph = build_graph(core.clone(), analysis, summarization).map_err(|e| {
            WorkflowError::Graph {
                workflow: WORKFLOW_NAME.to_string(),
                source: e,
            }
        })?;
        Ok(Self { core, graph })
    }

    /// Run the pipeline to completion.
    ///
    /// Validation and model failures surface as `error` on the returned
    /// state; `Err` is reserved for engine and state-conversion failures.
    pub async fn execute(
        &self,
        input: TranscriptAnalysisState,
    ) -> Result<TranscriptAnalysisState, WorkflowError> {
        self.core.run(&self.graph, input).await
    }
}

fn build_graph(
    core: Arc<WorkflowCore>,
    analysis_model: PhaseModel,
    summarization_model: PhaseModel,
) -> GraphResult<CompiledGraph> {
    let mut graph = StateGraph::new();

    graph
        .add_channel("messages", ChannelType::LastValue, None)
        .add_channel("transcript", ChannelType::LastValue, None)
        .add_channel("analysis", ChannelType::LastValue, None)
        .add_channel("error", ChannelType::LastValue, None)
        .add_channel("metadata", ChannelType::ShallowMerge, None);

    let validate_core = core.clone();
    graph.add_node("validateInput", move |state| {
        let core = validate_core.clone();
        Box::pin(async move { validate_input(core, state).await })
    });

    let analyze_core = core.clone();
    let analyze_model = analysis_model.clone();
    graph.add_node("analyzeTranscript", move |state| {
        let core = analyze_core.clone();
        let model = analyze_model.clone();
        Box::pin(async move { analyze_transcript(core, model, state).await })
    });

    let tags_core = core.clone();
    let tags_model = analysis_model;
    graph.add_node("extractTags", move |state| {
        let core = tags_core.clone();
        let model = tags_model.clone();
        Box::pin(async move { extract_tags(core, model, state).await })
    });

    let summarize_core = core;
    graph.add_node("summarize", move |state| {
        let core = summarize_core.clone();
        let model = summarization_model.clone();
        Box::pin(async move { summarize(core, model, state).await })
    });

    graph
        .set_entry_point("validateInput")
        .add_edge("validateInput", "analyzeTranscript")
        .add_edge("analyzeTranscript", "extractTags")
        .add_edge("extractTags", "summarize")
        .add_edge("summarize", END);

    graph.compile()
}

async fn validate_input(core: Arc<WorkflowCore>, state: Value) -> GraphResult<Value> {
    if error_is_set(&state) {
        return Ok(json!({}));
    }
    let parsed: TranscriptAnalysisState = serde_json::from_value(state)?;
    core.logger().step_data(
        "validateInput",
        &json!({ "transcriptLength": parsed.transcript.len() }),
    );

    if parsed.transcript.trim().is_empty() {
        return Ok(core.handle_step_error("validateInput", &"Transcript is required"));
    }
    if parsed.transcript.chars().count() < MIN_TRANSCRIPT_CHARS {
        return Ok(core.handle_step_error(
            "validateInput",
            &"Transcript is too short for meaningful analysis",
        ));
    }
    if parsed.transcript.chars().count() > MAX_TRANSCRIPT_CHARS {
        return Ok(core.handle_step_error(
            "validateInput",
            &"Transcript is too long. Please use a shorter transcript or split it into sections.",
        ));
    }

    let mut messages = parsed.messages;
    messages.push(Message::human(format!(
        "Analyze the following transcript: {}",
        parsed.transcript
    )));
    Ok(json!({ "messages": messages }))
}

async fn analyze_transcript(
    core: Arc<WorkflowCore>,
    model: PhaseModel,
    state: Value,
) -> GraphResult<Value> {
    if error_is_set(&state) {
        return Ok(json!({}));
    }
    let parsed: TranscriptAnalysisState = serde_json::from_value(state)?;
    core.logger().step("analyzeTranscript");

    let prompt = format!(
        "Analyze this transcript and provide:\n\
         1. A brief summary (2-3 sentences)\n\
         2. 3-5 key points\n\
         3. The overall sentiment (positive, negative, neutral, or mixed)\n\
         4. The type of content (interview, tutorial, presentation, etc.)\n\n\
         Transcript: {}\n\n\
         Respond in JSON format:\n\
         {{\n\
           \"summary\": \"...\",\n\
           \"keyPoints\": [\"...\", \"...\"],\n\
           \"sentiment\": \"positive|negative|neutral|mixed\",\n\
           \"contentType\": \"...\"\n\
         }}",
        parsed.transcript
    );

    let result = core
        .with_retry("analyzeTranscript", || {
            let model = model.clone();
            let prompt = prompt.clone();
            async move {
                let reply = model
                    .complete(vec![Message::human(prompt)])
                    .await
                    .map_err(StepError::from)?;
                let analysis: AnalysisReply = parse_json_reply(&reply)?;
                Ok((reply, analysis))
            }
        })
        .await;

    match result {
        Ok((reply, extracted)) => {
            let mut analysis = parsed.analysis.unwrap_or_default();
            analysis.summary = extracted.summary;
            analysis.key_points = extracted.key_points;
            analysis.sentiment = extracted.sentiment;
            analysis.content_type = extracted.content_type;

            let mut messages = parsed.messages;
            messages.push(Message::ai(reply));
            Ok(json!({ "analysis": analysis, "messages": messages }))
        }
        Err(err) => Ok(core.handle_step_error("analyzeTranscript", &err)),
    }
}

async fn extract_tags(
    core: Arc<WorkflowCore>,
    model: PhaseModel,
    state: Value,
) -> GraphResult<Value> {
    if error_is_set(&state) {
        return Ok(json!({}));
    }
    let parsed: TranscriptAnalysisState = serde_json::from_value(state)?;
    core.logger().step("extractTags");

    let current_analysis = serde_json::to_string(&parsed.analysis)?;
    let prompt = format!(
        "Based on this transcript analysis, generate 5-10 relevant tags with relevance scores.\n\
         Also calculate an overall content quality score (0.0-1.0) based on:\n\
         - Clarity and coherence\n\
         - Information density\n\
         - Engagement potential\n\
         - Production value indicators\n\n\
         Transcript: {}\n\
         Current Analysis: {}\n\n\
         Respond in JSON format:\n\
         {{\n\
           \"tags\": {{\n\
             \"tag1\": 0.95,\n\
             \"tag2\": 0.87\n\
           }},\n\
           \"contentScore\": 0.85\n\
         }}",
        parsed.transcript, current_analysis
    );

    let result = core
        .with_retry("extractTags", || {
            let model = model.clone();
            let prompt = prompt.clone();
            async move {
                let reply = model
                    .complete(vec![Message::human(prompt)])
                    .await
                    .map_err(StepError::from)?;
                let tags: TagReply = parse_json_reply(&reply)?;
                Ok((reply, tags))
            }
        })
        .await;

    let mut analysis = parsed.analysis.unwrap_or_default();
    match result {
        Ok((reply, extracted)) => {
            analysis.tags = extracted.tags.keys().cloned().collect();
            analysis.tag_scores = extracted.tags.into_iter().collect();
            analysis.content_score = extracted.content_score;

            let mut messages = parsed.messages;
            messages.push(Message::ai(reply));
            Ok(json!({ "analysis": analysis, "messages": messages }))
        }
        Err(err @ WorkflowError::Step { .. }) => {
            // fatal (auth) failures record the error; no fallback
            Ok(core.handle_step_error("extractTags", &err))
        }
        Err(_) => {
            // transient failure that survived retries: degrade to
            // frequency-based tags instead of failing the run
            let tags = basic_tags(&parsed.transcript);
            analysis.tag_scores = tags.iter().map(|t| (t.clone(), 0.5)).collect();
            analysis.tags = tags;
            analysis.content_score = Some(0.5);
            Ok(json!({ "analysis": analysis }))
        }
    }
}

async fn summarize(core: Arc<WorkflowCore>, model: PhaseModel, state: Value) -> GraphResult<Value> {
    if error_is_set(&state) {
        return Ok(json!({}));
    }
    let parsed: TranscriptAnalysisState = serde_json::from_value(state)?;
    core.logger()
        .step_data("summarize", &json!({ "analysis": parsed.analysis }));

    let prompt = format!(
        "Create a concise summary of the analysis results:\n{}",
        serde_json::to_string_pretty(&parsed.analysis)?
    );

    let result = core
        .with_retry("summarize", || {
            let model = model.clone();
            let prompt = prompt.clone();
            async move {
                model
                    .complete(vec![Message::human(prompt)])
                    .await
                    .map_err(StepError::from)
            }
        })
        .await;

    match result {
        Ok(reply) => {
            let mut messages = parsed.messages;
            messages.push(Message::ai(reply));
            Ok(json!({
                "messages": messages,
                "metadata": {
                    "summaryGenerated": true,
                    "completedAt": chrono::Utc::now().to_rfc3339(),
                },
            }))
        }
        Err(err) => Ok(core.handle_step_error("summarize", &err)),
    }
}

/// Frequency-based tag fallback used when model tag extraction fails.
fn basic_tags(transcript: &str) -> Vec<String> {
    let stopwords: HashSet<&str> = [
        "the", "is", "at", "which", "on", "and", "a", "an", "as", "are", "was", "were", "been",
        "be", "have", "has", "had", "do", "does", "did", "will", "would", "should", "could",
        "may", "might", "must", "can", "to", "of", "in", "for", "with", "it", "that", "this",
        "these", "those", "i", "you", "we", "they", "he", "she", "or", "but", "if", "then", "so",
        "all", "there", "their", "when", "where", "how", "why", "what", "who",
    ]
    .into_iter()
    .collect();

    let mut freq: HashMap<String, usize> = HashMap::new();
    for word in transcript.to_lowercase().split_whitespace() {
        let word = word.trim_matches(|c: char| !c.is_alphanumeric());
        if word.len() > 3 && !stopwords.contains(word) {
            *freq.entry(word.to_string()).or_insert(0) += 1;
        }
    }

    let mut ranked: Vec<(String, usize)> = freq.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.into_iter().take(8).map(|(word, _)| word).collect()
}
