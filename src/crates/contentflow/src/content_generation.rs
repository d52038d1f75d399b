//! Content generation workflow.
//!
//! Turns one or more (optionally pre-analyzed) transcripts into a piece of
//! content shaped by a template:
//!
//! ```text
//! validateInput → prepareContext → generateContent → formatContent → validateOutput
//! ```
//!
//! Template constraints (tweet counts, word bands, slide limits) are
//! descriptive guidance embedded in the generation prompt; `validateOutput`
//! checks them afterwards but records violations as warnings only — the
//! generated content is accepted regardless.

use std::collections::BTreeSet;
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

const WORKFLOW_NAME: &str = "ContentGeneration";

/// Raw transcript content longer than this is truncated before being
/// embedded in a prompt.
const MAX_PROMPT_TRANSCRIPT_CHARS: usize = 2000;

/// Supported output templates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TemplateType {
    Thread,
    Carousel,
    Newsletter,
    Blog,
    VideoScript,
}

impl TemplateType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateType::Thread => "thread",
            TemplateType::Carousel => "carousel",
            TemplateType::Newsletter => "newsletter",
            TemplateType::Blog => "blog",
            TemplateType::VideoScript => "video-script",
        }
    }
}

/// Output template selection plus optional caller constraints.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Template {
    #[serde(rename = "type")]
    pub kind: Option<TemplateType>,
    pub format: Option<String>,
    pub constraints: Map<String, Value>,
}

impl Template {
    pub fn of(kind: TemplateType) -> Self {
        Self {
            kind: Some(kind),
            ..Self::default()
        }
    }
}

/// A transcript fed into generation, optionally carrying analysis results.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TranscriptInput {
    pub id: String,
    pub content: String,
    pub analysis: Option<TranscriptSummary>,
}

/// Analysis subset relevant to generation.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TranscriptSummary {
    pub summary: String,
    pub key_points: Vec<String>,
    pub tags: Vec<String>,
}

/// Generated content body: a single document or an ordered list of parts
/// (tweets, slides) depending on the template.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContentBody {
    Single(String),
    Parts(Vec<String>),
}

impl ContentBody {
    pub fn word_count(&self) -> usize {
        match self {
            ContentBody::Single(text) => text.split_whitespace().count(),
            ContentBody::Parts(parts) => {
                parts.iter().map(|p| p.split_whitespace().count()).sum()
            }
        }
    }
}

/// The generated artifact.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedContent {
    pub title: String,
    pub content: ContentBody,
    pub format: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

/// Model reply shape for the generation step.
#[derive(Debug, Deserialize)]
struct GenerationReply {
    title: String,
    content: ContentBody,
}

/// State threaded through the content generation pipeline.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContentGenerationState {
    pub messages: Vec<Message>,
    pub transcripts: Vec<TranscriptInput>,
    pub template: Template,
    pub generated_content: Option<GeneratedContent>,
    pub error: Option<String>,
    pub metadata: Map<String, Value>,
}

/// Template-constrained generation pipeline.
pub struct ContentGenerationWorkflow {
    core: Arc<WorkflowCore>,
    graph: CompiledGraph,
}

impl ContentGenerationWorkflow {
    /// Build the workflow with the generation model resolved from
    /// configuration.
    pub fn new(config: &WorkflowConfig) -> Result<Self, WorkflowError> {
        Self::with_model(
            config.retry.clone(),
            PhaseModel::from_config(config, Phase::Generation),
        )
    }

    /// Build the workflow around an explicit generation model.
    pub fn with_model(retry: RetryPolicy, generation: PhaseModel) -> Result<Self, WorkflowError> {
        let core = Arc::new(WorkflowCore::new(WORKFLOW_NAME, retry));
        let graph = build_graph(core.clone(), generation).map_err(|e| WorkflowError::Graph {
            workflow: WORKFLOW_NAME.to_string(),
            source: e,
        })?;
        Ok(Self { core, graph })
    }

    /// Run the pipeline to completion.
    pub async fn execute(
        &self,
        input: ContentGenerationState,
    ) -> Result<ContentGenerationState, WorkflowError> {
        self.core.run(&self.graph, input).await
    }
}

fn build_graph(core: Arc<WorkflowCore>, model: PhaseModel) -> GraphResult<CompiledGraph> {
    let mut graph = StateGraph::new();

    graph
        .add_channel("messages", ChannelType::LastValue, None)
        .add_channel("transcripts", ChannelType::LastValue, None)
        .add_channel("template", ChannelType::LastValue, None)
        .add_channel("generatedContent", ChannelType::LastValue, None)
        .add_channel("error", ChannelType::LastValue, None)
        .add_channel("metadata", ChannelType::ShallowMerge, None);

    let validate_core = core.clone();
    graph.add_node("validateInput", move |state| {
        let core = validate_core.clone();
        Box::pin(async move { validate_input(core, state).await })
    });

    let context_core = core.clone();
    graph.add_node("prepareContext", move |state| {
        let core = context_core.clone();
        Box::pin(async move { prepare_context(core, state).await })
    });

    let generate_core = core.clone();
    graph.add_node("generateContent", move |state| {
        let core = generate_core.clone();
        let model = model.clone();
        Box::pin(async move { generate_content(core, model, state).await })
    });

    let format_core = core.clone();
    graph.add_node("formatContent", move |state| {
        let core = format_core.clone();
        Box::pin(async move { format_content(core, state).await })
    });

    let output_core = core;
    graph.add_node("validateOutput", move |state| {
        let core = output_core.clone();
        Box::pin(async move { validate_output(core, state).await })
    });

    graph
        .set_entry_point("validateInput")
        .add_edge("validateInput", "prepareContext")
        .add_edge("prepareContext", "generateContent")
        .add_edge("generateContent", "formatContent")
        .add_edge("formatContent", "validateOutput")
        .add_edge("validateOutput", END);

    graph.compile()
}

async fn validate_input(core: Arc<WorkflowCore>, state: Value) -> GraphResult<Value> {
    if error_is_set(&state) {
        return Ok(json!({}));
    }
    let parsed: ContentGenerationState = serde_json::from_value(state)?;
    core.logger().step_data(
        "validateInput",
        &json!({
            "transcriptCount": parsed.transcripts.len(),
            "templateType": parsed.template.kind,
        }),
    );

    if parsed.transcripts.is_empty() {
        return Ok(core.handle_step_error("validateInput", &"No transcripts provided"));
    }
    if parsed.template.kind.is_none() {
        return Ok(core.handle_step_error("validateInput", &"No template type specified"));
    }
    Ok(json!({}))
}

async fn prepare_context(core: Arc<WorkflowCore>, state: Value) -> GraphResult<Value> {
    if error_is_set(&state) {
        return Ok(json!({}));
    }
    let parsed: ContentGenerationState = serde_json::from_value(state)?;
    core.logger().step("prepareContext");

    let total_words: usize = parsed
        .transcripts
        .iter()
        .map(|t| t.content.split_whitespace().count())
        .sum();
    let combined_tags: BTreeSet<&str> = parsed
        .transcripts
        .iter()
        .filter_map(|t| t.analysis.as_ref())
        .flat_map(|a| a.tags.iter().map(String::as_str))
        .collect();

    let mut constraints = parsed
        .template
        .kind
        .map(template_constraints)
        .unwrap_or_default();
    // caller-supplied constraints override the template defaults
    for (key, value) in &parsed.template.constraints {
        constraints.insert(key.clone(), value.clone());
    }

    Ok(json!({
        "metadata": {
            "context": {
                "transcriptCount": parsed.transcripts.len(),
                "totalWords": total_words,
                "combinedTags": combined_tags,
                "templateConstraints": constraints,
            },
        },
    }))
}

/// Per-template generation constraints, embedded into the prompt and
/// checked (as warnings) by `validateOutput`.
fn template_constraints(kind: TemplateType) -> Map<String, Value> {
    let value = match kind {
        TemplateType::Thread => json!({
            "maxTweets": 10,
            "charsPerTweet": 280,
            "style": "conversational, engaging",
        }),
        TemplateType::Carousel => json!({
            "maxSlides": 10,
            "charsPerSlide": 150,
            "style": "visual, punchy",
        }),
        TemplateType::Newsletter => json!({
            "minWords": 500,
            "maxWords": 1500,
            "style": "informative, professional",
        }),
        TemplateType::Blog => json!({
            "minWords": 800,
            "maxWords": 2000,
            "style": "comprehensive, SEO-friendly",
        }),
        TemplateType::VideoScript => json!({
            "targetDuration": "5-10 minutes",
            "style": "conversational, structured",
        }),
    };
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

async fn generate_content(
    core: Arc<WorkflowCore>,
    model: PhaseModel,
    state: Value,
) -> GraphResult<Value> {
    if error_is_set(&state) {
        return Ok(json!({}));
    }
    let parsed: ContentGenerationState = serde_json::from_value(state)?;
    core.logger().step("generateContent");

    let kind = match parsed.template.kind {
        Some(kind) => kind,
        None => return Ok(core.handle_step_error("generateContent", &"No template type specified")),
    };
    let constraints = parsed
        .metadata
        .get("context")
        .and_then(|c| c.get("templateConstraints"))
        .cloned()
        .unwrap_or_else(|| json!({}));

    let transcript_content = parsed
        .transcripts
        .iter()
        .map(transcript_prompt_section)
        .collect::<Vec<_>>()
        .join("\n\n---\n\n");
    let prompt = build_generation_prompt(kind, &transcript_content, &constraints);

    let result = core
        .with_retry("generateContent", || {
            let model = model.clone();
            let prompt = prompt.clone();
            async move {
                let reply = model
                    .complete(vec![Message::human(prompt)])
                    .await
                    .map_err(StepError::from)?;
                parse_json_reply::<GenerationReply>(&reply)
            }
        })
        .await;

    match result {
        Ok(reply) => {
            let word_count = reply.content.word_count();
            let generated = GeneratedContent {
                title: reply.title,
                content: reply.content,
                format: kind.as_str().to_string(),
                metadata: match json!({
                    "generatedAt": chrono::Utc::now().to_rfc3339(),
                    "wordCount": word_count,
                }) {
                    Value::Object(map) => map,
                    _ => Map::new(),
                },
            };
            Ok(json!({ "generatedContent": generated }))
        }
        Err(err) => Ok(core.handle_step_error("generateContent", &err)),
    }
}

/// Prompt section for one transcript: prefer the analysis summary, fall back
/// to (possibly truncated) raw content.
fn transcript_prompt_section(transcript: &TranscriptInput) -> String {
    if let Some(analysis) = &transcript.analysis {
        if !analysis.summary.is_empty() {
            return format!("Summary: {}", analysis.summary);
        }
    }
    let content = &transcript.content;
    if content.chars().count() > MAX_PROMPT_TRANSCRIPT_CHARS {
        let truncated: String = content.chars().take(MAX_PROMPT_TRANSCRIPT_CHARS).collect();
        format!("Transcript (truncated): {truncated}...")
    } else {
        format!("Transcript: {content}")
    }
}

fn build_generation_prompt(kind: TemplateType, transcript_content: &str, constraints: &Value) -> String {
    let (task, shape) = match kind {
        TemplateType::Thread => (
            "Create a Twitter/X thread based on the following transcript content. \
             Extract the key insights and transform them into an engaging thread.",
            "{\n  \"title\": \"Thread title/hook\",\n  \"content\": [\"Tweet 1\", \"Tweet 2\", ...]\n}",
        ),
        TemplateType::Carousel => (
            "Create an Instagram carousel post based on the following transcript content. \
             Transform the key points into visually engaging slides.",
            "{\n  \"title\": \"Carousel caption\",\n  \"content\": [\"Slide 1 text\", \"Slide 2 text\", ...]\n}",
        ),
        TemplateType::Newsletter => (
            "Create a newsletter section based on the following transcript content. \
             Extract and organize the main insights.",
            "{\n  \"title\": \"Newsletter section title\",\n  \"content\": \"Full newsletter content with proper formatting\"\n}",
        ),
        TemplateType::Blog => (
            "Create a blog post based on the following transcript content. \
             Expand on the key themes and insights.",
            "{\n  \"title\": \"Blog post title\",\n  \"content\": \"Full blog post content with headings and paragraphs\"\n}",
        ),
        TemplateType::VideoScript => (
            "Create a video script based on the following transcript content. \
             Structure it for engaging video delivery.",
            "{\n  \"title\": \"Video title\",\n  \"content\": \"Full video script with sections and timing cues\"\n}",
        ),
    };
    format!(
        "{task}\nConstraints: {constraints}\n\n\
         Transcript Content:\n{transcript_content}\n\n\
         Return ONLY a JSON object (no markdown formatting, no code blocks) with this structure:\n{shape}"
    )
}

async fn format_content(core: Arc<WorkflowCore>, state: Value) -> GraphResult<Value> {
    if error_is_set(&state) {
        return Ok(json!({}));
    }
    let parsed: ContentGenerationState = serde_json::from_value(state)?;
    core.logger().step("formatContent");

    let mut generated = match parsed.generated_content {
        Some(generated) => generated,
        None => return Ok(json!({})),
    };

    match parsed.template.kind {
        Some(TemplateType::Thread) => {
            if let ContentBody::Parts(parts) = &generated.content {
                let total = parts.len();
                let numbered = parts
                    .iter()
                    .enumerate()
                    .map(|(i, tweet)| format!("{}/{} {}", i + 1, total, tweet))
                    .collect();
                generated.content = ContentBody::Parts(numbered);
            }
        }
        Some(TemplateType::Carousel) => {
            if let ContentBody::Parts(parts) = &generated.content {
                let labeled = parts
                    .iter()
                    .enumerate()
                    .map(|(i, slide)| format!("[Slide {}]\n{}", i + 1, slide))
                    .collect();
                generated.content = ContentBody::Parts(labeled);
            }
        }
        Some(TemplateType::Blog) | Some(TemplateType::Newsletter) => {
            if let ContentBody::Single(text) = &generated.content {
                if !text.contains('#') {
                    generated.content =
                        ContentBody::Single(format!("# {}\n\n{}", generated.title, text));
                }
            }
        }
        _ => {}
    }

    Ok(json!({ "generatedContent": generated }))
}

async fn validate_output(core: Arc<WorkflowCore>, state: Value) -> GraphResult<Value> {
    if error_is_set(&state) {
        return Ok(json!({}));
    }
    let parsed: ContentGenerationState = serde_json::from_value(state)?;
    core.logger().step("validateOutput");

    let generated = match &parsed.generated_content {
        Some(generated) => generated,
        None => return Ok(core.handle_step_error("validateOutput", &"No content was generated")),
    };

    let constraints = parsed
        .metadata
        .get("context")
        .and_then(|c| c.get("templateConstraints"))
        .cloned()
        .unwrap_or_else(|| json!({}));

    match parsed.template.kind {
        Some(TemplateType::Thread) => {
            if let (ContentBody::Parts(parts), Some(max)) =
                (&generated.content, constraints["maxTweets"].as_u64())
            {
                if parts.len() as u64 > max {
                    core.logger().step_warn(
                        "validateOutput",
                        &format!("Thread has {} tweets, exceeding limit of {max}", parts.len()),
                    );
                }
            }
        }
        Some(TemplateType::Carousel) => {
            if let (ContentBody::Parts(parts), Some(max)) =
                (&generated.content, constraints["maxSlides"].as_u64())
            {
                if parts.len() as u64 > max {
                    core.logger().step_warn(
                        "validateOutput",
                        &format!("Carousel has {} slides, exceeding limit of {max}", parts.len()),
                    );
                }
            }
        }
        Some(TemplateType::Blog) | Some(TemplateType::Newsletter) => {
            let word_count = generated
                .metadata
                .get("wordCount")
                .and_then(Value::as_u64)
                .unwrap_or(0);
            let min = constraints["minWords"].as_u64().unwrap_or(0);
            let max = constraints["maxWords"].as_u64().unwrap_or(u64::MAX);
            if word_count < min || word_count > max {
                core.logger().step_warn(
                    "validateOutput",
                    &format!("Content has {word_count} words, outside range {min}-{max}"),
                );
            }
        }
        _ => {}
    }

    let mut messages = parsed.messages;
    messages.push(Message::ai(format!(
        "Content generated successfully: {}",
        generated.title
    )));
    Ok(json!({ "messages": messages }))
}
