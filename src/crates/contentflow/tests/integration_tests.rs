//! End-to-end workflow runs over the public API, with scripted models in
//! place of the network.

use std::sync::Arc;
use std::time::Duration;

use contentflow::config::{ApiKeys, ConfigOverrides, Provider};
use contentflow::testing::ScriptedModel;
use contentflow::{
    CombineStrategy, ContentGenerationState, ContentGenerationWorkflow, MultiSourceState,
    MultiSourceWorkflow, PhaseModel, ProcessingOptions, Source, SourceType, Template, TemplateType,
    TranscriptAnalysisState, TranscriptAnalysisWorkflow, WorkflowOrchestrator,
};
use serde_json::{json, Map, Value};
use stategraph::{ChannelType, ChatError, RetryPolicy, StateGraph, END};
use tokio::time::Instant;

const ANALYSIS_REPLY: &str = r#"{
    "summary": "A walkthrough of cutting tail latency by batching writes.",
    "keyPoints": ["Batching halved p99 latency", "Back-pressure mattered most"],
    "sentiment": "positive",
    "contentType": "discussion"
}"#;

const TAGS_REPLY: &str = r#"{"tags": {"latency": 0.9, "batching": 0.8}, "contentScore": 0.75}"#;

const GENERATION_REPLY: &str = r##"{"title": "Batching writes", "content": "# Batching\n\nBody."}"##;

const TRANSCRIPT: &str = "Today we talk about how batching writes cut our tail latency in half \
                          across every region we operate in.";

fn phase(model: ScriptedModel) -> PhaseModel {
    PhaseModel::new(Arc::new(model), 0.3, 2000)
}

fn analysis_workflow(
    analysis: ScriptedModel,
    summarization: ScriptedModel,
) -> TranscriptAnalysisWorkflow {
    TranscriptAnalysisWorkflow::with_models(RetryPolicy::none(), phase(analysis), phase(summarization))
        .unwrap()
}

fn generation_workflow(model: ScriptedModel) -> ContentGenerationWorkflow {
    ContentGenerationWorkflow::with_model(RetryPolicy::none(), phase(model)).unwrap()
}

fn transcript_source(id: &str) -> Source {
    Source {
        id: id.to_string(),
        kind: SourceType::Transcript,
        content: TRANSCRIPT.to_string(),
        metadata: Map::new(),
    }
}

fn note_source(id: &str, tags: &[&str]) -> Source {
    let mut metadata = Map::new();
    metadata.insert("tags".to_string(), json!(tags));
    Source {
        id: id.to_string(),
        kind: SourceType::Note,
        content: format!("Note {id} content."),
        metadata,
    }
}

#[tokio::test]
async fn shallow_merge_accumulates_across_steps_like_a_combined_update() {
    let mut graph = StateGraph::new();
    graph.add_channel("metadata", ChannelType::ShallowMerge, None);
    graph.add_node("first", |_| {
        Box::pin(async { Ok(json!({"metadata": {"a": 1, "shared": "first"}})) })
    });
    graph.add_node("second", |_| {
        Box::pin(async { Ok(json!({"metadata": {"b": 2, "shared": "second"}})) })
    });
    graph
        .set_entry_point("first")
        .add_edge("first", "second")
        .add_edge("second", END);
    let compiled = graph.compile().unwrap();

    let sequential = compiled.invoke(json!({"metadata": {}})).await.unwrap();
    // same keys as one shallow merge of both updates, later write winning
    assert_eq!(
        sequential["metadata"],
        json!({"a": 1, "b": 2, "shared": "second"})
    );
}

#[tokio::test]
async fn messages_grow_monotonically_through_a_full_analysis_run() {
    let workflow = analysis_workflow(
        ScriptedModel::with_replies(vec![Ok(ANALYSIS_REPLY.into()), Ok(TAGS_REPLY.into())]),
        ScriptedModel::with_replies(vec![Ok("Short summary.".into())]),
    );
    let input = TranscriptAnalysisState::for_transcript(TRANSCRIPT);
    let initial_len = input.messages.len();

    let result = workflow.execute(input).await.unwrap();

    assert!(result.error.is_none());
    assert!(result.messages.len() >= initial_len);
    // human prompt plus one assistant message per model step
    assert_eq!(result.messages.len(), 4);
    let analysis = result.analysis.unwrap();
    assert!(!analysis.summary.is_empty());
    assert_eq!(analysis.tags, vec!["batching", "latency"]);
}

#[tokio::test(start_paused = true)]
async fn retry_budget_is_spent_before_a_step_fails() {
    let model = ScriptedModel::with_replies(vec![
        Err(ChatError::Provider("500".into())),
        Err(ChatError::Provider("500".into())),
        Err(ChatError::Provider("500".into())),
        Err(ChatError::Provider("500".into())),
    ]);
    let retry = RetryPolicy::default()
        .with_max_retries(3)
        .with_initial_delay_ms(1000)
        .with_max_delay_ms(5000)
        .with_backoff_multiplier(2.0);
    let workflow = ContentGenerationWorkflow::with_model(
        retry,
        PhaseModel::new(Arc::new(model), 0.7, 4000),
    )
    .unwrap();

    let started = Instant::now();
    let result = workflow
        .execute(ContentGenerationState {
            transcripts: vec![contentflow::TranscriptInput {
                id: "1".into(),
                content: "text".into(),
                analysis: None,
            }],
            template: Template::of(TemplateType::Blog),
            ..Default::default()
        })
        .await
        .unwrap();

    // 4 attempts separated by 1000 + 2000 + 4000 ms of backoff
    assert_eq!(started.elapsed(), Duration::from_millis(7000));
    assert!(result.error.unwrap().contains("Error in generateContent"));
}

#[tokio::test]
async fn short_transcript_yields_error_without_analysis() {
    let workflow = analysis_workflow(ScriptedModel::empty(), ScriptedModel::empty());
    let result = workflow
        .execute(TranscriptAnalysisState::for_transcript("hi"))
        .await
        .unwrap();
    assert!(!result.error.unwrap().is_empty());
    assert!(result.analysis.is_none());
}

#[tokio::test]
async fn missing_template_type_yields_error() {
    let workflow = generation_workflow(ScriptedModel::empty());
    let result = workflow
        .execute(ContentGenerationState {
            transcripts: vec![contentflow::TranscriptInput {
                id: "1".into(),
                content: "text".into(),
                analysis: None,
            }],
            template: Template::default(),
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(result.error.unwrap().contains("No template type specified"));
}

#[tokio::test]
async fn empty_sources_yield_error() {
    let workflow = MultiSourceWorkflow::with_workflows(
        RetryPolicy::none(),
        Arc::new(analysis_workflow(ScriptedModel::empty(), ScriptedModel::empty())),
        Arc::new(generation_workflow(ScriptedModel::empty())),
    )
    .unwrap();
    let result = workflow.execute(MultiSourceState::default()).await.unwrap();
    assert!(result.error.unwrap().contains("No sources provided"));
}

#[tokio::test]
async fn one_failing_source_does_not_sink_the_others() {
    // three transcripts analyzed sequentially; the second one's analysis
    // model call fails and its retries are exhausted
    let analysis_model = ScriptedModel::with_replies(vec![
        Ok(ANALYSIS_REPLY.into()),
        Ok(TAGS_REPLY.into()),
        Err(ChatError::Provider("500".into())),
        Ok(ANALYSIS_REPLY.into()),
        Ok(TAGS_REPLY.into()),
    ]);
    let summarization_model = ScriptedModel::with_replies(vec![
        Ok("First summary.".into()),
        Ok("Third summary.".into()),
    ]);
    let workflow = MultiSourceWorkflow::with_workflows(
        RetryPolicy::none(),
        Arc::new(analysis_workflow(analysis_model, summarization_model)),
        Arc::new(generation_workflow(ScriptedModel::with_replies(vec![Ok(
            GENERATION_REPLY.into(),
        )]))),
    )
    .unwrap();

    let result = workflow
        .execute(MultiSourceState {
            sources: vec![
                transcript_source("t1"),
                transcript_source("t2"),
                transcript_source("t3"),
            ],
            ..Default::default()
        })
        .await
        .unwrap();

    assert!(result.error.is_none());
    assert_eq!(result.processed_sources.len(), 3);
    assert!(result.processed_sources[0].analysis.is_some());
    assert!(result.processed_sources[1].analysis.is_none());
    assert!(result.processed_sources[2].analysis.is_some());
    assert!(result.final_output.is_some());
}

#[tokio::test]
async fn thematic_grouping_buckets_by_tag() {
    let workflow = MultiSourceWorkflow::with_workflows(
        RetryPolicy::none(),
        Arc::new(analysis_workflow(ScriptedModel::empty(), ScriptedModel::empty())),
        Arc::new(generation_workflow(ScriptedModel::with_replies(vec![Ok(
            GENERATION_REPLY.into(),
        )]))),
    )
    .unwrap();

    let result = workflow
        .execute(MultiSourceState {
            sources: vec![note_source("a", &["x", "y"]), note_source("b", &["y"])],
            processing_options: ProcessingOptions {
                combine_strategy: CombineStrategy::Thematic,
                ..Default::default()
            },
            ..Default::default()
        })
        .await
        .unwrap();

    let themes = &result.metadata["combinedContent"]["themes"];
    let ids = |bucket: &Value| -> Vec<String> {
        bucket
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["id"].as_str().unwrap().to_string())
            .collect()
    };
    assert_eq!(ids(&themes["x"]), vec!["a"]);
    assert_eq!(ids(&themes["y"]), vec!["a", "b"]);
    assert_eq!(
        result.metadata["combinedContent"]["metadata"]["themeCount"],
        2
    );
}

#[test]
fn orchestrator_construction_leaves_the_tracing_slot_to_the_host() {
    let _orchestrator = WorkflowOrchestrator::new(ConfigOverrides::default()).unwrap();
    // installing output is the binary's job, via contentflow::logging::init
    assert!(!tracing::dispatcher::has_been_set());
}

#[test]
fn config_round_trips_through_updates() {
    let mut orchestrator = WorkflowOrchestrator::new(ConfigOverrides {
        api_keys: Some(ApiKeys {
            openai: Some("sk-test".into()),
            anthropic: None,
        }),
        ..Default::default()
    })
    .unwrap();

    orchestrator
        .update_config(ConfigOverrides {
            provider: Some(Provider::Anthropic),
            ..Default::default()
        })
        .unwrap();

    let config = orchestrator.get_config();
    assert_eq!(config.provider(), Provider::Anthropic);
    assert_eq!(config.api_keys.openai.as_deref(), Some("sk-test"));
    // untouched sections keep their defaults
    assert_eq!(config.models.analysis, "gpt-4-turbo-preview");
    assert_eq!(config.retry.max_retries, 3);
    assert_eq!(config.temperature.generation, 0.7);
}
