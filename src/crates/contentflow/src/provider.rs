//! Per-phase model resolution.
//!
//! Each workflow phase (analysis, generation, summarization) gets its own
//! model identifier, temperature, and token budget from configuration.
//! [`PhaseModel`] bundles a [`ChatModel`] with those settings and exposes the
//! single completion call the workflow nodes use.
//!
//! A missing credential does not fail construction: the phase is backed by a
//! stub model whose calls fail with [`ChatError::Auth`], so the failure
//! surfaces as `state.error` at execution time instead.

use std::sync::Arc;

use async_trait::async_trait;
use llm::{AnthropicClient, OpenAiClient, ProviderConfig};
use stategraph::{ChatError, ChatModel, ChatRequest, ChatResponse, Message};

use crate::config::{Provider, WorkflowConfig};

/// Workflow phase, selecting a model/temperature/token tier.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Analysis,
    Generation,
    Summarization,
}

/// A chat model bound to one phase's sampling settings.
#[derive(Clone)]
pub struct PhaseModel {
    model: Arc<dyn ChatModel>,
    temperature: f32,
    max_tokens: u32,
}

impl PhaseModel {
    /// Bind an arbitrary model to explicit settings. Used directly by tests
    /// and callers bringing their own [`ChatModel`] implementation.
    pub fn new(model: Arc<dyn ChatModel>, temperature: f32, max_tokens: u32) -> Self {
        Self {
            model,
            temperature,
            max_tokens,
        }
    }

    /// Resolve the model for a phase from configuration.
    pub fn from_config(config: &WorkflowConfig, phase: Phase) -> Self {
        let (model_id, temperature, max_tokens) = match phase {
            Phase::Analysis => (
                &config.models.analysis,
                config.temperature.analysis,
                config.max_tokens.analysis,
            ),
            Phase::Generation => (
                &config.models.generation,
                config.temperature.generation,
                config.max_tokens.generation,
            ),
            Phase::Summarization => (
                &config.models.summarization,
                config.temperature.summarization,
                config.max_tokens.summarization,
            ),
        };
        Self::new(build_model(config, model_id), temperature, max_tokens)
    }

    /// Whether the underlying model can serve requests.
    pub fn is_available(&self) -> bool {
        self.model.is_available()
    }

    /// Run a completion with this phase's settings and return the reply text.
    pub async fn complete(&self, messages: Vec<Message>) -> Result<String, ChatError> {
        let request = ChatRequest::new(messages)
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens);
        let response = self.model.chat(request).await?;
        Ok(response.message.content)
    }
}

impl std::fmt::Debug for PhaseModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhaseModel")
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("available", &self.model.is_available())
            .finish()
    }
}

fn build_model(config: &WorkflowConfig, model_id: &str) -> Arc<dyn ChatModel> {
    match config.provider() {
        Provider::OpenAi => match &config.api_keys.openai {
            Some(key) => Arc::new(OpenAiClient::new(ProviderConfig::openai(key, model_id))),
            None => Arc::new(MissingCredentials {
                provider: Provider::OpenAi,
            }),
        },
        Provider::Anthropic => match &config.api_keys.anthropic {
            Some(key) => Arc::new(AnthropicClient::new(ProviderConfig::anthropic(key, model_id))),
            None => Arc::new(MissingCredentials {
                provider: Provider::Anthropic,
            }),
        },
    }
}

/// Stand-in model for an unconfigured provider; every call fails with an
/// auth error naming the missing key.
struct MissingCredentials {
    provider: Provider,
}

#[async_trait]
impl ChatModel for MissingCredentials {
    async fn chat(&self, _request: ChatRequest) -> Result<ChatResponse, ChatError> {
        Err(ChatError::Auth(format!(
            "{} API key is required. Please add it in Settings.",
            self.provider.display_name()
        )))
    }

    fn is_available(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ApiKeys, ConfigOverrides};

    #[tokio::test]
    async fn missing_credentials_fail_with_auth_error() {
        let config = WorkflowConfig::default();
        let phase = PhaseModel::from_config(&config, Phase::Analysis);
        assert!(!phase.is_available());

        let err = phase
            .complete(vec![Message::human("hello")])
            .await
            .unwrap_err();
        match err {
            ChatError::Auth(msg) => assert!(msg.contains("OpenAI API key is required")),
            other => panic!("expected auth error, got {other:?}"),
        }
    }

    #[test]
    fn configured_key_yields_available_model() {
        let config = WorkflowConfig::load(ConfigOverrides {
            api_keys: Some(ApiKeys {
                openai: Some("sk-test".into()),
                anthropic: None,
            }),
            ..Default::default()
        })
        .unwrap();
        let phase = PhaseModel::from_config(&config, Phase::Generation);
        assert!(phase.is_available());
    }

    #[test]
    fn phase_settings_come_from_config() {
        let config = WorkflowConfig::default();
        let phase = PhaseModel::from_config(&config, Phase::Summarization);
        assert_eq!(phase.temperature, 0.2);
        assert_eq!(phase.max_tokens, 1000);
    }
}
