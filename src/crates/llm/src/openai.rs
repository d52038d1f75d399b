//! OpenAI chat completions client.
//!
//! Talks to `POST {base_url}/chat/completions` with bearer authentication.
//! Supports the GPT-3.5/GPT-4 family; the model name comes from the
//! [`ProviderConfig`].
//!
//! # Example
//!
//! ```rust,ignore
//! use llm::{OpenAiClient, ProviderConfig};
//! use stategraph::{ChatModel, ChatRequest, Message};
//!
//! let client = OpenAiClient::new(ProviderConfig::openai(api_key, "gpt-4-turbo-preview"));
//! let response = client.chat(ChatRequest::new(vec![Message::human("Hello!")])).await?;
//! ```

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use stategraph::{ChatError, ChatModel, ChatRequest, ChatResponse, Message, MessageRole};
use tracing::debug;

use crate::config::ProviderConfig;
use crate::http::{status_error, transport_error};

/// OpenAI API client.
#[derive(Clone, Debug)]
pub struct OpenAiClient {
    config: ProviderConfig,
    client: Client,
}

impl OpenAiClient {
    /// Create a new client with the given configuration.
    pub fn new(config: ProviderConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_default();
        Self { config, client }
    }

    fn convert_message(msg: &Message) -> OpenAiMessage {
        OpenAiMessage {
            role: match msg.role {
                MessageRole::System => "system",
                MessageRole::Human => "user",
                MessageRole::Assistant => "assistant",
            }
            .to_string(),
            content: msg.content.clone(),
        }
    }
}

#[async_trait]
impl ChatModel for OpenAiClient {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, ChatError> {
        let url = format!("{}/chat/completions", self.config.base_url);
        let body = OpenAiRequest {
            model: self.config.model.clone(),
            messages: request.messages.iter().map(Self::convert_message).collect(),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        debug!(model = %self.config.model, messages = body.messages.len(), "openai chat request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error("openai", e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(status_error("openai", status, &text));
        }

        let parsed: OpenAiResponse = response
            .json()
            .await
            .map_err(|e| ChatError::InvalidResponse(format!("openai: {e}")))?;
        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ChatError::InvalidResponse("openai: response had no choices".into()))?;

        Ok(ChatResponse::from_text(choice.message.content))
    }
}

#[derive(Debug, Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAiMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}
