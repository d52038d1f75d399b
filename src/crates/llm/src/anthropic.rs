//! Anthropic messages client.
//!
//! Talks to `POST {base_url}/v1/messages` with `x-api-key` authentication.
//! The Anthropic API takes system instructions as a top-level `system` field
//! rather than as a message, so system messages are extracted from the
//! conversation before conversion.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use stategraph::{ChatError, ChatModel, ChatRequest, ChatResponse, MessageRole};
use tracing::debug;

use crate::config::ProviderConfig;
use crate::http::{status_error, transport_error};

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Fallback completion cap; the messages API requires `max_tokens`.
const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Anthropic API client.
#[derive(Clone, Debug)]
pub struct AnthropicClient {
    config: ProviderConfig,
    client: Client,
}

impl AnthropicClient {
    /// Create a new client with the given configuration.
    pub fn new(config: ProviderConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_default();
        Self { config, client }
    }

    /// Split the conversation into a combined system prompt and the
    /// human/assistant turns in wire format.
    fn convert_messages(request: &ChatRequest) -> (Option<String>, Vec<AnthropicMessage>) {
        let mut system_parts = Vec::new();
        let mut turns = Vec::new();
        for msg in &request.messages {
            match msg.role {
                MessageRole::System => system_parts.push(msg.content.clone()),
                MessageRole::Human => turns.push(AnthropicMessage {
                    role: "user".to_string(),
                    content: msg.content.clone(),
                }),
                MessageRole::Assistant => turns.push(AnthropicMessage {
                    role: "assistant".to_string(),
                    content: msg.content.clone(),
                }),
            }
        }
        let system = if system_parts.is_empty() {
            None
        } else {
            Some(system_parts.join("\n\n"))
        };
        (system, turns)
    }
}

#[async_trait]
impl ChatModel for AnthropicClient {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, ChatError> {
        let url = format!("{}/v1/messages", self.config.base_url);
        let (system, messages) = Self::convert_messages(&request);
        let body = AnthropicRequest {
            model: self.config.model.clone(),
            system,
            messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        };

        debug!(model = %self.config.model, messages = body.messages.len(), "anthropic chat request");

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error("anthropic", e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(status_error("anthropic", status, &text));
        }

        let parsed: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| ChatError::InvalidResponse(format!("anthropic: {e}")))?;
        let text = parsed
            .content
            .into_iter()
            .find(|block| block.kind == "text")
            .map(|block| block.text)
            .ok_or_else(|| {
                ChatError::InvalidResponse("anthropic: response had no text block".into())
            })?;

        Ok(ChatResponse::from_text(text))
    }
}

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<AnthropicMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContentBlock>,
}

#[derive(Debug, Deserialize)]
struct AnthropicContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use stategraph::Message;

    #[test]
    fn system_messages_are_lifted_out() {
        let request = ChatRequest::new(vec![
            Message::system("be terse"),
            Message::human("hello"),
            Message::ai("hi"),
        ]);
        let (system, turns) = AnthropicClient::convert_messages(&request);
        assert_eq!(system.as_deref(), Some("be terse"));
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].role, "user");
        assert_eq!(turns[1].role, "assistant");
    }

    #[test]
    fn multiple_system_messages_are_joined() {
        let request = ChatRequest::new(vec![
            Message::system("one"),
            Message::system("two"),
            Message::human("go"),
        ]);
        let (system, _) = AnthropicClient::convert_messages(&request);
        assert_eq!(system.as_deref(), Some("one\n\ntwo"));
    }

    #[test]
    fn parses_text_block_response() {
        let raw = r#"{"content": [{"type": "text", "text": "hello there"}]}"#;
        let parsed: AnthropicResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.content[0].text, "hello there");
    }
}
