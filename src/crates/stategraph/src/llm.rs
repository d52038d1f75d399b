//! Provider-agnostic chat model interface.
//!
//! The graph engine is an orchestration layer, not an LLM client library: it
//! defines the [`ChatModel`] trait and the request/response/error types, and
//! provider crates implement the trait for their particular API.
//!
//! # Example implementation
//!
//! ```rust,ignore
//! use stategraph::llm::{ChatModel, ChatRequest, ChatResponse, ChatError};
//! use async_trait::async_trait;
//!
//! struct MyClient { api_key: String }
//!
//! #[async_trait]
//! impl ChatModel for MyClient {
//!     async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, ChatError> {
//!         // convert messages, call the API, map the response
//!         todo!()
//!     }
//! }
//! ```

use async_trait::async_trait;
use thiserror::Error;

use crate::messages::Message;

/// Errors produced by chat model implementations.
///
/// The variants partition failures into transient conditions worth retrying
/// and permanent ones that retrying cannot fix; see
/// [`is_retryable`](ChatError::is_retryable).
#[derive(Debug, Error)]
pub enum ChatError {
    /// Network-level failure reaching the provider.
    #[error("transport error: {0}")]
    Transport(String),

    /// The request timed out.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// The provider rejected the request for rate limiting.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// Authentication failed or credentials are missing.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The provider rejected the request as malformed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The provider's response could not be parsed.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The provider reported a server-side failure.
    #[error("provider error: {0}")]
    Provider(String),
}

impl ChatError {
    /// Whether retrying the same request may succeed.
    ///
    /// Transport failures, timeouts, rate limits, and server-side provider
    /// errors are transient. Auth failures and malformed requests or
    /// responses are not: the same call would fail the same way.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ChatError::Transport(_)
                | ChatError::Timeout(_)
                | ChatError::RateLimited(_)
                | ChatError::Provider(_)
        )
    }
}

/// A chat completion request.
#[derive(Clone, Debug)]
pub struct ChatRequest {
    /// Conversation so far, in order.
    pub messages: Vec<Message>,
    /// Sampling temperature override.
    pub temperature: Option<f32>,
    /// Completion length cap override.
    pub max_tokens: Option<u32>,
}

impl ChatRequest {
    /// Create a request from a message list.
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            temperature: None,
            max_tokens: None,
        }
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the maximum completion tokens.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// A chat completion response.
#[derive(Clone, Debug)]
pub struct ChatResponse {
    /// The assistant message produced by the model.
    pub message: Message,
}

impl ChatResponse {
    /// Wrap assistant text as a response.
    pub fn from_text(content: impl Into<String>) -> Self {
        Self {
            message: Message::ai(content),
        }
    }
}

/// Chat-based language model.
///
/// Implementations convert [`Message`]s to their provider's wire format,
/// perform the call, and map failures onto [`ChatError`] so callers can make
/// uniform retry decisions.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Generate a completion for the given conversation.
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, ChatError>;

    /// Whether the model is ready to serve requests.
    ///
    /// Defaults to `true`; clients with unavailable credentials override this.
    fn is_available(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    #[async_trait]
    impl ChatModel for Echo {
        async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, ChatError> {
            let last = request
                .messages
                .last()
                .map(|m| m.content.clone())
                .unwrap_or_default();
            Ok(ChatResponse::from_text(last))
        }
    }

    #[tokio::test]
    async fn trait_object_dispatch() {
        let model: Box<dyn ChatModel> = Box::new(Echo);
        let response = model
            .chat(ChatRequest::new(vec![Message::human("ping")]))
            .await
            .unwrap();
        assert_eq!(response.message.content, "ping");
        assert_eq!(response.message.role, crate::messages::MessageRole::Assistant);
    }

    #[test]
    fn retryability_partition() {
        assert!(ChatError::Transport("reset".into()).is_retryable());
        assert!(ChatError::Timeout("30s".into()).is_retryable());
        assert!(ChatError::RateLimited("429".into()).is_retryable());
        assert!(ChatError::Provider("500".into()).is_retryable());
        assert!(!ChatError::Auth("bad key".into()).is_retryable());
        assert!(!ChatError::InvalidRequest("missing field".into()).is_retryable());
        assert!(!ChatError::InvalidResponse("truncated json".into()).is_retryable());
    }
}
