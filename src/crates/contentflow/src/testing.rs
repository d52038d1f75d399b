//! Test support: scripted chat models.
//!
//! A [`ScriptedModel`] returns a fixed sequence of replies (or errors), one
//! per call, letting workflow tests run the real pipelines without a network.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use stategraph::{ChatError, ChatModel, ChatRequest, ChatResponse};

/// Chat model that replays a prepared reply sequence.
#[derive(Debug, Default)]
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Result<String, ChatError>>>,
    calls: AtomicUsize,
}

impl ScriptedModel {
    /// A model with no replies; any call fails.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A model that replays the given replies in order.
    pub fn with_replies(replies: Vec<Result<String, ChatError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of chat calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn chat(&self, _request: ChatRequest) -> Result<ChatResponse, ChatError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = match self.replies.lock() {
            Ok(mut replies) => replies.pop_front(),
            Err(_) => None,
        };
        match next {
            Some(Ok(text)) => Ok(ChatResponse::from_text(text)),
            Some(Err(err)) => Err(err),
            None => Err(ChatError::Provider(
                "scripted model has no more replies".into(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stategraph::Message;

    #[tokio::test]
    async fn replays_replies_in_order_then_fails() {
        let model = ScriptedModel::with_replies(vec![
            Ok("first".to_string()),
            Err(ChatError::RateLimited("slow down".into())),
        ]);
        let request = ChatRequest::new(vec![Message::human("x")]);

        let reply = model.chat(request.clone()).await.unwrap();
        assert_eq!(reply.message.content, "first");
        assert!(matches!(
            model.chat(request.clone()).await,
            Err(ChatError::RateLimited(_))
        ));
        assert!(matches!(
            model.chat(request).await,
            Err(ChatError::Provider(_))
        ));
        assert_eq!(model.calls(), 3);
    }
}
