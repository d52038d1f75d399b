//! Chat message types.
//!
//! A minimal conversational message model shared by the graph state and the
//! model clients: a role plus text content. Messages serialize with lowercase
//! role tags (`"system"`, `"human"`, `"assistant"`) so they can live directly
//! inside JSON graph state.

use serde::{Deserialize, Serialize};

/// Speaker role of a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Instructions or context for the model.
    System,
    /// Input from the user.
    Human,
    /// Output from the model.
    Assistant,
}

/// A single message in a conversation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Who produced the message.
    pub role: MessageRole,
    /// Text content.
    pub content: String,
}

impl Message {
    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    /// Create a human message.
    pub fn human(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Human,
            content: content.into(),
        }
    }

    /// Create an assistant message.
    pub fn ai(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_serialize_lowercase() {
        let json = serde_json::to_value(Message::ai("hi")).unwrap();
        assert_eq!(json, serde_json::json!({"role": "assistant", "content": "hi"}));
    }

    #[test]
    fn round_trips_through_json() {
        let msg = Message::human("what's in this transcript?");
        let back: Message = serde_json::from_value(serde_json::to_value(&msg).unwrap()).unwrap();
        assert_eq!(back, msg);
    }
}
