//! Common types for chatbot conversations

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role of a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    /// Synthesized failure turn; never sent by the server
    Error,
}

/// Opaque message identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageId(String);

/// Sentinel id for the greeting seeded from chatbot metadata, distinct
/// from any server-issued or locally generated id.
const INITIAL_MESSAGE_ID: &str = "initial-message";

impl MessageId {
    pub fn fresh() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Id of the seeded greeting message
    pub fn initial() -> Self {
        Self(INITIAL_MESSAGE_ID.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_initial(&self) -> bool {
        self.0 == INITIAL_MESSAGE_ID
    }
}

/// One conversation turn
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub id: MessageId,
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: MessageId::fresh(),
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            id: MessageId::fresh(),
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            id: MessageId::fresh(),
            role: Role::Error,
            content: content.into(),
        }
    }

    /// The greeting seeded from `messages_initial`
    pub fn initial_greeting(content: impl Into<String>) -> Self {
        Self {
            id: MessageId::initial(),
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Chatbot metadata from `GET /chatbot/{publish_id}/live`
#[derive(Debug, Clone, Deserialize)]
pub struct Chatbot {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub live: bool,
    /// Greeting shown before the first user turn, when configured
    #[serde(default)]
    pub messages_initial: Option<String>,
}

// Wire types for the chat endpoints. Local message ids never cross the
// wire; outgoing history carries role and content only.

#[derive(Debug, Serialize)]
pub struct CreateChatRequest<'a> {
    pub message: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct CreateChatResponse {
    pub chat_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct WireMessage {
    pub role: Role,
    pub content: String,
}

impl From<&Message> for WireMessage {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role,
            content: message.content.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CompletionRequest {
    /// Unique per-request id, fresh for every submission
    pub id: String,
    /// Full conversation history in order, including the new user turn
    pub messages: Vec<WireMessage>,
}

/// Structured body of a non-success completion response
#[derive(Debug, Default, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub subscription_tier: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), "\"user\"");
        assert_eq!(
            serde_json::to_string(&Role::Assistant).unwrap(),
            "\"assistant\""
        );
        assert_eq!(serde_json::to_string(&Role::Error).unwrap(), "\"error\"");
    }

    #[test]
    fn test_initial_id_is_sentinel() {
        let greeting = Message::initial_greeting("Hi!");
        assert!(greeting.id.is_initial());
        assert_eq!(greeting.role, Role::Assistant);

        let real = Message::assistant("Hi!");
        assert!(!real.id.is_initial());
        assert_ne!(real.id, greeting.id);
    }

    #[test]
    fn test_fresh_ids_are_unique() {
        assert_ne!(MessageId::fresh(), MessageId::fresh());
    }

    #[test]
    fn test_chatbot_metadata_tolerates_missing_fields() {
        let chatbot: Chatbot = serde_json::from_str(r#"{"title":"Support"}"#).unwrap();
        assert_eq!(chatbot.title, "Support");
        assert!(!chatbot.live);
        assert!(chatbot.messages_initial.is_none());
    }

    #[test]
    fn test_completion_request_wire_shape() {
        let request = CompletionRequest {
            id: "req-1".to_string(),
            messages: vec![WireMessage {
                role: Role::User,
                content: "Hello".to_string(),
            }],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "id": "req-1",
                "messages": [{"role": "user", "content": "Hello"}]
            })
        );
    }
}
