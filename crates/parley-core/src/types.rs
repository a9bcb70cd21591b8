use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ParleyError;

// =============================================================================
// Enums
// =============================================================================

/// Who wrote a chat message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuthorRole {
    /// The human side of the conversation.
    User,
    /// Generated replies and greetings.
    Bot,
}

impl AuthorRole {
    /// Stable string form used in storage and on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthorRole::User => "User",
            AuthorRole::Bot => "Bot",
        }
    }
}

impl fmt::Display for AuthorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthorRole {
    type Err = ParleyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "User" => Ok(AuthorRole::User),
            "Bot" => Ok(AuthorRole::Bot),
            other => Err(ParleyError::Serialization(format!(
                "unknown author role: {}",
                other
            ))),
        }
    }
}

// =============================================================================
// Core structs
// =============================================================================

/// A single persisted message in a conversation.
///
/// Created once per turn, immutable afterwards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Unique message identifier.
    pub id: Uuid,
    /// Conversation the message belongs to.
    pub conversation_id: String,
    /// Author of the message.
    pub author_role: AuthorRole,
    /// Message text.
    pub message: String,
    /// Seconds since the Unix epoch at creation.
    pub timestamp: i64,
}

impl ChatMessage {
    /// Build a new message with a fresh id and the current time.
    pub fn new(
        conversation_id: impl Into<String>,
        author_role: AuthorRole,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            conversation_id: conversation_id.into(),
            author_role,
            message: message.into(),
            timestamp: Utc::now().timestamp(),
        }
    }

    /// A user-authored message.
    pub fn user(conversation_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(conversation_id, AuthorRole::User, message)
    }

    /// A bot-authored message.
    pub fn bot(conversation_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(conversation_id, AuthorRole::Bot, message)
    }
}

/// Incoming chat request body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ask {
    /// Raw user text.
    pub prompt: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_author_role_string_forms() {
        assert_eq!(AuthorRole::User.to_string(), "User");
        assert_eq!(AuthorRole::Bot.to_string(), "Bot");
        assert_eq!("User".parse::<AuthorRole>().unwrap(), AuthorRole::User);
        assert_eq!("Bot".parse::<AuthorRole>().unwrap(), AuthorRole::Bot);
    }

    #[test]
    fn test_author_role_rejects_unknown() {
        let err = "Assistant".parse::<AuthorRole>().unwrap_err();
        assert!(err.to_string().contains("Assistant"));
    }

    #[test]
    fn test_author_role_serde_matches_as_str() {
        let json = serde_json::to_string(&AuthorRole::Bot).unwrap();
        assert_eq!(json, "\"Bot\"");
    }

    #[test]
    fn test_new_message_has_fresh_id_and_timestamp() {
        let a = ChatMessage::user("c1", "hi");
        let b = ChatMessage::user("c1", "hi");
        assert_ne!(a.id, b.id);
        assert_ne!(a.id, Uuid::nil());

        let now = Utc::now().timestamp();
        assert!((a.timestamp - now).abs() < 2);
    }

    #[test]
    fn test_message_constructors_set_role() {
        assert_eq!(ChatMessage::user("c", "x").author_role, AuthorRole::User);
        assert_eq!(ChatMessage::bot("c", "x").author_role, AuthorRole::Bot);
    }

    #[test]
    fn test_message_json_field_names() {
        let msg = ChatMessage::bot("c1", "hello");
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["conversation_id"], "c1");
        assert_eq!(value["author_role"], "Bot");
        assert_eq!(value["message"], "hello");
        assert!(value["timestamp"].is_i64());
        assert!(value["id"].is_string());
    }

    #[test]
    fn test_ask_deserialize() {
        let ask: Ask = serde_json::from_str(r#"{"prompt": "What is new?"}"#).unwrap();
        assert_eq!(ask.prompt, "What is new?");
        assert!(serde_json::from_str::<Ask>("{}").is_err());
    }
}
