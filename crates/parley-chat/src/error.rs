//! Error types for the turn pipeline.

use parley_core::error::ParleyError;

/// Errors from the chat engine.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("conversation id must not be empty")]
    InvalidConversationId,
    #[error("memory service unavailable: {0}")]
    MemoryUnavailable(String),
    #[error("generation failed: {0}")]
    Generation(String),
    #[error("template error: {0}")]
    Template(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("turn cancelled")]
    Cancelled,
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl ChatError {
    /// True when an external store or service failed the call.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            ChatError::MemoryUnavailable(_) | ChatError::Generation(_) | ChatError::Storage(_)
        )
    }
}

impl From<ParleyError> for ChatError {
    fn from(err: ParleyError) -> Self {
        ChatError::Storage(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_error_display() {
        assert_eq!(
            ChatError::InvalidConversationId.to_string(),
            "conversation id must not be empty"
        );
        assert_eq!(
            ChatError::MemoryUnavailable("503".to_string()).to_string(),
            "memory service unavailable: 503"
        );
        assert_eq!(
            ChatError::Generation("timeout".to_string()).to_string(),
            "generation failed: timeout"
        );
        assert_eq!(
            ChatError::Template("missing chat".to_string()).to_string(),
            "template error: missing chat"
        );
        assert_eq!(
            ChatError::Storage("disk full".to_string()).to_string(),
            "storage error: disk full"
        );
        assert_eq!(ChatError::Cancelled.to_string(), "turn cancelled");
        assert_eq!(
            ChatError::InvalidInput("bad content type".to_string()).to_string(),
            "invalid input: bad content type"
        );
    }

    #[test]
    fn test_upstream_classification() {
        assert!(ChatError::MemoryUnavailable(String::new()).is_upstream());
        assert!(ChatError::Generation(String::new()).is_upstream());
        assert!(ChatError::Storage(String::new()).is_upstream());
        assert!(!ChatError::InvalidConversationId.is_upstream());
        assert!(!ChatError::Template(String::new()).is_upstream());
        assert!(!ChatError::Cancelled.is_upstream());
        assert!(!ChatError::InvalidInput(String::new()).is_upstream());
    }

    #[test]
    fn test_chat_error_from_parley_error() {
        let err: ChatError = ParleyError::Storage("connection lost".to_string()).into();
        assert!(matches!(err, ChatError::Storage(_)));
        assert!(err.to_string().contains("connection lost"));
    }
}
