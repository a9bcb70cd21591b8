//! Conversation store contract and its adapters.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use parley_core::types::ChatMessage;
use parley_storage::MessageRepository;

use crate::error::ChatError;

/// Append-only chat log keyed by conversation id.
///
/// `list_by_conversation` returns messages in append order. An append is
/// durable once the call returns.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn append(&self, message: &ChatMessage) -> Result<(), ChatError>;

    async fn list_by_conversation(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<ChatMessage>, ChatError>;

    /// Append a user message and the bot reply, user first.
    ///
    /// Adapters that can write both in one unit should override this.
    async fn append_turn(&self, user: &ChatMessage, bot: &ChatMessage) -> Result<(), ChatError> {
        self.append(user).await?;
        self.append(bot).await
    }
}

// =============================================================================
// SqliteConversationStore
// =============================================================================

/// Store backed by the SQLite chat log.
///
/// Database calls block, so they run on the blocking thread pool.
#[derive(Debug, Clone)]
pub struct SqliteConversationStore {
    repo: MessageRepository,
}

impl SqliteConversationStore {
    pub fn new(repo: MessageRepository) -> Self {
        Self { repo }
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T, ChatError>
    where
        T: Send + 'static,
        F: FnOnce(MessageRepository) -> Result<T, ChatError> + Send + 'static,
    {
        let repo = self.repo.clone();
        tokio::task::spawn_blocking(move || f(repo))
            .await
            .map_err(|e| ChatError::Storage(format!("storage task failed: {}", e)))?
    }
}

#[async_trait]
impl ConversationStore for SqliteConversationStore {
    async fn append(&self, message: &ChatMessage) -> Result<(), ChatError> {
        let message = message.clone();
        self.blocking(move |repo| Ok(repo.save(&message)?)).await
    }

    async fn list_by_conversation(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<ChatMessage>, ChatError> {
        let conversation_id = conversation_id.to_string();
        self.blocking(move |repo| Ok(repo.list_by_conversation(&conversation_id)?))
            .await
    }

    async fn append_turn(&self, user: &ChatMessage, bot: &ChatMessage) -> Result<(), ChatError> {
        let (user, bot) = (user.clone(), bot.clone());
        self.blocking(move |repo| Ok(repo.save_all(&[&user, &bot])?))
            .await
    }
}

// =============================================================================
// InMemoryConversationStore
// =============================================================================

/// Process-local store, mainly for tests and demos.
#[derive(Debug, Default)]
pub struct InMemoryConversationStore {
    conversations: Mutex<HashMap<String, Vec<ChatMessage>>>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<String, Vec<ChatMessage>>>, ChatError> {
        self.conversations
            .lock()
            .map_err(|e| ChatError::Storage(format!("conversation lock poisoned: {}", e)))
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn append(&self, message: &ChatMessage) -> Result<(), ChatError> {
        self.lock()?
            .entry(message.conversation_id.clone())
            .or_default()
            .push(message.clone());
        Ok(())
    }

    async fn list_by_conversation(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<ChatMessage>, ChatError> {
        Ok(self
            .lock()?
            .get(conversation_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn append_turn(&self, user: &ChatMessage, bot: &ChatMessage) -> Result<(), ChatError> {
        let mut conversations = self.lock()?;
        conversations
            .entry(user.conversation_id.clone())
            .or_default()
            .push(user.clone());
        conversations
            .entry(bot.conversation_id.clone())
            .or_default()
            .push(bot.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parley_storage::Database;

    use super::*;

    fn sqlite_store() -> SqliteConversationStore {
        let db = Arc::new(Database::in_memory().unwrap());
        SqliteConversationStore::new(MessageRepository::new(db))
    }

    async fn assert_append_order(store: &dyn ConversationStore) {
        for n in [0usize, 1, 5] {
            let conv = format!("conv-{}", n);
            let mut expected = Vec::new();
            for i in 0..n {
                let msg = ChatMessage::user(conv.as_str(), format!("m{}", i));
                store.append(&msg).await.unwrap();
                expected.push(msg);
            }
            assert_eq!(store.list_by_conversation(&conv).await.unwrap(), expected);
        }
    }

    #[tokio::test]
    async fn test_in_memory_append_order() {
        assert_append_order(&InMemoryConversationStore::new()).await;
    }

    #[tokio::test]
    async fn test_sqlite_append_order() {
        assert_append_order(&sqlite_store()).await;
    }

    #[tokio::test]
    async fn test_append_turn_user_first() {
        let stores: Vec<Box<dyn ConversationStore>> = vec![
            Box::new(InMemoryConversationStore::new()),
            Box::new(sqlite_store()),
        ];
        for store in stores {
            let user = ChatMessage::user("c1", "question");
            let bot = ChatMessage::bot("c1", "answer");
            store.append_turn(&user, &bot).await.unwrap();

            let listed = store.list_by_conversation("c1").await.unwrap();
            assert_eq!(listed, vec![user, bot]);
        }
    }

    #[tokio::test]
    async fn test_unknown_conversation_is_empty() {
        let store = sqlite_store();
        assert!(store.list_by_conversation("nope").await.unwrap().is_empty());
        let store = InMemoryConversationStore::new();
        assert!(store.list_by_conversation("nope").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sqlite_duplicate_id_is_storage_error() {
        let store = sqlite_store();
        let msg = ChatMessage::user("c1", "once");
        store.append(&msg).await.unwrap();
        let err = store.append(&msg).await.unwrap_err();
        assert!(matches!(err, ChatError::Storage(_)));
    }
}
