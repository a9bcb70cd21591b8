//! Turn orchestrator: drives one user message through the pipeline.
//!
//! Summarize -> classify intent -> retrieve memories -> respond -> persist.
//! Every step awaits the previous one. Nothing is written until the reply
//! exists, so a failed or cancelled turn leaves the chat log untouched.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use parley_core::config::ParleyConfig;
use parley_core::types::ChatMessage;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn, Instrument};
use uuid::Uuid;

use crate::error::ChatError;
use crate::generator::{Operation, TemplateArgs, TextGenerator};
use crate::memory::{render_memories, MemoryRetriever};
use crate::store::ConversationStore;
use crate::transcript::render_transcript;

/// Result count requested from the memory service on every turn.
pub const MEMORY_SEARCH_LIMIT: usize = 5;

/// Behaviour knobs fixed at construction.
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// Text of the bot message that opens a conversation.
    pub greeting: String,
    /// Run turns of the same conversation one at a time.
    pub serialize_per_conversation: bool,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            greeting: "Hello! How can I help you today?".to_string(),
            serialize_per_conversation: false,
        }
    }
}

impl From<&ParleyConfig> for OrchestratorSettings {
    fn from(config: &ParleyConfig) -> Self {
        Self {
            greeting: config.general.greeting.clone(),
            serialize_per_conversation: config.chat.serialize_per_conversation,
        }
    }
}

type TurnLocks = Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>;

/// Coordinates the store, the memory retriever and the text generator.
pub struct TurnOrchestrator {
    store: Arc<dyn ConversationStore>,
    retriever: Arc<dyn MemoryRetriever>,
    generator: Arc<dyn TextGenerator>,
    settings: OrchestratorSettings,
    turn_locks: TurnLocks,
}

impl TurnOrchestrator {
    pub fn new(
        store: Arc<dyn ConversationStore>,
        retriever: Arc<dyn MemoryRetriever>,
        generator: Arc<dyn TextGenerator>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            store,
            retriever,
            generator,
            settings,
            turn_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Process one user message and return the persisted bot reply.
    pub async fn handle_turn(
        &self,
        conversation_id: &str,
        user_text: &str,
    ) -> Result<ChatMessage, ChatError> {
        self.handle_turn_with_cancel(conversation_id, user_text, CancellationToken::new())
            .await
    }

    /// Like [`handle_turn`](Self::handle_turn), stopping early once `cancel` fires.
    ///
    /// Cancellation is honoured up to the moment persistence starts; after
    /// that the turn runs to completion.
    pub async fn handle_turn_with_cancel(
        &self,
        conversation_id: &str,
        user_text: &str,
        cancel: CancellationToken,
    ) -> Result<ChatMessage, ChatError> {
        if conversation_id.trim().is_empty() {
            return Err(ChatError::InvalidConversationId);
        }

        let span = tracing::info_span!("turn", conversation_id = %conversation_id);
        async {
            let result = if self.settings.serialize_per_conversation {
                self.run_serialized_turn(conversation_id, user_text, &cancel)
                    .await
            } else {
                self.run_turn(conversation_id, user_text, &cancel).await
            };

            match &result {
                Ok(bot) => info!(bot_message_id = %bot.id, "Turn complete"),
                Err(e) => warn!(error = %e, "Turn aborted"),
            }
            result
        }
        .instrument(span)
        .await
    }

    /// Open a new conversation with the configured greeting.
    pub async fn start_chat(&self) -> Result<ChatMessage, ChatError> {
        let conversation_id = Uuid::new_v4().to_string();
        let greeting = ChatMessage::bot(conversation_id, self.settings.greeting.clone());
        self.store.append(&greeting).await?;
        info!(conversation_id = %greeting.conversation_id, "Conversation started");
        Ok(greeting)
    }

    /// Stored messages of a conversation in append order.
    pub async fn history(&self, conversation_id: &str) -> Result<Vec<ChatMessage>, ChatError> {
        if conversation_id.trim().is_empty() {
            return Err(ChatError::InvalidConversationId);
        }
        self.store.list_by_conversation(conversation_id).await
    }

    async fn run_turn(
        &self,
        conversation_id: &str,
        user_text: &str,
        cancel: &CancellationToken,
    ) -> Result<ChatMessage, ChatError> {
        let user_message = ChatMessage::user(conversation_id, user_text.trim());

        let history = until_cancelled(cancel, self.store.list_by_conversation(conversation_id))
            .await?;
        let transcript = render_transcript(&history);
        debug!(history_len = history.len(), "History loaded");

        let summary = until_cancelled(
            cancel,
            self.generator.generate(
                Operation::Summarize,
                &TemplateArgs::new().with("input", transcript),
            ),
        )
        .await?;
        debug!(summary_len = summary.len(), "Summary generated");

        let intent = until_cancelled(
            cancel,
            self.generator.generate(
                Operation::ClassifyIntent,
                &TemplateArgs::new()
                    .with("input", user_text)
                    .with("summary", summary.as_str()),
            ),
        )
        .await?;
        debug!(intent = %intent, "Intent classified");

        let results = until_cancelled(
            cancel,
            self.retriever.search(&intent, MEMORY_SEARCH_LIMIT),
        )
        .await?;
        let memories = render_memories(&results);
        debug!(results = results.len(), "Memories retrieved");

        let reply = until_cancelled(
            cancel,
            self.generator.generate(
                Operation::Respond,
                &TemplateArgs::new()
                    .with("input", user_text)
                    .with("memories", memories)
                    .with("summary", summary),
            ),
        )
        .await?;
        let bot_message = ChatMessage::bot(conversation_id, reply);

        if cancel.is_cancelled() {
            return Err(ChatError::Cancelled);
        }
        self.store.append_turn(&user_message, &bot_message).await?;

        Ok(bot_message)
    }

    /// Run the turn while holding the conversation's lock.
    async fn run_serialized_turn(
        &self,
        conversation_id: &str,
        user_text: &str,
        cancel: &CancellationToken,
    ) -> Result<ChatMessage, ChatError> {
        let lease = self.turn_lease(conversation_id)?;
        let _guard = until_cancelled(cancel, async { Ok(lease.lock().await) }).await?;
        self.run_turn(conversation_id, user_text, cancel).await
    }

    fn turn_lease(&self, conversation_id: &str) -> Result<TurnLease<'_>, ChatError> {
        let mut locks = self
            .turn_locks
            .lock()
            .map_err(|e| ChatError::Storage(format!("turn lock map poisoned: {}", e)))?;
        let lock = Arc::clone(locks.entry(conversation_id.to_string()).or_default());
        Ok(TurnLease {
            locks: &self.turn_locks,
            conversation_id: conversation_id.to_string(),
            lock: Some(lock),
        })
    }
}

/// A turn's claim on its conversation lock.
///
/// Dropping the lease, including when the turn future itself is dropped,
/// removes the map entry once no other turn holds or awaits it.
struct TurnLease<'a> {
    locks: &'a TurnLocks,
    conversation_id: String,
    lock: Option<Arc<tokio::sync::Mutex<()>>>,
}

impl TurnLease<'_> {
    async fn lock(&self) -> Option<tokio::sync::MutexGuard<'_, ()>> {
        match self.lock.as_deref() {
            Some(lock) => Some(lock.lock().await),
            None => None,
        }
    }
}

impl Drop for TurnLease<'_> {
    fn drop(&mut self) {
        let Ok(mut locks) = self.locks.lock() else {
            return;
        };
        // Release our reference under the map lock so concurrent leases
        // agree on who removes the entry.
        drop(self.lock.take());
        if locks
            .get(&self.conversation_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.conversation_id);
        }
    }
}

/// Await `fut` unless `cancel` fires first.
async fn until_cancelled<T, F>(cancel: &CancellationToken, fut: F) -> Result<T, ChatError>
where
    F: Future<Output = Result<T, ChatError>>,
{
    if cancel.is_cancelled() {
        return Err(ChatError::Cancelled);
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ChatError::Cancelled),
        result = fut => result,
    }
}

// =============================================================================
// Tests
// =============================================================================
