//! Repository for the SQLite-backed chat log.

use std::sync::Arc;

use rusqlite::Connection;
use uuid::Uuid;

use parley_core::error::ParleyError;
use parley_core::types::{AuthorRole, ChatMessage};

use crate::db::Database;

/// Append-only repository of chat messages keyed by conversation id.
#[derive(Debug, Clone)]
pub struct MessageRepository {
    db: Arc<Database>,
}

impl MessageRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Append a single message.
    pub fn save(&self, message: &ChatMessage) -> Result<(), ParleyError> {
        self.db.with_conn(|conn| insert(conn, message))
    }

    /// Append several messages in one transaction, in slice order.
    ///
    /// Either every message is stored or none is.
    pub fn save_all(&self, messages: &[&ChatMessage]) -> Result<(), ParleyError> {
        self.db.with_conn(|conn| {
            let tx = conn
                .unchecked_transaction()
                .map_err(|e| ParleyError::Storage(format!("Failed to begin transaction: {}", e)))?;
            for message in messages {
                insert(&tx, message)?;
            }
            tx.commit()
                .map_err(|e| ParleyError::Storage(format!("Failed to commit messages: {}", e)))
        })
    }

    /// All messages of a conversation in append order.
    ///
    /// An unknown conversation yields an empty list.
    pub fn list_by_conversation(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<ChatMessage>, ParleyError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, conversation_id, author_role, message, timestamp
                     FROM chat_messages
                     WHERE conversation_id = ?1
                     ORDER BY seq ASC",
                )
                .map_err(|e| ParleyError::Storage(e.to_string()))?;

            let rows = stmt
                .query_map(rusqlite::params![conversation_id], |row| {
                    Ok(row_to_message(row))
                })
                .map_err(|e| ParleyError::Storage(e.to_string()))?;

            let mut messages = Vec::new();
            for row in rows {
                let message = row.map_err(|e| ParleyError::Storage(e.to_string()))??;
                messages.push(message);
            }
            Ok(messages)
        })
    }
}

fn insert(conn: &Connection, message: &ChatMessage) -> Result<(), ParleyError> {
    conn.execute(
        "INSERT INTO chat_messages (id, conversation_id, author_role, message, timestamp)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![
            message.id.to_string(),
            message.conversation_id,
            message.author_role.as_str(),
            message.message,
            message.timestamp,
        ],
    )
    .map_err(|e| ParleyError::Storage(format!("Failed to save message: {}", e)))?;
    Ok(())
}

fn row_to_message(row: &rusqlite::Row<'_>) -> Result<ChatMessage, ParleyError> {
    let id: String = row.get(0).map_err(|e| ParleyError::Storage(e.to_string()))?;
    let conversation_id: String = row.get(1).map_err(|e| ParleyError::Storage(e.to_string()))?;
    let role: String = row.get(2).map_err(|e| ParleyError::Storage(e.to_string()))?;
    let message: String = row.get(3).map_err(|e| ParleyError::Storage(e.to_string()))?;
    let timestamp: i64 = row.get(4).map_err(|e| ParleyError::Storage(e.to_string()))?;

    Ok(ChatMessage {
        id: Uuid::parse_str(&id)
            .map_err(|e| ParleyError::Storage(format!("Invalid message id {}: {}", id, e)))?,
        conversation_id,
        author_role: role.parse::<AuthorRole>()?,
        message,
        timestamp,
    })
}
