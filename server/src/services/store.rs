//! Message store: durable storage of room `chat` messages.
//!
//! DESIGN
//! ======
//! Storage keeps the raw encoded `chat` message text, one row per created
//! shape, exactly as clients sent it. It knows nothing about shape ids
//! beyond what it can decode at delete time: `delete_messages` re-queries the
//! room, decodes each row's embedded shape and deletes the rows whose shape id
//! was requested. No message-id to shape-id mapping is kept in memory, so
//! deletion works across restarts.
//!
//! Two implementations: [`PgMessageStore`] over the `chats` table, and
//! [`MemoryMessageStore`] for running without a database and for tests.

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde::Serialize;
use shapes::{RoomId, ShapeId, decode_chat_message};
use sqlx::PgPool;
use tokio::sync::Mutex;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("store unavailable")]
    Unavailable,
}

/// One stored `chat` message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredMessage {
    pub id: i64,
    pub room_id: RoomId,
    pub user_id: String,
    pub message: String,
}

#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Append one encoded `chat` message to the room's history.
    async fn append_message(&self, room_id: &RoomId, user_id: &str, message: &str) -> Result<(), StoreError>;

    /// All messages of the room, oldest first.
    async fn query_messages(&self, room_id: &RoomId) -> Result<Vec<StoredMessage>, StoreError>;

    /// Delete every stored message of the room whose embedded shape id is in
    /// `ids`. Returns the number of rows deleted.
    async fn delete_messages(&self, room_id: &RoomId, ids: &[ShapeId]) -> Result<u64, StoreError>;
}

/// Row ids of the messages whose decoded shape id is in `ids`. Rows that do
/// not decode never match.
#[must_use]
pub fn matching_message_ids(messages: &[StoredMessage], ids: &[ShapeId]) -> Vec<i64> {
    let wanted: HashSet<&ShapeId> = ids.iter().collect();
    messages
        .iter()
        .filter(|row| decode_chat_message(&row.message).is_ok_and(|shape| wanted.contains(&shape.id)))
        .map(|row| row.id)
        .collect()
}

// =============================================================================
// POSTGRES
// =============================================================================

pub struct PgMessageStore {
    pool: PgPool,
}

impl PgMessageStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageStore for PgMessageStore {
    async fn append_message(&self, room_id: &RoomId, user_id: &str, message: &str) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO chats (room_id, user_id, message) VALUES ($1, $2, $3)")
            .bind(room_id.as_str())
            .bind(user_id)
            .bind(message)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn query_messages(&self, room_id: &RoomId) -> Result<Vec<StoredMessage>, StoreError> {
        let rows = sqlx::query_as::<_, (i64, String, String)>(
            "SELECT id, user_id, message FROM chats WHERE room_id = $1 ORDER BY id ASC",
        )
        .bind(room_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, user_id, message)| StoredMessage { id, room_id: room_id.clone(), user_id, message })
            .collect())
    }

    async fn delete_messages(&self, room_id: &RoomId, ids: &[ShapeId]) -> Result<u64, StoreError> {
        let messages = self.query_messages(room_id).await?;
        let doomed = matching_message_ids(&messages, ids);
        if doomed.is_empty() {
            return Ok(0);
        }
        let result = sqlx::query("DELETE FROM chats WHERE room_id = $1 AND id = ANY($2)")
            .bind(room_id.as_str())
            .bind(&doomed)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

// =============================================================================
// IN-MEMORY
// =============================================================================

/// Process-local store. Contents are lost on restart.
#[derive(Default)]
pub struct MemoryMessageStore {
    rows: Mutex<Vec<StoredMessage>>,
    next_id: AtomicUsize,
    #[cfg(test)]
    faults: faults::Faults,
}

impl MemoryMessageStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}


#[async_trait]
impl MessageStore for MemoryMessageStore {
    async fn append_message(&self, room_id: &RoomId, user_id: &str, message: &str) -> Result<(), StoreError> {
        #[cfg(test)]
        self.faults.check_available()?;
        let id = i64::try_from(self.next_id.fetch_add(1, Ordering::SeqCst) + 1).unwrap_or(i64::MAX);
        self.rows.lock().await.push(StoredMessage {
            id,
            room_id: room_id.clone(),
            user_id: user_id.to_owned(),
            message: message.to_owned(),
        });
        Ok(())
    }

    async fn query_messages(&self, room_id: &RoomId) -> Result<Vec<StoredMessage>, StoreError> {
        #[cfg(test)]
        self.faults.before_query().await?;
        let rows = self.rows.lock().await;
        Ok(rows.iter().filter(|row| &row.room_id == room_id).cloned().collect())
    }

    async fn delete_messages(&self, room_id: &RoomId, ids: &[ShapeId]) -> Result<u64, StoreError> {
        #[cfg(test)]
        self.faults.check_available()?;
        let mut rows = self.rows.lock().await;
        let in_room: Vec<StoredMessage> = rows.iter().filter(|row| &row.room_id == room_id).cloned().collect();
        let doomed: HashSet<i64> = matching_message_ids(&in_room, ids).into_iter().collect();
        let before = rows.len();
        rows.retain(|row| !doomed.contains(&row.id));
        Ok((before - rows.len()) as u64)
    }
}
