//! Persistence service: background writer for room messages.
//!
//! DESIGN
//! ======
//! Live edits are persisted off the broadcast path. Room operations enqueue a
//! [`PersistOp`] with a non-blocking `try_send` while holding the room lock,
//! and a single worker applies the queue in order. FIFO order means a
//! deletion queued after its creation normally finds the stored record; the
//! remaining window (creation dropped or still retrying) is accepted.
//!
//! Each queued op bumps its room's pending-write count, and the worker
//! re-checks eviction once the op is done, so a room is never dropped from
//! memory while storage still lags behind it.
//!
//! ERROR HANDLING
//! ==============
//! Store failures are retried with linear back-off, then logged and dropped.
//! A full or closed queue drops the write with a warning. Neither ever rolls
//! back the cache or the broadcast already delivered.

use std::sync::Arc;
use std::time::Duration;

use shapes::{RoomId, ShapeId};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, info, warn};

use crate::config::env_parse;
use crate::services::store::{MessageStore, StoreError};
use crate::state::{AppState, Room, RoomRegistry};

const DEFAULT_PERSIST_QUEUE_CAPACITY: usize = 8192;
const DEFAULT_PERSIST_RETRIES: usize = 3;
const DEFAULT_PERSIST_RETRY_BASE_MS: u64 = 20;

/// Tuning knobs for the persistence worker, loaded from environment variables.
#[derive(Debug, Clone, Copy)]
pub struct PersistConfig {
    /// Bounded channel capacity for the persist queue.
    pub queue_capacity: usize,
    /// Attempts per op before it is dropped.
    pub retries: usize,
    /// Delay unit for linear retry back-off, in milliseconds.
    pub retry_base_ms: u64,
}

impl PersistConfig {
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            queue_capacity: env_parse("PERSIST_QUEUE_CAPACITY", DEFAULT_PERSIST_QUEUE_CAPACITY).max(1),
            retries: env_parse("PERSIST_RETRIES", DEFAULT_PERSIST_RETRIES).max(1),
            retry_base_ms: env_parse("PERSIST_RETRY_BASE_MS", DEFAULT_PERSIST_RETRY_BASE_MS),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PersistKind {
    Append { user_id: String, message: String },
    Delete { ids: Vec<ShapeId> },
}

/// One queued storage write for a room.
#[derive(Debug)]
pub struct PersistOp {
    pub room_id: RoomId,
    pub room: Arc<Room>,
    pub kind: PersistKind,
}

/// Spawn the persistence worker and return its queue sender.
#[must_use]
pub fn spawn_persistence_worker(
    store: Arc<dyn MessageStore>,
    rooms: RoomRegistry,
    config: PersistConfig,
) -> mpsc::Sender<PersistOp> {
    let (tx, mut rx) = mpsc::channel::<PersistOp>(config.queue_capacity);

    info!(
        queue_capacity = config.queue_capacity,
        retries = config.retries,
        retry_base_ms = config.retry_base_ms,
        "persistence worker configured"
    );

    tokio::spawn(async move {
        while let Some(op) = rx.recv().await {
            apply_with_retry(store.as_ref(), &op, config).await;
            op.room.end_write();
            rooms.try_evict(&op.room_id, &op.room).await;
        }
        info!("persistence worker stopped");
    });

    tx
}

/// Best-effort, non-blocking enqueue. Call while holding the room lock so
/// ops for one room are queued in the order they were applied.
pub fn enqueue(state: &AppState, op: PersistOp) {
    let Some(tx) = &state.persist_tx else {
        return;
    };

    op.room.begin_write();
    match tx.try_send(op) {
        Ok(()) => {}
        Err(TrySendError::Full(op)) => {
            op.room.end_write();
            warn!(room_id = %op.room_id, "persist queue full; dropping write");
        }
        Err(TrySendError::Closed(op)) => {
            op.room.end_write();
            warn!(room_id = %op.room_id, "persist queue closed; dropping write");
        }
    }
}

async fn apply_with_retry(store: &dyn MessageStore, op: &PersistOp, config: PersistConfig) {
    for attempt in 1..=config.retries {
        match apply(store, op).await {
            Ok(()) => return,
            Err(e) if attempt < config.retries => {
                warn!(
                    error = %e,
                    room_id = %op.room_id,
                    attempt,
                    total = config.retries,
                    "persist failed; retrying"
                );
                tokio::time::sleep(Duration::from_millis((attempt as u64) * config.retry_base_ms)).await;
            }
            Err(e) => {
                warn!(error = %e, room_id = %op.room_id, op = ?op.kind, "persist failed after retries; dropping write");
                return;
            }
        }
    }
}

async fn apply(store: &dyn MessageStore, op: &PersistOp) -> Result<(), StoreError> {
    match &op.kind {
        PersistKind::Append { user_id, message } => store.append_message(&op.room_id, user_id, message).await,
        PersistKind::Delete { ids } => {
            let deleted = store.delete_messages(&op.room_id, ids).await?;
            debug!(room_id = %op.room_id, requested = ids.len(), deleted, "persisted deletion");
            Ok(())
        }
    }
}

#[cfg(test)]
#[path = "persistence_test.rs"]
mod tests;
