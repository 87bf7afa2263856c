//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor. It
//! holds the message store, the room registry, the persistence queue and the
//! token verifier.
//!
//! The registry map is only locked to look up, insert or evict a room entry.
//! Each room carries its own mutex; every load, mutation and broadcast for
//! that room happens while holding it, so rooms never contend with each other
//! and one room's events are applied and fanned out in a single order.
//!
//! EVICTION
//! ========
//! A room is removed from the registry once it has no members and no queued
//! persistence writes. Eviction only `try_lock`s the room, so a busy room is
//! simply kept and re-checked later. An evicted room is flagged; a task that
//! fetched the entry just before eviction sees the flag after locking and
//! retries against a fresh entry.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use shapes::{Envelope, RoomId, ShapeList};
use tokio::sync::{Mutex, Notify, OwnedMutexGuard, RwLock, mpsc};
use tracing::info;
use uuid::Uuid;

use crate::services::auth::TokenVerifier;
use crate::services::persistence::PersistOp;
use crate::services::store::MessageStore;

// =============================================================================
// ROOM STATE
// =============================================================================

/// A connection's registration in one room.
#[derive(Debug, Clone)]
pub struct Member {
    pub user_id: String,
    /// Outbound queue of the member's websocket task.
    pub tx: mpsc::Sender<Envelope>,
    /// Raised when the member is dropped for falling behind.
    pub lag: Arc<LagSignal>,
}

/// One-shot flag telling a connection it missed a broadcast. A connection
/// that missed one can no longer converge and must close so its client
/// resyncs from history.
#[derive(Debug, Default)]
pub struct LagSignal {
    raised: AtomicBool,
    notify: Notify,
}

impl LagSignal {
    pub fn raise(&self) {
        self.raised.store(true, Ordering::SeqCst);
        self.notify.notify_one();
    }

    #[must_use]
    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::SeqCst)
    }

    /// Resolves once the signal has been raised. Only one waiter is supported.
    pub async fn raised(&self) {
        if !self.is_raised() {
            self.notify.notified().await;
        }
    }
}

/// Per-room state guarded by the room mutex.
#[derive(Debug, Default)]
pub struct RoomState {
    /// Room shape cache. `None` until the first load from storage succeeds.
    pub shapes: Option<ShapeList>,
    /// Connected members: `client_id` -> member.
    pub members: HashMap<Uuid, Member>,
    evicted: bool,
}

/// One room: its serialized state plus a count of queued persistence writes.
#[derive(Debug, Default)]
pub struct Room {
    state: Arc<Mutex<RoomState>>,
    pending_writes: AtomicUsize,
}

impl Room {
    #[must_use]
    pub fn pending_writes(&self) -> usize {
        self.pending_writes.load(Ordering::SeqCst)
    }

    pub(crate) fn begin_write(&self) {
        self.pending_writes.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn end_write(&self) {
        self.pending_writes.fetch_sub(1, Ordering::SeqCst);
    }
}

// =============================================================================
// ROOM REGISTRY
// =============================================================================

/// Process-scoped registry of resident rooms. Cloning shares the registry.
#[derive(Clone, Default)]
pub struct RoomRegistry {
    rooms: Arc<RwLock<HashMap<RoomId, Arc<Room>>>>,
}

impl RoomRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock the room, creating its entry if needed. Waits for any operation
    /// already holding the room.
    pub async fn lock_room(&self, room_id: &RoomId) -> (Arc<Room>, OwnedMutexGuard<RoomState>) {
        loop {
            let room = self.get_or_insert(room_id).await;
            let guard = room.state.clone().lock_owned().await;
            if !guard.evicted {
                return (room, guard);
            }
        }
    }

    /// Evict `room` if it is still the registered entry for `room_id`, has no
    /// members, no pending writes and is not locked. Returns whether it was
    /// evicted.
    pub async fn try_evict(&self, room_id: &RoomId, room: &Arc<Room>) -> bool {
        let mut rooms = self.rooms.write().await;
        if !rooms.get(room_id).is_some_and(|current| Arc::ptr_eq(current, room)) {
            return false;
        }
        let Ok(mut guard) = room.state.try_lock() else {
            return false;
        };
        if !guard.members.is_empty() || room.pending_writes() > 0 {
            return false;
        }
        guard.evicted = true;
        rooms.remove(room_id);
        info!(%room_id, "room: evicted");
        true
    }

    /// Registered entry for `room_id`, if any.
    #[cfg(test)]
    pub async fn get(&self, room_id: &RoomId) -> Option<Arc<Room>> {
        self.rooms.read().await.get(room_id).cloned()
    }

    /// Number of resident rooms.
    pub async fn len(&self) -> usize {
        self.rooms.read().await.len()
    }

    #[cfg(test)]
    pub async fn is_empty(&self) -> bool {
        self.rooms.read().await.is_empty()
    }

    async fn get_or_insert(&self, room_id: &RoomId) -> Arc<Room> {
        if let Some(room) = self.rooms.read().await.get(room_id) {
            return room.clone();
        }
        let mut rooms = self.rooms.write().await;
        rooms.entry(room_id.clone()).or_default().clone()
    }
}

// =============================================================================
// APP STATE
// =============================================================================

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum; all inner fields are Arc-wrapped or Clone.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn MessageStore>,
    pub rooms: RoomRegistry,
    /// Persistence queue. `None` disables persistence of live edits.
    pub persist_tx: Option<mpsc::Sender<PersistOp>>,
    pub auth: Arc<TokenVerifier>,
    pub client_channel_capacity: usize,
}

impl AppState {
    #[must_use]
    pub fn new(
        store: Arc<dyn MessageStore>,
        rooms: RoomRegistry,
        persist_tx: Option<mpsc::Sender<PersistOp>>,
        auth: TokenVerifier,
        client_channel_capacity: usize,
    ) -> Self {
        Self { store, rooms, persist_tx, auth: Arc::new(auth), client_channel_capacity }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================


#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
