//! Room service: sessions, membership, the room shape cache and fan-out.
//!
//! DESIGN
//! ======
//! A [`Session`] is one authenticated connection and the set of rooms it has
//! joined. Every room operation locks that room through the registry and does
//! all of its work under the lock: lazy cache load, cache mutation, broadcast
//! to members, and enqueueing the persistence write. Members of a room
//! therefore observe creations and deletions in exactly the order they were
//! applied to the cache. Storage writes happen later on the persistence
//! worker and never delay the broadcast.
//!
//! Broadcasts use `try_send`. A member whose connection is gone is removed on
//! the spot. A member whose queue is full is removed as well and its
//! [`LagSignal`] raised: having missed a message it could never converge, so
//! its connection closes and the client rejoins from stored history.
//!
//! ERROR HANDLING
//! ==============
//! Errors are scoped to the one caller. A cache load failure leaves the room
//! cold so the next access retries. Invalid shapes are reported as
//! [`RoomError::InvalidShape`] so the transport can drop them quietly.

#[cfg(test)]
#[path = "room_test.rs"]
mod tests;

use std::collections::HashSet;
use std::sync::Arc;

use shapes::{Envelope, ErrorCode, RoomId, ShapeError, ShapeId, ShapeList, decode_chat_message};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{info, warn};
use uuid::Uuid;

use crate::services::auth::Identity;
use crate::services::persistence::{self, PersistKind, PersistOp};
use crate::services::store::StoreError;
use crate::state::{AppState, LagSignal, Member, RoomState};

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    #[error("authentication required")]
    Unauthenticated,
    #[error("not a member of room {0}")]
    NotMember(RoomId),
    #[error("delete_shapes requires at least one id")]
    EmptyDeletion,
    #[error("invalid shape: {0}")]
    InvalidShape(#[from] ShapeError),
    #[error("room {room_id} unavailable: {source}")]
    Store {
        room_id: RoomId,
        #[source]
        source: StoreError,
    },
}

impl ErrorCode for RoomError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "E_UNAUTHENTICATED",
            Self::NotMember(_) => "E_NOT_MEMBER",
            Self::EmptyDeletion => "E_EMPTY_DELETION",
            Self::InvalidShape(_) => "E_INVALID_SHAPE",
            Self::Store { .. } => "E_STORE",
        }
    }
}

/// One authenticated connection.
#[derive(Debug)]
pub struct Session {
    pub client_id: Uuid,
    pub user_id: String,
    rooms: HashSet<RoomId>,
    tx: mpsc::Sender<Envelope>,
    lag: Arc<LagSignal>,
}

impl Session {
    #[must_use]
    pub fn is_member(&self, room_id: &RoomId) -> bool {
        self.rooms.contains(room_id)
    }

    /// Raised when a room drops this session for falling behind.
    #[must_use]
    pub fn lag_signal(&self) -> Arc<LagSignal> {
        self.lag.clone()
    }

    #[cfg(test)]
    pub fn rooms(&self) -> impl Iterator<Item = &RoomId> {
        self.rooms.iter()
    }
}

// =============================================================================
// SESSION LIFECYCLE
// =============================================================================

/// Register a connection with no room memberships. `tx` receives everything
/// broadcast to rooms the session joins.
///
/// # Errors
///
/// Returns [`RoomError::Unauthenticated`] if `identity` is absent or blank.
pub fn connect(identity: Option<Identity>, tx: mpsc::Sender<Envelope>) -> Result<Session, RoomError> {
    let Some(identity) = identity.filter(|id| !id.user_id.trim().is_empty()) else {
        return Err(RoomError::Unauthenticated);
    };
    let session = Session {
        client_id: Uuid::new_v4(),
        user_id: identity.user_id,
        rooms: HashSet::new(),
        tx,
        lag: Arc::default(),
    };
    info!(client_id = %session.client_id, user_id = %session.user_id, "session: connected");
    Ok(session)
}

/// Add the room to the session's memberships, loading the room cache if it is
/// cold. Idempotent.
///
/// # Errors
///
/// Returns [`RoomError::Store`] if the cache had to be loaded and storage
/// failed. The session does not join in that case.
pub async fn join(state: &AppState, session: &mut Session, room_id: RoomId) -> Result<(), RoomError> {
    let (room, mut guard) = state.rooms.lock_room(&room_id).await;
    if let Err(e) = ensure_loaded(state, &room_id, &mut guard).await {
        drop(guard);
        state.rooms.try_evict(&room_id, &room).await;
        return Err(e);
    }
    guard.members.insert(
        session.client_id,
        Member { user_id: session.user_id.clone(), tx: session.tx.clone(), lag: session.lag.clone() },
    );
    let members = guard.members.len();
    drop(guard);

    if session.rooms.insert(room_id.clone()) {
        info!(client_id = %session.client_id, %room_id, members, "session: joined room");
    }
    Ok(())
}

/// Remove the room from the session's memberships. Idempotent.
pub async fn leave(state: &AppState, session: &mut Session, room_id: &RoomId) {
    if !session.rooms.remove(room_id) {
        return;
    }
    remove_member(state, session.client_id, room_id).await;
    info!(client_id = %session.client_id, %room_id, "session: left room");
}

/// Drop every membership of the session. Room caches are left untouched.
pub async fn disconnect(state: &AppState, session: Session) {
    for room_id in &session.rooms {
        remove_member(state, session.client_id, room_id).await;
    }
    info!(client_id = %session.client_id, rooms = session.rooms.len(), "session: disconnected");
}

async fn remove_member(state: &AppState, client_id: Uuid, room_id: &RoomId) {
    let (room, mut guard) = state.rooms.lock_room(room_id).await;
    guard.members.remove(&client_id);
    drop(guard);
    state.rooms.try_evict(room_id, &room).await;
}

// =============================================================================
// SHAPE OPERATIONS
// =============================================================================

/// Apply a `chat` creation: cache the decoded shape, broadcast the raw
/// message to every member (sender included) and queue it for storage.
///
/// Returns `false` when a shape with the same id is already cached; nothing is
/// broadcast or stored then.
///
/// # Errors
///
/// [`RoomError::NotMember`] if the session has not joined the room,
/// [`RoomError::InvalidShape`] if `message` does not carry a valid shape,
/// [`RoomError::Store`] if a cold cache fails to load.
pub async fn create_shape(
    state: &AppState,
    session: &Session,
    room_id: &RoomId,
    message: String,
) -> Result<bool, RoomError> {
    if !session.is_member(room_id) {
        return Err(RoomError::NotMember(room_id.clone()));
    }
    let shape = decode_chat_message(&message)?;

    let (room, mut guard) = state.rooms.lock_room(room_id).await;
    let shapes = ensure_loaded(state, room_id, &mut guard).await?;
    let shape_id = shape.id.clone();
    if !shapes.push_unique(shape) {
        info!(client_id = %session.client_id, %room_id, %shape_id, "room: duplicate shape ignored");
        return Ok(false);
    }

    broadcast(&mut guard, room_id, &Envelope::Chat { room_id: room_id.clone(), message: message.clone() });
    persistence::enqueue(
        state,
        PersistOp {
            room_id: room_id.clone(),
            room: room.clone(),
            kind: PersistKind::Append { user_id: session.user_id.clone(), message },
        },
    );
    Ok(true)
}

/// Apply a deletion. Ids are expanded so that every segment of a targeted
/// stroke goes too; the expanded list is removed from the cache, broadcast to
/// every member and queued for storage. Returns the expanded ids.
///
/// # Errors
///
/// [`RoomError::EmptyDeletion`] for an empty `ids`, [`RoomError::NotMember`]
/// if the session has not joined the room, [`RoomError::Store`] if a cold
/// cache fails to load.
pub async fn delete_shapes(
    state: &AppState,
    session: &Session,
    room_id: &RoomId,
    ids: &[ShapeId],
) -> Result<Vec<ShapeId>, RoomError> {
    if ids.is_empty() {
        return Err(RoomError::EmptyDeletion);
    }
    if !session.is_member(room_id) {
        return Err(RoomError::NotMember(room_id.clone()));
    }

    let (room, mut guard) = state.rooms.lock_room(room_id).await;
    let shapes = ensure_loaded(state, room_id, &mut guard).await?;
    let expanded = shapes.expand_strokes(ids);
    let removed = shapes.remove_ids(&expanded);
    info!(client_id = %session.client_id, %room_id, requested = ids.len(), removed, "room: shapes deleted");

    broadcast(&mut guard, room_id, &Envelope::delete(room_id.clone(), expanded.clone()));
    persistence::enqueue(
        state,
        PersistOp { room_id: room_id.clone(), room: room.clone(), kind: PersistKind::Delete { ids: expanded.clone() } },
    );
    Ok(expanded)
}

// =============================================================================
// HELPERS
// =============================================================================

/// Load the room cache from storage if it is cold. Must be called with the
/// room lock held, which is what keeps concurrent joiners to one load.
async fn ensure_loaded<'a>(
    state: &AppState,
    room_id: &RoomId,
    room: &'a mut RoomState,
) -> Result<&'a mut ShapeList, RoomError> {
    if room.shapes.is_none() {
        let messages = state
            .store
            .query_messages(room_id)
            .await
            .map_err(|source| RoomError::Store { room_id: room_id.clone(), source })?;
        let (shapes, skipped) = ShapeList::from_messages(messages.iter().map(|row| row.message.as_str()));
        if skipped > 0 {
            warn!(%room_id, skipped, "room: skipped undecodable stored messages");
        }
        info!(%room_id, count = shapes.len(), "room: cache loaded");
        room.shapes = Some(shapes);
    }
    Ok(room.shapes.get_or_insert_with(ShapeList::new))
}

/// Send `envelope` to every member of the room. Closed members are removed;
/// members whose queue is full are removed and told they fell behind.
fn broadcast(room: &mut RoomState, room_id: &RoomId, envelope: &Envelope) {
    let mut closed = Vec::new();
    let mut lagging = Vec::new();
    for (client_id, member) in &room.members {
        match member.tx.try_send(envelope.clone()) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => lagging.push(*client_id),
            Err(TrySendError::Closed(_)) => closed.push(*client_id),
        }
    }
    for client_id in closed {
        room.members.remove(&client_id);
        info!(%room_id, %client_id, "room: removed closed member");
    }
    for client_id in lagging {
        if let Some(member) = room.members.remove(&client_id) {
            warn!(%room_id, %client_id, user_id = %member.user_id, "room: client queue full; dropping member");
            member.lag.raise();
        }
    }
}
