//! Envelope: the JSON message exchanged over the room websocket.
//!
//! DESIGN
//! ======
//! One `type`-tagged enum serves both directions. Clients send `join_room`,
//! `leave_room`, `chat` and `delete_shapes`; the server relays `chat` and
//! `delete_shapes` to room members and answers rejected operations with
//! `error`. A `chat` message carries the shape as an encoded string
//! (`{"shape": ...}`), which is also exactly what storage keeps.

#[cfg(test)]
#[path = "envelope_test.rs"]
mod envelope_test;

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::shape::{Shape, ShapeError, ShapeId, encode_chat_message};

// =============================================================================
// ROOM ID
// =============================================================================

/// Opaque room identifier. Accepted as a JSON string or integer, always
/// emitted as a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RoomId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for RoomId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for RoomId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(i64),
        }

        let id = match Raw::deserialize(deserializer)? {
            Raw::Text(text) => text.trim().to_owned(),
            Raw::Number(n) => n.to_string(),
        };
        if id.is_empty() {
            return Err(serde::de::Error::custom("room id is empty"));
        }
        Ok(Self(id))
    }
}

// =============================================================================
// ERROR CODES
// =============================================================================

/// Grepable error code for structured `error` envelopes.
pub trait ErrorCode: fmt::Display {
    fn error_code(&self) -> &'static str;
}

// =============================================================================
// ENVELOPE
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeletePayload {
    pub ids: Vec<ShapeId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Envelope {
    #[serde(rename_all = "camelCase")]
    JoinRoom { room_id: RoomId },
    #[serde(rename_all = "camelCase")]
    LeaveRoom { room_id: RoomId },
    /// Shape creation. `message` is the encoded `{"shape": ...}` payload.
    #[serde(rename_all = "camelCase")]
    Chat { room_id: RoomId, message: String },
    #[serde(rename_all = "camelCase")]
    DeleteShapes { room_id: RoomId, payload: DeletePayload },
    /// Server-only: an operation from this connection was rejected.
    Error { code: String, message: String },
}

impl Envelope {
    #[must_use]
    pub fn join(room_id: RoomId) -> Self {
        Self::JoinRoom { room_id }
    }

    #[must_use]
    pub fn leave(room_id: RoomId) -> Self {
        Self::LeaveRoom { room_id }
    }

    /// Build a `chat` creation message for `shape`.
    ///
    /// # Errors
    ///
    /// Returns [`ShapeError::Malformed`] if the shape cannot be encoded.
    pub fn chat(room_id: RoomId, shape: &Shape) -> Result<Self, ShapeError> {
        Ok(Self::Chat { room_id, message: encode_chat_message(shape)? })
    }

    #[must_use]
    pub fn delete(room_id: RoomId, ids: Vec<ShapeId>) -> Self {
        Self::DeleteShapes { room_id, payload: DeletePayload { ids } }
    }

    #[must_use]
    pub fn error_from(err: &(impl ErrorCode + ?Sized)) -> Self {
        Self::Error { code: err.error_code().to_owned(), message: err.to_string() }
    }

    /// Room this message targets. `None` for `error`.
    #[must_use]
    pub fn room_id(&self) -> Option<&RoomId> {
        match self {
            Self::JoinRoom { room_id }
            | Self::LeaveRoom { room_id }
            | Self::Chat { room_id, .. }
            | Self::DeleteShapes { room_id, .. } => Some(room_id),
            Self::Error { .. } => None,
        }
    }

    /// Parse one inbound text message.
    ///
    /// # Errors
    ///
    /// Returns the serde error for invalid JSON, unknown `type`, or missing fields.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// # Errors
    ///
    /// Returns the serde error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
