//! Shared shape model and wire envelope for realtime drawing rooms.
//!
//! This crate owns the vocabulary used by both `server` and `canvas`: the
//! three drawable shape variants, stroke grouping for freehand pencil
//! segments, the ordered id-deduplicated shape list that backs both the
//! client's local copy and the server's room cache, and the JSON envelope
//! exchanged over the websocket.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`shape`] | `Shape`, ids, validation, `{"shape": ...}` chat payload codec |
//! | [`list`] | `ShapeList` and stroke expansion for deletions |
//! | [`envelope`] | `Envelope` messages, `RoomId`, error codes |

pub mod envelope;
pub mod list;
pub mod shape;

pub use envelope::{DeletePayload, Envelope, ErrorCode, RoomId};
pub use list::ShapeList;
pub use shape::{Geometry, Shape, ShapeError, ShapeId, StrokeId, decode_chat_message, encode_chat_message};
