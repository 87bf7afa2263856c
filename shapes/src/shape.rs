//! Shape model: the drawable primitives and their identifiers.
//!
//! DESIGN
//! ======
//! A shape is an id plus a `type`-tagged geometry. Field names on the wire
//! (`startX`, `strokeId`, ...) are fixed by messages already sitting in
//! storage, so serde attributes pin them rather than Rust naming.
//!
//! Identity is by `id` alone. Geometry never participates in equality for
//! deduplication or deletion.

#[cfg(test)]
#[path = "shape_test.rs"]
mod shape_test;

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// IDS
// =============================================================================

/// Unique identifier for a shape within a room. Generated client-side.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShapeId(String);

/// Identifier shared by every pencil segment of one freehand stroke.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StrokeId(String);

macro_rules! string_id {
    ($name:ident) => {
        impl $name {
            /// Fresh random id (UUID v4).
            #[must_use]
            pub fn generate() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            #[must_use]
            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(ShapeId);
string_id!(StrokeId);

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ShapeError {
    #[error("malformed shape payload: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("shape id is empty")]
    EmptyId,
    #[error("pencil segment {0} has an empty stroke id")]
    EmptyStrokeId(ShapeId),
    #[error("shape {0} has a non-finite coordinate")]
    NonFinite(ShapeId),
}

// =============================================================================
// SHAPE
// =============================================================================

/// Geometry of a shape, tagged by `type` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Geometry {
    /// Top-left anchored rectangle. Width and height may be negative when the
    /// drag went up or left.
    Rect { x: f64, y: f64, width: f64, height: f64 },
    /// Circle described by its bounding box; the box diagonal is the diameter.
    Circle { x: f64, y: f64, width: f64, height: f64 },
    /// One line segment of a freehand stroke.
    #[serde(rename_all = "camelCase")]
    Pencil { start_x: f64, start_y: f64, end_x: f64, end_y: f64, stroke_id: StrokeId },
}

/// A drawable primitive with its identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    pub id: ShapeId,
    #[serde(flatten)]
    pub geometry: Geometry,
}

impl Shape {
    #[must_use]
    pub fn rect(id: ShapeId, x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { id, geometry: Geometry::Rect { x, y, width, height } }
    }

    #[must_use]
    pub fn circle(id: ShapeId, x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { id, geometry: Geometry::Circle { x, y, width, height } }
    }

    #[must_use]
    pub fn pencil(id: ShapeId, start: (f64, f64), end: (f64, f64), stroke_id: StrokeId) -> Self {
        Self {
            id,
            geometry: Geometry::Pencil { start_x: start.0, start_y: start.1, end_x: end.0, end_y: end.1, stroke_id },
        }
    }

    /// Stroke this shape belongs to. `None` for rectangles and circles.
    #[must_use]
    pub fn stroke_id(&self) -> Option<&StrokeId> {
        match &self.geometry {
            Geometry::Pencil { stroke_id, .. } => Some(stroke_id),
            Geometry::Rect { .. } | Geometry::Circle { .. } => None,
        }
    }

    /// Check the structural invariants a decoded shape must satisfy.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant: empty id, empty stroke id, or a
    /// non-finite coordinate.
    pub fn validate(&self) -> Result<(), ShapeError> {
        if self.id.is_empty() {
            return Err(ShapeError::EmptyId);
        }
        let coords = match &self.geometry {
            Geometry::Rect { x, y, width, height } | Geometry::Circle { x, y, width, height } => {
                [*x, *y, *width, *height]
            }
            Geometry::Pencil { start_x, start_y, end_x, end_y, stroke_id } => {
                if stroke_id.is_empty() {
                    return Err(ShapeError::EmptyStrokeId(self.id.clone()));
                }
                [*start_x, *start_y, *end_x, *end_y]
            }
        };
        if coords.iter().any(|c| !c.is_finite()) {
            return Err(ShapeError::NonFinite(self.id.clone()));
        }
        Ok(())
    }
}

// =============================================================================
// CHAT PAYLOAD CODEC
// =============================================================================

#[derive(Serialize)]
struct ChatPayloadRef<'a> {
    shape: &'a Shape,
}

#[derive(Deserialize)]
struct ChatPayload {
    shape: Shape,
}

/// Encode a shape as the `{"shape": ...}` string carried in a `chat` message.
///
/// # Errors
///
/// Returns [`ShapeError::Malformed`] if serialization fails.
pub fn encode_chat_message(shape: &Shape) -> Result<String, ShapeError> {
    Ok(serde_json::to_string(&ChatPayloadRef { shape })?)
}

/// Decode and validate the shape inside a `chat` message string.
///
/// # Errors
///
/// Returns [`ShapeError::Malformed`] for unparsable JSON or missing fields,
/// otherwise the first invariant [`Shape::validate`] rejects.
pub fn decode_chat_message(message: &str) -> Result<Shape, ShapeError> {
    let payload: ChatPayload = serde_json::from_str(message)?;
    payload.shape.validate()?;
    Ok(payload.shape)
}
