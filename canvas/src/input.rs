//! Input model: tools, UI state, and the gesture state machine.
//!
//! `Tool` captures what a pointer gesture will do. `InputState` is the active
//! gesture tracked between pointer-down and pointer-up, carrying everything
//! needed to stream pencil segments, size a preview, or collect an eraser
//! trail.

#[cfg(test)]
#[path = "input_test.rs"]
mod input_test;

use serde::{Deserialize, Serialize};
use shapes::{Shape, StrokeId};

use crate::geom::Point;

/// Which tool is currently active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    /// Freehand drawing, streamed as pencil segments (default).
    #[default]
    Pencil,
    /// Drag out a rectangle.
    Rect,
    /// Drag out a circle.
    Circle,
    /// Erase whatever the trail crosses.
    Eraser,
}

impl Tool {
    /// Parse a tool name as sent by the host toolbar.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "pencil" => Some(Self::Pencil),
            "rect" => Some(Self::Rect),
            "circle" => Some(Self::Circle),
            "eraser" => Some(Self::Eraser),
            _ => None,
        }
    }
}

/// Persistent UI state visible to the renderer.
#[derive(Debug, Clone, Default)]
pub struct UiState {
    /// Currently active tool.
    pub tool: Tool,
    /// Last known pointer position over the canvas. `None` after pointer-leave.
    pub cursor: Option<Point>,
}

/// Context for one pointer gesture, from down to up.
#[derive(Debug, Clone)]
pub enum Gesture {
    /// Freehand stroke. `anchor` advances to every sampled point.
    Pencil { anchor: Point, stroke_id: StrokeId },
    /// Rectangle or circle being sized from `anchor`.
    Box { tool: Tool, anchor: Point, preview: Option<Shape> },
    /// Eraser sweep; the trail is seeded with the down point.
    Eraser { trail: Vec<Point> },
}

/// Internal state for the input state machine.
#[derive(Debug, Clone, Default)]
pub enum InputState {
    /// No gesture in progress; waiting for the next pointer-down.
    #[default]
    Idle,
    /// A pointer is down and a gesture is being tracked.
    Dragging(Gesture),
}

impl InputState {
    #[must_use]
    pub fn is_dragging(&self) -> bool {
        matches!(self, Self::Dragging(_))
    }

    /// Preview shape of an in-progress rectangle/circle drag.
    #[must_use]
    pub fn preview(&self) -> Option<&Shape> {
        match self {
            Self::Dragging(Gesture::Box { preview, .. }) => preview.as_ref(),
            _ => None,
        }
    }

    /// Points of an in-progress eraser sweep. Empty otherwise.
    #[must_use]
    pub fn eraser_trail(&self) -> &[Point] {
        match self {
            Self::Dragging(Gesture::Eraser { trail }) => trail,
            _ => &[],
        }
    }
}
