//! Shared numeric constants for the canvas crate.

// ── Eraser ──────────────────────────────────────────────────────

/// A pencil segment is hit when a trail point lies strictly closer than this
/// many pixels to it.
pub const ERASER_HIT_THRESHOLD_PX: f64 = 10.0;

/// Radius of the circle drawn under the pointer while the eraser is active.
pub const ERASER_CURSOR_RADIUS_PX: f64 = 10.0;

/// Line width of the eraser trail overlay.
pub const ERASER_TRAIL_WIDTH_PX: f64 = 1.0;

// ── Strokes ─────────────────────────────────────────────────────

/// Line width used for every committed and preview shape.
pub const STROKE_WIDTH_PX: f64 = 2.0;
