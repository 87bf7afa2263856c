//! Rendering: draws the full scene through a [`Surface`].
//!
//! Every redraw is a full repaint in a fixed layer order: clear, background,
//! committed shapes in list order, the preview shape in the accent color, then
//! the eraser trail and eraser cursor. Overlays come last so they are never
//! hidden under committed shapes.
//!
//! The browser implementation of [`Surface`] wraps
//! [`web_sys::CanvasRenderingContext2d`]; fallible `Canvas2D` calls propagate
//! `JsValue` errors to [`crate::engine::Engine::render`].

#[cfg(test)]
#[path = "render_test.rs"]
mod render_test;

use std::f64::consts::PI;

use shapes::{Geometry, Shape, ShapeList};
use wasm_bindgen::JsValue;
use web_sys::CanvasRenderingContext2d;

use crate::consts::{ERASER_CURSOR_RADIUS_PX, ERASER_TRAIL_WIDTH_PX, STROKE_WIDTH_PX};
use crate::geom::{Point, circle_from_box};

/// Drawing primitives the renderer needs.
pub trait Surface {
    type Error;

    fn clear(&mut self, width: f64, height: f64) -> Result<(), Self::Error>;
    fn fill_background(&mut self, color: &str, width: f64, height: f64) -> Result<(), Self::Error>;
    fn stroke_rect(&mut self, x: f64, y: f64, width: f64, height: f64, color: &str) -> Result<(), Self::Error>;
    fn stroke_circle(&mut self, center: Point, radius: f64, color: &str) -> Result<(), Self::Error>;
    fn stroke_segment(&mut self, a: Point, b: Point, color: &str) -> Result<(), Self::Error>;
    fn stroke_trail(&mut self, points: &[Point], color: &str) -> Result<(), Self::Error>;
    fn eraser_cursor(&mut self, center: Point, radius: f64, color: &str) -> Result<(), Self::Error>;
}

/// Scene colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub background: &'static str,
    pub foreground: &'static str,
    pub accent: &'static str,
    pub trail: &'static str,
    pub cursor: &'static str,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            background: "#121212",
            foreground: "#ffffff",
            accent: "#4f9dff",
            trail: "rgba(255, 255, 255, 0.35)",
            cursor: "rgba(255, 255, 255, 0.6)",
        }
    }
}

/// Read-only view of everything one frame needs.
#[derive(Debug, Clone, Copy)]
pub struct Scene<'a> {
    pub shapes: &'a ShapeList,
    pub preview: Option<&'a Shape>,
    pub eraser_trail: &'a [Point],
    /// Eraser cursor position; `None` unless the eraser is active and the
    /// pointer is over the canvas.
    pub eraser_cursor: Option<Point>,
    pub width: f64,
    pub height: f64,
}

/// Draw the full scene.
///
/// # Errors
///
/// Returns the surface's error if any drawing call fails.
pub fn draw<S: Surface>(surface: &mut S, scene: &Scene<'_>, palette: &Palette) -> Result<(), S::Error> {
    surface.clear(scene.width, scene.height)?;
    surface.fill_background(palette.background, scene.width, scene.height)?;

    for shape in scene.shapes {
        draw_shape(surface, shape, palette.foreground)?;
    }

    if let Some(preview) = scene.preview {
        draw_shape(surface, preview, palette.accent)?;
    }

    if scene.eraser_trail.len() > 1 {
        surface.stroke_trail(scene.eraser_trail, palette.trail)?;
    }

    if let Some(center) = scene.eraser_cursor {
        surface.eraser_cursor(center, ERASER_CURSOR_RADIUS_PX, palette.cursor)?;
    }

    Ok(())
}

fn draw_shape<S: Surface>(surface: &mut S, shape: &Shape, color: &str) -> Result<(), S::Error> {
    match &shape.geometry {
        Geometry::Rect { x, y, width, height } => surface.stroke_rect(*x, *y, *width, *height, color),
        Geometry::Circle { x, y, width, height } => {
            let (center, radius) = circle_from_box(*x, *y, *width, *height);
            surface.stroke_circle(center, radius, color)
        }
        Geometry::Pencil { start_x, start_y, end_x, end_y, .. } => {
            surface.stroke_segment(Point::new(*start_x, *start_y), Point::new(*end_x, *end_y), color)
        }
    }
}

// =============================================================================
// Canvas2D
// =============================================================================

impl Surface for CanvasRenderingContext2d {
    type Error = JsValue;

    fn clear(&mut self, width: f64, height: f64) -> Result<(), JsValue> {
        self.clear_rect(0.0, 0.0, width, height);
        Ok(())
    }

    fn fill_background(&mut self, color: &str, width: f64, height: f64) -> Result<(), JsValue> {
        self.set_fill_style_str(color);
        self.fill_rect(0.0, 0.0, width, height);
        Ok(())
    }

    fn stroke_rect(&mut self, x: f64, y: f64, width: f64, height: f64, color: &str) -> Result<(), JsValue> {
        apply_stroke_style(self, color, STROKE_WIDTH_PX);
        CanvasRenderingContext2d::stroke_rect(self, x, y, width, height);
        Ok(())
    }

    fn stroke_circle(&mut self, center: Point, radius: f64, color: &str) -> Result<(), JsValue> {
        apply_stroke_style(self, color, STROKE_WIDTH_PX);
        self.begin_path();
        self.arc(center.x, center.y, radius, 0.0, 2.0 * PI)?;
        self.stroke();
        Ok(())
    }

    fn stroke_segment(&mut self, a: Point, b: Point, color: &str) -> Result<(), JsValue> {
        apply_stroke_style(self, color, STROKE_WIDTH_PX);
        self.begin_path();
        self.move_to(a.x, a.y);
        self.line_to(b.x, b.y);
        self.stroke();
        Ok(())
    }

    fn stroke_trail(&mut self, points: &[Point], color: &str) -> Result<(), JsValue> {
        let Some((first, rest)) = points.split_first() else {
            return Ok(());
        };
        apply_stroke_style(self, color, ERASER_TRAIL_WIDTH_PX);
        self.begin_path();
        self.move_to(first.x, first.y);
        for p in rest {
            self.line_to(p.x, p.y);
        }
        self.stroke();
        Ok(())
    }

    fn eraser_cursor(&mut self, center: Point, radius: f64, color: &str) -> Result<(), JsValue> {
        apply_stroke_style(self, color, ERASER_TRAIL_WIDTH_PX);
        self.begin_path();
        self.arc(center.x, center.y, radius, 0.0, 2.0 * PI)?;
        self.stroke();
        Ok(())
    }
}

fn apply_stroke_style(ctx: &CanvasRenderingContext2d, color: &str, width: f64) {
    ctx.set_stroke_style_str(color);
    ctx.set_line_width(width);
}
