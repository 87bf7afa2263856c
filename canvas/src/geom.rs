//! Plane geometry used by the eraser and the renderer.

#[cfg(test)]
#[path = "geom_test.rs"]
mod geom_test;

/// A point in canvas coordinates (CSS pixels).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Distance from `p` to the segment `a`→`b`.
///
/// Projects `p` onto the segment's line and clamps the projection to the
/// endpoints. A zero-length segment degrades to point distance.
#[must_use]
pub fn distance_to_segment(p: Point, a: Point, b: Point) -> f64 {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let (px, py) = (p.x - a.x, p.y - a.y);
    let len_sq = dx * dx + dy * dy;
    if len_sq < f64::EPSILON {
        return px.hypot(py);
    }
    let t = ((px * dx + py * dy) / len_sq).clamp(0.0, 1.0);
    let (cx, cy) = (a.x + t * dx, a.y + t * dy);
    (p.x - cx).hypot(p.y - cy)
}

/// Whether `p` lies inside the box anchored at (`x`, `y`) with signed
/// `width`/`height`. Edges count as inside.
#[must_use]
pub fn box_contains(p: Point, x: f64, y: f64, width: f64, height: f64) -> bool {
    let (left, right) = if width < 0.0 { (x + width, x) } else { (x, x + width) };
    let (top, bottom) = if height < 0.0 { (y + height, y) } else { (y, y + height) };
    p.x >= left && p.x <= right && p.y >= top && p.y <= bottom
}

/// Circle inscribed-by-diagonal convention: center is the box center and the
/// radius is half the box diagonal.
#[must_use]
pub fn circle_from_box(x: f64, y: f64, width: f64, height: f64) -> (Point, f64) {
    let center = Point::new(x + width / 2.0, y + height / 2.0);
    (center, width.hypot(height).abs() / 2.0)
}
