//! Eraser hit-testing.
//!
//! Resolution runs in two passes over the trail. Pass 1 tests every sampled
//! point against every shape not yet marked and collects direct hits. Pass 2
//! expands any hit pencil segment to every segment sharing its stroke, so a
//! stroke is only ever erased whole.

#[cfg(test)]
#[path = "hit_test.rs"]
mod hit_test;

use std::collections::HashSet;

use shapes::{Geometry, Shape, ShapeId, ShapeList};

use crate::consts::ERASER_HIT_THRESHOLD_PX;
use crate::geom::{Point, box_contains, distance_to_segment};

/// Whether `p` touches `shape`.
///
/// Rectangles and circles use an inclusive bounding-box test; pencil segments
/// are hit when `p` is strictly within [`ERASER_HIT_THRESHOLD_PX`] of the segment.
#[must_use]
pub fn shape_hit(shape: &Shape, p: Point) -> bool {
    match &shape.geometry {
        Geometry::Rect { x, y, width, height } | Geometry::Circle { x, y, width, height } => {
            box_contains(p, *x, *y, *width, *height)
        }
        Geometry::Pencil { start_x, start_y, end_x, end_y, .. } => {
            let a = Point::new(*start_x, *start_y);
            let b = Point::new(*end_x, *end_y);
            distance_to_segment(p, a, b) < ERASER_HIT_THRESHOLD_PX
        }
    }
}

/// Ids the eraser `trail` deletes from `shapes`, in list order.
#[must_use]
pub fn resolve_eraser(trail: &[Point], shapes: &ShapeList) -> Vec<ShapeId> {
    let mut marked: HashSet<&ShapeId> = HashSet::new();
    let mut direct: Vec<ShapeId> = Vec::new();

    for &p in trail {
        for shape in shapes {
            if marked.contains(&shape.id) {
                continue;
            }
            if shape_hit(shape, p) {
                marked.insert(&shape.id);
                direct.push(shape.id.clone());
            }
        }
    }

    if direct.is_empty() {
        return direct;
    }
    shapes.expand_strokes(&direct)
}
