//! Ordered shape list with id-based deduplication.
//!
//! Backs both the client's local shape list and the server's room cache.
//! Insertion order is draw order; an id appears at most once.

#[cfg(test)]
#[path = "list_test.rs"]
mod list_test;

use std::collections::HashSet;

use crate::shape::{Shape, ShapeId, StrokeId, decode_chat_message};

/// Insertion-ordered set of shapes keyed by id.
#[derive(Debug, Clone, Default)]
pub struct ShapeList {
    shapes: Vec<Shape>,
    ids: HashSet<ShapeId>,
}

impl ShapeList {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode stored `chat` message strings oldest-first, skipping entries that
    /// fail to decode or validate. Returns the list and the number skipped.
    pub fn from_messages<'a>(messages: impl IntoIterator<Item = &'a str>) -> (Self, usize) {
        let mut list = Self::new();
        let mut skipped = 0;
        for message in messages {
            match decode_chat_message(message) {
                Ok(shape) => {
                    list.push_unique(shape);
                }
                Err(_) => skipped += 1,
            }
        }
        (list, skipped)
    }

    /// Append a shape unless its id is already present. Returns `true` if added.
    pub fn push_unique(&mut self, shape: Shape) -> bool {
        if !self.ids.insert(shape.id.clone()) {
            return false;
        }
        self.shapes.push(shape);
        true
    }

    /// Remove every shape whose id is in `ids`. Returns how many were removed.
    pub fn remove_ids<'a>(&mut self, ids: impl IntoIterator<Item = &'a ShapeId>) -> usize {
        let doomed: HashSet<&ShapeId> = ids.into_iter().filter(|id| self.ids.contains(*id)).collect();
        if doomed.is_empty() {
            return 0;
        }
        self.shapes.retain(|shape| !doomed.contains(&shape.id));
        for id in &doomed {
            self.ids.remove(*id);
        }
        doomed.len()
    }

    /// Replace the list with `history`, keeping shapes already known locally
    /// that history does not contain after the history entries.
    pub fn merge_history(&mut self, history: ShapeList) {
        let local = std::mem::replace(self, history);
        for shape in local.shapes {
            self.push_unique(shape);
        }
    }

    /// Expand a deletion request so that targeting any segment of a stroke
    /// targets every segment of it.
    ///
    /// Ids come back in list order, followed by requested ids the list does
    /// not contain (they may only exist in storage).
    #[must_use]
    pub fn expand_strokes(&self, ids: &[ShapeId]) -> Vec<ShapeId> {
        let requested: HashSet<&ShapeId> = ids.iter().collect();
        let strokes: HashSet<&StrokeId> = self
            .shapes
            .iter()
            .filter(|shape| requested.contains(&shape.id))
            .filter_map(Shape::stroke_id)
            .collect();

        let mut out: Vec<ShapeId> = self
            .shapes
            .iter()
            .filter(|shape| requested.contains(&shape.id) || shape.stroke_id().is_some_and(|s| strokes.contains(s)))
            .map(|shape| shape.id.clone())
            .collect();

        let mut seen: HashSet<&ShapeId> = HashSet::new();
        for id in ids {
            if !self.ids.contains(id) && seen.insert(id) {
                out.push(id.clone());
            }
        }
        out
    }

    #[must_use]
    pub fn contains(&self, id: &ShapeId) -> bool {
        self.ids.contains(id)
    }

    #[must_use]
    pub fn get(&self, id: &ShapeId) -> Option<&Shape> {
        if !self.contains(id) {
            return None;
        }
        self.shapes.iter().find(|shape| &shape.id == id)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Shape> {
        self.shapes.iter()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Shape] {
        &self.shapes
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }
}

impl<'a> IntoIterator for &'a ShapeList {
    type Item = &'a Shape;
    type IntoIter = std::slice::Iter<'a, Shape>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl FromIterator<Shape> for ShapeList {
    fn from_iter<T: IntoIterator<Item = Shape>>(iter: T) -> Self {
        let mut list = Self::new();
        for shape in iter {
            list.push_unique(shape);
        }
        list
    }
}
