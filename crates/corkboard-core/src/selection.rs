//! Local selection state.

use kurbo::Rect;

use crate::collection::ObjectCollection;
use crate::object::ObjectId;

/// Ids of the objects the local user has selected, in selection order.
///
/// Selection is never synchronized; each session keeps its own.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    ids: Vec<ObjectId>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ids(&self) -> &[ObjectId] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.ids.contains(&id)
    }

    /// Select exactly one object.
    pub fn select(&mut self, id: ObjectId) {
        self.ids.clear();
        self.ids.push(id);
    }

    /// Replace the selection.
    pub fn set(&mut self, ids: impl IntoIterator<Item = ObjectId>) {
        self.ids.clear();
        for id in ids {
            self.add(id);
        }
    }

    /// Add to the selection (shift-click).
    pub fn add(&mut self, id: ObjectId) {
        if !self.contains(id) {
            self.ids.push(id);
        }
    }

    /// Add if absent, remove if present.
    pub fn toggle(&mut self, id: ObjectId) {
        match self.ids.iter().position(|&s| s == id) {
            Some(pos) => {
                self.ids.remove(pos);
            }
            None => self.ids.push(id),
        }
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    /// Drop ids that no longer exist in `objects`.
    /// Returns true if anything was removed.
    pub fn retain_existing(&mut self, objects: &ObjectCollection) -> bool {
        let before = self.ids.len();
        self.ids.retain(|&id| objects.contains(id));
        self.ids.len() != before
    }

    /// Union of the selected objects' bounds.
    pub fn bounds(&self, objects: &ObjectCollection) -> Option<Rect> {
        self.ids
            .iter()
            .filter_map(|&id| objects.get(id))
            .filter_map(|o| objects.resolved_bounds(o))
            .reduce(|a, b| a.union(b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{BoardObject, StickyNote};
    use kurbo::Point;

    fn board() -> ObjectCollection {
        (1..=3)
            .map(|id| {
                let mut n = StickyNote::new(Point::new(id as f64 * 200.0, 0.0), "");
                n.id = id;
                BoardObject::StickyNote(n)
            })
            .collect()
    }

    #[test]
    fn test_toggle_and_set() {
        let mut s = Selection::new();
        s.set([1, 2, 2]);
        assert_eq!(s.ids(), &[1, 2]);
        s.toggle(1);
        assert_eq!(s.ids(), &[2]);
        s.toggle(3);
        assert_eq!(s.ids(), &[2, 3]);
        s.select(1);
        assert_eq!(s.ids(), &[1]);
    }

    #[test]
    fn test_retain_existing() {
        let mut s = Selection::new();
        s.set([1, 9]);
        assert!(s.retain_existing(&board()));
        assert_eq!(s.ids(), &[1]);
        assert!(!s.retain_existing(&board()));
    }

    #[test]
    fn test_bounds_union() {
        let mut s = Selection::new();
        s.set([1, 3]);
        let b = s.bounds(&board()).unwrap();
        assert!((b.x0 - 200.0).abs() < f64::EPSILON);
        assert!((b.x1 - 700.0).abs() < f64::EPSILON);
        assert!(Selection::new().bounds(&board()).is_none());
    }
}
