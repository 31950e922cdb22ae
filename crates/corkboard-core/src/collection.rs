//! Immutable, revisioned object collection.
//!
//! A collection is a cheap handle to one revision of a board. Every mutation
//! returns a new handle and leaves the old one untouched; unchanged objects
//! are shared between revisions, so change detection is pointer comparison.

use std::collections::HashSet;
use std::sync::Arc;

use kurbo::Rect;

use crate::geometry::{boxes_intersect, connector_endpoints};
use crate::object::{BoardObject, ObjectId};

/// One revision of a board's objects, in z-order (first is bottom-most).
#[derive(Debug, Clone, Default)]
pub struct ObjectCollection {
    objects: Arc<Vec<Arc<BoardObject>>>,
}

impl PartialEq for ObjectCollection {
    /// Value equality, object by object in order.
    fn eq(&self, other: &Self) -> bool {
        self.same_revision(other)
            || (self.len() == other.len()
                && self
                    .objects
                    .iter()
                    .zip(other.objects.iter())
                    .all(|(a, b)| Arc::ptr_eq(a, b) || a == b))
    }
}

impl ObjectCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a revision from owned objects.
    pub fn from_objects(objects: impl IntoIterator<Item = BoardObject>) -> Self {
        Self::from_shared(objects.into_iter().map(Arc::new).collect())
    }

    pub(crate) fn from_shared(objects: Vec<Arc<BoardObject>>) -> Self {
        Self {
            objects: Arc::new(objects),
        }
    }

    /// Check whether two handles point at the very same revision.
    pub fn same_revision(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.objects, &other.objects)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<BoardObject>> {
        self.objects.iter()
    }

    pub fn as_slice(&self) -> &[Arc<BoardObject>] {
        &self.objects
    }

    /// Owned copies of every object, for serialization.
    pub fn to_vec(&self) -> Vec<BoardObject> {
        self.objects.iter().map(|o| (**o).clone()).collect()
    }

    pub fn get(&self, id: ObjectId) -> Option<&Arc<BoardObject>> {
        self.objects.iter().find(|o| o.id() == id)
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.position(id).is_some()
    }

    /// Index of an object in z-order.
    pub fn position(&self, id: ObjectId) -> Option<usize> {
        self.objects.iter().position(|o| o.id() == id)
    }

    pub fn max_id(&self) -> Option<ObjectId> {
        self.objects.iter().map(|o| o.id()).max()
    }

    /// Append an object, or replace the object with the same id in place.
    pub fn with_object(&self, object: impl Into<Arc<BoardObject>>) -> Self {
        let object = object.into();
        let mut next = self.objects.as_ref().clone();
        match next.iter().position(|o| o.id() == object.id()) {
            Some(index) => next[index] = object,
            None => next.push(object),
        }
        Self::from_shared(next)
    }

    /// Insert an object at a z-order index (clamped), replacing any object
    /// that already carries its id.
    pub fn inserted_at(&self, index: usize, object: impl Into<Arc<BoardObject>>) -> Self {
        let object = object.into();
        let mut next: Vec<_> = self
            .objects
            .iter()
            .filter(|o| o.id() != object.id())
            .cloned()
            .collect();
        let index = index.min(next.len());
        next.insert(index, object);
        Self::from_shared(next)
    }

    /// Replace one object with an edited copy.
    ///
    /// Returns `None` if no object has `id`. The edit must not change the id.
    pub fn updated(&self, id: ObjectId, edit: impl FnOnce(&mut BoardObject)) -> Option<Self> {
        let index = self.position(id)?;
        let mut object = (*self.objects[index]).clone();
        edit(&mut object);
        object.set_id(id);
        let mut next = self.objects.as_ref().clone();
        next[index] = Arc::new(object);
        Some(Self::from_shared(next))
    }

    /// Remove objects by id, together with every connector attached to them.
    pub fn without(&self, ids: &[ObjectId]) -> Self {
        let doomed: HashSet<ObjectId> = ids.iter().copied().collect();
        let next = self
            .objects
            .iter()
            .filter(|o| {
                !doomed.contains(&o.id())
                    && !o
                        .as_connector()
                        .is_some_and(|c| doomed.contains(&c.from_id) || doomed.contains(&c.to_id))
            })
            .cloned()
            .collect();
        Self::from_shared(next)
    }

    /// An empty revision.
    pub fn cleared(&self) -> Self {
        Self::new()
    }

    /// Bounds of an object, resolving connectors from the objects they join.
    ///
    /// A connector whose endpoints do not resolve yields `None`.
    pub fn resolved_bounds(&self, object: &BoardObject) -> Option<Rect> {
        match object.as_connector() {
            Some(c) => {
                let from = self.get(c.from_id)?;
                let to = self.get(c.to_id)?;
                let ends = connector_endpoints(
                    from,
                    to,
                    c.from_anchor.as_deref(),
                    c.to_anchor.as_deref(),
                );
                Some(Rect::from_points(ends.start, ends.end))
            }
            None => Some(object.bounds()),
        }
    }

    /// Objects whose bounds overlap `rect`, in z-order.
    ///
    /// Used for viewport culling and marquee selection.
    pub fn objects_in_rect(&self, rect: Rect) -> Vec<&Arc<BoardObject>> {
        self.objects
            .iter()
            .filter(|o| {
                self.resolved_bounds(o)
                    .is_some_and(|b| boxes_intersect(b, rect))
            })
            .collect()
    }
}

impl FromIterator<BoardObject> for ObjectCollection {
    fn from_iter<I: IntoIterator<Item = BoardObject>>(iter: I) -> Self {
        Self::from_objects(iter)
    }
}
