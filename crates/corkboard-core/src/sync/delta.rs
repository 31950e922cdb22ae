//! Change-sets between two collection revisions.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::collection::ObjectCollection;
use crate::object::{BoardObject, ObjectId};

/// A single step in an operation list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum Operation {
    /// Add an object. An object with the same id is replaced.
    Create {
        object: Arc<BoardObject>,
        /// Z-order index in the sender's collection.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        index: Option<usize>,
    },
    /// Replace an existing object in place.
    Update { object: Arc<BoardObject> },
    /// Remove an object and any connector attached to it.
    Delete { id: ObjectId },
}

/// Payload of one board broadcast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ChangeSet {
    /// Replay these operations in order.
    Ops { ops: Vec<Operation> },
    /// Replace the whole collection.
    Full { objects: Vec<Arc<BoardObject>> },
}

impl ChangeSet {
    pub fn full(collection: &ObjectCollection) -> Self {
        ChangeSet::Full {
            objects: collection.as_slice().to_vec(),
        }
    }

    pub fn is_full(&self) -> bool {
        matches!(self, ChangeSet::Full { .. })
    }

    /// Apply to a collection, producing the next revision.
    pub fn apply(&self, current: &ObjectCollection) -> ObjectCollection {
        match self {
            ChangeSet::Ops { ops } => apply_ops(current, ops),
            ChangeSet::Full { objects } => ObjectCollection::from_shared(objects.clone()),
        }
    }

    /// Ids of every object this change-set carries.
    pub fn object_ids(&self) -> Vec<ObjectId> {
        match self {
            ChangeSet::Ops { ops } => ops
                .iter()
                .filter_map(|op| match op {
                    Operation::Create { object, .. } | Operation::Update { object } => {
                        Some(object.id())
                    }
                    Operation::Delete { .. } => None,
                })
                .collect(),
            ChangeSet::Full { objects } => objects.iter().map(|o| o.id()).collect(),
        }
    }
}

/// Operations that turn `old` into `new`.
///
/// Deletes come first, then creates and updates in ascending z-order of
/// `new`. Objects present in both revisions are compared by pointer, so an
/// object is only reported as updated if it was replaced. Pure z-order moves
/// of surviving objects are not expressed; see [`is_reordered`].
pub fn diff(old: &ObjectCollection, new: &ObjectCollection) -> Vec<Operation> {
    if old.same_revision(new) {
        return Vec::new();
    }

    let old_by_id: HashMap<ObjectId, &Arc<BoardObject>> =
        old.iter().map(|o| (o.id(), o)).collect();
    let new_ids: HashSet<ObjectId> = new.iter().map(|o| o.id()).collect();

    let mut ops: Vec<Operation> = old
        .iter()
        .filter(|o| !new_ids.contains(&o.id()))
        .map(|o| Operation::Delete { id: o.id() })
        .collect();

    for (index, object) in new.iter().enumerate() {
        match old_by_id.get(&object.id()) {
            None => ops.push(Operation::Create {
                object: object.clone(),
                index: Some(index),
            }),
            Some(prev) if !Arc::ptr_eq(prev, object) => ops.push(Operation::Update {
                object: object.clone(),
            }),
            Some(_) => {}
        }
    }

    ops
}

/// Check whether objects present in both revisions changed relative order.
pub fn is_reordered(old: &ObjectCollection, new: &ObjectCollection) -> bool {
    if old.same_revision(new) {
        return false;
    }
    let new_ids: HashSet<ObjectId> = new.iter().map(|o| o.id()).collect();
    let old_ids: HashSet<ObjectId> = old.iter().map(|o| o.id()).collect();
    let survivors_old = old.iter().map(|o| o.id()).filter(|id| new_ids.contains(id));
    let survivors_new = new.iter().map(|o| o.id()).filter(|id| old_ids.contains(id));
    !survivors_old.eq(survivors_new)
}

/// Choose the payload for a transition.
///
/// Returns `None` when nothing changed. Sends the full collection when more
/// than `full_ratio` of the new collection changed, or when the z-order of
/// surviving objects moved.
pub fn build_change_set(
    old: &ObjectCollection,
    new: &ObjectCollection,
    full_ratio: f64,
) -> Option<ChangeSet> {
    let ops = diff(old, new);
    let reordered = is_reordered(old, new);
    if ops.is_empty() && !reordered {
        return None;
    }
    if reordered || ops.len() as f64 > full_ratio * new.len() as f64 {
        return Some(ChangeSet::full(new));
    }
    Some(ChangeSet::Ops { ops })
}

/// Replay operations against a collection in list order.
///
/// Updates and deletes for unknown ids are ignored; peers may race a create
/// against a delete.
pub fn apply_ops(current: &ObjectCollection, ops: &[Operation]) -> ObjectCollection {
    if ops.is_empty() {
        return current.clone();
    }

    let mut objects: Vec<Arc<BoardObject>> = current.as_slice().to_vec();
    for op in ops {
        match op {
            Operation::Create { object, index } => {
                let existing = objects.iter().position(|o| o.id() == object.id());
                match (existing, index) {
                    (Some(pos), None) => objects[pos] = object.clone(),
                    (existing, Some(index)) => {
                        if let Some(pos) = existing {
                            objects.remove(pos);
                        }
                        let index = (*index).min(objects.len());
                        objects.insert(index, object.clone());
                    }
                    (None, None) => objects.push(object.clone()),
                }
            }
            Operation::Update { object } => {
                match objects.iter().position(|o| o.id() == object.id()) {
                    Some(pos) => objects[pos] = object.clone(),
                    None => log::debug!("Ignoring update for unknown object {}", object.id()),
                }
            }
            Operation::Delete { id } => {
                let before = objects.len();
                objects.retain(|o| o.id() != *id && !o.references(*id));
                if objects.len() == before {
                    log::debug!("Ignoring delete for unknown object {id}");
                }
            }
        }
    }
    ObjectCollection::from_shared(objects)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{Connector, StickyNote};
    use kurbo::{Point, Vec2};

    fn note(id: ObjectId, text: &str) -> BoardObject {
        let mut n = StickyNote::new(Point::new(id as f64 * 150.0, 0.0), text);
        n.id = id;
        BoardObject::StickyNote(n)
    }

    fn ten_notes() -> ObjectCollection {
        (1..=10).map(|id| note(id, "x")).collect()
    }

    fn nudge(c: &ObjectCollection, ids: &[ObjectId]) -> ObjectCollection {
        ids.iter().fold(c.clone(), |acc, id| {
            acc.updated(*id, |o| o.translate(Vec2::new(1.0, 0.0))).unwrap()
        })
    }

    #[test]
    fn test_diff_against_self_is_empty() {
        let c = ten_notes();
        assert!(diff(&c, &c).is_empty());
        // A different revision holding the same objects is also unchanged
        let copy = ObjectCollection::from_shared(c.as_slice().to_vec());
        assert!(diff(&c, &copy).is_empty());
        assert!(build_change_set(&c, &copy, 0.5).is_none());
    }

    #[test]
    fn test_create_from_empty() {
        let empty = ObjectCollection::new();
        let next = empty.with_object(note(1, "Hello"));
        let ops = diff(&empty, &next);
        assert_eq!(ops.len(), 1);
        assert!(matches!(&ops[0], Operation::Create { object, index: Some(0) } if object.id() == 1));

        let remote = apply_ops(&ObjectCollection::new(), &ops);
        assert_eq!(remote.len(), 1);
        match remote.get(1).map(|o| &**o) {
            Some(BoardObject::StickyNote(n)) => assert_eq!(n.text, "Hello"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_round_trip_reproduces_new() {
        let old = ten_notes();
        let new = nudge(&old, &[2, 7])
            .without(&[4])
            .inserted_at(3, note(11, "new"))
            .with_object(note(12, "top"));
        let ops = diff(&old, &new);
        assert!(!is_reordered(&old, &new));
        assert_eq!(apply_ops(&old, &ops), new);
    }

    #[test]
    fn test_deletes_come_first() {
        let old = ten_notes();
        let new = old.without(&[5]).with_object(note(11, "n"));
        let ops = diff(&old, &new);
        assert!(matches!(ops[0], Operation::Delete { id: 5 }));
    }

    #[test]
    fn test_large_diff_falls_back_to_full() {
        let old = ten_notes();
        let small = nudge(&old, &[3]);
        assert!(matches!(
            build_change_set(&old, &small, 0.5),
            Some(ChangeSet::Ops { ops }) if ops.len() == 1
        ));

        let big = nudge(&old, &[1, 2, 3, 4, 5, 6]);
        assert!(build_change_set(&old, &big, 0.5).unwrap().is_full());

        // Exactly half is not "more than half"
        let half = nudge(&old, &[1, 2, 3, 4, 5]);
        assert!(!build_change_set(&old, &half, 0.5).unwrap().is_full());

        let cleared = old.cleared();
        assert!(build_change_set(&old, &cleared, 0.5).unwrap().is_full());
    }

    #[test]
    fn test_reorder_sends_full() {
        let old = ten_notes();
        let moved = old.get(1).cloned().unwrap();
        let new = old.inserted_at(10, moved);
        assert!(is_reordered(&old, &new));
        let cs = build_change_set(&old, &new, 0.5).unwrap();
        assert!(cs.is_full());
        assert_eq!(cs.apply(&old), new);
    }

    #[test]
    fn test_unknown_ids_are_ignored() {
        let c = ten_notes();
        let ops = vec![
            Operation::Update {
                object: Arc::new(note(99, "ghost")),
            },
            Operation::Delete { id: 42 },
        ];
        assert_eq!(apply_ops(&c, &ops), c);
    }

    #[test]
    fn test_create_existing_id_replaces() {
        let c = ten_notes();
        let ops = vec![Operation::Create {
            object: Arc::new(note(3, "again")),
            index: None,
        }];
        let next = apply_ops(&c, &ops);
        assert_eq!(next.len(), 10);
        assert_eq!(next.position(3), Some(2));
    }

    #[test]
    fn test_remote_delete_cascades() {
        let mut conn = Connector::new(1, 2);
        conn.id = 20;
        let c = ten_notes().with_object(BoardObject::Connector(conn));
        let next = apply_ops(&c, &[Operation::Delete { id: 2 }]);
        assert!(!next.contains(2));
        assert!(!next.contains(20));
    }

    #[test]
    fn test_wire_format() {
        let cs = ChangeSet::Ops {
            ops: vec![Operation::Delete { id: 3 }],
        };
        let json = serde_json::to_value(&cs).unwrap();
        assert_eq!(json["kind"], "ops");
        assert_eq!(json["ops"][0]["op"], "delete");
        assert_eq!(json["ops"][0]["id"], 3);

        let parsed: ChangeSet = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, cs);
    }
}
