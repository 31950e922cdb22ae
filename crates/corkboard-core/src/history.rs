//! Per-user undo/redo history.
//!
//! Every local transition becomes an [`Action`] owned by the user who made
//! it. Undo and redo only ever touch the invoking user's actions, so two
//! people editing the same board never undo each other's work.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::collection::ObjectCollection;
use crate::object::{BoardObject, ObjectId};

/// How one object changed within an action.
///
/// `before` is `None` for a create and `after` is `None` for a delete.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub id: ObjectId,
    pub before: Option<Arc<BoardObject>>,
    pub after: Option<Arc<BoardObject>>,
    /// Z-order index before the change, for restoring a deleted object.
    pub before_index: Option<usize>,
    /// Z-order index after the change, for recreating a created object.
    pub after_index: Option<usize>,
}

impl HistoryEntry {
    pub fn is_create(&self) -> bool {
        self.before.is_none()
    }

    pub fn is_delete(&self) -> bool {
        self.after.is_none()
    }
}

/// One reversible user action.
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    pub user_id: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
    pub entries: Vec<HistoryEntry>,
    pub undone: bool,
}

/// Bounded list of actions from every user of a session.
#[derive(Debug)]
pub struct History {
    actions: Vec<Action>,
    limit: usize,
    suppress: bool,
}

impl History {
    pub fn new(limit: usize) -> Self {
        Self {
            actions: Vec::new(),
            limit: limit.max(1),
            suppress: false,
        }
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    /// Skip recording the next transition.
    ///
    /// Set by undo/redo themselves and by the session before it applies a
    /// remote change, which must not be attributed to the local user.
    pub fn suppress_next(&mut self) {
        self.suppress = true;
    }

    /// Record the transition `prev` → `next` as an action of `user_id`.
    ///
    /// Returns `false` if the transition was suppressed or changed nothing.
    pub fn record(
        &mut self,
        prev: &ObjectCollection,
        next: &ObjectCollection,
        user_id: &str,
        timestamp: u64,
    ) -> bool {
        if std::mem::take(&mut self.suppress) {
            return false;
        }
        let entries = entries_between(prev, next);
        if entries.is_empty() {
            return false;
        }

        self.actions.push(Action {
            user_id: user_id.to_string(),
            timestamp,
            entries,
            undone: false,
        });
        self.enforce_limit(user_id);
        true
    }

    /// Trim to the limit, dropping `user_id`'s dead redo entries first.
    fn enforce_limit(&mut self, user_id: &str) {
        while self.actions.len() > self.limit {
            let dead = self
                .actions
                .iter()
                .position(|a| a.user_id == user_id && a.undone);
            self.actions.remove(dead.unwrap_or(0));
        }
    }

    pub fn can_undo(&self, user_id: &str) -> bool {
        self.actions
            .iter()
            .any(|a| a.user_id == user_id && !a.undone)
    }

    pub fn can_redo(&self, user_id: &str) -> bool {
        self.actions
            .iter()
            .any(|a| a.user_id == user_id && a.undone)
    }

    /// Revert `user_id`'s most recent live action against `current`.
    ///
    /// Created objects are removed, updated objects go back to their previous
    /// version and deleted objects are restored at their old z-order index.
    /// Returns the resulting collection, or `None` if the user has nothing
    /// to undo.
    pub fn undo(&mut self, user_id: &str, current: &ObjectCollection) -> Option<ObjectCollection> {
        let index = self
            .actions
            .iter()
            .rposition(|a| a.user_id == user_id && !a.undone)?;
        let action = &mut self.actions[index];
        action.undone = true;

        let removed: Vec<ObjectId> = action
            .entries
            .iter()
            .filter(|e| e.is_create())
            .map(|e| e.id)
            .collect();
        let reverted = action
            .entries
            .iter()
            .filter_map(|e| e.before.as_ref().filter(|_| !e.is_delete()));
        let restored = action
            .entries
            .iter()
            .filter(|e| e.is_delete())
            .filter_map(|e| Some((e.before_index?, e.before.clone()?)));

        let next = rebuild(current, &removed, reverted, restored);
        self.suppress = true;
        Some(next)
    }

    /// Re-apply `user_id`'s oldest undone action against `current`.
    pub fn redo(&mut self, user_id: &str, current: &ObjectCollection) -> Option<ObjectCollection> {
        let index = self
            .actions
            .iter()
            .position(|a| a.user_id == user_id && a.undone)?;
        let action = &mut self.actions[index];
        action.undone = false;

        let removed: Vec<ObjectId> = action
            .entries
            .iter()
            .filter(|e| e.is_delete())
            .map(|e| e.id)
            .collect();
        let reapplied = action
            .entries
            .iter()
            .filter_map(|e| e.after.as_ref().filter(|_| !e.is_create()));
        let recreated = action
            .entries
            .iter()
            .filter(|e| e.is_create())
            .filter_map(|e| Some((e.after_index?, e.after.clone()?)));

        let next = rebuild(current, &removed, reapplied, recreated);
        self.suppress = true;
        Some(next)
    }

    /// Forget every action.
    pub fn clear(&mut self) {
        self.actions.clear();
        self.suppress = false;
    }
}

/// Per-object changes between two revisions.
fn entries_between(prev: &ObjectCollection, next: &ObjectCollection) -> Vec<HistoryEntry> {
    if prev.same_revision(next) {
        return Vec::new();
    }
    let prev_index: HashMap<ObjectId, usize> =
        prev.iter().enumerate().map(|(i, o)| (o.id(), i)).collect();
    let next_ids: HashSet<ObjectId> = next.iter().map(|o| o.id()).collect();

    let mut entries: Vec<HistoryEntry> = prev
        .iter()
        .enumerate()
        .filter(|(_, o)| !next_ids.contains(&o.id()))
        .map(|(i, o)| HistoryEntry {
            id: o.id(),
            before: Some(o.clone()),
            after: None,
            before_index: Some(i),
            after_index: None,
        })
        .collect();

    for (i, object) in next.iter().enumerate() {
        let prior = prev_index.get(&object.id()).map(|&pi| (pi, &prev.as_slice()[pi]));
        match prior {
            Some((_, old)) if Arc::ptr_eq(old, object) => {}
            Some((pi, old)) => entries.push(HistoryEntry {
                id: object.id(),
                before: Some(old.clone()),
                after: Some(object.clone()),
                before_index: Some(pi),
                after_index: Some(i),
            }),
            None => entries.push(HistoryEntry {
                id: object.id(),
                before: None,
                after: Some(object.clone()),
                before_index: None,
                after_index: Some(i),
            }),
        }
    }
    entries
}

/// Remove `removed` (with their connectors), replace `replaced` in place and
/// insert `inserted` in ascending index order.
fn rebuild<'a>(
    current: &ObjectCollection,
    removed: &[ObjectId],
    replaced: impl Iterator<Item = &'a Arc<BoardObject>>,
    inserted: impl Iterator<Item = (usize, Arc<BoardObject>)>,
) -> ObjectCollection {
    let mut objects: Vec<Arc<BoardObject>> = current.without(removed).as_slice().to_vec();

    for object in replaced {
        match objects.iter().position(|o| o.id() == object.id()) {
            Some(pos) => objects[pos] = object.clone(),
            None => log::debug!("Object {} no longer exists, skipping", object.id()),
        }
    }

    let mut inserted: Vec<_> = inserted.collect();
    inserted.sort_by_key(|(index, _)| *index);
    for (index, object) in inserted {
        if objects.iter().any(|o| o.id() == object.id()) {
            continue;
        }
        let index = index.min(objects.len());
        objects.insert(index, object);
    }

    ObjectCollection::from_shared(objects)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{Connector, StickyNote};
    use kurbo::{Point, Vec2};

    fn note(id: ObjectId) -> BoardObject {
        let mut n = StickyNote::new(Point::new(id as f64 * 150.0, 0.0), format!("n{id}"));
        n.id = id;
        BoardObject::StickyNote(n)
    }

    fn step(history: &mut History, prev: &ObjectCollection, next: ObjectCollection, user: &str) -> ObjectCollection {
        history.record(prev, &next, user, 0);
        next
    }

    #[test]
    fn test_undo_redo_symmetry() {
        let mut h = History::new(100);
        let start: ObjectCollection = (1..=3).map(note).collect();

        let mut c = start.clone();
        c = step(&mut h, &c, c.with_object(note(4)), "a");
        c = step(&mut h, &c, c.updated(2, |o| o.translate(Vec2::new(5.0, 5.0))).unwrap(), "a");
        c = step(&mut h, &c, c.without(&[1]), "a");
        c = step(&mut h, &c, c.inserted_at(0, note(5)), "a");
        let end = c.clone();

        for _ in 0..4 {
            let next = h.undo("a", &c).unwrap();
            // The undo's own transition is not recorded
            assert!(!h.record(&c, &next, "a", 0));
            c = next;
        }
        assert_eq!(c, start);
        assert!(!h.can_undo("a"));

        for _ in 0..4 {
            let next = h.redo("a", &c).unwrap();
            assert!(!h.record(&c, &next, "a", 0));
            c = next;
        }
        assert_eq!(c, end);
        assert!(!h.can_redo("a"));
    }

    #[test]
    fn test_per_user_isolation() {
        let mut h = History::new(100);
        let c = ObjectCollection::new();
        let c = step(&mut h, &c, c.with_object(note(1)), "a");
        assert!(h.can_undo("a"));
        assert!(!h.can_undo("b"));
        assert!(h.undo("b", &c).is_none());

        let c = step(&mut h, &c, c.with_object(note(2)), "b");
        // A's undo only removes A's note
        let after = h.undo("a", &c).unwrap();
        assert!(!after.contains(1));
        assert!(after.contains(2));
        assert!(h.can_undo("b"));
    }

    #[test]
    fn test_undo_restores_cascaded_connector() {
        let mut h = History::new(100);
        let mut conn = Connector::new(1, 2);
        conn.id = 3;
        let c: ObjectCollection = [note(1), note(2), BoardObject::Connector(conn)]
            .into_iter()
            .collect();
        let start = c.clone();
        let c = step(&mut h, &c, c.without(&[1]), "a");
        assert_eq!(c.len(), 1);
        let back = h.undo("a", &c).unwrap();
        assert_eq!(back, start);
    }

    #[test]
    fn test_suppressed_transition_not_recorded() {
        let mut h = History::new(100);
        let c = ObjectCollection::new();
        h.suppress_next();
        assert!(!h.record(&c, &c.with_object(note(1)), "a", 0));
        assert!(h.is_empty());
        // Flag only covers one transition
        assert!(h.record(&c, &c.with_object(note(1)), "a", 0));
    }

    #[test]
    fn test_limit_drops_own_dead_redo_first() {
        let mut h = History::new(3);
        let c = ObjectCollection::new();
        let c = step(&mut h, &c, c.with_object(note(1)), "b");
        let c = step(&mut h, &c, c.with_object(note(2)), "a");
        let c = h.undo("a", &c).unwrap();
        h.record(&c, &c, "a", 0);
        let c = step(&mut h, &c, c.with_object(note(3)), "b");
        assert_eq!(h.len(), 3);

        step(&mut h, &c, c.with_object(note(4)), "a");
        assert_eq!(h.len(), 3);
        assert!(!h.can_redo("a"));
        // B's oldest action survived
        assert_eq!(h.actions()[0].user_id, "b");
    }

    #[test]
    fn test_limit_drops_oldest_without_dead_entries() {
        let mut h = History::new(2);
        let mut c = ObjectCollection::new();
        for id in 1..=3 {
            c = step(&mut h, &c, c.with_object(note(id)), "a");
        }
        assert_eq!(h.len(), 2);
        assert_eq!(h.actions()[0].entries[0].id, 2);
    }

    #[test]
    fn test_noop_transition_not_recorded() {
        let mut h = History::new(10);
        let c: ObjectCollection = (1..=2).map(note).collect();
        let copy = ObjectCollection::from_objects(c.to_vec());
        // Same values but new allocations count as updates
        assert!(h.record(&c, &copy, "a", 0));
        assert!(!h.record(&c, &c, "a", 0));
    }

    #[test]
    fn test_redo_oldest_first() {
        let mut h = History::new(10);
        let c = ObjectCollection::new();
        let c = step(&mut h, &c, c.with_object(note(1)), "a");
        let c = step(&mut h, &c, c.with_object(note(2)), "a");
        let c = h.undo("a", &c).unwrap();
        h.record(&c, &c, "a", 0);
        let c = h.undo("a", &c).unwrap();
        h.record(&c, &c, "a", 0);
        assert!(c.is_empty());

        let c = h.redo("a", &c).unwrap();
        assert!(c.contains(1));
        assert!(!c.contains(2));
    }
}
