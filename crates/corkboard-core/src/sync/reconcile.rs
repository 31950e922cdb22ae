//! Periodic reconciliation against the persisted snapshot.

use std::time::{Duration, Instant};

use crate::collection::ObjectCollection;
use crate::config::SyncConfig;

/// What to do with a freshly loaded snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileDecision {
    /// Replace the local collection.
    Apply,
    /// Our own save is too recent; the snapshot may predate it.
    SkipGuard,
    /// The snapshot looks like what we already have.
    SkipUnchanged,
}

/// Timer and guard for the reconciliation path.
#[derive(Debug)]
pub struct Reconciler {
    interval: Duration,
    guard: Duration,
    last_poll: Option<Instant>,
    last_local_save: Option<Instant>,
}

impl Reconciler {
    pub fn new(config: &SyncConfig, now: Instant) -> Self {
        Self {
            interval: config.reconcile_interval,
            guard: config.reconcile_guard,
            last_poll: Some(now),
            last_local_save: None,
        }
    }

    /// Check whether a snapshot should be fetched.
    pub fn due(&self, now: Instant) -> bool {
        self.last_poll
            .is_none_or(|last| now.duration_since(last) >= self.interval)
    }

    pub fn mark_polled(&mut self, now: Instant) {
        self.last_poll = Some(now);
    }

    pub fn note_local_save(&mut self, now: Instant) {
        self.last_local_save = Some(now);
    }

    /// Decide whether `snapshot` should replace `current`.
    ///
    /// The comparison is a cheap heuristic: same count and same first and
    /// last id count as unchanged.
    pub fn evaluate(
        &self,
        current: &ObjectCollection,
        snapshot: &ObjectCollection,
        now: Instant,
    ) -> ReconcileDecision {
        if self
            .last_local_save
            .is_some_and(|saved| now.duration_since(saved) < self.guard)
        {
            return ReconcileDecision::SkipGuard;
        }

        let ends = |c: &ObjectCollection| {
            let s = c.as_slice();
            (s.len(), s.first().map(|o| o.id()), s.last().map(|o| o.id()))
        };
        if ends(current) == ends(snapshot) {
            ReconcileDecision::SkipUnchanged
        } else {
            ReconcileDecision::Apply
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{BoardObject, ObjectId, StickyNote};
    use kurbo::Point;

    fn board(ids: &[ObjectId]) -> ObjectCollection {
        ids.iter()
            .map(|id| {
                let mut n = StickyNote::new(Point::ZERO, "");
                n.id = *id;
                BoardObject::StickyNote(n)
            })
            .collect()
    }

    #[test]
    fn test_due_after_interval() {
        let t0 = Instant::now();
        let r = Reconciler::new(&SyncConfig::default(), t0);
        assert!(!r.due(t0 + Duration::from_secs(1)));
        assert!(r.due(t0 + Duration::from_secs(5)));
    }

    #[test]
    fn test_guard_after_own_save() {
        let t0 = Instant::now();
        let mut r = Reconciler::new(&SyncConfig::default(), t0);
        r.note_local_save(t0);
        let decision = r.evaluate(&board(&[1]), &board(&[1, 2]), t0 + Duration::from_secs(1));
        assert_eq!(decision, ReconcileDecision::SkipGuard);
        let decision = r.evaluate(&board(&[1]), &board(&[1, 2]), t0 + Duration::from_secs(4));
        assert_eq!(decision, ReconcileDecision::Apply);
    }

    #[test]
    fn test_unchanged_heuristic() {
        let t0 = Instant::now();
        let r = Reconciler::new(&SyncConfig::default(), t0);
        assert_eq!(
            r.evaluate(&board(&[1, 2, 3]), &board(&[1, 9, 3]), t0),
            ReconcileDecision::SkipUnchanged
        );
        assert_eq!(
            r.evaluate(&board(&[1, 2, 3]), &board(&[1, 2, 4]), t0),
            ReconcileDecision::Apply
        );
        assert_eq!(
            r.evaluate(&board(&[]), &board(&[]), t0),
            ReconcileDecision::SkipUnchanged
        );
    }
}
