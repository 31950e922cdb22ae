//! Broadcast scheduling and echo suppression.

use std::time::{Duration, Instant};

use super::delta::{ChangeSet, build_change_set};
use crate::collection::ObjectCollection;
use crate::config::SyncConfig;

/// Broadcast state of one board session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// Everything local has been broadcast.
    Idle,
    /// Local changes are waiting for the trailing debounce deadline.
    Unbroadcast,
    /// A change-set was handed out and its send is not yet confirmed.
    Broadcasting,
}

/// Diffs local transitions against the last broadcast revision and decides
/// when to send.
///
/// Timing is driven by the caller: every method that may fire takes the
/// current `Instant`, and [`next_deadline`](Self::next_deadline) reports when
/// [`poll`](Self::poll) should be called next.
#[derive(Debug)]
pub struct DeltaSync {
    debounce: Duration,
    full_ratio: f64,
    last_broadcast: ObjectCollection,
    last_send: Option<Instant>,
    deadline: Option<Instant>,
    applying_remote: bool,
    state: SyncState,
}

impl DeltaSync {
    pub fn new(config: &SyncConfig, initial: ObjectCollection) -> Self {
        Self {
            debounce: config.broadcast_debounce,
            full_ratio: config.full_sync_ratio,
            last_broadcast: initial,
            last_send: None,
            deadline: None,
            applying_remote: false,
            state: SyncState::Idle,
        }
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    /// When the pending trailing broadcast is due, if one is armed.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// The revision peers are assumed to hold.
    pub fn last_broadcast(&self) -> &ObjectCollection {
        &self.last_broadcast
    }

    /// Check whether the next transition is the result of a remote apply.
    pub fn is_applying_remote(&self) -> bool {
        self.applying_remote
    }

    /// React to the local collection moving to `current`.
    ///
    /// Returns a change-set to send now (leading edge), or `None` if the
    /// transition came from a remote apply, changed nothing, or fell inside
    /// the debounce window. In the last case a trailing deadline is armed.
    pub fn on_local_transition(
        &mut self,
        current: &ObjectCollection,
        now: Instant,
    ) -> Option<ChangeSet> {
        if self.applying_remote {
            self.applying_remote = false;
            return None;
        }
        if current.same_revision(&self.last_broadcast) {
            return None;
        }

        match self.last_send {
            Some(last) if now.duration_since(last) < self.debounce => {
                self.deadline = Some(last + self.debounce);
                self.state = SyncState::Unbroadcast;
                None
            }
            _ => self.flush(current),
        }
    }

    /// Fire the trailing deadline if it has passed.
    ///
    /// The diff is taken against `current`, the latest collection, not the
    /// one present when the deadline was armed.
    pub fn poll(&mut self, current: &ObjectCollection, now: Instant) -> Option<ChangeSet> {
        match self.deadline {
            Some(deadline) if now >= deadline => self.flush(current),
            _ => None,
        }
    }

    /// Diff and hand out everything not yet broadcast, ignoring the debounce.
    pub fn flush(&mut self, current: &ObjectCollection) -> Option<ChangeSet> {
        self.deadline = None;
        let change = build_change_set(&self.last_broadcast, current, self.full_ratio);
        self.last_broadcast = current.clone();
        self.state = if change.is_some() {
            SyncState::Broadcasting
        } else {
            SyncState::Idle
        };
        change
    }

    /// Report the outcome of sending the last change-set.
    ///
    /// Only successful sends restart the debounce window.
    pub fn record_send(&mut self, now: Instant, ok: bool) {
        if ok {
            self.last_send = Some(now);
        }
        if self.state == SyncState::Broadcasting {
            self.state = SyncState::Idle;
        }
    }

    /// Apply a change-set received from a peer.
    ///
    /// Sets the echo-suppression flag so the transition this produces is not
    /// broadcast again, and applies the same change to the last broadcast
    /// revision so it is not reported as a local change later either.
    pub fn apply_remote(&mut self, current: &ObjectCollection, change: &ChangeSet) -> ObjectCollection {
        self.applying_remote = true;
        self.last_broadcast = change.apply(&self.last_broadcast);
        change.apply(current)
    }

    /// Replace everything with an authoritative snapshot.
    pub fn apply_snapshot(&mut self, snapshot: ObjectCollection) -> ObjectCollection {
        self.applying_remote = true;
        self.last_broadcast = snapshot.clone();
        self.deadline = None;
        self.state = SyncState::Idle;
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{BoardObject, ObjectId, StickyNote};
    use kurbo::{Point, Vec2};

    fn note(id: ObjectId) -> BoardObject {
        let mut n = StickyNote::new(Point::new(0.0, id as f64 * 120.0), "");
        n.id = id;
        BoardObject::StickyNote(n)
    }

    fn config() -> SyncConfig {
        SyncConfig {
            broadcast_debounce: Duration::from_millis(50),
            ..SyncConfig::default()
        }
    }

    fn many(n: u64) -> ObjectCollection {
        (1..=n).map(note).collect()
    }

    fn ms(t0: Instant, ms: u64) -> Instant {
        t0 + Duration::from_millis(ms)
    }

    #[test]
    fn test_leading_edge_sends_immediately() {
        let t0 = Instant::now();
        let base = many(10);
        let mut sync = DeltaSync::new(&config(), base.clone());
        let next = base.with_object(note(11));
        let cs = sync.on_local_transition(&next, t0).unwrap();
        assert_eq!(sync.state(), SyncState::Broadcasting);
        assert!(!cs.is_full());
        sync.record_send(t0, true);
        assert_eq!(sync.state(), SyncState::Idle);
        assert!(sync.next_deadline().is_none());
    }

    #[test]
    fn test_trailing_send_uses_latest_collection() {
        let t0 = Instant::now();
        let base = many(10);
        let mut sync = DeltaSync::new(&config(), base.clone());

        let a = base.with_object(note(11));
        assert!(sync.on_local_transition(&a, t0).is_some());
        sync.record_send(t0, true);

        let b = a.with_object(note(12));
        assert!(sync.on_local_transition(&b, ms(t0, 10)).is_none());
        assert_eq!(sync.state(), SyncState::Unbroadcast);
        assert_eq!(sync.next_deadline(), Some(ms(t0, 50)));

        let c = b.with_object(note(13));
        assert!(sync.on_local_transition(&c, ms(t0, 30)).is_none());
        // Still a single deadline
        assert_eq!(sync.next_deadline(), Some(ms(t0, 50)));

        assert!(sync.poll(&c, ms(t0, 49)).is_none());
        let cs = sync.poll(&c, ms(t0, 50)).unwrap();
        assert_eq!(cs.object_ids(), vec![12, 13]);
        assert!(sync.next_deadline().is_none());
    }

    #[test]
    fn test_failed_send_does_not_restart_window() {
        let t0 = Instant::now();
        let base = many(10);
        let mut sync = DeltaSync::new(&config(), base.clone());
        let a = base.with_object(note(11));
        assert!(sync.on_local_transition(&a, t0).is_some());
        sync.record_send(t0, false);
        let b = a.with_object(note(12));
        assert!(sync.on_local_transition(&b, ms(t0, 10)).is_some());
    }

    #[test]
    fn test_remote_apply_is_not_echoed() {
        let t0 = Instant::now();
        let base = many(10);
        let mut sync = DeltaSync::new(&config(), base.clone());
        let remote = ChangeSet::Ops {
            ops: vec![crate::sync::Operation::Create {
                object: note(11).into(),
                index: None,
            }],
        };
        let next = sync.apply_remote(&base, &remote);
        assert!(sync.is_applying_remote());
        assert!(sync.on_local_transition(&next, t0).is_none());
        assert!(!sync.is_applying_remote());

        // A later local change only carries the local edit
        let local = next.with_object(note(12));
        let cs = sync.on_local_transition(&local, ms(t0, 100)).unwrap();
        assert_eq!(cs.object_ids(), vec![12]);
    }

    #[test]
    fn test_remote_apply_keeps_pending_local_edit() {
        let t0 = Instant::now();
        let base = many(10);
        let mut sync = DeltaSync::new(&config(), base.clone());
        let a = base.with_object(note(11));
        sync.on_local_transition(&a, t0);
        sync.record_send(t0, true);

        let b = a.with_object(note(12));
        assert!(sync.on_local_transition(&b, ms(t0, 5)).is_none());

        let remote = ChangeSet::Ops {
            ops: vec![crate::sync::Operation::Delete { id: 1 }],
        };
        let c = sync.apply_remote(&b, &remote);
        sync.on_local_transition(&c, ms(t0, 6));

        let cs = sync.poll(&c, ms(t0, 60)).unwrap();
        assert_eq!(cs.object_ids(), vec![12]);
    }

    #[test]
    fn test_snapshot_resets_schedule() {
        let t0 = Instant::now();
        let base = many(3);
        let mut sync = DeltaSync::new(&config(), base.clone());
        let a = base.with_object(note(4));
        sync.on_local_transition(&a, t0);
        sync.record_send(t0, true);
        sync.on_local_transition(&a.with_object(note(5)), ms(t0, 1));
        assert!(sync.next_deadline().is_some());

        let snap = sync.apply_snapshot(many(2));
        assert!(sync.next_deadline().is_none());
        assert!(sync.on_local_transition(&snap, ms(t0, 2)).is_none());
        assert!(sync.last_broadcast().same_revision(&snap));
    }
}
