//! Throttled cursor broadcast and the remote cursor table.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Payload of a `cursor` broadcast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CursorMessage {
    pub user_id: String,
    pub name: String,
    pub x: f64,
    pub y: f64,
}

impl CursorMessage {
    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// Rate limiter for outgoing cursor positions.
///
/// At most one position is held back; newer positions overwrite it.
#[derive(Debug)]
pub struct CursorThrottle {
    interval: Duration,
    last_sent: Option<Instant>,
    pending: Option<Point>,
}

impl CursorThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_sent: None,
            pending: None,
        }
    }

    fn ready(&self, now: Instant) -> bool {
        self.last_sent
            .is_none_or(|last| now.duration_since(last) >= self.interval)
    }

    /// Offer a new pointer position.
    ///
    /// Returns the position to send now, or `None` if it was parked until the
    /// interval elapses.
    pub fn update(&mut self, position: Point, now: Instant) -> Option<Point> {
        if self.ready(now) {
            self.pending = None;
            self.last_sent = Some(now);
            Some(position)
        } else {
            self.pending = Some(position);
            None
        }
    }

    /// Release the parked position once the interval has elapsed.
    pub fn poll(&mut self, now: Instant) -> Option<Point> {
        if self.pending.is_some() && self.ready(now) {
            self.last_sent = Some(now);
            self.pending.take()
        } else {
            None
        }
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// When the parked position may be sent.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending?;
        Some(self.last_sent.map_or_else(Instant::now, |last| last + self.interval))
    }

    /// Drop any parked position.
    pub fn cancel(&mut self) {
        self.pending = None;
    }
}

/// Last known pointer of another user.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteCursor {
    pub name: String,
    pub position: Point,
}

/// Pointers of other users on the board, keyed by user id.
#[derive(Debug, Clone, Default)]
pub struct RemoteCursors {
    cursors: HashMap<String, RemoteCursor>,
}

impl RemoteCursors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, msg: &CursorMessage) {
        self.cursors.insert(
            msg.user_id.clone(),
            RemoteCursor {
                name: msg.name.clone(),
                position: msg.position(),
            },
        );
    }

    /// Forget everything about a user, e.g. after they left.
    pub fn purge(&mut self, user_id: &str) {
        self.cursors.remove(user_id);
    }

    pub fn get(&self, user_id: &str) -> Option<&RemoteCursor> {
        self.cursors.get(user_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &RemoteCursor)> {
        self.cursors.iter()
    }

    pub fn len(&self) -> usize {
        self.cursors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cursors.is_empty()
    }

    pub fn clear(&mut self) {
        self.cursors.clear();
    }
}
