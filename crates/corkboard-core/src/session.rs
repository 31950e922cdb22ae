//! Board session lifecycle.
//!
//! A [`BoardSession`] owns everything one client needs for one open board:
//! the object collection, id allocator, history, delta sync, presence,
//! cursors, selection and auto-save. All mutation goes through the session so
//! that every transition is seen by history, sync and persistence in the same
//! order. The session is driven from the caller's event loop: mutations
//! happen synchronously, and [`BoardSession::tick`] drains the channel and
//! fires whatever timers are due.

use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use kurbo::{Point, Rect};
use thiserror::Error;

use crate::collection::ObjectCollection;
use crate::config::SyncConfig;
use crate::geometry::{erase_path, point_to_polyline_dist};
use crate::history::History;
use crate::object::{BoardObject, IdAllocator, ObjectId};
use crate::presence::{CursorMessage, CursorThrottle, PresenceMeta, PresenceRoster, RemoteCursors};
use crate::selection::Selection;
use crate::storage::{AutoSaver, BoardSnapshot, SaveStatus, Storage, StorageError};
use crate::sync::{ChangeSet, DeltaSync, ReconcileDecision, Reconciler, SyncState};
use crate::transport::{ChannelEvent, Transport, TransportError};

/// Broadcast event carrying object change-sets.
pub const OBJECTS_EVENT: &str = "objects";

/// Broadcast event carrying cursor positions.
pub const CURSOR_EVENT: &str = "cursor";

/// Samples per bent line when hit-testing the eraser.
const ERASER_CURVE_SAMPLES: usize = 16;

/// Session errors.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("Connector endpoint {0} does not exist")]
    UnknownObject(ObjectId),
    #[error("Session is closed")]
    Closed,
}

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// What caused a collection transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    /// A user, tool or assistant edit made through the session.
    Local,
    /// Undo or redo.
    History,
    /// A change-set from a peer.
    Remote,
    /// The reconciliation snapshot.
    Snapshot,
}

fn timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

/// One client's view of one board.
pub struct BoardSession<S: Storage, T: Transport> {
    board_id: String,
    user: PresenceMeta,
    objects: ObjectCollection,
    ids: IdAllocator,
    history: History,
    delta: DeltaSync,
    reconciler: Reconciler,
    saver: AutoSaver<S>,
    transport: T,
    roster: PresenceRoster,
    cursor: CursorThrottle,
    cursors: RemoteCursors,
    selection: Selection,
    closed: bool,
}

impl<S: Storage, T: Transport> BoardSession<S, T> {
    /// Open `board_id` for `user`.
    ///
    /// Loads the persisted snapshot (a missing board starts empty), seeds the
    /// collection and id allocator, joins the board channel, subscribes to
    /// object and cursor events and announces presence.
    pub async fn open(
        board_id: &str,
        user: PresenceMeta,
        storage: Arc<S>,
        mut transport: T,
        config: SyncConfig,
    ) -> SessionResult<Self> {
        let saver = AutoSaver::new(storage, board_id, &config);
        let snapshot = match saver.load().await {
            Ok(snapshot) => snapshot,
            Err(StorageError::NotFound(_)) => BoardSnapshot::default(),
            Err(e) => return Err(e.into()),
        };
        let objects = snapshot.to_collection();
        let ids = IdAllocator::seeded(snapshot.next_id, objects.max_id());

        transport.join(board_id)?;
        transport.subscribe(OBJECTS_EVENT);
        transport.subscribe(CURSOR_EVENT);
        transport.track(user.clone())?;

        let mut roster = PresenceRoster::new();
        roster.recompute(&transport.presence_state());

        log::info!(
            "Opened board {board_id} as {} with {} objects",
            user.user_id,
            objects.len()
        );

        let now = Instant::now();
        Ok(Self {
            board_id: board_id.to_string(),
            history: History::new(config.history_limit),
            delta: DeltaSync::new(&config, objects.clone()),
            reconciler: Reconciler::new(&config, now),
            cursor: CursorThrottle::new(config.cursor_throttle),
            user,
            objects,
            ids,
            saver,
            transport,
            roster,
            cursors: RemoteCursors::new(),
            selection: Selection::new(),
            closed: false,
        })
    }

    pub fn board_id(&self) -> &str {
        &self.board_id
    }

    pub fn user(&self) -> &PresenceMeta {
        &self.user
    }

    /// Current revision of the board.
    pub fn objects(&self) -> &ObjectCollection {
        &self.objects
    }

    pub fn object(&self, id: ObjectId) -> Option<&Arc<BoardObject>> {
        self.objects.get(id)
    }

    /// The id the next created object receives.
    pub fn next_id(&self) -> ObjectId {
        self.ids.peek()
    }

    pub fn save_status(&self) -> &SaveStatus {
        self.saver.status()
    }

    pub fn sync_state(&self) -> SyncState {
        self.delta.state()
    }

    /// Users online on this board, including the local one.
    pub fn online_users(&self) -> &[PresenceMeta] {
        self.roster.users()
    }

    pub fn remote_cursors(&self) -> &RemoteCursors {
        &self.cursors
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn selection_mut(&mut self) -> &mut Selection {
        &mut self.selection
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo(&self.user.user_id)
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo(&self.user.user_id)
    }

    /// Earliest instant at which [`tick`](Self::tick) has timer work to do.
    pub fn next_deadline(&self) -> Option<Instant> {
        [
            self.delta.next_deadline(),
            self.cursor.next_deadline(),
            self.saver.next_deadline(),
        ]
        .into_iter()
        .flatten()
        .min()
    }

    fn ensure_open(&self) -> SessionResult<()> {
        if self.closed {
            Err(SessionError::Closed)
        } else {
            Ok(())
        }
    }

    /// Give `object` a usable id: a fresh one if it has none or its id is
    /// already taken, otherwise its own.
    fn assign_id(&mut self, object: &mut BoardObject) -> ObjectId {
        let id = object.id();
        if id == 0 || self.objects.contains(id) {
            let fresh = self.ids.allocate();
            object.set_id(fresh);
            fresh
        } else {
            self.ids.observe(id);
            id
        }
    }

    /// A connector may only join objects present in `objects`.
    fn check_connector(objects: &ObjectCollection, object: &BoardObject) -> SessionResult<()> {
        if let Some(c) = object.as_connector() {
            for end in [c.from_id, c.to_id] {
                if end == c.id || !objects.contains(end) {
                    return Err(SessionError::UnknownObject(end));
                }
            }
        }
        Ok(())
    }

    /// Add an object on top of the board. Returns its id.
    pub fn create(&mut self, mut object: BoardObject, now: Instant) -> SessionResult<ObjectId> {
        self.ensure_open()?;
        Self::check_connector(&self.objects, &object)?;
        let id = self.assign_id(&mut object);
        let next = self.objects.with_object(object);
        self.transition(next, Origin::Local, now);
        Ok(id)
    }

    /// Replace an object with an edited copy.
    ///
    /// Returns false if no object has `id`. An edit that points a connector
    /// at a missing object is rejected and leaves the board unchanged.
    pub fn update(
        &mut self,
        id: ObjectId,
        edit: impl FnOnce(&mut BoardObject),
        now: Instant,
    ) -> SessionResult<bool> {
        self.ensure_open()?;
        let Some(next) = self.objects.updated(id, edit) else {
            return Ok(false);
        };
        if let Some(edited) = next.get(id) {
            Self::check_connector(&next, edited)?;
        }
        self.transition(next, Origin::Local, now);
        Ok(true)
    }

    /// Delete objects and every connector attached to them.
    ///
    /// Returns how many objects were removed, connectors included.
    pub fn delete(&mut self, ids: &[ObjectId], now: Instant) -> SessionResult<usize> {
        self.ensure_open()?;
        let next = self.objects.without(ids);
        let removed = self.objects.len() - next.len();
        if removed > 0 {
            self.transition(next, Origin::Local, now);
        }
        Ok(removed)
    }

    /// Delete the current selection.
    pub fn delete_selected(&mut self, now: Instant) -> SessionResult<usize> {
        let ids = self.selection.ids().to_vec();
        self.delete(&ids, now)
    }

    /// Remove everything from the board.
    pub fn clear(&mut self, now: Instant) -> SessionResult<()> {
        self.ensure_open()?;
        if !self.objects.is_empty() {
            self.transition(self.objects.cleared(), Origin::Local, now);
        }
        Ok(())
    }

    /// Replace the whole board, e.g. when applying a template.
    ///
    /// Objects without an id, or with a duplicate one, get fresh ids.
    /// Connectors whose endpoints are not part of `objects` are dropped.
    pub fn replace_all(&mut self, objects: Vec<BoardObject>, now: Instant) -> SessionResult<()> {
        self.ensure_open()?;
        let mut seen = std::collections::HashSet::new();
        let mut placed = Vec::with_capacity(objects.len());
        for mut object in objects {
            let id = object.id();
            if id == 0 || !seen.insert(id) {
                let fresh = self.ids.allocate();
                object.set_id(fresh);
                seen.insert(fresh);
            } else {
                self.ids.observe(id);
            }
            placed.push(object);
        }
        placed.retain(|o| {
            o.as_connector()
                .is_none_or(|c| seen.contains(&c.from_id) && seen.contains(&c.to_id))
        });
        self.transition(ObjectCollection::from_objects(placed), Origin::Local, now);
        Ok(())
    }

    /// Erase everything under a circular eraser.
    ///
    /// Freehand paths are split into their surviving pieces, and lines and
    /// arrows within `radius` are deleted. The whole stroke is one undoable
    /// action. Returns true if anything changed.
    pub fn erase_at(&mut self, center: Point, radius: f64, now: Instant) -> SessionResult<bool> {
        self.ensure_open()?;
        let mut doomed = Vec::new();
        let mut replacements: Vec<(usize, BoardObject)> = Vec::new();

        for (index, object) in self.objects.iter().enumerate() {
            if let Some(path) = object.as_path() {
                if let Some(pieces) = erase_path(&path.points, center, radius) {
                    doomed.push(path.id);
                    for piece in pieces {
                        replacements.push((index, BoardObject::Path(path.with_points(piece))));
                    }
                }
            } else if let Some(line) = object.as_line() {
                if point_to_polyline_dist(center, &line.polyline(ERASER_CURVE_SAMPLES)) <= radius {
                    doomed.push(line.id);
                }
            }
        }
        if doomed.is_empty() {
            return Ok(false);
        }

        // Pieces take the z-order slot of the path they came from. Connectors
        // attached to an erased path go with it, so the slot is counted over
        // what survives.
        let survivors = self.objects.without(&doomed);
        let mut next = survivors.clone();
        let mut inserted = 0;
        for (index, mut piece) in replacements {
            let slot = self.objects.as_slice()[..index]
                .iter()
                .filter(|o| survivors.contains(o.id()))
                .count();
            piece.set_id(self.ids.allocate());
            next = next.inserted_at(slot + inserted, piece);
            inserted += 1;
        }
        self.transition(next, Origin::Local, now);
        Ok(true)
    }

    /// Select every object overlapping `rect` (marquee selection).
    pub fn select_in_rect(&mut self, rect: Rect) {
        let hits: Vec<ObjectId> = self
            .objects
            .objects_in_rect(rect)
            .iter()
            .map(|o| o.id())
            .collect();
        self.selection.set(hits);
    }

    /// Undo the local user's most recent action.
    ///
    /// Returns false if there is nothing to undo.
    pub fn undo(&mut self, now: Instant) -> SessionResult<bool> {
        self.ensure_open()?;
        let Some(next) = self.history.undo(&self.user.user_id, &self.objects) else {
            return Ok(false);
        };
        self.selection.clear();
        self.transition(next, Origin::History, now);
        Ok(true)
    }

    /// Redo the local user's oldest undone action.
    pub fn redo(&mut self, now: Instant) -> SessionResult<bool> {
        self.ensure_open()?;
        let Some(next) = self.history.redo(&self.user.user_id, &self.objects) else {
            return Ok(false);
        };
        self.selection.clear();
        self.transition(next, Origin::History, now);
        Ok(true)
    }

    /// Report the local pointer position. Sent at most once per throttle
    /// interval; positions in between are coalesced.
    pub fn move_cursor(&mut self, position: Point, now: Instant) -> SessionResult<()> {
        self.ensure_open()?;
        if let Some(position) = self.cursor.update(position, now) {
            self.send_cursor(position);
        }
        Ok(())
    }

    /// Drain the channel and run every timer that is due at `now`.
    ///
    /// Failures here are logged and reflected in the save status; they never
    /// end the session.
    pub async fn tick(&mut self, now: Instant) -> SessionResult<()> {
        self.ensure_open()?;

        for event in self.transport.poll() {
            self.handle_event(event, now);
        }

        if let Some(change) = self.delta.poll(&self.objects, now) {
            self.broadcast(&change, now);
        }

        if let Some(position) = self.cursor.poll(now) {
            self.send_cursor(position);
        }

        if self.saver.should_save(now) {
            let snapshot = self.snapshot();
            if self.saver.save(&snapshot, now).await.is_ok() {
                self.reconciler.note_local_save(now);
            }
        }

        if self.reconciler.due(now) {
            self.reconciler.mark_polled(now);
            self.reconcile(now).await;
        }
        Ok(())
    }

    /// Flush pending broadcasts and saves, then leave the channel.
    ///
    /// The session is closed even if the final save fails; the error is
    /// returned so the caller can warn the user.
    pub async fn close(&mut self, now: Instant) -> SessionResult<()> {
        self.ensure_open()?;

        if let Some(change) = self.delta.flush(&self.objects) {
            self.broadcast(&change, now);
        }
        self.cursor.cancel();

        let saved = if self.saver.is_dirty() {
            let snapshot = self.snapshot();
            self.saver.save(&snapshot, now).await
        } else {
            Ok(())
        };

        if let Err(e) = self.transport.untrack() {
            log::debug!("Untrack on close failed: {e}");
        }
        self.transport.unsubscribe_all();
        self.transport.close();
        self.cursors.clear();
        self.closed = true;
        log::info!("Closed board {}", self.board_id);

        saved.map_err(SessionError::from)
    }

    /// Persistable state of the board.
    pub fn snapshot(&self) -> BoardSnapshot {
        BoardSnapshot::from_collection(&self.objects, self.ids.peek())
    }

    /// Move to `next` and let history, sync and persistence observe it.
    fn transition(&mut self, next: ObjectCollection, origin: Origin, now: Instant) {
        let prev = std::mem::replace(&mut self.objects, next);

        if matches!(origin, Origin::Remote | Origin::Snapshot) {
            self.history.suppress_next();
        }
        self.history
            .record(&prev, &self.objects, &self.user.user_id, timestamp_ms());

        if let Some(change) = self.delta.on_local_transition(&self.objects, now) {
            self.broadcast(&change, now);
        }

        if let Some(max) = self.objects.max_id() {
            self.ids.observe(max);
        }
        self.selection.retain_existing(&self.objects);

        if matches!(origin, Origin::Local | Origin::History) {
            self.saver.mark_dirty(now);
        }
    }

    fn broadcast(&mut self, change: &ChangeSet, now: Instant) {
        let payload = match serde_json::to_value(change) {
            Ok(payload) => payload,
            Err(e) => {
                log::warn!("Failed to encode change-set: {e}");
                self.delta.record_send(now, false);
                return;
            }
        };
        match self.transport.send(OBJECTS_EVENT, payload) {
            Ok(()) => {
                log::debug!(
                    "Broadcast {} change-set on {}",
                    if change.is_full() { "full" } else { "delta" },
                    self.board_id
                );
                self.delta.record_send(now, true);
            }
            Err(e) => {
                log::warn!("Failed to broadcast change-set: {e}");
                self.delta.record_send(now, false);
            }
        }
    }

    fn send_cursor(&mut self, position: Point) {
        let msg = CursorMessage {
            user_id: self.user.user_id.clone(),
            name: self.user.display_name.clone(),
            x: position.x,
            y: position.y,
        };
        let result = serde_json::to_value(&msg)
            .map_err(|e| TransportError::Encode(e.to_string()))
            .and_then(|payload| self.transport.send(CURSOR_EVENT, payload));
        if let Err(e) = result {
            log::debug!("Failed to send cursor: {e}");
        }
    }

    fn handle_event(&mut self, event: ChannelEvent, now: Instant) {
        match event {
            ChannelEvent::Broadcast { event, payload } if event == OBJECTS_EVENT => {
                match serde_json::from_value::<ChangeSet>(payload) {
                    Ok(change) => {
                        let next = self.delta.apply_remote(&self.objects, &change);
                        self.transition(next, Origin::Remote, now);
                    }
                    Err(e) => log::warn!("Ignoring malformed change-set: {e}"),
                }
            }
            ChannelEvent::Broadcast { event, payload } if event == CURSOR_EVENT => {
                match serde_json::from_value::<CursorMessage>(payload) {
                    Ok(msg) if msg.user_id != self.user.user_id => self.cursors.apply(&msg),
                    Ok(_) => {}
                    Err(e) => log::debug!("Ignoring malformed cursor: {e}"),
                }
            }
            ChannelEvent::Broadcast { event, .. } => {
                log::debug!("Ignoring unknown event {event}");
            }
            ChannelEvent::PresenceJoin { .. }
            | ChannelEvent::PresenceLeave { .. }
            | ChannelEvent::PresenceSync => {
                let left = self.roster.recompute(&self.transport.presence_state());
                for user_id in left {
                    log::debug!("User {user_id} left board {}", self.board_id);
                    self.cursors.purge(&user_id);
                }
            }
            ChannelEvent::Connected => log::info!("Channel for {} connected", self.board_id),
            ChannelEvent::Disconnected => log::warn!("Channel for {} disconnected", self.board_id),
            ChannelEvent::Error { message } => log::warn!("Channel error: {message}"),
        }
    }

    /// Fetch the persisted snapshot and replace local state with it unless
    /// it is stale or looks unchanged.
    async fn reconcile(&mut self, now: Instant) {
        if self.saver.is_dirty() {
            return;
        }
        let snapshot = match self.saver.load().await {
            Ok(snapshot) => snapshot,
            Err(StorageError::NotFound(_)) => return,
            Err(e) => {
                log::warn!("Reconciliation load failed: {e}");
                return;
            }
        };
        let incoming = snapshot.to_collection();
        match self.reconciler.evaluate(&self.objects, &incoming, now) {
            ReconcileDecision::Apply => {
                log::info!(
                    "Reconciling board {} from snapshot ({} objects)",
                    self.board_id,
                    incoming.len()
                );
                self.ids.observe(snapshot.next_id.saturating_sub(1));
                let next = self.delta.apply_snapshot(incoming);
                self.transition(next, Origin::Snapshot, now);
            }
            ReconcileDecision::SkipGuard | ReconcileDecision::SkipUnchanged => {}
        }
    }
}
