//! Debounced, time-bounded board saving.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::{BoardSnapshot, Storage, StorageError, StorageResult};
use crate::config::SyncConfig;

/// Save state shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveStatus {
    Saved,
    Unsaved,
    Saving,
    Error(String),
}

impl fmt::Display for SaveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SaveStatus::Saved => write!(f, "Saved"),
            SaveStatus::Unsaved => write!(f, "Unsaved changes"),
            SaveStatus::Saving => write!(f, "Saving..."),
            SaveStatus::Error(msg) => write!(f, "Save failed: {msg}"),
        }
    }
}

/// Saves one board after local edits have been quiet for the debounce
/// period. Every storage call is bounded by the persistence timeout.
pub struct AutoSaver<S: Storage> {
    storage: Arc<S>,
    board_id: String,
    debounce: Duration,
    timeout: Duration,
    dirty: bool,
    last_change: Option<Instant>,
    last_save: Option<Instant>,
    status: SaveStatus,
}

impl<S: Storage> AutoSaver<S> {
    pub fn new(storage: Arc<S>, board_id: impl Into<String>, config: &SyncConfig) -> Self {
        Self {
            storage,
            board_id: board_id.into(),
            debounce: config.save_debounce,
            timeout: config.persistence_timeout,
            dirty: false,
            last_change: None,
            last_save: None,
            status: SaveStatus::Saved,
        }
    }

    pub fn board_id(&self) -> &str {
        &self.board_id
    }

    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }

    pub fn status(&self) -> &SaveStatus {
        &self.status
    }

    /// Check if the board has unsaved changes.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Time of the last successful save.
    pub fn last_save(&self) -> Option<Instant> {
        self.last_save
    }

    /// Record a local change; restarts the debounce.
    pub fn mark_dirty(&mut self, now: Instant) {
        self.dirty = true;
        self.last_change = Some(now);
        self.status = SaveStatus::Unsaved;
    }

    /// Check whether the board is dirty and has been quiet long enough.
    pub fn should_save(&self, now: Instant) -> bool {
        self.dirty
            && self
                .last_change
                .is_some_and(|t| now.duration_since(t) >= self.debounce)
    }

    /// When the pending save becomes due.
    pub fn next_deadline(&self) -> Option<Instant> {
        if !self.dirty {
            return None;
        }
        self.last_change.map(|t| t + self.debounce)
    }

    /// Save immediately.
    ///
    /// On failure the board stays dirty and the status carries the error, so
    /// the next attempt writes whatever state is current by then.
    pub async fn save(&mut self, snapshot: &BoardSnapshot, now: Instant) -> StorageResult<()> {
        self.status = SaveStatus::Saving;
        let result = bounded(self.timeout, self.storage.save(&self.board_id, snapshot)).await;
        match result {
            Ok(()) => {
                log::debug!("Saved board {} ({} objects)", self.board_id, snapshot.objects.len());
                self.dirty = false;
                self.last_save = Some(now);
                self.status = SaveStatus::Saved;
                Ok(())
            }
            Err(e) => {
                log::warn!("Failed to save board {}: {e}", self.board_id);
                self.status = SaveStatus::Error(e.to_string());
                Err(e)
            }
        }
    }

    /// Load the board, bounded by the persistence timeout.
    pub async fn load(&self) -> StorageResult<BoardSnapshot> {
        bounded(self.timeout, self.storage.load(&self.board_id)).await
    }
}

/// Run a storage call, failing with [`StorageError::Timeout`] if it takes
/// longer than `limit`.
///
/// The limit needs a tokio timer. Under any other executor the call runs
/// unbounded.
pub(crate) async fn bounded<T>(
    limit: Duration,
    call: impl Future<Output = StorageResult<T>>,
) -> StorageResult<T> {
    if tokio::runtime::Handle::try_current().is_err() {
        log::trace!("No tokio runtime, storage call runs without a timeout");
        return call.await;
    }
    tokio::time::timeout(limit, call)
        .await
        .map_err(|_| StorageError::Timeout(limit))?
}
