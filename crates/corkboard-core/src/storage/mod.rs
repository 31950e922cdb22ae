//! Board persistence.
//!
//! A [`Storage`] backend keeps one [`BoardSnapshot`] per board id. The
//! session loads it once on open and writes it back through [`AutoSaver`]
//! after local edits settle.

mod autosave;
mod memory;

#[cfg(not(target_arch = "wasm32"))]
mod file;

pub use autosave::{AutoSaver, SaveStatus};
pub use memory::MemoryStorage;

#[cfg(not(target_arch = "wasm32"))]
pub use file::FileStorage;

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::collection::ObjectCollection;
use crate::object::{BoardObject, ObjectId};

/// Storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Board not found: {0}")]
    NotFound(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Storage call timed out after {0:?}")]
    Timeout(Duration),
    #[error("Storage error: {0}")]
    Other(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Boxed future returned by storage backends.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Persisted state of one board.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardSnapshot {
    pub objects: Vec<BoardObject>,
    /// Next id the board's allocator will hand out.
    #[serde(default)]
    pub next_id: ObjectId,
}

impl BoardSnapshot {
    pub fn new(objects: Vec<BoardObject>, next_id: ObjectId) -> Self {
        Self { objects, next_id }
    }

    pub fn from_collection(collection: &ObjectCollection, next_id: ObjectId) -> Self {
        Self {
            objects: collection.to_vec(),
            next_id,
        }
    }

    pub fn to_collection(&self) -> ObjectCollection {
        ObjectCollection::from_objects(self.objects.iter().cloned())
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Trait for board storage backends.
pub trait Storage: Send + Sync {
    /// Save a board.
    fn save(&self, board_id: &str, snapshot: &BoardSnapshot) -> BoxFuture<'_, StorageResult<()>>;

    /// Load a board.
    fn load(&self, board_id: &str) -> BoxFuture<'_, StorageResult<BoardSnapshot>>;

    /// Delete a board.
    fn delete(&self, board_id: &str) -> BoxFuture<'_, StorageResult<()>>;

    /// List all board ids.
    fn list(&self) -> BoxFuture<'_, StorageResult<Vec<String>>>;

    /// Check if a board exists.
    fn exists(&self, board_id: &str) -> BoxFuture<'_, StorageResult<bool>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::StickyNote;
    use kurbo::Point;

    #[test]
    fn test_snapshot_wire_format() {
        let mut note = StickyNote::new(Point::new(1.0, 2.0), "Hi");
        note.id = 3;
        let snap = BoardSnapshot::new(vec![BoardObject::StickyNote(note)], 4);
        let json: serde_json::Value = serde_json::from_str(&snap.to_json().unwrap()).unwrap();
        assert_eq!(json["nextId"], 4);
        assert_eq!(json["objects"][0]["type"], "stickyNote");
        assert_eq!(BoardSnapshot::from_json(&json.to_string()).unwrap(), snap);
    }
}
