//! Corkboard Core Library
//!
//! Board model, collaboration sync, undo history and persistence for the
//! Corkboard whiteboard. Nothing here renders; a front end drives a
//! [`BoardSession`] and draws its [`ObjectCollection`].

pub mod collection;
pub mod config;
pub mod geometry;
pub mod history;
pub mod object;
pub mod presence;
pub mod selection;
pub mod session;
pub mod storage;
pub mod sync;
pub mod transport;

pub use collection::ObjectCollection;
pub use config::SyncConfig;
pub use history::{Action, History, HistoryEntry};
pub use object::{BoardObject, IdAllocator, ObjectId, ObjectTrait};
pub use presence::{CursorMessage, PresenceMeta, PresenceRoster, PresenceState, RemoteCursors};
pub use selection::Selection;
pub use session::{BoardSession, CURSOR_EVENT, OBJECTS_EVENT, SessionError, SessionResult};
pub use storage::{AutoSaver, BoardSnapshot, MemoryStorage, SaveStatus, Storage, StorageError};
pub use sync::{ChangeSet, DeltaSync, Operation, SyncState};
pub use transport::{ChannelEvent, MemoryHub, MemoryTransport, Transport, TransportError};

#[cfg(not(target_arch = "wasm32"))]
pub use storage::FileStorage;
#[cfg(not(target_arch = "wasm32"))]
pub use transport::WsTransport;
