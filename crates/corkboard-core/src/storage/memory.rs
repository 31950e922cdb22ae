//! In-memory storage implementation.

use super::{BoardSnapshot, BoxFuture, Storage, StorageError, StorageResult};
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory storage for tests and ephemeral boards.
#[derive(Default)]
pub struct MemoryStorage {
    boards: RwLock<HashMap<String, BoardSnapshot>>,
}

impl MemoryStorage {
    /// Create a new empty memory storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a storage already holding one board.
    pub fn with_board(board_id: &str, snapshot: BoardSnapshot) -> Self {
        let storage = Self::new();
        if let Ok(mut boards) = storage.boards.write() {
            boards.insert(board_id.to_string(), snapshot);
        }
        storage
    }
}

fn lock_error(e: impl std::fmt::Display) -> StorageError {
    StorageError::Other(format!("Lock error: {e}"))
}

impl Storage for MemoryStorage {
    fn save(&self, board_id: &str, snapshot: &BoardSnapshot) -> BoxFuture<'_, StorageResult<()>> {
        let board_id = board_id.to_string();
        let snapshot = snapshot.clone();
        Box::pin(async move {
            let mut boards = self.boards.write().map_err(lock_error)?;
            boards.insert(board_id, snapshot);
            Ok(())
        })
    }

    fn load(&self, board_id: &str) -> BoxFuture<'_, StorageResult<BoardSnapshot>> {
        let board_id = board_id.to_string();
        Box::pin(async move {
            let boards = self.boards.read().map_err(lock_error)?;
            boards
                .get(&board_id)
                .cloned()
                .ok_or(StorageError::NotFound(board_id))
        })
    }

    fn delete(&self, board_id: &str) -> BoxFuture<'_, StorageResult<()>> {
        let board_id = board_id.to_string();
        Box::pin(async move {
            let mut boards = self.boards.write().map_err(lock_error)?;
            boards.remove(&board_id);
            Ok(())
        })
    }

    fn list(&self) -> BoxFuture<'_, StorageResult<Vec<String>>> {
        Box::pin(async move {
            let boards = self.boards.read().map_err(lock_error)?;
            Ok(boards.keys().cloned().collect())
        })
    }

    fn exists(&self, board_id: &str) -> BoxFuture<'_, StorageResult<bool>> {
        let board_id = board_id.to_string();
        Box::pin(async move {
            let boards = self.boards.read().map_err(lock_error)?;
            Ok(boards.contains_key(&board_id))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_and_load() {
        let storage = MemoryStorage::new();
        let snap = BoardSnapshot::new(Vec::new(), 7);

        storage.save("board", &snap).await.unwrap();
        let loaded = storage.load("board").await.unwrap();

        assert_eq!(loaded.next_id, 7);
    }

    #[tokio::test]
    async fn test_not_found() {
        let storage = MemoryStorage::new();
        let result = storage.load("nonexistent").await;

        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_exists_and_delete() {
        let storage = MemoryStorage::with_board("board", BoardSnapshot::default());

        assert!(storage.exists("board").await.unwrap());
        storage.delete("board").await.unwrap();
        assert!(!storage.exists("board").await.unwrap());
    }

    #[tokio::test]
    async fn test_list() {
        let storage = MemoryStorage::new();
        let snap = BoardSnapshot::default();

        storage.save("b1", &snap).await.unwrap();
        storage.save("b2", &snap).await.unwrap();

        let mut list = storage.list().await.unwrap();
        list.sort();
        assert_eq!(list, vec!["b1".to_string(), "b2".to_string()]);
    }
}
