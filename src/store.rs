//! Persistence gateway interface.
//!
//! A narrow CRUD façade over one table. Implementations own no business
//! logic: validation happens in [`TodoHandler`](crate::TodoHandler) before a
//! gateway method is ever called.

use async_trait::async_trait;
use thiserror::Error;

use crate::model::TodoItem;

/// Failure reported by a [`TodoStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// An update or delete affected zero rows.
    #[error("todo {0} not found")]
    NotFound(i64),

    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    /// The handle was already closed.
    #[error("store is closed")]
    Closed,

    /// The blocking task running the statement panicked or the connection
    /// lock was poisoned.
    #[error("store task failed: {0}")]
    Task(String),
}

/// CRUD operations against the item store.
///
/// Shared across every connection task as `Arc<dyn TodoStore>`.
#[async_trait]
pub trait TodoStore: Send + Sync + 'static {
    /// Inserts one item and returns it with its assigned id and timestamps.
    async fn create(&self, subject: &str, description: &str) -> Result<TodoItem, StoreError>;

    /// Items with `id > after_id` in ascending id order. `limit == 0` means
    /// no limit.
    async fn list(&self, after_id: i64, limit: i64) -> Result<Vec<TodoItem>, StoreError>;

    /// Rewrites subject and description, refreshing `updated_at`.
    ///
    /// Returns [`StoreError::NotFound`] if `id` does not exist.
    async fn update(&self, id: i64, subject: &str, description: &str)
        -> Result<TodoItem, StoreError>;

    /// Deletes every id or none of them.
    ///
    /// Returns [`StoreError::NotFound`] carrying the first id that matched no
    /// row; the deletes already issued for the other ids are rolled back.
    async fn delete(&self, ids: &[i64]) -> Result<(), StoreError>;

    /// Cheap round-trip used by the readiness probe.
    async fn ping(&self) -> Result<(), StoreError>;

    /// Closes the underlying handle. Later calls fail with
    /// [`StoreError::Closed`].
    async fn close(&self) -> Result<(), StoreError>;
}
