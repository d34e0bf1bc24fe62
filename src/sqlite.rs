//! SQLite-backed [`TodoStore`].
//!
//! One connection, shared behind a mutex and driven from tokio's blocking
//! pool. Every gateway call is a single parameterized statement except
//! [`delete`](TodoStore::delete), which issues one statement per id inside a
//! transaction.
//!
//! Timestamps are stored as integer microseconds since the Unix epoch and
//! rendered in the offset handed to [`SqliteStore::open`].

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::{debug, info};

use crate::model::TodoItem;
use crate::store::{StoreError, TodoStore};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS todos (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        subject     TEXT    NOT NULL CHECK (subject <> ''),
        description TEXT    NOT NULL DEFAULT '',
        created_at  INTEGER NOT NULL,
        updated_at  INTEGER NOT NULL
    );
";

const COLUMNS: &str = "id, subject, description, created_at, updated_at";

pub struct SqliteStore {
    conn: Arc<Mutex<Option<Connection>>>,
    offset: FixedOffset,
}

impl SqliteStore {
    /// Opens (or creates) the database at `path`, creating missing parent
    /// directories and the `todos` table.
    pub fn open(path: impl AsRef<Path>, offset: FixedOffset) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        info!(path = %path.display(), "sqlite store opened");
        Self::with_connection(conn, offset)
    }

    /// In-memory database, gone when the store is closed.
    pub fn open_in_memory(offset: FixedOffset) -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?, offset)
    }

    fn with_connection(conn: Connection, offset: FixedOffset) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn: Arc::new(Mutex::new(Some(conn))), offset })
    }

    /// Runs `f` against the open connection on the blocking pool.
    async fn run<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut Connection, FixedOffset) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        let offset = self.offset;
        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock().map_err(|e| StoreError::Task(e.to_string()))?;
            let conn = guard.as_mut().ok_or(StoreError::Closed)?;
            f(conn, offset)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

#[async_trait]
impl TodoStore for SqliteStore {
    async fn create(&self, subject: &str, description: &str) -> Result<TodoItem, StoreError> {
        let (subject, description) = (subject.to_owned(), description.to_owned());
        self.run(move |conn, offset| {
            let now = Utc::now().timestamp_micros();
            let item = conn.query_row(
                &format!(
                    "INSERT INTO todos (subject, description, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?3) RETURNING {COLUMNS}"
                ),
                params![subject, description, now],
                |row| row_to_item(row, offset),
            )?;
            debug!(id = item.id, "todo inserted");
            Ok(item)
        })
        .await
    }

    async fn list(&self, after_id: i64, limit: i64) -> Result<Vec<TodoItem>, StoreError> {
        // SQLite reads a negative LIMIT as "no limit".
        let limit = if limit == 0 { -1 } else { limit };
        self.run(move |conn, offset| {
            let mut stmt = conn.prepare_cached(&format!(
                "SELECT {COLUMNS} FROM todos WHERE id > ?1 ORDER BY id ASC LIMIT ?2"
            ))?;
            let items = stmt
                .query_map(params![after_id, limit], |row| row_to_item(row, offset))?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(items)
        })
        .await
    }

    async fn update(
        &self,
        id: i64,
        subject: &str,
        description: &str,
    ) -> Result<TodoItem, StoreError> {
        let (subject, description) = (subject.to_owned(), description.to_owned());
        self.run(move |conn, offset| {
            let now = Utc::now().timestamp_micros();
            // updated_at moves forward by at least one tick even when the
            // clock has not.
            conn.query_row(
                &format!(
                    "UPDATE todos
                     SET subject = ?2, description = ?3, updated_at = MAX(?4, updated_at + 1)
                     WHERE id = ?1 RETURNING {COLUMNS}"
                ),
                params![id, subject, description, now],
                |row| row_to_item(row, offset),
            )
            .optional()?
            .ok_or(StoreError::NotFound(id))
        })
        .await
    }

    async fn delete(&self, ids: &[i64]) -> Result<(), StoreError> {
        let ids = ids.to_vec();
        self.run(move |conn, _| {
            let tx = conn.transaction()?;
            for &id in &ids {
                let affected = tx.execute("DELETE FROM todos WHERE id = ?1", params![id])?;
                if affected == 0 {
                    // Dropping `tx` rolls back the deletes already issued.
                    return Err(StoreError::NotFound(id));
                }
            }
            tx.commit()?;
            debug!(count = ids.len(), "todos deleted");
            Ok(())
        })
        .await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.run(|conn, _| Ok(conn.query_row("SELECT 1", [], |_| Ok(()))?)).await
    }

    async fn close(&self) -> Result<(), StoreError> {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock().map_err(|e| StoreError::Task(e.to_string()))?;
            let conn = guard.take().ok_or(StoreError::Closed)?;
            conn.close().map_err(|(_, e)| StoreError::Sqlite(e))?;
            info!("sqlite store closed");
            Ok(())
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

fn row_to_item(row: &Row<'_>, offset: FixedOffset) -> rusqlite::Result<TodoItem> {
    Ok(TodoItem {
        id: row.get(0)?,
        subject: row.get(1)?,
        description: row.get(2)?,
        created_at: micros_to_datetime(row, 3, offset)?,
        updated_at: micros_to_datetime(row, 4, offset)?,
    })
}

fn micros_to_datetime(
    row: &Row<'_>,
    idx: usize,
    offset: FixedOffset,
) -> rusqlite::Result<DateTime<FixedOffset>> {
    let micros: i64 = row.get(idx)?;
    DateTime::<Utc>::from_timestamp_micros(micros)
        .map(|at| at.with_timezone(&offset))
        .ok_or(rusqlite::Error::IntegralValueOutOfRange(idx, micros))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    fn tokyo() -> FixedOffset {
        FixedOffset::east_opt(9 * 3600).unwrap()
    }

    #[fixture]
    fn store() -> SqliteStore {
        SqliteStore::open_in_memory(tokyo()).unwrap()
    }

    #[rstest]
    #[tokio::test]
    async fn create_assigns_increasing_ids(store: SqliteStore) {
        let a = store.create("a", "").await.unwrap();
        let b = store.create("b", "desc").await.unwrap();

        assert!(a.id > 0);
        assert!(b.id > a.id);
        assert_eq!(b.description, "desc");
        assert_eq!(a.created_at, a.updated_at);
        assert_eq!(a.created_at.offset(), &tokyo());
    }

    #[rstest]
    #[tokio::test]
    async fn ids_are_not_reused_after_delete(store: SqliteStore) {
        let a = store.create("a", "").await.unwrap();
        store.delete(&[a.id]).await.unwrap();
        let b = store.create("b", "").await.unwrap();
        assert!(b.id > a.id);
    }

    #[rstest]
    #[tokio::test]
    async fn list_pages_by_cursor(store: SqliteStore) {
        for subject in ["a", "b", "c", "d"] {
            store.create(subject, "").await.unwrap();
        }

        let page = store.list(1, 2).await.unwrap();
        let ids: Vec<_> = page.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![2, 3]);

        assert!(store.list(4, 10).await.unwrap().is_empty());
    }

    #[rstest]
    #[tokio::test]
    async fn zero_limit_is_unrestricted(store: SqliteStore) {
        for subject in ["a", "b", "c"] {
            store.create(subject, "").await.unwrap();
        }
        assert_eq!(store.list(0, 0).await.unwrap().len(), 3);
    }

    #[rstest]
    #[tokio::test]
    async fn update_keeps_created_at_and_advances_updated_at(store: SqliteStore) {
        let created = store.create("a", "").await.unwrap();
        let first = store.update(created.id, "b", "x").await.unwrap();
        let second = store.update(created.id, "c", "y").await.unwrap();

        assert_eq!(first.created_at, created.created_at);
        assert_eq!(second.created_at, created.created_at);
        assert!(first.updated_at > created.updated_at);
        assert!(second.updated_at > first.updated_at);
        assert_eq!(second.subject, "c");
        assert_eq!(second.description, "y");
    }

    #[rstest]
    #[tokio::test]
    async fn update_of_missing_id_is_not_found(store: SqliteStore) {
        let err = store.update(42, "a", "").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(42)));
    }

    #[rstest]
    #[tokio::test]
    async fn delete_is_all_or_nothing(store: SqliteStore) {
        let a = store.create("a", "").await.unwrap();
        let b = store.create("b", "").await.unwrap();

        let err = store.delete(&[a.id, 99, b.id]).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(99)));
        assert_eq!(store.list(0, 0).await.unwrap().len(), 2);

        store.delete(&[a.id, b.id]).await.unwrap();
        assert!(store.list(0, 0).await.unwrap().is_empty());
    }

    #[rstest]
    #[tokio::test]
    async fn empty_subject_is_rejected_by_the_table(store: SqliteStore) {
        let err = store.create("", "").await.unwrap_err();
        assert!(matches!(err, StoreError::Sqlite(_)));
    }

    #[rstest]
    #[tokio::test]
    async fn close_happens_once(store: SqliteStore) {
        store.ping().await.unwrap();
        store.close().await.unwrap();

        assert!(matches!(store.close().await, Err(StoreError::Closed)));
        assert!(matches!(store.ping().await, Err(StoreError::Closed)));
        assert!(matches!(store.create("a", "").await, Err(StoreError::Closed)));
    }

    #[test]
    fn open_fails_under_a_regular_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("plain-file");
        std::fs::write(&file, b"").unwrap();

        let err = SqliteStore::open(file.join("todo.db"), tokyo()).err().unwrap();
        assert!(matches!(err, StoreError::Io(_)), "{err}");
    }

    #[test]
    fn open_fails_on_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        let err = SqliteStore::open(dir.path(), tokyo()).err().unwrap();
        assert!(matches!(err, StoreError::Sqlite(_)), "{err}");
    }

    #[tokio::test]
    async fn open_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("todo.db");

        let store = SqliteStore::open(&path, tokyo()).unwrap();
        store.create("a", "").await.unwrap();
        store.close().await.unwrap();

        let reopened = SqliteStore::open(&path, tokyo()).unwrap();
        assert_eq!(reopened.list(0, 0).await.unwrap().len(), 1);
    }
}
