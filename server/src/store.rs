//! SQLite-backed persistence for todo records.
//!
//! # Design
//! `Store` owns exactly one connection for the lifetime of the process. The
//! connection sits behind a `Mutex<Option<_>>`: the mutex serializes access
//! from request handlers, and the `Option` lets `close` release the handle
//! while the `Store` itself is still shared.
//!
//! SQLite keeps `completed` as an integer. `completed_from_sql` is the only
//! place that turns the stored value back into a `bool`, and every read goes
//! through `row_to_todo`.

use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS todos (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    completed BOOLEAN DEFAULT 0
);";

const SELECT_ALL: &str = "SELECT id, title, completed FROM todos ORDER BY id DESC";
const SELECT_BY_ID: &str = "SELECT id, title, completed FROM todos WHERE id = ?1";

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// A single todo record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
    pub id: i64,
    pub title: String,
    pub completed: bool,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("todo store is closed")]
    Closed,

    /// A thread panicked while holding the connection lock.
    #[error("todo store lock poisoned")]
    Poisoned,
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Durable CRUD over the `todos` table.
///
/// Open once at startup, share behind an `Arc`, and call [`Store::close`] at
/// shutdown. Every operation after `close` fails with [`StoreError::Closed`].
#[derive(Debug)]
pub struct Store {
    conn: Mutex<Option<Connection>>,
}

impl Store {
    /// Opens (or creates) the database file at `path` and ensures the
    /// `todos` table exists.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        let store = Self::bootstrap(Connection::open(path)?)?;
        info!(path = %path.display(), "todo store opened");
        Ok(store)
    }

    /// Opens a private in-memory database. Contents vanish on close.
    pub fn open_in_memory() -> StoreResult<Self> {
        let store = Self::bootstrap(Connection::open_in_memory()?)?;
        info!("in-memory todo store opened");
        Ok(store)
    }

    fn bootstrap(conn: Connection) -> StoreResult<Self> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(Some(conn)),
        })
    }

    /// All todos, newest (highest id) first.
    pub fn list_all(&self) -> StoreResult<Vec<Todo>> {
        let todos = self.with_conn(|conn| {
            let mut stmt = conn.prepare_cached(SELECT_ALL)?;
            let rows = stmt.query_map([], row_to_todo)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
        })?;
        debug!(count = todos.len(), "listed todos");
        Ok(todos)
    }

    pub fn get(&self, id: i64) -> StoreResult<Option<Todo>> {
        self.with_conn(|conn| conn.query_row(SELECT_BY_ID, params![id], row_to_todo).optional())
    }

    /// Inserts a new todo. `title` is stored as given; callers validate it.
    pub fn create(&self, title: &str, completed: bool) -> StoreResult<Todo> {
        let todo = self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO todos (title, completed) VALUES (?1, ?2)",
                params![title, completed_to_sql(completed)],
            )?;
            Ok(Todo {
                id: conn.last_insert_rowid(),
                title: title.to_owned(),
                completed,
            })
        })?;
        debug!(id = todo.id, "todo created");
        Ok(todo)
    }

    /// Applies the supplied fields to an existing todo, leaving `None` fields
    /// untouched. Returns `Ok(None)` when no todo has this id.
    ///
    /// The read and the write share one immediate transaction, so a
    /// concurrent writer cannot slip in between them.
    pub fn update(
        &self,
        id: i64,
        title: Option<&str>,
        completed: Option<bool>,
    ) -> StoreResult<Option<Todo>> {
        let updated = self.with_conn(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let existing = tx
                .query_row(SELECT_BY_ID, params![id], row_to_todo)
                .optional()?;
            let Some(existing) = existing else {
                return Ok(None);
            };

            let merged = Todo {
                id,
                title: title.map_or(existing.title, str::to_owned),
                completed: completed.unwrap_or(existing.completed),
            };
            tx.execute(
                "UPDATE todos SET title = ?1, completed = ?2 WHERE id = ?3",
                params![merged.title, completed_to_sql(merged.completed), id],
            )?;
            tx.commit()?;
            Ok(Some(merged))
        })?;
        debug!(id, found = updated.is_some(), "todo update");
        Ok(updated)
    }

    /// Removes a todo. Returns `false` if there was nothing to remove.
    pub fn delete(&self, id: i64) -> StoreResult<bool> {
        let removed =
            self.with_conn(|conn| conn.execute("DELETE FROM todos WHERE id = ?1", params![id]))?;
        debug!(id, removed, "todo delete");
        Ok(removed > 0)
    }

    /// Releases the connection. Calling this more than once is a no-op.
    pub fn close(&self) -> StoreResult<()> {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?.take();
        if let Some(conn) = conn {
            conn.close().map_err(|(_, err)| StoreError::Sqlite(err))?;
            info!("todo store closed");
        }
        Ok(())
    }

    fn with_conn<T>(
        &self,
        op: impl FnOnce(&mut Connection) -> rusqlite::Result<T>,
    ) -> StoreResult<T> {
        let mut guard = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        let conn = guard.as_mut().ok_or(StoreError::Closed)?;
        Ok(op(conn)?)
    }
}

fn row_to_todo(row: &Row<'_>) -> rusqlite::Result<Todo> {
    Ok(Todo {
        id: row.get(0)?,
        title: row.get(1)?,
        completed: completed_from_sql(row.get(2)?),
    })
}

/// `NULL` and `0` are false; any other integer is true.
fn completed_from_sql(raw: Option<i64>) -> bool {
    raw.is_some_and(|value| value != 0)
}

fn completed_to_sql(completed: bool) -> i64 {
    i64::from(completed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> Store {
        Store::open_in_memory().unwrap()
    }

    #[test]
    fn create_assigns_positive_id_and_defaults() {
        let store = store();
        let todo = store.create("Buy milk", false).unwrap();
        assert!(todo.id > 0);
        assert_eq!(todo.title, "Buy milk");
        assert!(!todo.completed);
        assert_eq!(store.list_all().unwrap(), vec![todo]);
    }

    #[test]
    fn list_is_newest_first() {
        let store = store();
        let first = store.create("first", false).unwrap();
        let second = store.create("second", true).unwrap();
        let ids: Vec<i64> = store.list_all().unwrap().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[test]
    fn update_without_fields_changes_nothing() {
        let store = store();
        let todo = store.create("Walk dog", true).unwrap();
        let updated = store.update(todo.id, None, None).unwrap().unwrap();
        assert_eq!(updated, todo);
        assert_eq!(store.get(todo.id).unwrap(), Some(todo));
    }

    #[test]
    fn update_title_preserves_completed() {
        let store = store();
        let todo = store.create("Walk dog", true).unwrap();
        let updated = store.update(todo.id, Some("Walk cat"), None).unwrap().unwrap();
        assert_eq!(updated.title, "Walk cat");
        assert!(updated.completed);
        assert_eq!(store.get(todo.id).unwrap(), Some(updated));
    }

    #[test]
    fn update_completed_preserves_title() {
        let store = store();
        let todo = store.create("Walk dog", true).unwrap();
        let updated = store.update(todo.id, None, Some(false)).unwrap().unwrap();
        assert_eq!(updated.title, "Walk dog");
        assert!(!updated.completed);
    }

    #[test]
    fn update_missing_id_returns_none() {
        let store = store();
        assert_eq!(store.update(999_999, Some("x"), Some(true)).unwrap(), None);
        assert!(store.list_all().unwrap().is_empty());
    }

    #[test]
    fn delete_reports_whether_a_row_went_away() {
        let store = store();
        let todo = store.create("gone soon", false).unwrap();
        assert!(store.delete(todo.id).unwrap());
        assert!(!store.delete(todo.id).unwrap());
        assert!(!store.delete(424_242).unwrap());
        assert_eq!(store.get(todo.id).unwrap(), None);
    }

    #[test]
    fn ids_are_not_reused_after_delete() {
        let store = store();
        let first = store.create("a", false).unwrap();
        store.delete(first.id).unwrap();
        let second = store.create("b", false).unwrap();
        assert!(second.id > first.id);
    }

    #[test]
    fn completed_reads_any_nonzero_integer_as_true() {
        let store = store();
        store
            .with_conn(|conn| {
                conn.execute_batch(
                    "INSERT INTO todos (title, completed) VALUES ('two', 2);
                     INSERT INTO todos (title, completed) VALUES ('null', NULL);
                     INSERT INTO todos (title) VALUES ('default');",
                )
            })
            .unwrap();
        let flags: Vec<(String, bool)> = store
            .list_all()
            .unwrap()
            .into_iter()
            .map(|t| (t.title, t.completed))
            .collect();
        assert_eq!(
            flags,
            vec![
                ("default".to_string(), false),
                ("null".to_string(), false),
                ("two".to_string(), true),
            ]
        );
    }

    #[test]
    fn close_is_idempotent_and_blocks_further_use() {
        let store = store();
        store.close().unwrap();
        store.close().unwrap();
        assert!(matches!(store.list_all(), Err(StoreError::Closed)));
        assert!(matches!(store.create("late", false), Err(StoreError::Closed)));
    }

    #[test]
    fn file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("todos.db");

        let store = Store::open(&path).unwrap();
        let created = store.create("persisted", true).unwrap();
        store.close().unwrap();

        let reopened = Store::open(&path).unwrap();
        assert_eq!(reopened.list_all().unwrap(), vec![created]);
    }
}
