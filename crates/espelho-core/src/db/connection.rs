//! Database connection management

use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use rusqlite::{Connection, Transaction};

use crate::error::{Error, Result};

use super::schema;

/// Wrapper around the single embedded SQLite file.
///
/// The connection sits behind a mutex: reads and writes are short synchronous
/// calls, and callers must never hold the lock across an await point.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open the database at the given path, creating it if it doesn't exist.
    ///
    /// Runs schema initialization; a schema failure is fatal.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref()).map_err(Error::from)?;
        Self::bootstrap(conn)
    }

    /// Open an in-memory database (useful for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(Error::from)?;
        Self::bootstrap(conn)
    }

    fn bootstrap(conn: Connection) -> Result<Self> {
        configure(&conn);
        schema::init(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run a read-only closure against the connection
    pub(crate) fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self.lock();
        f(&conn)
    }

    /// Run a closure inside one write transaction.
    ///
    /// Commit happens only when the closure succeeds; any error rolls the
    /// whole transaction back and surfaces as `Error::Transaction` with the
    /// underlying cause preserved.
    pub(crate) fn with_tx<T>(&self, f: impl FnOnce(&Transaction<'_>) -> Result<T>) -> Result<T> {
        let mut conn = self.lock();
        let tx = conn.transaction().map_err(Error::transaction)?;
        match f(&tx) {
            Ok(value) => {
                tx.commit().map_err(Error::transaction)?;
                Ok(value)
            }
            Err(error) => Err(match error {
                // dropping the transaction rolls it back
                Error::Sqlite(source) => Error::transaction(source),
                other => other,
            }),
        }
    }
}

/// Configure SQLite for a single-writer local file
fn configure(conn: &Connection) {
    // journal_mode returns a row; in-memory databases report "memory"
    conn.query_row("PRAGMA journal_mode = WAL", [], |_| Ok(())).ok();
    conn.execute_batch("PRAGMA synchronous = NORMAL;").ok();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_in_memory_initializes_schema() {
        let db = Database::open_in_memory().unwrap();
        let count: i64 = db
            .with_conn(|conn| {
                Ok(conn.query_row("SELECT COUNT(*) FROM tarefas", [], |row| row.get(0))?)
            })
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn with_tx_rolls_back_on_error() {
        let db = Database::open_in_memory().unwrap();
        let result: Result<()> = db.with_tx(|tx| {
            tx.execute(
                "INSERT INTO workspace (nome, criador) VALUES ('w', 'a@b.c')",
                [],
            )?;
            Err(Error::InvalidInput("forced failure".into()))
        });
        assert!(result.is_err());

        let count: i64 = db
            .with_conn(|conn| {
                Ok(conn.query_row("SELECT COUNT(*) FROM workspace", [], |row| row.get(0))?)
            })
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn with_tx_wraps_sqlite_failures() {
        let db = Database::open_in_memory().unwrap();
        let result: Result<()> = db.with_tx(|tx| {
            tx.execute("INSERT INTO no_such_table (x) VALUES (1)", [])?;
            Ok(())
        });
        assert!(matches!(result, Err(Error::Transaction { .. })));
    }
}
