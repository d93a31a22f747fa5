//! Database layer: the task store.

pub mod tasks;

use crate::error::{StoreError, StoreResult};
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

/// Store handle wrapping a SQLite connection.
///
/// Operations serialize on the inner mutex; concurrent requests queue
/// rather than interleave. The engine's single-statement atomicity is the
/// only cross-process guarantee.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create the database at the given path.
    ///
    /// Fails with [`StoreError::Connection`] when the file cannot be
    /// opened or the schema cannot be applied; callers treat that as
    /// fatal at startup.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let conn =
            Connection::open(path).map_err(|e| StoreError::Connection(e.to_string()))?;

        // WAL keeps readers from blocking the writer.
        conn.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA foreign_keys=ON;
             PRAGMA busy_timeout=5000;",
        )?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        db.run_migrations()?;

        Ok(db)
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| StoreError::Connection(e.to_string()))?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        db.run_migrations()?;

        Ok(db)
    }

    /// Apply the embedded schema. Idempotent: refinery records applied
    /// migrations and skips them on later opens.
    fn run_migrations(&self) -> StoreResult<()> {
        let mut conn = self.conn.lock().unwrap();
        embedded::migrations::runner()
            .run(&mut *conn)
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        Ok(())
    }

    /// Execute a function with exclusive access to the connection.
    pub(crate) fn with_conn<F, T>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&Connection) -> StoreResult<T>,
    {
        let conn = self.conn.lock().unwrap();
        f(&conn)
    }

    /// Trivial liveness query backing the health endpoint.
    pub fn ping(&self) -> StoreResult<()> {
        self.with_conn(|conn| {
            conn.query_row("SELECT 1", [], |_| Ok(()))?;
            Ok(())
        })
    }
}

/// Current UTC timestamp, the store's single clock source.
pub fn now() -> chrono::DateTime<chrono::Utc> {
    chrono::Utc::now()
}
