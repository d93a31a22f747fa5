//! Task CRUD over the `tasks` table.

use super::{Database, now};
use crate::error::{StoreError, StoreResult};
use crate::types::{TITLE_MAX_CHARS, Task, TaskPatch};
use rusqlite::{Connection, Row, params};
use tracing::debug;

/// Sample rows inserted into a fresh database.
const EXAMPLE_TITLES: [&str; 4] = [
    "Aprender a desplegar el servidor",
    "Configurar la base de datos",
    "Crear la API REST",
    "Conectar el cliente con el backend",
];

fn parse_task_row(row: &Row) -> rusqlite::Result<Task> {
    Ok(Task {
        id: row.get("id")?,
        title: row.get("title")?,
        completed: row.get("completed")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

/// Trim and validate a title per the storage invariant: never empty or
/// whitespace-only, never longer than [`TITLE_MAX_CHARS`] characters.
fn normalize_title(raw: &str) -> StoreResult<String> {
    let title = raw.trim();
    if title.is_empty() {
        return Err(StoreError::Validation("El título es requerido".into()));
    }
    if title.chars().count() > TITLE_MAX_CHARS {
        return Err(StoreError::Validation(format!(
            "El título supera los {TITLE_MAX_CHARS} caracteres"
        )));
    }
    Ok(title.to_string())
}

/// Internal helper to get a task using an existing connection.
fn get_task_internal(conn: &Connection, id: i64) -> StoreResult<Option<Task>> {
    let mut stmt = conn.prepare("SELECT * FROM tasks WHERE id = ?1")?;

    match stmt.query_row(params![id], parse_task_row) {
        Ok(task) => Ok(Some(task)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

impl Database {
    /// All tasks, newest first.
    ///
    /// The ordering is part of the API contract: the client shapes its
    /// presentation around it. The `id` tiebreak keeps it deterministic
    /// when two rows share a timestamp.
    pub fn list_tasks(&self) -> StoreResult<Vec<Task>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT * FROM tasks ORDER BY created_at DESC, id DESC")?;

            let tasks = stmt
                .query_map([], parse_task_row)?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(tasks)
        })
    }

    /// Get a task by id. Absent rows are `Ok(None)`, not an error.
    pub fn get_task(&self, id: i64) -> StoreResult<Option<Task>> {
        self.with_conn(|conn| get_task_internal(conn, id))
    }

    /// Insert a new task and return the row as persisted.
    pub fn create_task(&self, title: &str) -> StoreResult<Task> {
        let title = normalize_title(title)?;
        let ts = now();

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO tasks (title, completed, created_at, updated_at)
                 VALUES (?1, 0, ?2, ?3)",
                params![title, ts, ts],
            )?;
            let id = conn.last_insert_rowid();
            debug!(id, "task created");

            // Re-select so the caller sees exactly what was persisted,
            // defaults included.
            get_task_internal(conn, id)?.ok_or(StoreError::NotFound)
        })
    }

    /// Apply a partial update and return the fully updated row.
    ///
    /// Populated patch fields are folded into one parameterized statement;
    /// absent fields keep their stored value. `completed` is stored
    /// strictly as 0 or 1.
    pub fn update_task(&self, id: i64, patch: &TaskPatch) -> StoreResult<Task> {
        let title = match &patch.title {
            Some(raw) => Some(normalize_title(raw)?),
            None => None,
        };
        let completed = patch.completed.map(i64::from);
        let ts = now();

        self.with_conn(|conn| {
            let affected = conn.execute(
                "UPDATE tasks SET
                     title = COALESCE(?2, title),
                     completed = COALESCE(?3, completed),
                     updated_at = ?4
                 WHERE id = ?1",
                params![id, title, completed, ts],
            )?;
            if affected == 0 {
                return Err(StoreError::NotFound);
            }

            // The row can vanish between the update and this read under a
            // concurrent delete; that surfaces as not-found, not a crash.
            get_task_internal(conn, id)?.ok_or(StoreError::NotFound)
        })
    }

    /// Delete a task, returning its state immediately before deletion.
    pub fn delete_task(&self, id: i64) -> StoreResult<Task> {
        self.with_conn(|conn| {
            let task = get_task_internal(conn, id)?.ok_or(StoreError::NotFound)?;

            let affected = conn.execute("DELETE FROM tasks WHERE id = ?1", params![id])?;
            if affected == 0 {
                return Err(StoreError::NotFound);
            }
            debug!(id, "task deleted");

            Ok(task)
        })
    }

    /// Seed the sample tasks into a fresh database.
    ///
    /// Each title is guarded by a check-then-insert on the exact title, so
    /// repeated startups insert nothing new. Callers serialize on the
    /// connection mutex, which keeps the two steps from racing in-process.
    pub fn seed_example_tasks(&self) -> StoreResult<usize> {
        let ts = now();

        self.with_conn(|conn| {
            let mut inserted = 0;
            for title in EXAMPLE_TITLES {
                let present: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM tasks WHERE title = ?1",
                    params![title],
                    |row| row.get(0),
                )?;
                if present == 0 {
                    conn.execute(
                        "INSERT INTO tasks (title, completed, created_at, updated_at)
                         VALUES (?1, 0, ?2, ?3)",
                        params![title, ts, ts],
                    )?;
                    inserted += 1;
                }
            }
            Ok(inserted)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_trims_whitespace() {
        assert_eq!(normalize_title("  Comprar pan  ").unwrap(), "Comprar pan");
    }

    #[test]
    fn normalize_rejects_blank_titles() {
        assert!(matches!(normalize_title(""), Err(StoreError::Validation(_))));
        assert!(matches!(
            normalize_title("   "),
            Err(StoreError::Validation(_))
        ));
    }

    #[test]
    fn normalize_enforces_max_chars() {
        let at_limit = "á".repeat(TITLE_MAX_CHARS);
        assert_eq!(normalize_title(&at_limit).unwrap(), at_limit);

        let over = "á".repeat(TITLE_MAX_CHARS + 1);
        assert!(matches!(
            normalize_title(&over),
            Err(StoreError::Validation(_))
        ));
    }
}
