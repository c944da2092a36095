//! SQLite persistence for tasks and sessions.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use stint_core::types::{Session, SessionId, Task, TaskId, TaskSort};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sqlite error: {source}")]
    Sql {
        #[from]
        source: rusqlite::Error,
    },
    #[error("a task named '{name}' already exists")]
    DuplicateName { name: String },
    #[error("task {id} not found")]
    TaskNotFound { id: TaskId },
    #[error("session {id} not found")]
    SessionNotFound { id: SessionId },
    #[error("transaction for {op} rolled back: {source}")]
    RolledBack {
        op: &'static str,
        #[source]
        source: rusqlite::Error,
    },
    #[error("timestamp parse error for value '{value}': {source}")]
    TimestampParse {
        value: String,
        #[source]
        source: chrono::ParseError,
    },
}

/// SQLite-backed store. The connection sits behind one mutex, which also
/// serializes flushes: at most one session write is in flight at a time.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        tune(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        tune(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn migrate(&self) -> Result<(), StoreError> {
        self.lock_conn().execute_batch(
            r#"
CREATE TABLE IF NOT EXISTS tasks (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    description TEXT,
    accumulated_seconds INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS sessions (
    id INTEGER PRIMARY KEY,
    task_id INTEGER NOT NULL REFERENCES tasks(id),
    started_at TEXT NOT NULL,
    duration_seconds INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_sessions_task ON sessions(task_id, started_at);
"#,
        )?;
        Ok(())
    }

    pub fn create_task(&self, name: &str, description: Option<&str>) -> Result<Task, StoreError> {
        let conn = self.lock_conn();
        let inserted = conn.execute(
            "INSERT INTO tasks (name, description, accumulated_seconds) VALUES (?1, ?2, 0)",
            params![name, description],
        );
        match inserted {
            Ok(_) => Ok(Task {
                id: TaskId(conn.last_insert_rowid()),
                name: name.to_string(),
                description: description.map(str::to_string),
                accumulated_seconds: 0,
            }),
            Err(err) if is_unique_violation(&err) => Err(StoreError::DuplicateName {
                name: name.to_string(),
            }),
            Err(err) => Err(err.into()),
        }
    }

    pub fn load_task(&self, id: TaskId) -> Result<Option<Task>, StoreError> {
        let task = self
            .lock_conn()
            .query_row(
                "SELECT id, name, description, accumulated_seconds FROM tasks WHERE id = ?1",
                params![id.0],
                task_from_row,
            )
            .optional()?;
        Ok(task)
    }

    pub fn list_tasks(&self, sort: TaskSort) -> Result<Vec<Task>, StoreError> {
        let order = match sort {
            TaskSort::Name => "name COLLATE NOCASE ASC, id ASC",
            TaskSort::Accumulated => "accumulated_seconds DESC, name COLLATE NOCASE ASC",
            TaskSort::Id => "id ASC",
        };
        let sql =
            format!("SELECT id, name, description, accumulated_seconds FROM tasks ORDER BY {order}");

        let conn = self.lock_conn();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], task_from_row)?;
        let mut tasks = Vec::new();
        for row in rows {
            tasks.push(row?);
        }
        Ok(tasks)
    }

    /// Deletes a task and its sessions in one transaction. Any failure rolls
    /// the whole delete back. Returns false when the task does not exist.
    pub fn delete_task(&self, id: TaskId) -> Result<bool, StoreError> {
        let mut conn = self.lock_conn();
        let tx = conn.transaction()?;
        let removed = match delete_task_rows(&tx, id) {
            Ok(removed) => removed,
            Err(source) => {
                // dropping the open transaction rolls both deletes back
                return Err(StoreError::RolledBack {
                    op: "delete_task",
                    source,
                });
            }
        };
        tx.commit().map_err(|source| StoreError::RolledBack {
            op: "delete_task",
            source,
        })?;
        Ok(removed)
    }

    pub fn insert_session(
        &self,
        task_id: TaskId,
        started_at: DateTime<Utc>,
    ) -> Result<SessionId, StoreError> {
        let conn = self.lock_conn();
        conn.execute(
            "INSERT INTO sessions (task_id, started_at, duration_seconds) VALUES (?1, ?2, 0)",
            params![task_id.0, started_at.to_rfc3339()],
        )?;
        Ok(SessionId(conn.last_insert_rowid()))
    }

    pub fn load_session(&self, id: SessionId) -> Result<Option<Session>, StoreError> {
        let raw = self
            .lock_conn()
            .query_row(
                "SELECT id, task_id, started_at, duration_seconds FROM sessions WHERE id = ?1",
                params![id.0],
                raw_session_from_row,
            )
            .optional()?;
        raw.map(session_from_raw).transpose()
    }

    pub fn list_sessions_for_task(&self, task_id: TaskId) -> Result<Vec<Session>, StoreError> {
        let conn = self.lock_conn();
        let mut stmt = conn.prepare(
            "SELECT id, task_id, started_at, duration_seconds FROM sessions
             WHERE task_id = ?1 ORDER BY started_at ASC, id ASC",
        )?;
        let rows = stmt.query_map(params![task_id.0], raw_session_from_row)?;
        let mut sessions = Vec::new();
        for row in rows {
            sessions.push(session_from_raw(row?)?);
        }
        Ok(sessions)
    }

    /// Autosave flush: overwrite the session row with the absolute elapsed
    /// value and move the task aggregate by the delta since the previous
    /// flush, in one transaction. Repeating a value changes nothing.
    pub fn flush_session(&self, id: SessionId, elapsed_seconds: i64) -> Result<(), StoreError> {
        let mut conn = self.lock_conn();
        let tx = conn.transaction()?;

        let row: Option<(i64, i64)> = tx
            .query_row(
                "SELECT task_id, duration_seconds FROM sessions WHERE id = ?1",
                params![id.0],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        let Some((task_id, previous_seconds)) = row else {
            return Err(StoreError::SessionNotFound { id });
        };

        let delta = elapsed_seconds - previous_seconds;
        if delta == 0 {
            return Ok(());
        }

        tx.execute(
            "UPDATE sessions SET duration_seconds = ?2 WHERE id = ?1",
            params![id.0, elapsed_seconds],
        )?;
        tx.execute(
            "UPDATE tasks SET accumulated_seconds = accumulated_seconds + ?2 WHERE id = ?1",
            params![task_id, delta],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Terminal flush for Stop: the session row gets its final value and the
    /// task aggregate is recomputed from the pre-session baseline, healing
    /// any drift left by missed autosave flushes.
    pub fn finalize_session(
        &self,
        id: SessionId,
        task_id: TaskId,
        prior_accumulated: i64,
        final_seconds: i64,
    ) -> Result<(), StoreError> {
        let mut conn = self.lock_conn();
        let tx = conn.transaction()?;

        let updated = tx.execute(
            "UPDATE sessions SET duration_seconds = ?2 WHERE id = ?1",
            params![id.0, final_seconds],
        )?;
        if updated == 0 {
            return Err(StoreError::SessionNotFound { id });
        }
        tx.execute(
            "UPDATE tasks SET accumulated_seconds = ?2 WHERE id = ?1",
            params![task_id.0, prior_accumulated + final_seconds],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn lock_conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("sqlite connection lock")
    }

    /// Raw connection access for tests that need to reach around the API.
    #[cfg(test)]
    pub(crate) fn conn_for_tests(&self) -> MutexGuard<'_, Connection> {
        self.lock_conn()
    }
}

fn tune(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.busy_timeout(BUSY_TIMEOUT)?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    Ok(())
}

fn delete_task_rows(tx: &Transaction<'_>, id: TaskId) -> Result<bool, rusqlite::Error> {
    tx.execute("DELETE FROM sessions WHERE task_id = ?1", params![id.0])?;
    let tasks_deleted = tx.execute("DELETE FROM tasks WHERE id = ?1", params![id.0])?;
    Ok(tasks_deleted > 0)
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(code, _)
            if code.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

fn task_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Task> {
    Ok(Task {
        id: TaskId(row.get(0)?),
        name: row.get(1)?,
        description: row.get(2)?,
        accumulated_seconds: row.get(3)?,
    })
}

type RawSession = (i64, i64, String, i64);

fn raw_session_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawSession> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
}

fn session_from_raw(raw: RawSession) -> Result<Session, StoreError> {
    let (id, task_id, started_at, duration_seconds) = raw;
    let started_at = DateTime::parse_from_rfc3339(&started_at)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|source| StoreError::TimestampParse {
            value: started_at,
            source,
        })?;
    Ok(Session {
        id: SessionId(id),
        task_id: TaskId(task_id),
        started_at,
        duration_seconds,
    })
}
