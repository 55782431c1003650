//! SQLite storage for tasks
//!
//! Tasks live in a single `tasks` table. A `position` column keeps the
//! collection order; every write replaces the table inside one transaction.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::{StoreLock, TaskStore};
use crate::domain::{Priority, Task, TaskId, TaskStatus};

/// Raw column values of one `tasks` row
type TaskRow = (String, String, String, String, String);

pub struct SqliteTaskStore {
    db_path: PathBuf,
    conn: Mutex<Connection>,
}

impl SqliteTaskStore {
    /// Schema version - bump when schema changes
    const SCHEMA_VERSION: i32 = 1;

    /// Opens (or creates) the database at `db_path`
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create directory: {}", parent.display())
                })?;
            }
        }

        let conn = Connection::open(db_path)
            .with_context(|| format!("Failed to open task database: {}", db_path.display()))?;

        conn.busy_timeout(Duration::from_secs(5))?;

        // Enable WAL mode for better concurrent access
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        Self::ensure_schema(&conn)?;

        Ok(Self {
            db_path: db_path.to_path_buf(),
            conn: Mutex::new(conn),
        })
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    fn ensure_schema(conn: &Connection) -> Result<()> {
        let current: i32 = conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))
            .optional()?
            .unwrap_or(0);

        if current == Self::SCHEMA_VERSION {
            return Ok(());
        }

        conn.execute_batch(&format!(
            "
            CREATE TABLE IF NOT EXISTS tasks (
                id TEXT PRIMARY KEY,
                position INTEGER NOT NULL,
                title TEXT NOT NULL,
                status TEXT NOT NULL,
                priority TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_tasks_position ON tasks(position);
            PRAGMA user_version = {};
            ",
            Self::SCHEMA_VERSION
        ))
        .context("Failed to create task schema")?;

        Ok(())
    }

    fn conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("SQLite connection lock poisoned"))
    }
}

fn task_from_row((id, title, status, priority, created_at): TaskRow) -> Result<Task> {
    Ok(Task {
        id: id.parse::<TaskId>()?,
        title,
        status: status.parse::<TaskStatus>()?,
        priority: priority.parse::<Priority>()?,
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .with_context(|| format!("Invalid created_at '{}'", created_at))?
            .with_timezone(&Utc),
    })
}

impl TaskStore for SqliteTaskStore {
    fn describe(&self) -> String {
        format!("sqlite:{}", self.db_path.display())
    }

    fn is_persistent(&self) -> bool {
        true
    }

    fn read(&self) -> Result<Vec<Task>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, title, status, priority, created_at FROM tasks ORDER BY position",
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
            })?
            .collect::<rusqlite::Result<Vec<TaskRow>>>()?;

        rows.into_iter()
            .map(|row| {
                let id = row.0.clone();
                task_from_row(row).with_context(|| format!("Failed to load task {}", id))
            })
            .collect()
    }

    fn write(&self, tasks: &[Task]) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        tx.execute("DELETE FROM tasks", [])?;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO tasks (id, position, title, status, priority, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;

            for (position, task) in tasks.iter().enumerate() {
                stmt.execute(params![
                    task.id.as_str(),
                    position as i64,
                    task.title,
                    task.status.as_str(),
                    task.priority.as_str(),
                    task.created_at.to_rfc3339_opts(SecondsFormat::Nanos, true),
                ])
                .with_context(|| format!("Failed to insert task {}", task.id))?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    fn write_lock(&self) -> Result<StoreLock> {
        StoreLock::acquire(&self.db_path)
    }
}
