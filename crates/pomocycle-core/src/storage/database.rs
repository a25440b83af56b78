//! SQLite-based storage for the cycle engine's collaborators.
//!
//! Provides persistent storage for:
//! - Completed focus sessions
//! - Tasks and their pomodoro progress
//! - Overwork (fatigue) events
//! - A small stats summary over the above

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::error::{CoreError, DatabaseError, ValidationError};
use crate::fatigue::FatigueRule;
use crate::task::{TaskCategory, TaskFilter, TaskRecord, TaskStatus};
use crate::timer::TimerMode;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: i64,
    pub task_id: Option<String>,
    pub user_id: Option<String>,
    pub session_type: String,
    pub duration_min: u64,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverworkRecord {
    pub id: i64,
    pub user_id: Option<String>,
    pub rule_code: String,
    pub notes: String,
    pub logged_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Stats {
    pub today_pomodoros: u64,
    pub total_pomodoros: u64,
    pub total_focus_min: u64,
    pub tasks_done: u64,
    pub active_tasks: u64,
    pub overwork_events: u64,
}

/// SQLite database for sessions, tasks and overwork events.
pub struct Database {
    conn: Connection,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").finish_non_exhaustive()
    }
}

type DbResult<T> = Result<T, DatabaseError>;

impl Database {
    /// Open the database at `~/.config/pomocycle/pomocycle.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, CoreError> {
        let path = data_dir()?.join("pomocycle.db");
        Ok(Self::open_at(&path)?)
    }

    pub fn open_at(path: &Path) -> DbResult<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: PathBuf::from(path),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), rusqlite::Error> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS sessions (
                id           INTEGER PRIMARY KEY AUTOINCREMENT,
                task_id      TEXT,
                user_id      TEXT,
                session_type TEXT NOT NULL,
                duration_min INTEGER NOT NULL,
                completed_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS tasks (
                id                  TEXT PRIMARY KEY,
                name                TEXT NOT NULL,
                category            TEXT NOT NULL DEFAULT 'work',
                pomodoro_goal       INTEGER NOT NULL,
                pomodoros_completed INTEGER NOT NULL DEFAULT 0,
                status              TEXT NOT NULL DEFAULT 'active',
                created_at          TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS overwork_logs (
                id        INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id   TEXT,
                rule_code TEXT NOT NULL,
                notes     TEXT NOT NULL DEFAULT '',
                logged_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_sessions_completed_at ON sessions(completed_at);
            CREATE INDEX IF NOT EXISTS idx_sessions_task_id ON sessions(task_id);
            CREATE INDEX IF NOT EXISTS idx_tasks_status ON tasks(status);",
        )?;
        Ok(())
    }

    // ── Sessions ─────────────────────────────────────────────────────

    /// Record a completed session to the database.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub fn record_session(
        &self,
        task_id: Option<&str>,
        user_id: Option<&str>,
        kind: TimerMode,
        duration_min: u64,
        completed_at: DateTime<Utc>,
    ) -> DbResult<i64> {
        self.conn.execute(
            "INSERT INTO sessions (task_id, user_id, session_type, duration_min, completed_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                task_id,
                user_id,
                kind.as_str(),
                duration_min,
                completed_at.to_rfc3339(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Most recent sessions first.
    pub fn list_sessions(&self, limit: usize) -> DbResult<Vec<SessionRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, task_id, user_id, session_type, duration_min, completed_at
             FROM sessions ORDER BY completed_at DESC, id DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok(SessionRecord {
                id: row.get(0)?,
                task_id: row.get(1)?,
                user_id: row.get(2)?,
                session_type: row.get(3)?,
                duration_min: row.get(4)?,
                completed_at: parse_ts(&row.get::<_, String>(5)?),
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    // ── Tasks ────────────────────────────────────────────────────────

    pub fn insert_task(&self, task: &TaskRecord) -> DbResult<()> {
        self.conn.execute(
            "INSERT INTO tasks (id, name, category, pomodoro_goal, pomodoros_completed, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                task.id,
                task.name,
                task.category.as_str(),
                task.pomodoro_goal,
                task.pomodoros_completed,
                task.status.as_str(),
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn get_task(&self, id: &str) -> DbResult<Option<TaskRecord>> {
        let task = self
            .conn
            .query_row(
                "SELECT id, name, category, pomodoro_goal, pomodoros_completed, status
                 FROM tasks WHERE id = ?1",
                params![id],
                task_from_row,
            )
            .optional()?;
        Ok(task)
    }

    fn require_task(&self, id: &str) -> DbResult<TaskRecord> {
        self.get_task(id)?.ok_or_else(|| DatabaseError::NotFound {
            kind: "task",
            id: id.to_string(),
        })
    }

    pub fn list_tasks(&self, filter: TaskFilter) -> DbResult<Vec<TaskRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, category, pomodoro_goal, pomodoros_completed, status
             FROM tasks ORDER BY created_at ASC, rowid ASC",
        )?;
        let rows = stmt.query_map([], task_from_row)?;
        let mut tasks = Vec::new();
        for row in rows {
            let task = row?;
            if filter.matches(task.status) {
                tasks.push(task);
            }
        }
        Ok(tasks)
    }

    /// Rewrite name, category and goal. Progress and status are kept.
    ///
    /// # Errors
    /// Rejects a blank name or a zero goal with the same rules as
    /// [`TaskRecord::new`]; nothing is written in that case.
    pub fn update_task(
        &self,
        id: &str,
        name: Option<&str>,
        category: Option<TaskCategory>,
        pomodoro_goal: Option<u32>,
    ) -> Result<TaskRecord, CoreError> {
        let mut task = self.require_task(id)?;
        if let Some(name) = name {
            let name = name.trim();
            if name.is_empty() {
                return Err(ValidationError::Empty("name".into()).into());
            }
            task.name = name.to_string();
        }
        if let Some(category) = category {
            task.category = category;
        }
        if let Some(goal) = pomodoro_goal {
            if goal == 0 {
                return Err(ValidationError::InvalidValue {
                    field: "pomodoro_goal".into(),
                    message: "must be at least 1".into(),
                }
                .into());
            }
            task.pomodoro_goal = goal;
        }
        self.write_task(&task)?;
        Ok(task)
    }

    pub fn set_task_status(&self, id: &str, status: TaskStatus) -> DbResult<TaskRecord> {
        let mut task = self.require_task(id)?;
        task.status = status;
        self.write_task(&task)?;
        Ok(task)
    }

    /// Flip active <-> completed.
    pub fn toggle_task_status(&self, id: &str) -> DbResult<TaskRecord> {
        let task = self.require_task(id)?;
        self.set_task_status(id, task.status.toggled())
    }

    /// Count one completed pomodoro against the task, completing it once
    /// the goal is reached.
    pub fn increment_task_progress(&self, id: &str) -> DbResult<TaskRecord> {
        let mut task = self.require_task(id)?;
        if task.record_pomodoro() {
            tracing::info!(
                task_id = id,
                goal = task.pomodoro_goal,
                "task reached its pomodoro goal"
            );
        }
        self.write_task(&task)?;
        Ok(task)
    }

    pub fn delete_task(&self, id: &str) -> DbResult<bool> {
        let n = self
            .conn
            .execute("DELETE FROM tasks WHERE id = ?1", params![id])?;
        Ok(n > 0)
    }

    fn write_task(&self, task: &TaskRecord) -> DbResult<()> {
        self.conn.execute(
            "UPDATE tasks SET name = ?2, category = ?3, pomodoro_goal = ?4,
                              pomodoros_completed = ?5, status = ?6
             WHERE id = ?1",
            params![
                task.id,
                task.name,
                task.category.as_str(),
                task.pomodoro_goal,
                task.pomodoros_completed,
                task.status.as_str(),
            ],
        )?;
        Ok(())
    }

    // ── Overwork ─────────────────────────────────────────────────────

    pub fn log_overwork(
        &self,
        user_id: Option<&str>,
        rule: FatigueRule,
        notes: &str,
        logged_at: DateTime<Utc>,
    ) -> DbResult<i64> {
        self.conn.execute(
            "INSERT INTO overwork_logs (user_id, rule_code, notes, logged_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![user_id, rule.code(), notes, logged_at.to_rfc3339()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn list_overwork(&self, limit: usize) -> DbResult<Vec<OverworkRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, rule_code, notes, logged_at
             FROM overwork_logs ORDER BY logged_at DESC, id DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok(OverworkRecord {
                id: row.get(0)?,
                user_id: row.get(1)?,
                rule_code: row.get(2)?,
                notes: row.get(3)?,
                logged_at: parse_ts(&row.get::<_, String>(4)?),
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    // ── Stats ────────────────────────────────────────────────────────

    pub fn stats(&self) -> DbResult<Stats> {
        let today = Utc::now().format("%Y-%m-%d").to_string();
        let focus = TimerMode::Focus.as_str();

        let (total_pomodoros, total_focus_min) = self.conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(duration_min), 0)
             FROM sessions WHERE session_type = ?1",
            params![focus],
            |row| Ok((row.get::<_, u64>(0)?, row.get::<_, u64>(1)?)),
        )?;
        let today_pomodoros = self.conn.query_row(
            "SELECT COUNT(*) FROM sessions WHERE session_type = ?1 AND completed_at >= ?2",
            params![focus, format!("{today}T00:00:00+00:00")],
            |row| row.get::<_, u64>(0),
        )?;

        let mut stats = Stats {
            today_pomodoros,
            total_pomodoros,
            total_focus_min,
            ..Stats::default()
        };

        let mut stmt = self
            .conn
            .prepare("SELECT status, COUNT(*) FROM tasks GROUP BY status")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, u64>(1)?))
        })?;
        for row in rows {
            let (status, count) = row?;
            match TaskStatus::parse(&status) {
                Some(TaskStatus::Active) => stats.active_tasks += count,
                Some(TaskStatus::Completed) => stats.tasks_done += count,
                None => {}
            }
        }

        stats.overwork_events =
            self.conn
                .query_row("SELECT COUNT(*) FROM overwork_logs", [], |row| row.get(0))?;

        Ok(stats)
    }
}

fn task_from_row(row: &Row<'_>) -> rusqlite::Result<TaskRecord> {
    let category: String = row.get(2)?;
    let status: String = row.get(5)?;
    Ok(TaskRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        category: TaskCategory::parse(&category).unwrap_or_default(),
        pomodoro_goal: row.get(3)?,
        pomodoros_completed: row.get(4)?,
        status: TaskStatus::parse(&status).unwrap_or(TaskStatus::Active),
    })
}

fn parse_ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_default()
}
