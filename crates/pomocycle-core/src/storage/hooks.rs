use std::sync::{Arc, Mutex};

use chrono::Utc;

use super::Database;
use crate::fatigue::FatigueRule;
use crate::hooks::{
    HookError, HookResult, OverworkLog, SessionEmitter, TaskLookup, TaskProgressUpdater,
};
use crate::task::TaskRecord;
use crate::timer::TimerMode;

/// Plugs a shared [`Database`] into every collaborator slot of a
/// [`crate::CycleSession`], stamping rows with the configured user id.
#[derive(Debug, Clone)]
pub struct DbHooks {
    db: Arc<Mutex<Database>>,
    user_id: Option<String>,
}

impl DbHooks {
    pub fn new(db: Arc<Mutex<Database>>, user_id: Option<String>) -> Self {
        Self { db, user_id }
    }

    pub fn database(&self) -> &Arc<Mutex<Database>> {
        &self.db
    }

    fn with_db<T>(
        &self,
        f: impl FnOnce(&Database) -> Result<T, crate::error::DatabaseError>,
    ) -> Result<T, HookError> {
        let db = self.db.lock().map_err(|e| e.to_string())?;
        Ok(f(&*db)?)
    }
}

impl SessionEmitter for DbHooks {
    fn record_completed_session(
        &mut self,
        task_id: Option<&str>,
        duration_minutes: u64,
        kind: TimerMode,
    ) -> HookResult {
        let user_id = self.user_id.as_deref();
        self.with_db(|db| db.record_session(task_id, user_id, kind, duration_minutes, Utc::now()))?;
        Ok(())
    }
}

impl TaskProgressUpdater for DbHooks {
    fn increment_task_progress(&mut self, task_id: &str) -> HookResult {
        self.with_db(|db| db.increment_task_progress(task_id))?;
        Ok(())
    }
}

impl OverworkLog for DbHooks {
    fn log_overwork_event(&mut self, rule: FatigueRule, notes: &str) -> HookResult {
        let user_id = self.user_id.as_deref();
        self.with_db(|db| db.log_overwork(user_id, rule, notes, Utc::now()))?;
        Ok(())
    }
}

impl TaskLookup for DbHooks {
    fn find_task(&self, task_id: &str) -> Option<TaskRecord> {
        match self.with_db(|db| db.get_task(task_id)) {
            Ok(task) => task,
            Err(e) => {
                tracing::warn!(error = %e, task_id, "task lookup failed");
                None
            }
        }
    }
}
