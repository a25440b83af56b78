//! Collaborator interfaces the cycle engine calls out to.
//!
//! Every hook is fire-and-forget from the engine's side: the state
//! transition has already been committed when a hook runs, and a failing
//! hook is logged and dropped, never rolled back.

use crate::fatigue::{FatigueRule, FatigueSignal};
use crate::task::TaskRecord;
use crate::timer::TimerMode;

/// Error type returned by collaborator hooks.
pub type HookError = Box<dyn std::error::Error + Send + Sync>;
pub type HookResult = Result<(), HookError>;

/// Receives one record per completed focus phase.
pub trait SessionEmitter: Send {
    fn record_completed_session(
        &mut self,
        task_id: Option<&str>,
        duration_minutes: u64,
        kind: TimerMode,
    ) -> HookResult;
}

/// Raises a task's completed-pomodoro counter.
///
/// Implementations flip the task to completed once the counter meets
/// its goal.
pub trait TaskProgressUpdater: Send {
    fn increment_task_progress(&mut self, task_id: &str) -> HookResult;
}

/// Receives fatigue signals for display.
pub trait FatigueSink: Send {
    fn on_fatigue_detected(&mut self, signal: &FatigueSignal);
}

/// Best-effort persistence of overwork events.
pub trait OverworkLog: Send {
    fn log_overwork_event(&mut self, rule: FatigueRule, notes: &str) -> HookResult;
}

/// Resolves task ids for selection.
pub trait TaskLookup {
    fn find_task(&self, task_id: &str) -> Option<TaskRecord>;
}

/// Hook implementation that accepts everything and does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct Noop;

impl SessionEmitter for Noop {
    fn record_completed_session(&mut self, _: Option<&str>, _: u64, _: TimerMode) -> HookResult {
        Ok(())
    }
}

impl TaskProgressUpdater for Noop {
    fn increment_task_progress(&mut self, _: &str) -> HookResult {
        Ok(())
    }
}

impl FatigueSink for Noop {
    fn on_fatigue_detected(&mut self, _: &FatigueSignal) {}
}

impl OverworkLog for Noop {
    fn log_overwork_event(&mut self, _: FatigueRule, _: &str) -> HookResult {
        Ok(())
    }
}

impl TaskLookup for Noop {
    fn find_task(&self, _: &str) -> Option<TaskRecord> {
        None
    }
}

impl<F> FatigueSink for F
where
    F: FnMut(&FatigueSignal) + Send,
{
    fn on_fatigue_detected(&mut self, signal: &FatigueSignal) {
        self(signal)
    }
}

impl TaskLookup for [TaskRecord] {
    fn find_task(&self, task_id: &str) -> Option<TaskRecord> {
        self.iter().find(|t| t.id == task_id).cloned()
    }
}

impl TaskLookup for Vec<TaskRecord> {
    fn find_task(&self, task_id: &str) -> Option<TaskRecord> {
        self.as_slice().find_task(task_id)
    }
}
