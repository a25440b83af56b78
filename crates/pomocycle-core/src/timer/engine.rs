//! Cycle engine implementation.
//!
//! The engine is a wall-clock-based state machine. It does not use
//! internal threads - the caller is responsible for calling `reconcile()`
//! periodically, and again whenever the host wakes up after being hidden
//! or suspended.
//!
//! ## Phase Transitions
//!
//! ```text
//! Focus -> ShortBreak -> Focus -> ... -> Focus -> LongBreak -> Focus
//! ```
//!
//! Every phase boundary stops the timer; the next phase needs an explicit
//! `start()`.
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = CycleEngine::new(CycleDurations::default());
//! engine.start(clock.now());
//! // In a loop:
//! let step = engine.reconcile(clock.now()); // step.completion is Some at a boundary
//! ```

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::mode::{CycleDurations, TimerMode};
use crate::hooks::TaskLookup;

/// Countdown state for one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleState {
    pub mode: TimerMode,
    pub seconds_left: u64,
    pub is_running: bool,
    pub pomodoros_done_in_cycle: u32,
    /// Reconciliation anchor. Only meaningful while running.
    #[serde(skip)]
    last_reconciled_at: Option<DateTime<Utc>>,
}

/// A phase boundary crossed during reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseCompletion {
    pub completed: TimerMode,
    pub next: TimerMode,
    /// Count after this completion.
    pub pomodoros_done_in_cycle: u32,
}

/// Result of reconciling a state against `now`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    pub state: CycleState,
    /// Whole seconds taken off the countdown (or consumed up to a boundary).
    pub elapsed_secs: u64,
    pub completion: Option<PhaseCompletion>,
}

/// What the engine hands back from `reconcile()`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReconcileStep {
    pub elapsed_secs: u64,
    pub completion: Option<PhaseCompletion>,
    pub pomodoro: Option<CompletedPomodoro>,
}

/// Payload for the session log and task progress when a focus phase ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedPomodoro {
    pub task_id: Option<String>,
    pub duration_minutes: u64,
    pub pomodoro_number: u32,
}

/// Read-only view handed to observers and the UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleSnapshot {
    pub mode: TimerMode,
    pub seconds_left: u64,
    pub phase_secs: u64,
    pub is_running: bool,
    pub pomodoros_done_in_cycle: u32,
    pub pomodoros_before_long_break: u32,
    pub selected_task: Option<String>,
}

impl CycleState {
    /// Fresh state: idle at the start of a focus phase.
    pub fn initial(durations: &CycleDurations) -> Self {
        Self {
            mode: TimerMode::Focus,
            seconds_left: durations.focus_secs,
            is_running: false,
            pomodoros_done_in_cycle: 0,
            last_reconciled_at: None,
        }
    }

    pub fn last_reconciled_at(&self) -> Option<DateTime<Utc>> {
        self.last_reconciled_at
    }

    /// Pure reconciliation of `self` against wall-clock `now`.
    ///
    /// Elapsed time is floored to whole seconds and the anchor only moves
    /// by the seconds actually consumed, so the sub-second remainder is
    /// carried into the next call. A clock that went backwards counts as
    /// zero elapsed and re-anchors at `now`.
    ///
    /// Reaching zero completes the phase exactly once; seconds past the
    /// boundary are discarded and the next phase starts at full length.
    pub fn reconciled(&self, now: DateTime<Utc>, durations: &CycleDurations) -> Reconciliation {
        let mut next = self.clone();
        let anchor = match self.last_reconciled_at {
            Some(anchor) if self.is_running => anchor,
            _ => {
                return Reconciliation {
                    state: next,
                    elapsed_secs: 0,
                    completion: None,
                }
            }
        };

        let delta_ms = (now - anchor).num_milliseconds();
        if delta_ms < 0 {
            next.last_reconciled_at = Some(now);
            return Reconciliation {
                state: next,
                elapsed_secs: 0,
                completion: None,
            };
        }

        let elapsed = (delta_ms / 1000) as u64;
        if elapsed >= self.seconds_left {
            let consumed = self.seconds_left;
            let completion = next.complete_phase(durations);
            next.last_reconciled_at = Some(now);
            return Reconciliation {
                state: next,
                elapsed_secs: consumed,
                completion: Some(completion),
            };
        }

        next.seconds_left = self.seconds_left - elapsed;
        next.last_reconciled_at = Some(anchor + Duration::seconds(elapsed as i64));
        Reconciliation {
            state: next,
            elapsed_secs: elapsed,
            completion: None,
        }
    }

    /// Move to the phase after the current one and stop.
    fn complete_phase(&mut self, durations: &CycleDurations) -> PhaseCompletion {
        let completed = self.mode;
        let next = match completed {
            TimerMode::Focus => {
                self.pomodoros_done_in_cycle = self.pomodoros_done_in_cycle.saturating_add(1);
                durations.break_after(self.pomodoros_done_in_cycle)
            }
            TimerMode::ShortBreak | TimerMode::LongBreak => TimerMode::Focus,
        };
        self.mode = next;
        self.seconds_left = durations.duration_of(next);
        self.is_running = false;
        PhaseCompletion {
            completed,
            next,
            pomodoros_done_in_cycle: self.pomodoros_done_in_cycle,
        }
    }
}

/// Core cycle engine.
///
/// Owns the [`CycleState`] and the selected task binding. Every mutation
/// goes through one of the command methods below.
#[derive(Debug, Clone)]
pub struct CycleEngine {
    durations: CycleDurations,
    state: CycleState,
    selected_task: Option<String>,
}

impl CycleEngine {
    pub fn new(durations: CycleDurations) -> Self {
        Self {
            state: CycleState::initial(&durations),
            durations,
            selected_task: None,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> &CycleState {
        &self.state
    }

    pub fn durations(&self) -> &CycleDurations {
        &self.durations
    }

    pub fn mode(&self) -> TimerMode {
        self.state.mode
    }

    pub fn seconds_left(&self) -> u64 {
        self.state.seconds_left
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running
    }

    pub fn pomodoros_done_in_cycle(&self) -> u32 {
        self.state.pomodoros_done_in_cycle
    }

    pub fn selected_task(&self) -> Option<&str> {
        self.selected_task.as_deref()
    }

    pub fn snapshot(&self) -> CycleSnapshot {
        CycleSnapshot {
            mode: self.state.mode,
            seconds_left: self.state.seconds_left,
            phase_secs: self.durations.duration_of(self.state.mode),
            is_running: self.state.is_running,
            pomodoros_done_in_cycle: self.state.pomodoros_done_in_cycle,
            pomodoros_before_long_break: self.durations.pomodoros_before_long_break,
            selected_task: self.selected_task.clone(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Returns `false` if the timer was already running.
    pub fn start(&mut self, now: DateTime<Utc>) -> bool {
        if self.state.is_running {
            return false;
        }
        self.state.is_running = true;
        self.state.last_reconciled_at = Some(now);
        tracing::debug!(
            mode = ?self.state.mode,
            seconds_left = self.state.seconds_left,
            "cycle started"
        );
        true
    }

    /// Returns `false` if the timer was not running.
    pub fn pause(&mut self) -> bool {
        if !self.state.is_running {
            return false;
        }
        self.state.is_running = false;
        self.state.last_reconciled_at = None;
        tracing::debug!(seconds_left = self.state.seconds_left, "cycle paused");
        true
    }

    /// Stop and return to the focus phase with `to_duration` seconds left.
    ///
    /// The completed-pomodoro count is left alone. `to_duration` is capped
    /// at the focus length.
    pub fn reset(&mut self, to_duration: u64) {
        self.state.is_running = false;
        self.state.last_reconciled_at = None;
        self.state.mode = TimerMode::Focus;
        self.state.seconds_left = to_duration.min(self.durations.focus_secs);
        tracing::debug!(seconds_left = self.state.seconds_left, "cycle reset");
    }

    /// Apply elapsed wall-clock time up to `now`.
    pub fn reconcile(&mut self, now: DateTime<Utc>) -> ReconcileStep {
        let Reconciliation {
            state,
            elapsed_secs,
            completion,
        } = self.state.reconciled(now, &self.durations);
        self.state = state;

        let pomodoro = completion
            .as_ref()
            .filter(|c| c.completed == TimerMode::Focus)
            .map(|c| CompletedPomodoro {
                task_id: self.selected_task.clone(),
                duration_minutes: self.durations.focus_minutes(),
                pomodoro_number: c.pomodoros_done_in_cycle,
            });

        if let Some(c) = &completion {
            tracing::info!(
                completed = ?c.completed,
                next = ?c.next,
                pomodoros_done_in_cycle = c.pomodoros_done_in_cycle,
                "phase complete"
            );
        }

        ReconcileStep {
            elapsed_secs,
            completion,
            pomodoro,
        }
    }

    /// Bind `task_id` as the active task and reset to a full focus phase.
    ///
    /// Unknown or completed tasks are ignored; returns whether the binding
    /// changed.
    pub fn select_task<L>(&mut self, task_id: &str, lookup: &L) -> bool
    where
        L: TaskLookup + ?Sized,
    {
        match lookup.find_task(task_id) {
            Some(task) if task.is_active() => {
                self.selected_task = Some(task.id);
                self.reset(self.durations.focus_secs);
                true
            }
            Some(_) => {
                tracing::debug!(task_id, "ignoring selection of completed task");
                false
            }
            None => {
                tracing::debug!(task_id, "ignoring selection of unknown task");
                false
            }
        }
    }

    /// Drop the task binding without touching the countdown.
    pub fn clear_task(&mut self) -> Option<String> {
        self.selected_task.take()
    }

    /// Start a new cycle window. Returns `false` if already at zero.
    pub fn reset_cycle(&mut self) -> bool {
        if self.state.pomodoros_done_in_cycle == 0 {
            return false;
        }
        self.state.pomodoros_done_in_cycle = 0;
        true
    }
}

impl CycleSnapshot {
    /// `MM:SS` rendering of the remaining time.
    pub fn display_time(&self) -> String {
        format!("{:02}:{:02}", self.seconds_left / 60, self.seconds_left % 60)
    }

    /// 0.0 .. 1.0 progress within the current phase.
    pub fn phase_progress(&self) -> f64 {
        if self.phase_secs == 0 {
            return 1.0;
        }
        1.0 - (self.seconds_left as f64 / self.phase_secs as f64)
    }

    /// Message shown while the timer sits at a phase boundary waiting for
    /// the user to start the next phase.
    pub fn transition_prompt(&self) -> &'static str {
        match self.mode {
            TimerMode::LongBreak => {
                "Great job! You've completed a Pomodoro cycle. Time for a long break."
            }
            TimerMode::ShortBreak => "Pomodoro completed! Time for a short break to recharge.",
            TimerMode::Focus => "Break's over! Ready to focus again?",
        }
    }
}
