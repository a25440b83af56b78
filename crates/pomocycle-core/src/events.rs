use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::fatigue::FatigueRule;
use crate::timer::{CycleSnapshot, TimerMode};

/// Every state change in a cycle session produces an Event.
/// The CLI prints them; a GUI would render them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    TimerStarted {
        mode: TimerMode,
        seconds_left: u64,
        at: DateTime<Utc>,
    },
    TimerPaused {
        seconds_left: u64,
        at: DateTime<Utc>,
    },
    TimerReset {
        seconds_left: u64,
        at: DateTime<Utc>,
    },
    /// A phase ran out; the timer is stopped waiting for the next start.
    PhaseCompleted {
        completed: TimerMode,
        next: TimerMode,
        pomodoros_done_in_cycle: u32,
        prompt: String,
        at: DateTime<Utc>,
    },
    TaskSelected {
        task_id: String,
        at: DateTime<Utc>,
    },
    TaskCleared {
        task_id: String,
        at: DateTime<Utc>,
    },
    CycleReset {
        at: DateTime<Utc>,
    },
    FatigueDetected {
        rule: FatigueRule,
        message: String,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        #[serde(flatten)]
        snapshot: CycleSnapshot,
        display: String,
        at: DateTime<Utc>,
    },
}

impl Event {
    pub fn snapshot(snapshot: CycleSnapshot, at: DateTime<Utc>) -> Self {
        Event::StateSnapshot {
            display: snapshot.display_time(),
            snapshot,
            at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::{CycleDurations, CycleEngine};

    #[test]
    fn events_are_tagged() {
        let event = Event::CycleReset { at: Utc::now() };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "cycle_reset");
    }

    #[test]
    fn snapshot_event_flattens_state() {
        let engine = CycleEngine::new(CycleDurations::default());
        let event = Event::snapshot(engine.snapshot(), Utc::now());
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "state_snapshot");
        assert_eq!(json["mode"], "focus");
        assert_eq!(json["seconds_left"], 1500);
        assert_eq!(json["display"], "25:00");
    }
}
