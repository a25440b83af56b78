mod engine;
mod mode;

pub use engine::{
    CompletedPomodoro, CycleEngine, CycleSnapshot, CycleState, PhaseCompletion, ReconcileStep,
    Reconciliation,
};
pub use mode::{CycleDurations, TimerMode};
