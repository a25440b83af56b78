//! # Pomocycle Core Library
//!
//! Core logic for the Pomocycle focus timer. Everything the CLI does goes
//! through this crate, so other front ends can drive the same engine.
//!
//! ## Architecture
//!
//! - **Cycle Engine**: A wall-clock-reconciled state machine over focus and
//!   break phases. The caller decides when to reconcile; time is derived
//!   from the clock, never from counting ticks.
//! - **Fatigue Detector**: A passive observer that raises edge-triggered
//!   overwork signals from engine snapshots.
//! - **Session / Driver**: Wires the engine and detector to injected
//!   collaborators and runs periodic reconciliation on tokio.
//! - **Storage**: SQLite for sessions, tasks and the overwork log; TOML for
//!   configuration.
//!
//! ## Key Components
//!
//! - [`CycleEngine`]: Core cycle state machine
//! - [`OverworkDetector`]: Fatigue heuristics
//! - [`CycleSession`]: Engine plus detector plus collaborators
//! - [`CycleDriver`]: Cancellable periodic reconciliation
//! - [`Database`]: Persistence and statistics
//! - [`Config`]: Application configuration management

pub mod clock;
pub mod driver;
pub mod error;
pub mod events;
pub mod fatigue;
pub mod hooks;
pub mod session;
pub mod storage;
pub mod task;
pub mod timer;

pub use clock::{Clock, FakeClock, SystemClock};
pub use driver::{CycleDriver, DEFAULT_TICK_INTERVAL};
pub use error::{ConfigError, CoreError, DatabaseError, ValidationError};
pub use events::Event;
pub use fatigue::{FatigueConfig, FatigueRule, FatigueSignal, OverworkDetector, Recommendation};
pub use hooks::{FatigueSink, OverworkLog, SessionEmitter, TaskLookup, TaskProgressUpdater};
pub use session::CycleSession;
pub use storage::{Config, Database, DbHooks, Stats};
pub use task::{TaskCategory, TaskFilter, TaskRecord, TaskStatus};
pub use timer::{CycleDurations, CycleEngine, CycleSnapshot, CycleState, TimerMode};
