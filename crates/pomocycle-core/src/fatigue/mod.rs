//! Overwork (fatigue) detection.
//!
//! The detector is a passive observer over cycle snapshots. It raises
//! advisory [`FatigueSignal`]s and never feeds anything back into the
//! cycle engine.

mod detector;
mod recommendations;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use detector::OverworkDetector;
pub use recommendations::{Recommendation, AFFIRMATION};

/// Continuous running focus time that counts as a long session.
pub const LONG_SESSION_THRESHOLD_SECS: u64 = 2 * 60 * 60;

/// Which overwork heuristic fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FatigueRule {
    #[serde(rename = "pomodoro-cycle")]
    PomodoroCycle,
    #[serde(rename = "long-session-over-2-hours")]
    LongSessionOver2Hours,
}

impl FatigueRule {
    /// Stable rule code used in the overwork log.
    pub fn code(&self) -> &'static str {
        match self {
            FatigueRule::PomodoroCycle => "pomodoro-cycle",
            FatigueRule::LongSessionOver2Hours => "long-session-over-2-hours",
        }
    }

    pub fn parse(code: &str) -> Option<Self> {
        match code {
            "pomodoro-cycle" => Some(FatigueRule::PomodoroCycle),
            "long-session-over-2-hours" => Some(FatigueRule::LongSessionOver2Hours),
            _ => None,
        }
    }
}

/// One-shot notification that a fatigue threshold was crossed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FatigueSignal {
    pub rule: FatigueRule,
    pub detected_at: DateTime<Utc>,
}

/// Detector settings. Also the `[fatigue]` section of the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FatigueConfig {
    /// When false the detector keeps its counters but emits nothing.
    pub enabled: bool,
    pub long_session_threshold_secs: u64,
    /// Forward signals to the overwork log.
    pub log_events: bool,
}

impl Default for FatigueConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            long_session_threshold_secs: LONG_SESSION_THRESHOLD_SECS,
            log_events: true,
        }
    }
}
