use chrono::{DateTime, Utc};

use super::{FatigueConfig, FatigueRule, FatigueSignal};
use crate::timer::{CycleSnapshot, TimerMode};

/// Edge-triggered overwork detector.
///
/// Feed it every fully reconciled snapshot together with the seconds that
/// reconciliation consumed. Each rule fires once per threshold crossing,
/// not once per observation while the condition holds.
#[derive(Debug, Clone)]
pub struct OverworkDetector {
    config: FatigueConfig,
    continuous_focus_secs: u64,
    last_cycle_notified: u32,
}

impl OverworkDetector {
    pub fn new(config: FatigueConfig) -> Self {
        Self {
            config,
            continuous_focus_secs: 0,
            last_cycle_notified: 0,
        }
    }

    pub fn config(&self) -> &FatigueConfig {
        &self.config
    }

    pub fn continuous_focus_secs(&self) -> u64 {
        self.continuous_focus_secs
    }

    pub fn last_cycle_notified(&self) -> u32 {
        self.last_cycle_notified
    }

    /// Evaluate both rules against `snapshot`.
    pub fn observe(
        &mut self,
        snapshot: &CycleSnapshot,
        elapsed_secs: u64,
        now: DateTime<Utc>,
    ) -> Vec<FatigueSignal> {
        let mut fired = Vec::new();

        if snapshot.mode == TimerMode::Focus && snapshot.is_running {
            let threshold = self.config.long_session_threshold_secs;
            let before = self.continuous_focus_secs;
            self.continuous_focus_secs = before.saturating_add(elapsed_secs);
            if before < threshold && self.continuous_focus_secs >= threshold {
                fired.push(FatigueRule::LongSessionOver2Hours);
                self.continuous_focus_secs = 0;
            }
        } else {
            self.continuous_focus_secs = 0;
        }

        let done = snapshot.pomodoros_done_in_cycle;
        if done < self.last_cycle_notified {
            // Count went back down: a new cycle window started.
            self.last_cycle_notified = 0;
        }
        let every = snapshot.pomodoros_before_long_break.max(1);
        if done > 0 && done % every == 0 && done > self.last_cycle_notified {
            fired.push(FatigueRule::PomodoroCycle);
            self.last_cycle_notified = done;
        }

        if !self.config.enabled {
            return Vec::new();
        }

        fired
            .into_iter()
            .map(|rule| {
                tracing::info!(rule = rule.code(), "fatigue detected");
                FatigueSignal {
                    rule,
                    detected_at: now,
                }
            })
            .collect()
    }
}

impl Default for OverworkDetector {
    fn default() -> Self {
        Self::new(FatigueConfig::default())
    }
}
