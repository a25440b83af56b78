use serde::{Deserialize, Serialize};

/// Which phase of the cycle the timer is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerMode {
    Focus,
    ShortBreak,
    LongBreak,
}

impl TimerMode {
    pub fn is_break(&self) -> bool {
        !matches!(self, TimerMode::Focus)
    }

    /// Storage/wire identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            TimerMode::Focus => "focus",
            TimerMode::ShortBreak => "short_break",
            TimerMode::LongBreak => "long_break",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "focus" => Some(TimerMode::Focus),
            "short_break" => Some(TimerMode::ShortBreak),
            "long_break" => Some(TimerMode::LongBreak),
            _ => None,
        }
    }

    /// Human-readable label for the phase.
    pub fn label(&self) -> &'static str {
        match self {
            TimerMode::Focus => "Focus Time",
            TimerMode::ShortBreak => "Short Break",
            TimerMode::LongBreak => "Long Break",
        }
    }
}

/// Phase lengths consumed by the cycle engine.
///
/// All durations are whole seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleDurations {
    pub focus_secs: u64,
    pub short_break_secs: u64,
    pub long_break_secs: u64,
    pub pomodoros_before_long_break: u32,
}

impl CycleDurations {
    /// `pomodoros_before_long_break` is clamped to at least 1.
    pub fn new(
        focus_secs: u64,
        short_break_secs: u64,
        long_break_secs: u64,
        pomodoros_before_long_break: u32,
    ) -> Self {
        Self {
            focus_secs,
            short_break_secs,
            long_break_secs,
            pomodoros_before_long_break: pomodoros_before_long_break.max(1),
        }
    }

    pub fn duration_of(&self, mode: TimerMode) -> u64 {
        match mode {
            TimerMode::Focus => self.focus_secs,
            TimerMode::ShortBreak => self.short_break_secs,
            TimerMode::LongBreak => self.long_break_secs,
        }
    }

    /// Focus length in whole minutes, as reported to the session log.
    pub fn focus_minutes(&self) -> u64 {
        self.focus_secs / 60
    }

    /// Break that follows the `completed`-th pomodoro of the cycle.
    pub fn break_after(&self, completed: u32) -> TimerMode {
        let every = self.pomodoros_before_long_break.max(1);
        if completed > 0 && completed % every == 0 {
            TimerMode::LongBreak
        } else {
            TimerMode::ShortBreak
        }
    }
}

impl Default for CycleDurations {
    fn default() -> Self {
        Self::new(25 * 60, 5 * 60, 15 * 60, 4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_durations() {
        let d = CycleDurations::default();
        assert_eq!(d.duration_of(TimerMode::Focus), 1500);
        assert_eq!(d.duration_of(TimerMode::ShortBreak), 300);
        assert_eq!(d.duration_of(TimerMode::LongBreak), 900);
        assert_eq!(d.focus_minutes(), 25);
    }

    #[test]
    fn every_fourth_pomodoro_earns_long_break() {
        let d = CycleDurations::default();
        let breaks: Vec<_> = (1..=8).map(|n| d.break_after(n)).collect();
        assert_eq!(breaks[3], TimerMode::LongBreak);
        assert_eq!(breaks[7], TimerMode::LongBreak);
        assert_eq!(
            breaks.iter().filter(|m| **m == TimerMode::ShortBreak).count(),
            6
        );
    }

    #[test]
    fn zero_cycle_length_is_clamped() {
        let d = CycleDurations::new(5, 3, 5, 0);
        assert_eq!(d.pomodoros_before_long_break, 1);
        assert_eq!(d.break_after(1), TimerMode::LongBreak);
    }

    #[test]
    fn mode_string_roundtrip() {
        for mode in [TimerMode::Focus, TimerMode::ShortBreak, TimerMode::LongBreak] {
            assert_eq!(TimerMode::parse(mode.as_str()), Some(mode));
        }
        assert_eq!(TimerMode::parse("pomodoro"), None);
    }
}
