use serde::Serialize;

use super::FatigueRule;

/// What to tell the user when a rule fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Recommendation {
    pub message: &'static str,
    pub tips: &'static [&'static str],
}

pub const AFFIRMATION: &str = "Your brain will thank you for it!";

const POMODORO_CYCLE: Recommendation = Recommendation {
    message: "You've completed a full cycle of pomodoros without a long break. Give yourself some care!",
    tips: &[
        "Hydrate: drink a glass of water.",
        "Stretch: move your body for 3-5 minutes.",
        "Look away from your screen for at least 30 seconds.",
        "Snack on something healthy.",
        "Journal one thought before coming back.",
    ],
};

const LONG_SESSION: Recommendation = Recommendation {
    message: "You've been focusing for over 2 hours without rest. Time to pause!",
    tips: &[
        "Take a 10-15 minute walk.",
        "Unplug from all screens temporarily.",
        "Do a quick prayer or mindfulness practice.",
        "Make a cup of tea or warm water.",
    ],
};

impl FatigueRule {
    pub fn recommendation(&self) -> Recommendation {
        match self {
            FatigueRule::PomodoroCycle => POMODORO_CYCLE,
            FatigueRule::LongSessionOver2Hours => LONG_SESSION,
        }
    }
}
