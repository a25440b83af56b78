//! Overwork log and recovery tips.

use clap::Subcommand;
use pomocycle_core::fatigue::AFFIRMATION;
use pomocycle_core::{Database, FatigueRule};
use serde::Serialize;

use super::CmdResult;

#[derive(Subcommand)]
pub enum FatigueAction {
    /// Show recent overwork events
    Log {
        /// Maximum number of entries
        #[arg(long, default_value = "20")]
        limit: usize,
    },
    /// Show recovery tips for a rule
    Tips {
        /// Rule code: "pomodoro-cycle" or "long-session-over-2-hours"
        rule: String,
    },
}

#[derive(Serialize)]
struct TipsView<'a> {
    rule: &'a str,
    message: &'a str,
    tips: &'a [&'a str],
    affirmation: &'a str,
}

pub fn run(action: FatigueAction) -> CmdResult {
    match action {
        FatigueAction::Log { limit } => {
            let db = Database::open()?;
            let entries = db.list_overwork(limit)?;
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
        FatigueAction::Tips { rule } => {
            let rule = FatigueRule::parse(&rule).ok_or_else(|| format!("unknown rule: {rule}"))?;
            let rec = rule.recommendation();
            let view = TipsView {
                rule: rule.code(),
                message: rec.message,
                tips: rec.tips,
                affirmation: AFFIRMATION,
            };
            println!("{}", serde_json::to_string_pretty(&view)?);
        }
    }
    Ok(())
}
