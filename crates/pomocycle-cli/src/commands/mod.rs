pub mod config;
pub mod fatigue;
pub mod run;
pub mod stats;
pub mod task;

pub type CmdResult = Result<(), Box<dyn std::error::Error>>;
