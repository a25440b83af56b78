use pomocycle_core::Database;

use super::CmdResult;

pub fn run() -> CmdResult {
    let db = Database::open()?;
    let stats = db.stats()?;
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}
