//! Interactive timer session.
//!
//! Reads one command per line from stdin and prints every event the
//! session produces as a JSON line on stdout. The timer only lives as long
//! as the process; completed sessions, task progress and overwork events
//! are written to the database as they happen.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use clap::Args;
use pomocycle_core::{
    Config, CycleDriver, CycleSession, Database, DbHooks, Event, SystemClock, TaskStatus,
};
use tokio::io::{AsyncBufReadExt, BufReader};

use super::CmdResult;

#[derive(Args)]
pub struct RunArgs {
    /// Bind this task before the first command
    #[arg(long)]
    task: Option<String>,
    /// Override the reconcile interval in milliseconds
    #[arg(long)]
    tick_ms: Option<u64>,
}

const HELP: &str =
    "commands: start | pause | reset | select <id> | clear | done <id> | cycle-reset | visible | status | quit";

enum Flow {
    Continue,
    Quit,
}

pub fn run(args: RunArgs) -> CmdResult {
    let mut config = Config::load()?;
    if let Some(ms) = args.tick_ms {
        config.set("timer.tick_interval_ms", &ms.to_string())?;
    }

    let db = Arc::new(Mutex::new(Database::open()?));
    let hooks = DbHooks::new(Arc::clone(&db), config.account.user_id.clone());
    let session = CycleSession::new(config.cycle_durations(), config.fatigue_config())
        .with_session_emitter(hooks.clone())
        .with_progress_updater(hooks.clone())
        .with_overwork_log(hooks.clone())
        .with_task_lookup(hooks);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(session_loop(session, db, &config, args.task));
    // A stdin read may still be parked on the blocking pool.
    runtime.shutdown_timeout(Duration::from_millis(200));
    result
}

async fn session_loop(
    session: CycleSession,
    db: Arc<Mutex<Database>>,
    config: &Config,
    task: Option<String>,
) -> CmdResult {
    let (mut driver, mut events) = CycleDriver::new(session, SystemClock, config.tick_interval());
    if let Some(task_id) = task {
        driver.select_task(&task_id);
    }
    print_event(&Event::snapshot(driver.snapshot(), Utc::now()))?;
    drain(&mut events)?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            Some(event) = events.recv() => print_event(&event)?,
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let flow = handle_line(&mut driver, &db, line.trim())?;
                drain(&mut events)?;
                if matches!(flow, Flow::Quit) {
                    break;
                }
            }
        }
    }

    driver.shutdown();
    drain(&mut events)
}

fn handle_line(
    driver: &mut CycleDriver,
    db: &Mutex<Database>,
    line: &str,
) -> Result<Flow, Box<dyn std::error::Error>> {
    let mut parts = line.split_whitespace();
    let Some(cmd) = parts.next() else {
        return Ok(Flow::Continue);
    };
    let arg = parts.next();

    match (cmd, arg) {
        ("start", None) => driver.start(),
        ("pause", None) => driver.pause(),
        ("reset", None) => driver.reset(),
        ("select", Some(id)) => driver.select_task(id),
        ("clear", None) => driver.clear_task(),
        ("done", Some(id)) => {
            let result = {
                let db = db.lock().map_err(|e| e.to_string())?;
                db.set_task_status(id, TaskStatus::Completed)
            };
            match result {
                Ok(_) => driver.task_completed(id),
                Err(e) => eprintln!("error: {e}"),
            }
        }
        ("cycle-reset", None) => driver.reset_cycle(),
        ("visible", None) => driver.on_visible(),
        ("status", None) => print_event(&Event::snapshot(driver.snapshot(), Utc::now()))?,
        ("quit" | "exit", None) => return Ok(Flow::Quit),
        ("help", _) => eprintln!("{HELP}"),
        _ => {
            tracing::debug!(line, "unrecognized command");
            eprintln!("unknown command: {line}\n{HELP}");
        }
    }
    Ok(Flow::Continue)
}

fn drain(events: &mut tokio::sync::mpsc::UnboundedReceiver<Event>) -> CmdResult {
    while let Ok(event) = events.try_recv() {
        print_event(&event)?;
    }
    Ok(())
}

fn print_event(event: &Event) -> CmdResult {
    println!("{}", serde_json::to_string(event)?);
    Ok(())
}
