//! Task management commands for CLI.

use clap::Subcommand;
use pomocycle_core::{Database, TaskCategory, TaskFilter, TaskRecord};

use super::CmdResult;

#[derive(Subcommand)]
pub enum TaskAction {
    /// Create a new task
    Add {
        /// Task name
        name: String,
        /// Category: work, study, personal or health
        #[arg(long, default_value = "work")]
        category: String,
        /// Pomodoros needed to finish the task
        #[arg(long, default_value = "1")]
        goal: u32,
    },
    /// List tasks as JSON
    List {
        /// Which tasks to show: active, completed or all
        #[arg(long, default_value = "active")]
        filter: String,
    },
    /// Update a task's name, category or goal
    Edit {
        /// Task ID
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        goal: Option<u32>,
    },
    /// Flip a task between active and completed
    Toggle {
        /// Task ID
        id: String,
    },
    /// Delete a task
    Delete {
        /// Task ID
        id: String,
    },
}

fn parse_category(s: &str) -> Result<TaskCategory, String> {
    TaskCategory::parse(s).ok_or_else(|| format!("unknown category: {s}"))
}

pub fn run(action: TaskAction) -> CmdResult {
    let db = Database::open()?;

    match action {
        TaskAction::Add {
            name,
            category,
            goal,
        } => {
            let task = TaskRecord::new(name, parse_category(&category)?, goal)?;
            db.insert_task(&task)?;
            println!("{}", serde_json::to_string_pretty(&task)?);
        }
        TaskAction::List { filter } => {
            let filter =
                TaskFilter::parse(&filter).ok_or_else(|| format!("unknown filter: {filter}"))?;
            let tasks = db.list_tasks(filter)?;
            println!("{}", serde_json::to_string_pretty(&tasks)?);
        }
        TaskAction::Edit {
            id,
            name,
            category,
            goal,
        } => {
            let category = category.as_deref().map(parse_category).transpose()?;
            let task = db.update_task(&id, name.as_deref(), category, goal)?;
            println!("{}", serde_json::to_string_pretty(&task)?);
        }
        TaskAction::Toggle { id } => {
            let task = db.toggle_task_status(&id)?;
            println!("{}", serde_json::to_string_pretty(&task)?);
        }
        TaskAction::Delete { id } => {
            if !db.delete_task(&id)? {
                return Err(format!("task not found: {id}").into());
            }
            println!("Task deleted: {id}");
        }
    }
    Ok(())
}
