//! Task records as seen by the cycle engine.
//!
//! The engine only needs to know whether a task can be selected and how
//! its pomodoro counter moves; everything else is carried for the store.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Task status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Active,
    Completed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Active => "active",
            TaskStatus::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(TaskStatus::Active),
            "completed" => Some(TaskStatus::Completed),
            _ => None,
        }
    }

    pub fn toggled(&self) -> Self {
        match self {
            TaskStatus::Active => TaskStatus::Completed,
            TaskStatus::Completed => TaskStatus::Active,
        }
    }
}

/// Task category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskCategory {
    #[default]
    Work,
    Study,
    Personal,
    Health,
}

impl TaskCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskCategory::Work => "work",
            TaskCategory::Study => "study",
            TaskCategory::Personal => "personal",
            TaskCategory::Health => "health",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "work" => Some(TaskCategory::Work),
            "study" => Some(TaskCategory::Study),
            "personal" => Some(TaskCategory::Personal),
            "health" => Some(TaskCategory::Health),
            _ => None,
        }
    }
}

/// Which tasks a listing should return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskFilter {
    All,
    #[default]
    Active,
    Completed,
}

impl TaskFilter {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Some(TaskFilter::All),
            "active" => Some(TaskFilter::Active),
            "completed" | "done" => Some(TaskFilter::Completed),
            _ => None,
        }
    }

    pub fn matches(&self, status: TaskStatus) -> bool {
        match self {
            TaskFilter::All => true,
            TaskFilter::Active => status == TaskStatus::Active,
            TaskFilter::Completed => status == TaskStatus::Completed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: String,
    pub name: String,
    pub category: TaskCategory,
    pub pomodoro_goal: u32,
    pub pomodoros_completed: u32,
    pub status: TaskStatus,
}

impl TaskRecord {
    /// Build a fresh active task with a generated id.
    pub fn new(
        name: impl Into<String>,
        category: TaskCategory,
        pomodoro_goal: u32,
    ) -> Result<Self, ValidationError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ValidationError::Empty("name".into()));
        }
        if pomodoro_goal == 0 {
            return Err(ValidationError::InvalidValue {
                field: "pomodoro_goal".into(),
                message: "must be at least 1".into(),
            });
        }
        Ok(Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            category,
            pomodoro_goal,
            pomodoros_completed: 0,
            status: TaskStatus::Active,
        })
    }

    pub fn is_active(&self) -> bool {
        self.status == TaskStatus::Active
    }

    /// Count one finished pomodoro against this task.
    ///
    /// Returns `true` when this pomodoro met the goal and flipped the
    /// task to completed.
    pub fn record_pomodoro(&mut self) -> bool {
        self.pomodoros_completed = self.pomodoros_completed.saturating_add(1);
        if self.status == TaskStatus::Active && self.pomodoros_completed >= self.pomodoro_goal {
            self.status = TaskStatus::Completed;
            return true;
        }
        false
    }

    /// `"2/4"` style progress.
    pub fn progress_label(&self) -> String {
        format!("{}/{}", self.pomodoros_completed, self.pomodoro_goal)
    }
}
