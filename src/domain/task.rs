//! Task domain model
//!
//! A task is a titled unit of work with a priority and a two-state status.
//! All operations here are pure: they take tasks by reference and hand
//! back new values, leaving persistence to the caller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::id::{Clock, IdGenerator, SystemClock, TaskId, UuidGenerator};
use super::validation::{normalize_title, ValidationError};

/// Status of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    #[serde(alias = "pendiente")]
    Pending,
    #[serde(alias = "completada")]
    Completed,
}

impl TaskStatus {
    /// Returns the opposite status
    pub fn toggled(self) -> Self {
        match self {
            TaskStatus::Pending => TaskStatus::Completed,
            TaskStatus::Completed => TaskStatus::Pending,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, TaskStatus::Completed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" | "pendiente" => Ok(TaskStatus::Pending),
            "completed" | "completada" => Ok(TaskStatus::Completed),
            _ => Err(ValidationError::InvalidStatus(s.to_string())),
        }
    }
}

/// Priority of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    #[serde(alias = "alta")]
    High,
    #[serde(alias = "media")]
    Medium,
    #[serde(alias = "baja")]
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" | "alta" => Ok(Priority::High),
            "medium" | "media" => Ok(Priority::Medium),
            "low" | "baja" => Ok(Priority::Low),
            _ => Err(ValidationError::InvalidPriority(s.to_string())),
        }
    }
}

/// Selector applied to a task collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskFilter {
    #[default]
    All,
    #[serde(alias = "pendientes")]
    Pending,
    #[serde(alias = "completadas")]
    Completed,
}

impl TaskFilter {
    /// Returns true if the task passes this filter
    pub fn matches(&self, task: &Task) -> bool {
        match self {
            TaskFilter::All => true,
            TaskFilter::Pending => task.status == TaskStatus::Pending,
            TaskFilter::Completed => task.status == TaskStatus::Completed,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskFilter::All => "all",
            TaskFilter::Pending => "pending",
            TaskFilter::Completed => "completed",
        }
    }
}

impl fmt::Display for TaskFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskFilter {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(TaskFilter::All),
            "pending" | "pendientes" => Ok(TaskFilter::Pending),
            "completed" | "completadas" => Ok(TaskFilter::Completed),
            _ => Err(ValidationError::InvalidFilter(s.to_string())),
        }
    }
}

/// A unit of work
///
/// Serialized with camelCase keys. The localized keys `titulo`, `estado`,
/// `prioridad` and `fechaCreacion` are accepted when reading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Unique identifier
    pub id: TaskId,

    /// Trimmed title, 1 to 100 characters
    #[serde(alias = "titulo")]
    pub title: String,

    /// Current status
    #[serde(alias = "estado")]
    pub status: TaskStatus,

    /// Priority level
    #[serde(alias = "prioridad")]
    pub priority: Priority,

    /// When the task was created; never changes afterwards
    #[serde(alias = "fechaCreacion")]
    pub created_at: DateTime<Utc>,
}

/// Partial update of a task; `None` fields are left alone
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "titulo")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none", alias = "prioridad")]
    pub priority: Option<Priority>,

    #[serde(default, skip_serializing_if = "Option::is_none", alias = "estado")]
    pub status: Option<TaskStatus>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.priority.is_none() && self.status.is_none()
    }
}

/// Aggregate counts over a task collection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskStats {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
}

/// Creates a pending task with a fresh ID and the current time
pub fn create_task(title: &str, priority: Priority) -> Result<Task, ValidationError> {
    create_task_with(title, priority, &UuidGenerator, &SystemClock)
}

/// Creates a pending task using the given ID source and clock
pub fn create_task_with(
    title: &str,
    priority: Priority,
    ids: &dyn IdGenerator,
    clock: &dyn Clock,
) -> Result<Task, ValidationError> {
    let title = normalize_title(title)?;

    Ok(Task {
        id: ids.next_id(),
        title: title.to_string(),
        status: TaskStatus::Pending,
        priority,
        created_at: clock.now(),
    })
}

/// Returns a copy of the task with its status flipped
pub fn toggle_task_completion(task: &Task) -> Task {
    Task {
        status: task.status.toggled(),
        ..task.clone()
    }
}

/// Applies a partial update, validating every provided field first
pub fn update_task(task: &Task, patch: &TaskPatch) -> Result<Task, ValidationError> {
    let title = match &patch.title {
        Some(title) => normalize_title(title)?.to_string(),
        None => task.title.clone(),
    };

    Ok(Task {
        title,
        priority: patch.priority.unwrap_or(task.priority),
        status: patch.status.unwrap_or(task.status),
        ..task.clone()
    })
}

/// Yields the tasks matching `filter`, in their original order
pub fn filter_tasks(tasks: &[Task], filter: TaskFilter) -> impl Iterator<Item = &Task> + '_ {
    tasks.iter().filter(move |task| filter.matches(task))
}

/// Counts tasks by status
pub fn calculate_stats(tasks: &[Task]) -> TaskStats {
    let completed = tasks.iter().filter(|t| t.status.is_complete()).count();
    TaskStats {
        total: tasks.len(),
        completed,
        pending: tasks.len() - completed,
    }
}

/// Finds a task by ID
pub fn find_task<'a>(tasks: &'a [Task], id: &TaskId) -> Option<&'a Task> {
    tasks.iter().find(|t| &t.id == id)
}
