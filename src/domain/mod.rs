//! Domain models for taskboard
//!
//! Contains the core business logic without any I/O concerns.

mod id;
mod task;
mod validation;

pub use id::{Clock, IdError, IdGenerator, SystemClock, TaskId, UuidGenerator};
pub use task::{
    calculate_stats, create_task, create_task_with, filter_tasks, find_task,
    toggle_task_completion, update_task, Priority, Task, TaskFilter, TaskPatch, TaskStats,
    TaskStatus,
};
pub use validation::{
    normalize_title, validate_task_title, ErrorCode, ValidationError, ValidationResult,
    MAX_TITLE_LEN,
};
