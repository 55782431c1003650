//! Taskboard - a small task manager with a JSON HTTP API
//!
//! Tasks carry a title, a priority and a pending/completed status. The
//! [`domain`] module holds the pure rules (creation, toggling, updates,
//! filtering, stats and title validation); [`storage`] persists the task
//! collection; [`service`] combines the two; [`api`] and [`cli`] expose
//! it over HTTP and the command line.

pub mod domain;
pub mod storage;
pub mod service;
pub mod api;
pub mod cli;

pub use domain::{Priority, Task, TaskFilter, TaskId, TaskStats, TaskStatus};
pub use service::{ServiceError, TaskService};
