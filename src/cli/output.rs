//! Output formatting for CLI commands

use serde::Serialize;

use crate::domain::{Task, TaskStats};

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Output helper for consistent formatting
pub struct Output {
    format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Prints a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Text => println!("{}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({
                        "success": true,
                        "message": message
                    })
                );
            }
        }
    }

    /// Prints structured data
    pub fn data<T: Serialize>(&self, data: &T) {
        match self.format {
            OutputFormat::Text => {
                // Fallback for types without a text rendering
                if let Ok(json) = serde_json::to_string_pretty(data) {
                    println!("{}", json);
                }
            }
            OutputFormat::Json => {
                if let Ok(json) = serde_json::to_string(data) {
                    println!("{}", json);
                }
            }
        }
    }

    /// Prints a table row (text only, ignored in JSON mode)
    pub fn row(&self, columns: &[&str]) {
        if self.format == OutputFormat::Text {
            println!("{}", columns.join("\t"));
        }
    }

    /// Returns true if using JSON format
    pub fn is_json(&self) -> bool {
        self.format == OutputFormat::Json
    }

    /// Prints a list of tasks as rows, or as a JSON array
    pub fn tasks(&self, tasks: &[Task]) {
        if self.is_json() {
            self.data(&tasks);
        } else if tasks.is_empty() {
            println!("No tasks");
        } else {
            for task in tasks {
                self.task_row(task);
            }
        }
    }

    /// Prints task counts
    pub fn stats(&self, stats: &TaskStats) {
        if self.is_json() {
            self.data(stats);
        } else {
            println!("Total:     {}", stats.total);
            println!("Completed: {}", stats.completed);
            println!("Pending:   {}", stats.pending);
        }
    }

    fn task_row(&self, task: &Task) {
        let mark = if task.status.is_complete() { "[x]" } else { "[ ]" };
        let created = task.created_at.format("%Y-%m-%d %H:%M").to_string();
        self.row(&[
            task.id.as_str(),
            mark,
            task.priority.as_str(),
            &created,
            &task.title,
        ]);
    }
}
