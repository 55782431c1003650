//! Task CLI commands

use anyhow::{bail, Result};
use clap::Subcommand;

use super::output::Output;
use crate::domain::{Priority, TaskFilter, TaskId, TaskPatch, TaskStatus};
use crate::service::TaskService;

#[derive(Subcommand)]
pub enum TaskCommands {
    /// Add a task
    ///
    /// Examples:
    ///   taskboard task add "Write report" --priority high
    ///   taskboard task add "Comprar pan" -p baja
    Add {
        /// Task title (1-100 characters)
        title: String,

        /// Priority: high, medium or low
        #[arg(long, short)]
        priority: String,
    },

    /// List tasks
    List {
        /// Filter: all, pending or completed
        #[arg(long, default_value = "all")]
        filter: String,
    },

    /// Show task details
    Show {
        /// Task ID
        id: String,
    },

    /// Flip a task between pending and completed
    Toggle {
        /// Task ID
        id: String,
    },

    /// Change a task's title, priority or status
    Update {
        /// Task ID
        id: String,

        /// New title
        #[arg(long)]
        title: Option<String>,

        /// New priority: high, medium or low
        #[arg(long)]
        priority: Option<String>,

        /// New status: pending or completed
        #[arg(long)]
        status: Option<String>,
    },

    /// Delete a task
    Remove {
        /// Task ID
        id: String,
    },
}

pub fn run(cmd: TaskCommands, service: &TaskService, output: &Output) -> Result<()> {
    match cmd {
        TaskCommands::Add { title, priority } => add_task(service, output, &title, &priority),
        TaskCommands::List { filter } => list_tasks(service, output, &filter),
        TaskCommands::Show { id } => show_task(service, output, &id),
        TaskCommands::Toggle { id } => toggle_task(service, output, &id),
        TaskCommands::Update {
            id,
            title,
            priority,
            status,
        } => update_task(
            service,
            output,
            &id,
            title,
            priority.as_deref(),
            status.as_deref(),
        ),
        TaskCommands::Remove { id } => remove_task(service, output, &id),
    }
}

fn add_task(service: &TaskService, output: &Output, title: &str, priority: &str) -> Result<()> {
    let priority: Priority = priority.parse()?;
    let task = service.create(title, priority)?;

    if output.is_json() {
        output.data(&task);
    } else {
        output.success(&format!("Created task: {} - {}", task.id, task.title));
    }

    Ok(())
}

fn list_tasks(service: &TaskService, output: &Output, filter: &str) -> Result<()> {
    let filter: TaskFilter = filter.parse()?;
    let tasks = service.list(filter)?;
    tracing::debug!(filter = %filter, count = tasks.len(), "listed tasks");

    output.tasks(&tasks);
    Ok(())
}

fn show_task(service: &TaskService, output: &Output, id: &str) -> Result<()> {
    let id: TaskId = id.parse()?;
    let task = service.get(&id)?;

    if output.is_json() {
        output.data(&task);
    } else {
        println!("ID:       {}", task.id);
        println!("Title:    {}", task.title);
        println!("Status:   {}", task.status);
        println!("Priority: {}", task.priority);
        println!("Created:  {}", task.created_at.to_rfc3339());
    }

    Ok(())
}

fn toggle_task(service: &TaskService, output: &Output, id: &str) -> Result<()> {
    let id: TaskId = id.parse()?;
    let task = service.toggle(&id)?;

    if output.is_json() {
        output.data(&task);
    } else {
        output.success(&format!("Task {} is now {}", task.id, task.status));
    }

    Ok(())
}

fn update_task(
    service: &TaskService,
    output: &Output,
    id: &str,
    title: Option<String>,
    priority: Option<&str>,
    status: Option<&str>,
) -> Result<()> {
    let id: TaskId = id.parse()?;

    let patch = TaskPatch {
        title,
        priority: priority.map(str::parse::<Priority>).transpose()?,
        status: status.map(str::parse::<TaskStatus>).transpose()?,
    };
    if patch.is_empty() {
        bail!("Nothing to update: pass --title, --priority or --status");
    }

    let task = service.update(&id, &patch)?;

    if output.is_json() {
        output.data(&task);
    } else {
        output.success(&format!("Updated task: {} - {}", task.id, task.title));
    }

    Ok(())
}

fn remove_task(service: &TaskService, output: &Output, id: &str) -> Result<()> {
    let id: TaskId = id.parse()?;
    let task = service.remove(&id)?;

    if output.is_json() {
        output.data(&task);
    } else {
        output.success(&format!("Removed task: {} - {}", task.id, task.title));
    }

    Ok(())
}
