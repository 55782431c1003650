//! JSONL storage for tasks
//!
//! Tasks are stored one JSON object per line, in collection order.
//! Writes go to a unique temp file in the same directory and are renamed
//! over the store, so readers always see a complete file. Writers from
//! different processes serialize on the `.lock` sidecar.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tempfile::NamedTempFile;

use super::{StoreLock, TaskStore};
use crate::domain::{Task, TaskId};

/// Store for task data in JSONL format
pub struct JsonlTaskStore {
    path: PathBuf,
}

impl JsonlTaskStore {
    /// Creates a new task store at the given path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the path to the store file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn dir(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }
}

impl TaskStore for JsonlTaskStore {
    fn describe(&self) -> String {
        format!("jsonl:{}", self.path.display())
    }

    fn is_persistent(&self) -> bool {
        true
    }

    /// A repeated ID keeps its first position and its last content
    fn read(&self) -> Result<Vec<Task>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.path)
            .with_context(|| format!("Failed to open task store: {}", self.path.display()))?;

        let reader = BufReader::new(&file);
        let mut tasks: Vec<Task> = Vec::new();
        let mut positions: HashMap<TaskId, usize> = HashMap::new();

        for (line_num, line) in reader.lines().enumerate() {
            let line = line.with_context(|| format!("Failed to read line {}", line_num + 1))?;

            if line.trim().is_empty() {
                continue;
            }

            let task: Task = serde_json::from_str(&line)
                .with_context(|| format!("Failed to parse task at line {}", line_num + 1))?;

            let existing = positions.get(&task.id).copied();
            match existing {
                Some(pos) => tasks[pos] = task,
                None => {
                    positions.insert(task.id.clone(), tasks.len());
                    tasks.push(task);
                }
            }
        }

        Ok(tasks)
    }

    fn write(&self, tasks: &[Task]) -> Result<()> {
        let dir = self.dir();
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory: {}", dir.display()))?;

        let temp = NamedTempFile::new_in(dir)
            .with_context(|| format!("Failed to create temp file in {}", dir.display()))?;

        {
            let mut writer = BufWriter::new(temp.as_file());

            for task in tasks {
                let line = serde_json::to_string(task).context("Failed to serialize task")?;
                writeln!(writer, "{}", line).context("Failed to write task")?;
            }

            writer.flush().context("Failed to flush task store")?;
        }

        // Atomic rename
        temp.persist(&self.path)
            .map_err(|e| e.error)
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;

        Ok(())
    }

    fn write_lock(&self) -> Result<StoreLock> {
        StoreLock::acquire(&self.path)
    }
}
