//! In-memory task store (non-persistent).

use std::sync::{Arc, RwLock};

use anyhow::{anyhow, Result};

use super::TaskStore;
use crate::domain::Task;

#[derive(Clone, Default)]
pub struct InMemoryTaskStore {
    tasks: Arc<RwLock<Vec<Task>>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with `tasks`
    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        Self {
            tasks: Arc::new(RwLock::new(tasks)),
        }
    }
}

impl TaskStore for InMemoryTaskStore {
    fn describe(&self) -> String {
        "memory".to_string()
    }

    fn is_persistent(&self) -> bool {
        false
    }

    fn read(&self) -> Result<Vec<Task>> {
        let tasks = self
            .tasks
            .read()
            .map_err(|_| anyhow!("In-memory task store lock poisoned"))?;
        Ok(tasks.clone())
    }

    fn write(&self, tasks: &[Task]) -> Result<()> {
        let mut guard = self
            .tasks
            .write()
            .map_err(|_| anyhow!("In-memory task store lock poisoned"))?;
        *guard = tasks.to_vec();
        Ok(())
    }
}
