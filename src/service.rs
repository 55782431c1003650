//! Task service
//!
//! Binds the pure domain operations to a [`TaskStore`]. Every mutating call
//! is a read-modify-write of the whole collection, serialized by an
//! in-process mutex and by the store's own [`StoreLock`], which file-backed
//! stores share across processes. Nothing is written unless the operation
//! succeeds.

use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::anyhow;
use thiserror::Error;

use crate::domain::{
    self, Clock, ErrorCode, IdGenerator, Priority, SystemClock, Task, TaskFilter, TaskId,
    TaskPatch, TaskStats, UuidGenerator, ValidationError,
};
use crate::storage::{StoreLock, TaskStore};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Task not found: {0}")]
    NotFound(TaskId),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl ServiceError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ServiceError::Validation(e) => e.code(),
            ServiceError::NotFound(_) => ErrorCode::TaskNotFound,
            ServiceError::Storage(_) => ErrorCode::InternalError,
        }
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;

/// Attempts at drawing an ID not already in the store
const MAX_ID_ATTEMPTS: u32 = 8;

pub struct TaskService {
    store: Arc<dyn TaskStore>,
    ids: Box<dyn IdGenerator>,
    clock: Box<dyn Clock>,
    write_lock: Mutex<()>,
}

impl TaskService {
    /// Creates a service with random IDs and the system clock
    pub fn new(store: Arc<dyn TaskStore>) -> Self {
        Self::with_sources(store, Box::new(UuidGenerator), Box::new(SystemClock))
    }

    /// Creates a service with explicit ID and time sources
    pub fn with_sources(
        store: Arc<dyn TaskStore>,
        ids: Box<dyn IdGenerator>,
        clock: Box<dyn Clock>,
    ) -> Self {
        Self {
            store,
            ids,
            clock,
            write_lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &dyn TaskStore {
        self.store.as_ref()
    }

    /// Held for the whole of a read-modify-write
    fn lock(&self) -> Result<(MutexGuard<'_, ()>, StoreLock)> {
        let guard = self
            .write_lock
            .lock()
            .map_err(|_| ServiceError::Storage(anyhow!("Task service lock poisoned")))?;
        let store_lock = self.store.write_lock()?;
        Ok((guard, store_lock))
    }

    /// Lists tasks matching `filter`, in stored order
    pub fn list(&self, filter: TaskFilter) -> Result<Vec<Task>> {
        let tasks = self.store.read()?;
        Ok(domain::filter_tasks(&tasks, filter).cloned().collect())
    }

    /// Fetches a single task
    pub fn get(&self, id: &TaskId) -> Result<Task> {
        let tasks = self.store.read()?;
        domain::find_task(&tasks, id)
            .cloned()
            .ok_or_else(|| ServiceError::NotFound(id.clone()))
    }

    /// Creates and stores a new task
    pub fn create(&self, title: &str, priority: Priority) -> Result<Task> {
        let mut task =
            domain::create_task_with(title, priority, self.ids.as_ref(), self.clock.as_ref())?;

        let _guard = self.lock()?;
        let mut tasks = self.store.read()?;

        let mut attempts = 1;
        while domain::find_task(&tasks, &task.id).is_some() {
            if attempts == MAX_ID_ATTEMPTS {
                return Err(ServiceError::Storage(anyhow!(
                    "Could not generate an unused task ID after {} attempts",
                    attempts
                )));
            }
            tracing::warn!(id = %task.id, "generated task ID already in use, drawing another");
            task.id = self.ids.next_id();
            attempts += 1;
        }

        tasks.push(task.clone());
        self.store.write(&tasks)?;

        tracing::debug!(id = %task.id, priority = %task.priority, "created task");
        Ok(task)
    }

    /// Applies a partial update to a stored task
    pub fn update(&self, id: &TaskId, patch: &TaskPatch) -> Result<Task> {
        self.modify(id, |task| domain::update_task(task, patch))
    }

    /// Flips a stored task between pending and completed
    pub fn toggle(&self, id: &TaskId) -> Result<Task> {
        self.modify(id, |task| Ok(domain::toggle_task_completion(task)))
    }

    /// Deletes a task, returning it
    pub fn remove(&self, id: &TaskId) -> Result<Task> {
        let _guard = self.lock()?;
        let mut tasks = self.store.read()?;

        let pos = tasks
            .iter()
            .position(|t| &t.id == id)
            .ok_or_else(|| ServiceError::NotFound(id.clone()))?;
        let removed = tasks.remove(pos);
        self.store.write(&tasks)?;

        tracing::debug!(id = %removed.id, "removed task");
        Ok(removed)
    }

    /// Counts stored tasks by status
    pub fn stats(&self) -> Result<TaskStats> {
        let tasks = self.store.read()?;
        Ok(domain::calculate_stats(&tasks))
    }

    fn modify<F>(&self, id: &TaskId, change: F) -> Result<Task>
    where
        F: FnOnce(&Task) -> std::result::Result<Task, ValidationError>,
    {
        let _guard = self.lock()?;
        let mut tasks = self.store.read()?;

        let pos = tasks
            .iter()
            .position(|t| &t.id == id)
            .ok_or_else(|| ServiceError::NotFound(id.clone()))?;
        let updated = change(&tasks[pos])?;
        tasks[pos] = updated.clone();
        self.store.write(&tasks)?;

        tracing::debug!(id = %updated.id, status = %updated.status, "updated task");
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::testing::{fixed_time, FixedClock, SequentialIds};
    use crate::domain::TaskStatus;
    use crate::storage::{open_store, InMemoryTaskStore, StorageBackend, StorageConfig};

    fn service() -> (TaskService, InMemoryTaskStore) {
        let store = InMemoryTaskStore::new();
        let service = TaskService::with_sources(
            Arc::new(store.clone()),
            Box::new(SequentialIds::default()),
            Box::new(FixedClock),
        );
        (service, store)
    }

    fn id(s: &str) -> TaskId {
        s.parse().unwrap()
    }

    #[test]
    fn create_persists_task() {
        let (service, store) = service();

        let task = service.create("  First  ", Priority::High).unwrap();
        assert_eq!(task.id, id("task-1"));
        assert_eq!(task.title, "First");
        assert_eq!(task.created_at, fixed_time());

        assert_eq!(store.read().unwrap(), vec![task]);
    }

    #[test]
    fn invalid_create_leaves_store_untouched() {
        let (service, store) = service();
        service.create("keep", Priority::Low).unwrap();
        let before = store.read().unwrap();

        let err = service.create("   ", Priority::Low).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);
        assert_eq!(store.read().unwrap(), before);
    }

    #[test]
    fn list_filters_in_order() {
        let (service, _) = service();
        service.create("one", Priority::Low).unwrap();
        service.create("two", Priority::Low).unwrap();
        service.create("three", Priority::Low).unwrap();
        service.toggle(&id("task-2")).unwrap();

        let pending: Vec<_> = service
            .list(TaskFilter::Pending)
            .unwrap()
            .into_iter()
            .map(|t| t.title)
            .collect();
        assert_eq!(pending, vec!["one", "three"]);

        assert_eq!(service.list(TaskFilter::All).unwrap().len(), 3);
        assert_eq!(service.list(TaskFilter::Completed).unwrap().len(), 1);
    }

    #[test]
    fn toggle_twice_restores_status() {
        let (service, _) = service();
        service.create("flip", Priority::Medium).unwrap();

        assert_eq!(service.toggle(&id("task-1")).unwrap().status, TaskStatus::Completed);
        assert_eq!(service.toggle(&id("task-1")).unwrap().status, TaskStatus::Pending);
    }

    #[test]
    fn update_validates_before_writing() {
        let (service, store) = service();
        service.create("original", Priority::Medium).unwrap();
        let before = store.read().unwrap();

        let bad = TaskPatch {
            title: Some("x".repeat(101)),
            status: Some(TaskStatus::Completed),
            ..Default::default()
        };
        let err = service.update(&id("task-1"), &bad).unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Validation(ValidationError::TitleTooLong { len: 101 })
        ));
        assert_eq!(store.read().unwrap(), before);

        let good = TaskPatch {
            priority: Some(Priority::High),
            ..Default::default()
        };
        let updated = service.update(&id("task-1"), &good).unwrap();
        assert_eq!(updated.priority, Priority::High);
        assert_eq!(service.get(&id("task-1")).unwrap(), updated);
    }

    #[test]
    fn missing_ids_are_not_found() {
        let (service, _) = service();
        let missing = id("nope");

        for err in [
            service.get(&missing).unwrap_err(),
            service.toggle(&missing).unwrap_err(),
            service.update(&missing, &TaskPatch::default()).unwrap_err(),
            service.remove(&missing).unwrap_err(),
        ] {
            assert_eq!(err.code(), ErrorCode::TaskNotFound);
            assert_eq!(err.to_string(), "Task not found: nope");
        }
    }

    #[test]
    fn remove_deletes_only_that_task() {
        let (service, _) = service();
        service.create("a", Priority::Low).unwrap();
        service.create("b", Priority::Low).unwrap();

        let removed = service.remove(&id("task-1")).unwrap();
        assert_eq!(removed.title, "a");

        let left: Vec<_> = service
            .list(TaskFilter::All)
            .unwrap()
            .into_iter()
            .map(|t| t.title)
            .collect();
        assert_eq!(left, vec!["b"]);
    }

    #[test]
    fn stats_follow_mutations() {
        let (service, _) = service();
        assert_eq!(service.stats().unwrap(), TaskStats::default());

        service.create("a", Priority::Low).unwrap();
        service.create("b", Priority::Low).unwrap();
        service.create("c", Priority::Low).unwrap();
        service.toggle(&id("task-2")).unwrap();

        assert_eq!(
            service.stats().unwrap(),
            TaskStats {
                total: 3,
                completed: 1,
                pending: 2
            }
        );
    }

    #[test]
    fn concurrent_creates_are_not_lost() {
        let service = Arc::new(TaskService::new(Arc::new(InMemoryTaskStore::new())));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let service = Arc::clone(&service);
                std::thread::spawn(move || {
                    for j in 0..10 {
                        service
                            .create(&format!("t{}-{}", i, j), Priority::Low)
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(service.stats().unwrap().total, 80);
    }

    #[test]
    fn create_skips_ids_already_in_store() {
        let store = InMemoryTaskStore::new();
        let first = TaskService::with_sources(
            Arc::new(store.clone()),
            Box::new(SequentialIds::default()),
            Box::new(FixedClock),
        );
        first.create("a", Priority::Low).unwrap();
        first.create("b", Priority::Low).unwrap();

        // A fresh generator starts over at task-1
        let second = TaskService::with_sources(
            Arc::new(store.clone()),
            Box::new(SequentialIds::default()),
            Box::new(FixedClock),
        );
        let task = second.create("c", Priority::Low).unwrap();
        assert_eq!(task.id, id("task-3"));

        let ids: Vec<_> = store.read().unwrap().into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![id("task-1"), id("task-2"), id("task-3")]);
    }

    #[test]
    fn create_gives_up_when_ids_keep_colliding() {
        struct SameId;
        impl IdGenerator for SameId {
            fn next_id(&self) -> TaskId {
                "fixed".parse().unwrap()
            }
        }

        let store = InMemoryTaskStore::new();
        let service =
            TaskService::with_sources(Arc::new(store.clone()), Box::new(SameId), Box::new(FixedClock));
        service.create("one", Priority::Low).unwrap();

        let err = service.create("two", Priority::Low).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InternalError);
        assert_eq!(store.read().unwrap().len(), 1);
    }

    fn independent_services_share_one_file(backend: StorageBackend, file: &str) {
        let dir = tempfile::TempDir::new().unwrap();
        let config = StorageConfig {
            backend,
            data_path: Some(dir.path().join(file)),
        };

        // Schema and journal mode are set up once, before the race
        open_store(&config).unwrap();

        // One service and store per thread, as separate processes would have
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let config = config.clone();
                std::thread::spawn(move || {
                    let service = TaskService::new(open_store(&config).unwrap());
                    for j in 0..25 {
                        service
                            .create(&format!("t{}-{}", i, j), Priority::Low)
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let tasks = open_store(&config).unwrap().read().unwrap();
        assert_eq!(tasks.len(), 100);
        let unique: std::collections::HashSet<_> = tasks.iter().map(|t| &t.id).collect();
        assert_eq!(unique.len(), 100);
    }

    #[test]
    fn jsonl_writers_in_separate_services_do_not_lose_tasks() {
        independent_services_share_one_file(StorageBackend::Jsonl, "tasks.jsonl");
    }

    #[test]
    fn sqlite_writers_in_separate_services_do_not_lose_tasks() {
        independent_services_share_one_file(StorageBackend::Sqlite, "tasks.db");
    }
}
