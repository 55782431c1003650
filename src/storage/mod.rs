//! # Storage Layer
//!
//! Persistence adapters for the task collection. The domain layer never
//! touches storage; callers read the whole collection, transform it with
//! the pure domain functions and write it back.
//!
//! ## Backends
//!
//! | Backend | Type | Format |
//! |---------|------|--------|
//! | `jsonl` | [`JsonlTaskStore`] | One JSON task per line (default `data/tasks.jsonl`) |
//! | `sqlite` | [`SqliteTaskStore`] | SQLite `tasks` table (default `data/tasks.db`) |
//! | `memory` | [`InMemoryTaskStore`] | Process memory, lost on exit |
//!
//! ## Concurrency Safety
//!
//! - [`TaskStore::write_lock`] returns a [`StoreLock`]. File-backed stores
//!   hold an exclusive `fs2` lock on a `<data file>.lock` sidecar, so
//!   separate processes sharing a data file take turns
//! - [`JsonlTaskStore`] writes a unique temp file and renames it into place
//! - [`SqliteTaskStore`] rewrites the table inside a single transaction
//! - [`crate::service::TaskService`] holds the lock for each
//!   read-modify-write sequence

mod config;
mod jsonl;
mod memory;
mod sqlite;

use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use fs2::FileExt;

use crate::domain::Task;

pub use config::{
    Config, ConfigError, ServerConfig, StorageBackend, StorageConfig, CONFIG_FILE_NAME,
};
pub use jsonl::JsonlTaskStore;
pub use memory::InMemoryTaskStore;
pub use sqlite::SqliteTaskStore;

/// Ordered collection store, implemented by every backend
pub trait TaskStore: Send + Sync {
    /// Short human-readable description (backend and location)
    fn describe(&self) -> String;

    /// Whether data survives a restart
    fn is_persistent(&self) -> bool;

    /// Reads the full collection, in stored order
    fn read(&self) -> Result<Vec<Task>>;

    /// Replaces the full collection
    fn write(&self, tasks: &[Task]) -> Result<()>;

    /// Blocks until this handle may run a read-modify-write, across
    /// processes where the backend supports it
    fn write_lock(&self) -> Result<StoreLock> {
        Ok(StoreLock::unlocked())
    }
}

/// Exclusive write access to a store, released on drop
#[derive(Debug)]
pub struct StoreLock {
    _file: Option<File>,
}

impl StoreLock {
    /// A lock for stores that live in a single process
    pub fn unlocked() -> Self {
        Self { _file: None }
    }

    /// Takes an exclusive lock on the `.lock` sidecar of `data_path`
    pub fn acquire(data_path: &Path) -> Result<Self> {
        let lock_path = sidecar_path(data_path);
        if let Some(parent) = lock_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create directory: {}", parent.display())
                })?;
            }
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .with_context(|| format!("Failed to open lock file: {}", lock_path.display()))?;

        file.lock_exclusive()
            .with_context(|| format!("Failed to lock {}", lock_path.display()))?;

        // Unlocked when the file is closed
        Ok(Self { _file: Some(file) })
    }
}

/// `tasks.jsonl` -> `tasks.jsonl.lock`
fn sidecar_path(data_path: &Path) -> PathBuf {
    let mut name: OsString = data_path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("tasks"));
    name.push(".lock");
    data_path.with_file_name(name)
}

/// Opens the store selected by the configuration
pub fn open_store(config: &StorageConfig) -> Result<Arc<dyn TaskStore>> {
    let store: Arc<dyn TaskStore> = match config.backend {
        StorageBackend::Jsonl => Arc::new(JsonlTaskStore::new(config.resolved_path())),
        StorageBackend::Sqlite => Arc::new(SqliteTaskStore::open(&config.resolved_path())?),
        StorageBackend::Memory => Arc::new(InMemoryTaskStore::new()),
    };

    tracing::debug!(store = %store.describe(), "opened task store");
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn open_each_backend() {
        let dir = TempDir::new().unwrap();

        for (backend, file) in [
            (StorageBackend::Jsonl, "tasks.jsonl"),
            (StorageBackend::Sqlite, "tasks.db"),
            (StorageBackend::Memory, "unused"),
        ] {
            let config = StorageConfig {
                backend,
                data_path: Some(dir.path().join(file)),
            };
            let store = open_store(&config).unwrap();
            assert!(store.read().unwrap().is_empty());
            assert_eq!(store.is_persistent(), backend != StorageBackend::Memory);
        }
    }

    #[test]
    fn sidecar_sits_next_to_data_file() {
        assert_eq!(
            sidecar_path(Path::new("data/tasks.jsonl")),
            PathBuf::from("data/tasks.jsonl.lock")
        );
        assert_eq!(sidecar_path(Path::new("tasks.db")), PathBuf::from("tasks.db.lock"));
    }

    #[test]
    fn store_lock_excludes_other_holders() {
        use std::sync::atomic::{AtomicBool, Ordering};
        use std::time::Duration;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tasks.jsonl");
        let released = Arc::new(AtomicBool::new(false));

        let held = StoreLock::acquire(&path).unwrap();
        let waiter = {
            let path = path.clone();
            let released = Arc::clone(&released);
            std::thread::spawn(move || {
                let _lock = StoreLock::acquire(&path).unwrap();
                released.load(Ordering::SeqCst)
            })
        };

        std::thread::sleep(Duration::from_millis(100));
        released.store(true, Ordering::SeqCst);
        drop(held);

        assert!(waiter.join().unwrap(), "second holder got the lock too early");
        assert!(dir.path().join("tasks.jsonl.lock").exists());
    }
}
