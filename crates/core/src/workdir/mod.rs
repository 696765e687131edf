//! Per-worker filesystem scopes.
//!
//! Every worker slot owns exactly one directory under the configured root.
//! The directory is created when the worker starts and emptied after every
//! task, whatever the task's outcome. The directory itself is never removed.

mod maintenance;

pub use maintenance::{DropCachesHook, MaintenanceConfig, MaintenanceHook, NoopMaintenance};

use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

/// Allocates worker directories below a shared root.
#[derive(Debug, Clone)]
pub struct WorkDirManager {
    root: PathBuf,
}

impl WorkDirManager {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Allocate (or reuse) the directory for worker slot `index`.
    pub async fn allocate(&self, index: usize) -> io::Result<WorkerContext> {
        let path = self.root.join(format!("worker-{}", index));
        tokio::fs::create_dir_all(&path).await?;
        Ok(WorkerContext { index, path })
    }
}

/// One worker's exclusive directory.
///
/// Not `Clone`: the owning worker holds the only handle.
#[derive(Debug)]
pub struct WorkerContext {
    index: usize,
    path: PathBuf,
}

impl WorkerContext {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove every entry inside the directory.
    ///
    /// Entries that cannot be removed are logged and skipped; the error
    /// returned is the first one met, after all removals were attempted.
    pub async fn clear(&self) -> io::Result<usize> {
        let mut entries = match tokio::fs::read_dir(&self.path).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tokio::fs::create_dir_all(&self.path).await?;
                return Ok(0);
            }
            Err(e) => return Err(e),
        };

        let mut removed = 0;
        let mut first_error = None;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let file_type = entry.file_type().await?;
            let result = if file_type.is_dir() {
                tokio::fs::remove_dir_all(&path).await
            } else {
                tokio::fs::remove_file(&path).await
            };
            match result {
                Ok(()) => removed += 1,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to remove work file");
                    first_error.get_or_insert(e);
                }
            }
        }

        debug!(worker = self.index, removed, "Cleared work directory");
        match first_error {
            Some(e) => Err(e),
            None => Ok(removed),
        }
    }

    /// True when the directory has no entries.
    pub async fn is_empty(&self) -> io::Result<bool> {
        let mut entries = tokio::fs::read_dir(&self.path).await?;
        Ok(entries.next_entry().await?.is_none())
    }
}
