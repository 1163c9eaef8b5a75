//! Per-repository write locks
//!
//! Two layers:
//! 1. In-process async mutex per repository, so tasks in this process queue up
//! 2. Filesystem lock (cross-process), so other processes are turned away

use super::fs_lock::FsLockGuard;
use crate::error::{IndexingError, RagError};
use crate::repo_id::RepoId;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Lock registry shared by clones of one client
#[derive(Clone)]
pub(crate) struct RepoLocks {
    lock_dir: PathBuf,
    wait_timeout: Duration,
    local: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

/// Held for the duration of a write to one repository
pub(crate) struct RepoLockGuard {
    _fs_lock: FsLockGuard,
    _local: OwnedMutexGuard<()>,
}

impl RepoLocks {
    pub(crate) fn new(lock_dir: PathBuf, wait_timeout: Duration) -> Self {
        Self {
            lock_dir,
            wait_timeout,
            local: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Acquire both layers for `repo`, waiting up to the configured timeout
    pub(crate) async fn acquire(&self, repo: &RepoId) -> Result<RepoLockGuard, RagError> {
        let start = Instant::now();

        let repo_mutex = {
            let mut local = self.local.lock().await;
            // Entries nobody holds or waits on are only referenced by the map
            local.retain(|_, mutex| Arc::strong_count(mutex) > 1);
            Arc::clone(local.entry(repo.to_string()).or_default())
        };

        let local_guard = tokio::time::timeout(self.wait_timeout, repo_mutex.lock_owned())
            .await
            .map_err(|_| IndexingError::LockTimeout {
                repo: repo.to_string(),
                secs: self.wait_timeout.as_secs(),
            })?;

        let remaining = self.wait_timeout.saturating_sub(start.elapsed());
        let lock_dir = self.lock_dir.clone();
        let key = repo.to_string();
        let fs_lock = tokio::task::spawn_blocking(move || {
            FsLockGuard::acquire_blocking(&lock_dir, &key, remaining)
        })
        .await
        .map_err(|e| RagError::other(format!("Lock task failed: {}", e)))??;

        match fs_lock {
            Some(fs_lock) => {
                tracing::debug!("Acquired repository lock for {}", repo);
                Ok(RepoLockGuard {
                    _fs_lock: fs_lock,
                    _local: local_guard,
                })
            }
            None => Err(IndexingError::RepositoryLocked(repo.to_string()).into()),
        }
    }
}
