//! Filesystem-based locking for cross-process coordination
//!
//! Uses flock() through `fs2` so two processes never index the same repository at
//! once. Complements the in-process locks in repo_lock.rs.

use anyhow::{Context, Result};
use fs2::FileExt;
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Lock file path for a key: first 16 hex chars of its SHA-256
fn lock_file_path(lock_dir: &Path, key: &str) -> PathBuf {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    let hash = format!("{:x}", hasher.finalize());
    lock_dir.join(format!("{}.lock", &hash[..16]))
}

/// Guard that holds an exclusive filesystem lock
///
/// The lock is released when the guard is dropped. If the process crashes, the OS
/// releases the flock.
pub struct FsLockGuard {
    _file: File,
    path: PathBuf,
}

impl FsLockGuard {
    /// Try to acquire an exclusive filesystem lock, non-blocking
    ///
    /// Returns:
    /// - `Ok(Some(guard))` if the lock was acquired
    /// - `Ok(None)` if another holder has it
    /// - `Err(...)` on IO errors
    pub fn try_acquire(lock_dir: &Path, key: &str) -> Result<Option<Self>> {
        let lock_path = lock_file_path(lock_dir, key);

        tracing::debug!(
            "Attempting to acquire filesystem lock: key={}, lock_file={:?}",
            key,
            lock_path
        );

        fs::create_dir_all(lock_dir).context("Failed to create lock directory")?;
        let file = File::create(&lock_path).context("Failed to create lock file")?;

        match file.try_lock_exclusive() {
            Ok(()) => {
                tracing::debug!("Acquired filesystem lock for: {}", key);
                Ok(Some(Self {
                    _file: file,
                    path: lock_path,
                }))
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                tracing::debug!("Filesystem lock for {} is held elsewhere", key);
                Ok(None)
            }
            Err(e) => Err(e).context("Failed to acquire filesystem lock"),
        }
    }

    /// Poll for the lock until it is acquired or `timeout` expires (`Ok(None)`)
    pub fn acquire_blocking(lock_dir: &Path, key: &str, timeout: Duration) -> Result<Option<Self>> {
        let start = Instant::now();
        let sleep_interval = Duration::from_millis(100);

        loop {
            if let Some(guard) = Self::try_acquire(lock_dir, key)? {
                if start.elapsed() > sleep_interval {
                    tracing::info!("Acquired filesystem lock after {:?}", start.elapsed());
                }
                return Ok(Some(guard));
            }
            if start.elapsed() >= timeout {
                tracing::warn!(
                    "Timeout waiting for filesystem lock on {} after {:?}",
                    key,
                    timeout
                );
                return Ok(None);
            }
            std::thread::sleep(sleep_interval);
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for FsLockGuard {
    fn drop(&mut self) {
        // The lock file is kept for reuse
        tracing::debug!("Releasing filesystem lock {:?}", self.path);
    }
}
