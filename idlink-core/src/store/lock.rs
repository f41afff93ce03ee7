//! Storage lock for serializing table rewrites across processes.
//!
//! An exclusive advisory lock on a dedicated file is held for the whole
//! read-modify-write cycle of [`super::BlobAssociationStore`], which is what
//! makes its check-then-insert atomic when several processes share one table.
//! The lock is per open file, so callers sharing a `StorageLock` within one
//! process still need their own mutex.

use std::fs::{self, File, OpenOptions, TryLockError};
use std::io;
use std::path::Path;
use std::sync::Arc;

use super::error::{StoreError, StoreResult};

/// A file-backed lock that serializes storage mutations across processes.
#[derive(Debug, Clone)]
pub struct StorageLock {
    file: Arc<File>,
}

/// Guard that holds an exclusive lock for its lifetime.
#[derive(Debug)]
pub struct StorageLockGuard {
    file: Arc<File>,
}

impl StorageLock {
    /// Opens or creates the lock file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or created.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| lock_error("creating lock directory", &err))?;
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|err| lock_error("opening lock file", &err))?;
        Ok(Self {
            file: Arc::new(file),
        })
    }

    /// Acquires the exclusive lock, blocking until it is available.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock cannot be acquired.
    pub fn lock(&self) -> StoreResult<StorageLockGuard> {
        self.file
            .lock()
            .map_err(|err| lock_error("acquiring table lock", &err))?;
        Ok(self.guard())
    }

    /// Attempts to acquire the exclusive lock without blocking.
    ///
    /// Returns `None` while another handle holds it.
    ///
    /// # Errors
    ///
    /// Returns an error if the attempt fails for any other reason.
    pub fn try_lock(&self) -> StoreResult<Option<StorageLockGuard>> {
        match self.file.try_lock() {
            Ok(()) => Ok(Some(self.guard())),
            Err(TryLockError::WouldBlock) => Ok(None),
            Err(TryLockError::Error(err)) => Err(lock_error("acquiring table lock", &err)),
        }
    }

    fn guard(&self) -> StorageLockGuard {
        StorageLockGuard {
            file: Arc::clone(&self.file),
        }
    }
}

impl Drop for StorageLockGuard {
    fn drop(&mut self) {
        if let Err(err) = self.file.unlock() {
            log::warn!("failed to release table lock: {err}");
        }
    }
}

fn lock_error(context: &str, err: &io::Error) -> StoreError {
    StoreError::Lock(format!("{context}: {err}"))
}
