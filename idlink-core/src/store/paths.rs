//! Storage path helpers.

use std::path::{Path, PathBuf};

use super::ASSOCIATIONS_BLOB;

const LOCK_FILENAME: &str = "lock";

/// Paths for association storage artifacts under `<root>/idlink`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoragePaths {
    root: PathBuf,
    idlink_dir: PathBuf,
}

impl StoragePaths {
    /// Builds storage paths rooted at `root`.
    #[must_use]
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref().to_path_buf();
        let idlink_dir = root.join("idlink");
        Self { root, idlink_dir }
    }

    /// Returns the storage root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the directory holding the association table and its lock.
    #[must_use]
    pub fn idlink_dir(&self) -> &Path {
        &self.idlink_dir
    }

    /// Returns the path to the association table blob.
    #[must_use]
    pub fn associations_path(&self) -> PathBuf {
        self.idlink_dir.join(ASSOCIATIONS_BLOB)
    }

    /// Returns the path to the lock file.
    #[must_use]
    pub fn lock_path(&self) -> PathBuf {
        self.idlink_dir.join(LOCK_FILENAME)
    }
}
