//! File system-based atomic blob store.
//!
//! Writes follow write-to-temp-then-rename: the data goes to a temporary file
//! in the same directory, the file is synced, renamed over the target and the
//! directory is synced, so readers never observe a partial write.

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use super::error::{StoreError, StoreResult};
use super::traits::AtomicBlobStore;

fn io_error(context: impl AsRef<str>, err: &std::io::Error) -> StoreError {
    StoreError::BlobStore(format!("{}: {err}", context.as_ref()))
}

/// [`AtomicBlobStore`] keeping each blob as a file in one directory.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    directory: PathBuf,
}

impl FsBlobStore {
    /// Creates a blob store for `directory`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn new(directory: impl AsRef<Path>) -> StoreResult<Self> {
        let directory = directory.as_ref().to_path_buf();
        fs::create_dir_all(&directory).map_err(|err| {
            io_error(
                format!("failed to create blob directory '{}'", directory.display()),
                &err,
            )
        })?;
        Ok(Self { directory })
    }

    /// Returns the directory holding the blobs.
    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn blob_path(&self, name: &str) -> PathBuf {
        self.directory.join(name)
    }

    fn temp_path(&self, name: &str) -> PathBuf {
        self.directory.join(format!(".{name}.tmp"))
    }

    #[cfg(unix)]
    fn sync_directory(&self) -> StoreResult<()> {
        let dir = File::open(&self.directory).map_err(|err| {
            io_error(
                format!("failed to open directory '{}'", self.directory.display()),
                &err,
            )
        })?;
        dir.sync_all()
            .map_err(|err| io_error("failed to sync directory", &err))
    }

    #[cfg(not(unix))]
    fn sync_directory(&self) -> StoreResult<()> {
        Ok(())
    }
}

impl AtomicBlobStore for FsBlobStore {
    fn read(&self, name: &str) -> StoreResult<Option<Vec<u8>>> {
        match fs::read(self.blob_path(name)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(io_error(format!("failed to read blob '{name}'"), &err)),
        }
    }

    fn write_atomic(&self, name: &str, bytes: &[u8]) -> StoreResult<()> {
        let temp_path = self.temp_path(name);
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)
            .map_err(|err| io_error(format!("failed to create temp file for '{name}'"), &err))?;
        file.write_all(bytes)
            .map_err(|err| io_error(format!("failed to write blob '{name}'"), &err))?;
        file.sync_all()
            .map_err(|err| io_error(format!("failed to sync blob '{name}'"), &err))?;
        drop(file);

        fs::rename(&temp_path, self.blob_path(name))
            .map_err(|err| io_error(format!("failed to rename blob '{name}'"), &err))?;
        self.sync_directory()
    }

    fn delete(&self, name: &str) -> StoreResult<()> {
        match fs::remove_file(self.blob_path(name)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(io_error(format!("failed to delete blob '{name}'"), &err)),
        }
    }
}
