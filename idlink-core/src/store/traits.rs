//! Platform interfaces for association persistence.

use super::error::StoreResult;

/// Atomic storage for small binary files (e.g. `associations.bin`).
///
/// Writes MUST be atomic: readers see either the complete old content or the
/// complete new content, never a partial write.
pub trait AtomicBlobStore: Send + Sync {
    /// Reads the blob named `name`, if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    fn read(&self, name: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Writes bytes atomically to `name`, replacing any existing content.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn write_atomic(&self, name: &str, bytes: &[u8]) -> StoreResult<()>;

    /// Deletes the blob named `name`. Deleting a missing blob succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    fn delete(&self, name: &str) -> StoreResult<()>;
}
