//! Error types for association stores.

use thiserror::Error;

use crate::identifier::ExternalIdentifier;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by association stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The identifier is already bound to an account.
    #[error("identifier already associated: {0}")]
    DuplicateIdentifier(ExternalIdentifier),

    /// No association exists for the identifier.
    #[error("association not found: {0}")]
    NotFound(ExternalIdentifier),

    /// The backing storage cannot be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Errors coming from the blob store.
    #[error("blob store error: {0}")]
    BlobStore(String),

    /// Errors coming from the storage lock.
    #[error("storage lock error: {0}")]
    Lock(String),

    /// Serialization/deserialization failures.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Persisted table violates the store invariants.
    #[error("corrupted association table: {0}")]
    Corrupted(String),

    /// Unsupported table envelope version.
    #[error("unsupported table version: {0}")]
    UnsupportedVersion(u32),
}

impl StoreError {
    /// Returns `true` for failures of the storage itself, as opposed to
    /// outcomes of a well-formed request (duplicates, missing entries).
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !matches!(self, Self::DuplicateIdentifier(_) | Self::NotFound(_))
    }
}
