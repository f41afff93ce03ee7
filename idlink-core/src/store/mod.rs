//! Persistence of the external identifier ↔ account mapping.
//!
//! [`AssociationStore`] is the seam; [`MemoryAssociationStore`] keeps the table
//! in process and [`BlobAssociationStore`] persists it through an
//! [`AtomicBlobStore`] under a cross-process [`StorageLock`].

use serde::{Deserialize, Serialize};

use crate::identifier::{AccountRef, ExternalIdentifier};

mod envelope;
pub mod error;
mod fs;
pub mod lock;
mod memory;
pub mod paths;
mod persistent;
mod table;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use fs::FsBlobStore;
pub use lock::{StorageLock, StorageLockGuard};
pub use memory::MemoryAssociationStore;
pub use paths::StoragePaths;
pub use persistent::BlobAssociationStore;
pub use traits::AtomicBlobStore;

pub(crate) const ASSOCIATIONS_BLOB: &str = "associations.bin";

/// A persisted binding between an external identifier and a local account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct Association {
    /// The bound identifier, in canonical form.
    pub external_identifier: ExternalIdentifier,
    /// The account the identifier is bound to.
    pub account: AccountRef,
    /// Human-friendly rendering of the identifier supplied by the provider.
    pub friendly_display: Option<String>,
}

impl Association {
    /// Creates an association record.
    #[must_use]
    pub const fn new(
        external_identifier: ExternalIdentifier,
        account: AccountRef,
        friendly_display: Option<String>,
    ) -> Self {
        Self {
            external_identifier,
            account,
            friendly_display,
        }
    }

    /// Returns `true` if the association binds to `account`.
    #[must_use]
    pub fn is_bound_to(&self, account: &AccountRef) -> bool {
        &self.account == account
    }
}

/// Storage for associations.
///
/// Implementations must make [`AssociationStore::insert`] atomic with respect
/// to the uniqueness check: of two concurrent inserts for the same identifier
/// exactly one succeeds.
pub trait AssociationStore: Send + Sync {
    /// Looks up the association for `identifier`.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage cannot be read.
    fn find_by_identifier(
        &self,
        identifier: &ExternalIdentifier,
    ) -> StoreResult<Option<Association>>;

    /// Lists the associations bound to `account`, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage cannot be read.
    fn list_by_account(&self, account: &AccountRef) -> StoreResult<Vec<Association>>;

    /// Lists every association, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage cannot be read.
    fn list_all(&self) -> StoreResult<Vec<Association>>;

    /// Inserts a new association.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuplicateIdentifier`] if the identifier is already
    /// bound, or a storage error.
    fn insert(&self, association: Association) -> StoreResult<()>;

    /// Removes the association for `identifier` and returns it.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if there is none, or a storage error.
    fn remove(&self, identifier: &ExternalIdentifier) -> StoreResult<Association>;

    /// Removes every listed identifier that is present and returns how many were removed.
    ///
    /// Missing identifiers are skipped. There is no atomicity across entries.
    ///
    /// # Errors
    ///
    /// Returns a storage error; removals performed before it stay removed.
    fn remove_many(&self, identifiers: &[ExternalIdentifier]) -> StoreResult<usize>;

    /// Returns `true` if `identifier` is bound to any account.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage cannot be read.
    fn contains(&self, identifier: &ExternalIdentifier) -> StoreResult<bool> {
        Ok(self.find_by_identifier(identifier)?.is_some())
    }
}
