//! Association store persisted through an [`AtomicBlobStore`].

use std::sync::{Arc, Mutex};

use log::debug;

use super::envelope::TableEnvelope;
use super::error::{StoreError, StoreResult};
use super::fs::FsBlobStore;
use super::lock::StorageLock;
use super::paths::StoragePaths;
use super::table::AssociationTable;
use super::traits::AtomicBlobStore;
use super::{Association, AssociationStore, ASSOCIATIONS_BLOB};
use crate::identifier::{AccountRef, ExternalIdentifier};

/// Association store persisting the whole table as a single CBOR blob.
///
/// Mutations reload the table, apply the change and rewrite the blob while
/// holding both an in-process mutex and the cross-process [`StorageLock`], so
/// insert's uniqueness check holds across threads and processes. Reads go
/// straight to the blob, which the atomic rename keeps consistent.
pub struct BlobAssociationStore {
    blobs: Arc<dyn AtomicBlobStore>,
    lock: StorageLock,
    writer: Mutex<()>,
}

impl std::fmt::Debug for BlobAssociationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobAssociationStore").finish()
    }
}

impl BlobAssociationStore {
    /// Opens the file-backed store under `paths`, creating directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or the lock file cannot be created.
    pub fn open(paths: &StoragePaths) -> StoreResult<Self> {
        let blobs = FsBlobStore::new(paths.idlink_dir())?;
        let lock = StorageLock::open(&paths.lock_path())?;
        Ok(Self::new(Arc::new(blobs), lock))
    }

    /// Creates a store from explicit components.
    #[must_use]
    pub fn new(blobs: Arc<dyn AtomicBlobStore>, lock: StorageLock) -> Self {
        Self {
            blobs,
            lock,
            writer: Mutex::new(()),
        }
    }

    fn load(&self) -> StoreResult<AssociationTable> {
        match self.blobs.read(ASSOCIATIONS_BLOB)? {
            Some(bytes) => TableEnvelope::deserialize(&bytes)?.into_table(),
            None => Ok(AssociationTable::default()),
        }
    }

    fn save(&self, table: &AssociationTable) -> StoreResult<()> {
        let bytes = TableEnvelope::from_table(table).serialize()?;
        self.blobs.write_atomic(ASSOCIATIONS_BLOB, &bytes)?;
        debug!("association table written, {} rows", table.len());
        Ok(())
    }

    /// Runs `mutation` against the freshly loaded table and persists it if the
    /// mutation reports a change.
    fn update<T>(
        &self,
        mutation: impl FnOnce(&mut AssociationTable) -> StoreResult<(T, bool)>,
    ) -> StoreResult<T> {
        let _writer = self
            .writer
            .lock()
            .map_err(|_| StoreError::Lock("mutex poisoned".to_string()))?;
        let _guard = self.lock.lock()?;

        let mut table = self.load()?;
        let (value, changed) = mutation(&mut table)?;
        if changed {
            self.save(&table)?;
        }
        Ok(value)
    }
}

impl AssociationStore for BlobAssociationStore {
    fn find_by_identifier(
        &self,
        identifier: &ExternalIdentifier,
    ) -> StoreResult<Option<Association>> {
        Ok(self.load()?.find(identifier).cloned())
    }

    fn list_by_account(&self, account: &AccountRef) -> StoreResult<Vec<Association>> {
        Ok(self.load()?.list_by_account(account))
    }

    fn list_all(&self) -> StoreResult<Vec<Association>> {
        Ok(self.load()?.rows().cloned().collect())
    }

    fn insert(&self, association: Association) -> StoreResult<()> {
        self.update(|table| table.insert(association).map(|()| ((), true)))
    }

    fn remove(&self, identifier: &ExternalIdentifier) -> StoreResult<Association> {
        self.update(|table| table.remove(identifier).map(|removed| (removed, true)))
    }

    fn remove_many(&self, identifiers: &[ExternalIdentifier]) -> StoreResult<usize> {
        self.update(|table| {
            let removed = table.remove_many(identifiers)?;
            Ok((removed, removed > 0))
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Barrier;

    use super::*;
    use crate::identifier::IdentifierValidator;

    fn id(raw: &str) -> ExternalIdentifier {
        IdentifierValidator::default().validate(raw).unwrap()
    }

    #[test]
    fn test_table_survives_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let paths = StoragePaths::new(dir.path());

        {
            let store = BlobAssociationStore::open(&paths).unwrap();
            store
                .insert(Association::new(
                    id("https://example.com/alice"),
                    AccountRef::new("alice"),
                    Some("example.com/alice".to_string()),
                ))
                .unwrap();
            store
                .insert(Association::new(id("=bob"), AccountRef::new("bob"), None))
                .unwrap();
        }
        assert!(paths.associations_path().exists());

        let reopened = BlobAssociationStore::open(&paths).unwrap();
        let alice = reopened
            .find_by_identifier(&id("HTTPS://EXAMPLE.COM/alice"))
            .unwrap()
            .expect("persisted association");
        assert_eq!(alice.account, AccountRef::new("alice"));
        assert_eq!(alice.friendly_display.as_deref(), Some("example.com/alice"));
        assert_eq!(reopened.list_all().unwrap().len(), 2);
    }

    #[test]
    fn test_duplicate_is_rejected_across_handles() {
        let dir = tempfile::tempdir().expect("tempdir");
        let paths = StoragePaths::new(dir.path());
        let first = BlobAssociationStore::open(&paths).unwrap();
        let second = BlobAssociationStore::open(&paths).unwrap();

        first
            .insert(Association::new(id("=alice"), AccountRef::new("a"), None))
            .unwrap();
        let err = second
            .insert(Association::new(id("=alice"), AccountRef::new("b"), None))
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateIdentifier(_)));
    }

    #[test]
    fn test_remove_many_skips_missing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = BlobAssociationStore::open(&StoragePaths::new(dir.path())).unwrap();
        store
            .insert(Association::new(id("https://id1.example/"), AccountRef::new("a"), None))
            .unwrap();

        let removed = store
            .remove_many(&[id("https://id1.example/"), id("https://id2.example/")])
            .unwrap();
        assert_eq!(removed, 1);
        assert!(matches!(
            store.remove(&id("https://id1.example/")),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_concurrent_inserts_have_one_winner() {
        let dir = tempfile::tempdir().expect("tempdir");
        let paths = StoragePaths::new(dir.path());
        let barrier = Arc::new(Barrier::new(4));

        let handles: Vec<_> = (0..4)
            .map(|i| {
                // A separate handle per thread, as separate processes would have.
                let store = BlobAssociationStore::open(&paths).unwrap();
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    store
                        .insert(Association::new(
                            id("https://example.com/contested"),
                            AccountRef::new(format!("account-{i}")),
                            None,
                        ))
                        .is_ok()
                })
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|handle| handle.join().expect("thread join"))
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
    }

    #[test]
    fn test_unsupported_version_is_fatal() {
        let dir = tempfile::tempdir().expect("tempdir");
        let paths = StoragePaths::new(dir.path());
        let blobs = FsBlobStore::new(paths.idlink_dir()).unwrap();
        let mut envelope = TableEnvelope::from_table(&AssociationTable::default());
        envelope.version = 99;
        blobs
            .write_atomic(ASSOCIATIONS_BLOB, &envelope.serialize().unwrap())
            .unwrap();

        let store = BlobAssociationStore::open(&paths).unwrap();
        let err = store.list_all().unwrap_err();
        assert!(matches!(err, StoreError::UnsupportedVersion(99)));
        assert!(err.is_fatal());
    }
}
