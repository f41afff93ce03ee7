//! In-process association store.

use std::sync::{Mutex, MutexGuard};

use super::error::{StoreError, StoreResult};
use super::table::AssociationTable;
use super::{Association, AssociationStore};
use crate::identifier::{AccountRef, ExternalIdentifier};

/// Association store kept in memory behind a mutex.
///
/// Every operation runs in a single critical section, so an insert's
/// uniqueness check and the write cannot interleave with another insert.
#[derive(Debug, Default)]
pub struct MemoryAssociationStore {
    table: Mutex<AssociationTable>,
}

impl MemoryAssociationStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with `associations`, in order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Corrupted`] if an identifier appears twice.
    pub fn with_associations(associations: Vec<Association>) -> StoreResult<Self> {
        Ok(Self {
            table: Mutex::new(AssociationTable::from_rows(associations)?),
        })
    }

    fn table(&self) -> StoreResult<MutexGuard<'_, AssociationTable>> {
        self.table
            .lock()
            .map_err(|_| StoreError::Unavailable("mutex poisoned".to_string()))
    }
}

impl AssociationStore for MemoryAssociationStore {
    fn find_by_identifier(
        &self,
        identifier: &ExternalIdentifier,
    ) -> StoreResult<Option<Association>> {
        Ok(self.table()?.find(identifier).cloned())
    }

    fn list_by_account(&self, account: &AccountRef) -> StoreResult<Vec<Association>> {
        Ok(self.table()?.list_by_account(account))
    }

    fn list_all(&self) -> StoreResult<Vec<Association>> {
        Ok(self.table()?.rows().cloned().collect())
    }

    fn insert(&self, association: Association) -> StoreResult<()> {
        self.table()?.insert(association)
    }

    fn remove(&self, identifier: &ExternalIdentifier) -> StoreResult<Association> {
        self.table()?.remove(identifier)
    }

    fn remove_many(&self, identifiers: &[ExternalIdentifier]) -> StoreResult<usize> {
        self.table()?.remove_many(identifiers)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Barrier};

    use super::*;
    use crate::identifier::IdentifierValidator;

    fn id(raw: &str) -> ExternalIdentifier {
        IdentifierValidator::default().validate(raw).unwrap()
    }

    #[test]
    fn test_insert_find_remove() {
        let store = MemoryAssociationStore::new();
        let alice = AccountRef::new("alice");
        let association =
            Association::new(id("https://example.com/alice"), alice.clone(), None);

        store.insert(association.clone()).unwrap();
        assert_eq!(
            store.find_by_identifier(&association.external_identifier).unwrap(),
            Some(association.clone())
        );
        assert_eq!(store.list_by_account(&alice).unwrap(), vec![association.clone()]);

        let removed = store.remove(&association.external_identifier).unwrap();
        assert_eq!(removed, association);
        assert!(!store.contains(&association.external_identifier).unwrap());
    }

    #[test]
    fn test_duplicate_insert_fails() {
        let store = MemoryAssociationStore::new();
        let identifier = id("https://example.com/alice");
        store
            .insert(Association::new(identifier.clone(), AccountRef::new("a"), None))
            .unwrap();

        let err = store
            .insert(Association::new(identifier.clone(), AccountRef::new("b"), None))
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateIdentifier(ref dup) if *dup == identifier));
        assert!(!err.is_fatal());
        assert_eq!(
            store.find_by_identifier(&identifier).unwrap().unwrap().account,
            AccountRef::new("a")
        );
    }

    #[test]
    fn test_remove_missing_is_not_found() {
        let store = MemoryAssociationStore::new();
        let err = store.remove(&id("https://example.com/ghost")).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn test_remove_many_skips_missing() {
        let store = MemoryAssociationStore::new();
        store
            .insert(Association::new(id("https://id1.example/"), AccountRef::new("a"), None))
            .unwrap();

        let removed = store
            .remove_many(&[id("https://id1.example/"), id("https://id2.example/")])
            .unwrap();
        assert_eq!(removed, 1);
        assert!(store.list_all().unwrap().is_empty());
    }

    #[test]
    fn test_concurrent_inserts_have_one_winner() {
        let store = Arc::new(MemoryAssociationStore::new());
        let identifier = id("https://example.com/contested");
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                let barrier = Arc::clone(&barrier);
                let identifier = identifier.clone();
                std::thread::spawn(move || {
                    barrier.wait();
                    store
                        .insert(Association::new(
                            identifier,
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
        assert_eq!(store.list_all().unwrap().len(), 1);
    }
}
