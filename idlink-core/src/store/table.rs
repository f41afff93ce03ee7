//! Indexed association table shared by the store implementations.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::error::{StoreError, StoreResult};
use super::Association;
use crate::identifier::{AccountRef, ExternalIdentifier};

/// Rows keyed by insertion sequence, with a unique index on the identifier and
/// a secondary index on the account.
#[derive(Debug, Default, Clone)]
pub(crate) struct AssociationTable {
    next_seq: u64,
    rows: BTreeMap<u64, Association>,
    by_identifier: HashMap<ExternalIdentifier, u64>,
    by_account: HashMap<AccountRef, BTreeSet<u64>>,
}

impl AssociationTable {
    /// Rebuilds a table (and its indexes) from rows in insertion order.
    pub(crate) fn from_rows(rows: Vec<Association>) -> StoreResult<Self> {
        let mut table = Self::default();
        for row in rows {
            table.insert(row).map_err(|err| match err {
                StoreError::DuplicateIdentifier(identifier) => StoreError::Corrupted(
                    format!("identifier {identifier} appears more than once"),
                ),
                other => other,
            })?;
        }
        Ok(table)
    }

    /// Rows in insertion order.
    pub(crate) fn rows(&self) -> impl Iterator<Item = &Association> {
        self.rows.values()
    }

    pub(crate) fn len(&self) -> usize {
        self.rows.len()
    }

    pub(crate) fn find(&self, identifier: &ExternalIdentifier) -> Option<&Association> {
        self.by_identifier
            .get(identifier)
            .and_then(|seq| self.rows.get(seq))
    }

    pub(crate) fn list_by_account(&self, account: &AccountRef) -> Vec<Association> {
        self.by_account
            .get(account)
            .map(|seqs| {
                seqs.iter()
                    .filter_map(|seq| self.rows.get(seq))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub(crate) fn insert(&mut self, association: Association) -> StoreResult<()> {
        if self
            .by_identifier
            .contains_key(&association.external_identifier)
        {
            return Err(StoreError::DuplicateIdentifier(
                association.external_identifier,
            ));
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        self.by_identifier
            .insert(association.external_identifier.clone(), seq);
        self.by_account
            .entry(association.account.clone())
            .or_default()
            .insert(seq);
        self.rows.insert(seq, association);
        Ok(())
    }

    pub(crate) fn remove(
        &mut self,
        identifier: &ExternalIdentifier,
    ) -> StoreResult<Association> {
        let seq = self
            .by_identifier
            .remove(identifier)
            .ok_or_else(|| StoreError::NotFound(identifier.clone()))?;
        let association = self.rows.remove(&seq).ok_or_else(|| {
            StoreError::Corrupted(format!("index points at missing row for {identifier}"))
        })?;

        if let Some(seqs) = self.by_account.get_mut(&association.account) {
            seqs.remove(&seq);
            if seqs.is_empty() {
                self.by_account.remove(&association.account);
            }
        }
        Ok(association)
    }

    /// Removes every present identifier, skipping missing ones.
    pub(crate) fn remove_many(
        &mut self,
        identifiers: &[ExternalIdentifier],
    ) -> StoreResult<usize> {
        let mut removed = 0;
        for identifier in identifiers {
            match self.remove(identifier) {
                Ok(_) => removed += 1,
                Err(StoreError::NotFound(_)) => {}
                Err(err) => return Err(err),
            }
        }
        Ok(removed)
    }
}
