//! Versioned on-disk encoding of the association table.

use serde::{Deserialize, Serialize};

use super::error::{StoreError, StoreResult};
use super::table::AssociationTable;
use super::Association;

const TABLE_VERSION: u32 = 1;

/// CBOR envelope around the table rows, stored in insertion order.
///
/// Only rows are persisted; both indexes are rebuilt on load.
#[derive(Clone, Serialize, Deserialize)]
pub(crate) struct TableEnvelope {
    pub(crate) version: u32,
    pub(crate) associations: Vec<Association>,
}

impl TableEnvelope {
    pub(crate) fn from_table(table: &AssociationTable) -> Self {
        Self {
            version: TABLE_VERSION,
            associations: table.rows().cloned().collect(),
        }
    }

    pub(crate) fn into_table(self) -> StoreResult<AssociationTable> {
        AssociationTable::from_rows(self.associations)
    }

    pub(crate) fn serialize(&self) -> StoreResult<Vec<u8>> {
        let mut bytes = Vec::new();
        ciborium::ser::into_writer(self, &mut bytes)
            .map_err(|err| StoreError::Serialization(err.to_string()))?;
        Ok(bytes)
    }

    pub(crate) fn deserialize(bytes: &[u8]) -> StoreResult<Self> {
        let envelope: Self = ciborium::de::from_reader(bytes)
            .map_err(|err| StoreError::Serialization(err.to_string()))?;
        if envelope.version != TABLE_VERSION {
            return Err(StoreError::UnsupportedVersion(envelope.version));
        }
        Ok(envelope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifier::{AccountRef, IdentifierValidator};

    #[test]
    fn test_envelope_preserves_order_and_indexes() {
        let validator = IdentifierValidator::default();
        let mut table = AssociationTable::default();
        for (raw, account) in [
            ("https://z.example/", "alice"),
            ("=bob", "bob"),
            ("https://a.example/", "alice"),
        ] {
            table
                .insert(Association::new(
                    validator.validate(raw).unwrap(),
                    AccountRef::new(account),
                    Some(raw.to_string()),
                ))
                .unwrap();
        }

        let bytes = TableEnvelope::from_table(&table).serialize().unwrap();
        let decoded = TableEnvelope::deserialize(&bytes)
            .unwrap()
            .into_table()
            .unwrap();

        let original: Vec<_> = table.rows().cloned().collect();
        let restored: Vec<_> = decoded.rows().cloned().collect();
        assert_eq!(original, restored);
        assert_eq!(decoded.list_by_account(&AccountRef::new("alice")).len(), 2);
    }

    #[test]
    fn test_envelope_version_mismatch() {
        let mut envelope = TableEnvelope::from_table(&AssociationTable::default());
        envelope.version = TABLE_VERSION + 1;
        let bytes = envelope.serialize().expect("serialize");
        match TableEnvelope::deserialize(&bytes) {
            Err(StoreError::UnsupportedVersion(version)) => {
                assert_eq!(version, TABLE_VERSION + 1);
            }
            Err(err) => panic!("unexpected error: {err}"),
            Ok(_) => panic!("expected error"),
        }
    }

    #[test]
    fn test_garbage_is_a_serialization_error() {
        assert!(matches!(
            TableEnvelope::deserialize(b"\xff\x00garbage"),
            Err(StoreError::Serialization(_))
        ));
    }
}
