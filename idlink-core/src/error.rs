use thiserror::Error;

use crate::store::StoreError;

/// Errors that escape the service boundary.
///
/// Expected outcomes (invalid identifiers, provider failures, duplicate
/// bindings, missing entries, missing permissions) are reported as result
/// values instead. Only conditions with no safe local recovery end up here.
#[derive(Debug, Error)]
#[cfg_attr(feature = "ffi", derive(uniffi::Error))]
#[cfg_attr(feature = "ffi", uniffi(flat_error))]
pub enum AssociationError {
    /// The association store could not be read or written.
    #[error("association store failure: {0}")]
    Store(#[from] StoreError),
    /// Settings could not be parsed or are unusable.
    #[error("invalid settings: {0}")]
    InvalidSettings(String),
}
