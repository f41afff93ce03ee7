//! Message keys returned to the host for localization.
//!
//! The core never renders user-facing text. Results carry a [`MessageKey`] and
//! positional arguments, and the host maps them to localized strings.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

/// Identifies a user-facing message.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    IntoStaticStr,
    Serialize,
    Deserialize,
)]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
pub enum MessageKey {
    /// The identifier was bound to the logged in account.
    #[strum(serialize = "openid.associated")]
    #[serde(rename = "openid.associated")]
    Associated,
    /// The identifier was already bound to the logged in account.
    #[strum(serialize = "openid.association_confirmed")]
    #[serde(rename = "openid.association_confirmed")]
    AssociationConfirmed,
    /// The user logged in through an existing association.
    #[strum(serialize = "openid.logged_in")]
    #[serde(rename = "openid.logged_in")]
    LoggedIn,
    /// The claimed identifier is bound to another account.
    #[strum(serialize = "openid.already_assigned")]
    #[serde(rename = "openid.already_assigned")]
    AlreadyAssigned,
    /// The user canceled at the provider.
    #[strum(serialize = "openid.canceled_at_provider")]
    #[serde(rename = "openid.canceled_at_provider")]
    CanceledAtProvider,
    /// The provider reported a failure. Args: `[provider message]`.
    #[strum(serialize = "openid.provider_failed")]
    #[serde(rename = "openid.provider_failed")]
    ProviderFailed,
    /// The identifier is not a valid OpenID identifier.
    #[strum(serialize = "openid.invalid_identifier")]
    #[serde(rename = "openid.invalid_identifier")]
    InvalidIdentifier,
    /// There is no logged in account to bind a new identifier to.
    #[strum(serialize = "openid.no_account_context")]
    #[serde(rename = "openid.no_account_context")]
    NoAccountContext,
    /// The handshake could not be started. Args: `[protocol message]`.
    #[strum(serialize = "openid.unable_to_authenticate")]
    #[serde(rename = "openid.unable_to_authenticate")]
    UnableToAuthenticate,
    /// The association was deleted.
    #[strum(serialize = "openid.deleted")]
    #[serde(rename = "openid.deleted")]
    Deleted,
    /// The association did not exist (anymore).
    #[strum(serialize = "openid.already_deleted")]
    #[serde(rename = "openid.already_deleted")]
    AlreadyDeleted,
    /// Bulk deletion finished. Args: `[removed count]`.
    #[strum(serialize = "openid.bulk_deleted")]
    #[serde(rename = "openid.bulk_deleted")]
    BulkDeleted,
    /// The requester may not manage associations.
    #[strum(serialize = "openid.not_authorized")]
    #[serde(rename = "openid.not_authorized")]
    NotAuthorized,
}

impl MessageKey {
    /// Returns the key string used in localization catalogs.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

/// A message key with its positional arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct UserMessage {
    /// Which message to show.
    pub key: MessageKey,
    /// Values for the message's positional placeholders.
    pub args: Vec<String>,
}

impl UserMessage {
    /// A message without arguments.
    #[must_use]
    pub const fn new(key: MessageKey) -> Self {
        Self {
            key,
            args: Vec::new(),
        }
    }

    /// A message with positional arguments.
    #[must_use]
    pub const fn with_args(key: MessageKey, args: Vec<String>) -> Self {
        Self { key, args }
    }
}

impl From<MessageKey> for UserMessage {
    fn from(key: MessageKey) -> Self {
        Self::new(key)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_key_strings_match_across_strum_and_serde() {
        for key in [
            MessageKey::Associated,
            MessageKey::ProviderFailed,
            MessageKey::NotAuthorized,
        ] {
            let json = serde_json::to_string(&key).unwrap();
            assert_eq!(json, format!("\"{}\"", key.as_str()));
            assert_eq!(MessageKey::from_str(key.as_str()).unwrap(), key);
        }
        assert_eq!(MessageKey::CanceledAtProvider.to_string(), "openid.canceled_at_provider");
    }
}
