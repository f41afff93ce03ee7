//! The relying-party gateway: the only component that talks to identity providers.
//!
//! The gateway wraps the host's protocol library (discovery, request signing,
//! nonce and replay protection). The core only starts handshakes through it and
//! reads back the structured outcome of the provider's response.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;

use crate::claims::ExtensionRequest;
use crate::identifier::ExternalIdentifier;

/// Status reported by the provider for a handshake.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum HandshakeStatus {
    /// The provider asserted the claimed identifier.
    Authenticated,
    /// The user canceled at the provider.
    Canceled,
    /// The handshake failed; see the outcome's error message.
    Failed,
}

/// Outcome of one provider round trip. Transient, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct HandshakeOutcome {
    /// What the provider reported.
    pub status: HandshakeStatus,
    /// Identifier the provider vouched for, as received.
    #[serde(default)]
    pub claimed_identifier: Option<String>,
    /// Display form of the identifier suggested by the provider.
    #[serde(default)]
    pub friendly_display: Option<String>,
    /// Error detail for failed handshakes.
    #[serde(default)]
    pub error_message: Option<String>,
}

impl HandshakeOutcome {
    /// An authenticated outcome for `claimed_identifier`.
    #[must_use]
    pub fn authenticated(
        claimed_identifier: impl Into<String>,
        friendly_display: Option<String>,
    ) -> Self {
        Self {
            status: HandshakeStatus::Authenticated,
            claimed_identifier: Some(claimed_identifier.into()),
            friendly_display,
            error_message: None,
        }
    }

    /// A canceled outcome.
    #[must_use]
    pub const fn canceled() -> Self {
        Self {
            status: HandshakeStatus::Canceled,
            claimed_identifier: None,
            friendly_display: None,
            error_message: None,
        }
    }

    /// A failed outcome carrying the provider's error detail.
    #[must_use]
    pub fn failed(error_message: impl Into<String>) -> Self {
        Self {
            status: HandshakeStatus::Failed,
            claimed_identifier: None,
            friendly_display: None,
            error_message: Some(error_message.into()),
        }
    }
}

/// Location the user agent must be sent to in order to continue at the provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RedirectTarget(String);

#[cfg(feature = "ffi")]
uniffi::custom_newtype!(RedirectTarget, String);

impl RedirectTarget {
    /// Wraps a provider location.
    #[must_use]
    pub fn new(location: impl Into<String>) -> Self {
        Self(location.into())
    }

    /// Returns the location.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RedirectTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Everything the gateway needs to start a handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct HandshakeRequest {
    /// Validated identifier to authenticate.
    pub identifier: ExternalIdentifier,
    /// Attribute requests to attach to the authentication request.
    pub extensions: Vec<ExtensionRequest>,
    /// Caller context to carry through the round trip (usually a return URL).
    pub return_context: Option<String>,
}

/// The provider round trip failed at the transport or protocol layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[cfg_attr(feature = "ffi", derive(uniffi::Error))]
pub enum ProtocolError {
    /// Discovery or negotiation with the provider failed.
    #[error("{message}")]
    Negotiation {
        /// Detail reported by the protocol library.
        message: String,
    },
    /// The provider could not be reached.
    #[error("provider unreachable: {message}")]
    Unreachable {
        /// Detail reported by the transport.
        message: String,
    },
    /// Unexpected `UniFFI` callback error.
    #[error("unexpected uniffi callback error: {message}")]
    UnexpectedCallback {
        /// Reason reported by `UniFFI`.
        message: String,
    },
}

#[cfg(feature = "ffi")]
impl From<uniffi::UnexpectedUniFFICallbackError> for ProtocolError {
    fn from(error: uniffi::UnexpectedUniFFICallbackError) -> Self {
        Self::UnexpectedCallback {
            message: error.reason,
        }
    }
}

/// Host-provided access to the identity protocol for the current request.
#[async_trait]
pub trait RelyingPartyGateway: Send + Sync {
    /// Returns `true` if the current request carries a provider response.
    fn has_pending_response(&self) -> bool;

    /// Starts a handshake and returns where to send the user agent.
    ///
    /// # Errors
    ///
    /// Returns a [`ProtocolError`] if the provider is unreachable or rejects
    /// the negotiation.
    async fn begin_handshake(
        &self,
        request: HandshakeRequest,
    ) -> Result<RedirectTarget, ProtocolError>;

    /// Returns the outcome of the pending response, or `None` when there is none.
    fn current_outcome(&self) -> Option<HandshakeOutcome>;
}
