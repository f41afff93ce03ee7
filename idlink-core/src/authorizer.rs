//! Decides what a handshake outcome means for the current account.

use std::sync::Arc;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::gateway::{HandshakeOutcome, HandshakeStatus};
use crate::identifier::{AccountRef, ExternalIdentifier, IdentifierValidator};
use crate::store::{Association, AssociationStore, StoreError, StoreResult};

const UNKNOWN_PROVIDER_FAILURE: &str = "unknown provider failure";

/// Inserts retried when the conflicting row disappears before it can be read.
const MAX_INSERT_ATTEMPTS: usize = 3;

/// Why an outcome was not accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RejectionReason {
    /// The user canceled at the provider.
    Canceled,
    /// The provider reported a failure.
    Failed {
        /// Provider error detail.
        message: String,
    },
    /// The claimed identifier is missing or malformed.
    InvalidIdentifier,
    /// A new identifier arrived with no logged in account to bind it to.
    NoAccountContext,
}

/// The closed set of outcomes of [`Authorizer::authorize`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum AuthorizationDecision {
    /// The outcome was accepted; the association names the authenticated account.
    Authenticated {
        /// The (new or existing) association.
        association: Association,
        /// `true` if this call created the association.
        created: bool,
    },
    /// The identifier is bound to a different account. Nothing was changed.
    AlreadyAssociated {
        /// The contested identifier.
        identifier: ExternalIdentifier,
    },
    /// The outcome was not accepted. Nothing was changed.
    Rejected(RejectionReason),
}

/// Applies the binding policy to handshake outcomes.
///
/// An identifier binds to at most one account. A new identifier binds to the
/// logged in account; an identifier already bound elsewhere is refused; an
/// identifier bound to the logged in account (or used without a logged in
/// account) authenticates that account.
#[derive(Clone)]
pub struct Authorizer {
    store: Arc<dyn AssociationStore>,
    validator: IdentifierValidator,
}

impl std::fmt::Debug for Authorizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authorizer")
            .field("validator", &self.validator)
            .finish_non_exhaustive()
    }
}

impl Authorizer {
    /// Creates an authorizer over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn AssociationStore>, validator: IdentifierValidator) -> Self {
        Self { store, validator }
    }

    /// Decides the fate of `outcome` for `current_account`.
    ///
    /// # Errors
    ///
    /// Only storage failures are returned as errors; every other result is a
    /// decision.
    pub fn authorize(
        &self,
        outcome: &HandshakeOutcome,
        current_account: Option<&AccountRef>,
    ) -> StoreResult<AuthorizationDecision> {
        match outcome.status {
            HandshakeStatus::Authenticated => {}
            HandshakeStatus::Canceled => {
                return Ok(AuthorizationDecision::Rejected(RejectionReason::Canceled));
            }
            HandshakeStatus::Failed => {
                let message = outcome
                    .error_message
                    .clone()
                    .filter(|message| !message.trim().is_empty())
                    .unwrap_or_else(|| UNKNOWN_PROVIDER_FAILURE.to_string());
                return Ok(AuthorizationDecision::Rejected(RejectionReason::Failed {
                    message,
                }));
            }
        }

        let Some(identifier) = outcome
            .claimed_identifier
            .as_deref()
            .and_then(|raw| self.validator.validate(raw).ok())
        else {
            warn!("provider asserted an invalid claimed identifier");
            return Ok(AuthorizationDecision::Rejected(
                RejectionReason::InvalidIdentifier,
            ));
        };

        if let Some(existing) = self.store.find_by_identifier(&identifier)? {
            return Ok(Self::decide_existing(existing, current_account));
        }

        let Some(account) = current_account else {
            debug!("no account to bind {identifier} to");
            return Ok(AuthorizationDecision::Rejected(
                RejectionReason::NoAccountContext,
            ));
        };

        let association = Association::new(
            identifier.clone(),
            account.clone(),
            outcome.friendly_display.clone(),
        );
        for _ in 0..MAX_INSERT_ATTEMPTS {
            match self.store.insert(association.clone()) {
                Ok(()) => {
                    info!("associated {identifier} with account {account}");
                    return Ok(AuthorizationDecision::Authenticated {
                        association,
                        created: true,
                    });
                }
                Err(StoreError::DuplicateIdentifier(_)) => {
                    // Lost a race against a concurrent insert; judge the winner's row.
                    if let Some(existing) = self.store.find_by_identifier(&identifier)? {
                        return Ok(Self::decide_existing(existing, Some(account)));
                    }
                    debug!("winning row for {identifier} vanished, retrying insert");
                }
                Err(err) => return Err(err),
            }
        }

        warn!("{identifier} stayed contested after {MAX_INSERT_ATTEMPTS} insert attempts");
        Ok(AuthorizationDecision::AlreadyAssociated { identifier })
    }

    fn decide_existing(
        existing: Association,
        current_account: Option<&AccountRef>,
    ) -> AuthorizationDecision {
        match current_account {
            Some(account) if !existing.is_bound_to(account) => {
                warn!(
                    "refusing to bind {} to {account}: already bound to another account",
                    existing.external_identifier
                );
                AuthorizationDecision::AlreadyAssociated {
                    identifier: existing.external_identifier,
                }
            }
            _ => AuthorizationDecision::Authenticated {
                association: existing,
                created: false,
            },
        }
    }
}
