//! The association service: what the host's request handlers call.
//!
//! A handshake spans two independent calls. [`AssociationService::begin_association`]
//! validates the identifier and hands it to the gateway, which answers with a
//! redirect to the provider. When the provider sends the user back, the host
//! calls [`AssociationService::complete_association`], which reads the outcome
//! from the gateway and runs it through the [`Authorizer`]. Nothing is kept in
//! process between the two calls.
//!
//! Expected outcomes are returned as values carrying message keys; only store
//! failures surface as [`AssociationError`].

use std::sync::Arc;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::authorizer::{AuthorizationDecision, Authorizer, RejectionReason};
use crate::config::AssociationSettings;
use crate::error::AssociationError;
use crate::gateway::{HandshakeRequest, RedirectTarget, RelyingPartyGateway};
use crate::identifier::{AccountRef, ExternalIdentifier, IdentifierValidator};
use crate::messages::{MessageKey, UserMessage};
use crate::redirect::resolve_return_location;
use crate::store::{Association, AssociationStore, StoreError};

/// Progress of one association attempt.
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
pub enum HandshakeState {
    /// Nothing in flight.
    Idle,
    /// The user agent was sent to the provider.
    HandshakeStarted,
    /// The provider's response is being interpreted.
    OutcomeReceived,
    /// The outcome was accepted.
    Completed,
    /// The attempt ended without an accepted outcome.
    Rejected,
}

impl HandshakeState {
    /// Returns `true` for states that end an attempt.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Rejected)
    }

    /// Settles an interpreted outcome. Only `OutcomeReceived` moves; every
    /// other state is returned unchanged.
    #[must_use]
    pub const fn settle(self, accepted: bool) -> Self {
        match self {
            Self::OutcomeReceived if accepted => Self::Completed,
            Self::OutcomeReceived => Self::Rejected,
            other => other,
        }
    }
}

/// Result of [`AssociationService::begin_association`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum BeginOutcome {
    /// Send the user agent to `target`.
    Redirect {
        /// Provider location.
        target: RedirectTarget,
    },
    /// The handshake was not started.
    Rejected {
        /// Why, for the user.
        message: UserMessage,
    },
}

impl BeginOutcome {
    /// The attempt's state after this call.
    #[must_use]
    pub const fn state(&self) -> HandshakeState {
        match self {
            Self::Redirect { .. } => HandshakeState::HandshakeStarted,
            Self::Rejected { .. } => HandshakeState::Rejected,
        }
    }
}

/// Result of [`AssociationService::complete_association`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct AssociationResult {
    /// `Idle` when the request carried no provider response, otherwise terminal.
    pub state: HandshakeState,
    /// The authorizer's decision, if an outcome was interpreted.
    pub decision: Option<AuthorizationDecision>,
    /// Message to show, if any.
    pub message: Option<UserMessage>,
    /// Local location to redirect to; set only for accepted outcomes.
    pub redirect: Option<String>,
}

impl AssociationResult {
    const fn idle() -> Self {
        Self {
            state: HandshakeState::Idle,
            decision: None,
            message: None,
            redirect: None,
        }
    }

    /// The account to treat as logged in, for accepted outcomes.
    #[must_use]
    pub fn authenticated_account(&self) -> Option<&AccountRef> {
        match &self.decision {
            Some(AuthorizationDecision::Authenticated { association, .. }) => {
                Some(&association.account)
            }
            _ => None,
        }
    }
}

/// Result of [`AssociationService::remove_association`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RemovalOutcome {
    /// The association was removed.
    Removed {
        /// The removed record.
        association: Association,
    },
    /// There was nothing to remove.
    AlreadyGone {
        /// The identifier as given.
        identifier: String,
    },
    /// The requester may not manage associations. Nothing was changed.
    AccessDenied,
}

impl RemovalOutcome {
    /// Message to show for this outcome.
    #[must_use]
    pub const fn message(&self) -> UserMessage {
        match self {
            Self::Removed { .. } => UserMessage::new(MessageKey::Deleted),
            Self::AlreadyGone { .. } => UserMessage::new(MessageKey::AlreadyDeleted),
            Self::AccessDenied => UserMessage::new(MessageKey::NotAuthorized),
        }
    }
}

/// Result of [`AssociationService::bulk_remove`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum BulkRemovalOutcome {
    /// `count` associations were removed; missing ones were skipped.
    Removed {
        /// Number of removed associations.
        count: u64,
    },
    /// The requester may not manage associations. Nothing was changed.
    AccessDenied,
}

impl BulkRemovalOutcome {
    /// Message to show for this outcome.
    #[must_use]
    pub fn message(&self) -> UserMessage {
        match self {
            Self::Removed { count } => {
                UserMessage::with_args(MessageKey::BulkDeleted, vec![count.to_string()])
            }
            Self::AccessDenied => UserMessage::new(MessageKey::NotAuthorized),
        }
    }
}

/// Bulk actions offered on the association index.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
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
pub enum BulkAction {
    /// Do nothing.
    #[default]
    None,
    /// Delete the checked associations.
    Delete,
}

/// Orchestrates validation, the provider handshake, authorization and storage.
///
/// The store is shared; the gateway belongs to the request being served, so
/// hosts typically keep one service and derive per-request instances with
/// [`AssociationService::with_gateway`].
#[derive(Clone)]
pub struct AssociationService {
    store: Arc<dyn AssociationStore>,
    gateway: Arc<dyn RelyingPartyGateway>,
    settings: AssociationSettings,
    authorizer: Authorizer,
}

impl std::fmt::Debug for AssociationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssociationService")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl AssociationService {
    /// Creates a service.
    #[must_use]
    pub fn new(
        store: Arc<dyn AssociationStore>,
        gateway: Arc<dyn RelyingPartyGateway>,
        settings: AssociationSettings,
    ) -> Self {
        let authorizer = Authorizer::new(Arc::clone(&store), settings.validator());
        Self {
            store,
            gateway,
            settings,
            authorizer,
        }
    }

    /// Creates a service with default settings.
    #[must_use]
    pub fn with_defaults(
        store: Arc<dyn AssociationStore>,
        gateway: Arc<dyn RelyingPartyGateway>,
    ) -> Self {
        Self::new(store, gateway, AssociationSettings::default())
    }

    /// Returns a service sharing this one's store and settings but talking to `gateway`.
    #[must_use]
    pub fn with_gateway(&self, gateway: Arc<dyn RelyingPartyGateway>) -> Self {
        Self {
            store: Arc::clone(&self.store),
            gateway,
            settings: self.settings.clone(),
            authorizer: self.authorizer.clone(),
        }
    }

    /// Returns the settings in effect.
    #[must_use]
    pub const fn settings(&self) -> &AssociationSettings {
        &self.settings
    }

    const fn validator(&self) -> IdentifierValidator {
        self.settings.validator()
    }

    /// Validates `raw_identifier` and starts a provider handshake for it.
    ///
    /// `return_context` travels through the round trip untouched (usually the
    /// URL to return to once the association completes).
    pub async fn begin_association(
        &self,
        raw_identifier: &str,
        return_context: Option<&str>,
    ) -> BeginOutcome {
        let identifier = match self.validator().validate(raw_identifier) {
            Ok(identifier) => identifier,
            Err(err) => {
                debug!("not starting handshake: {err}");
                return BeginOutcome::Rejected {
                    message: MessageKey::InvalidIdentifier.into(),
                };
            }
        };

        let request = HandshakeRequest {
            identifier: identifier.clone(),
            extensions: self.settings.claims.extension_requests(),
            return_context: return_context.map(str::to_string),
        };

        match self.gateway.begin_handshake(request).await {
            Ok(target) => {
                info!("handshake started for {identifier}");
                BeginOutcome::Redirect { target }
            }
            Err(err) => {
                warn!("unable to start handshake for {identifier}: {err}");
                BeginOutcome::Rejected {
                    message: UserMessage::with_args(
                        MessageKey::UnableToAuthenticate,
                        vec![err.to_string()],
                    ),
                }
            }
        }
    }

    /// Interprets the provider response carried by the current request.
    ///
    /// Returns an `Idle` result when there is no pending response.
    ///
    /// # Errors
    ///
    /// Returns [`AssociationError::Store`] if the store fails.
    pub fn complete_association(
        &self,
        current_account: Option<&AccountRef>,
        return_url: Option<&str>,
    ) -> Result<AssociationResult, AssociationError> {
        if !self.gateway.has_pending_response() {
            return Ok(AssociationResult::idle());
        }
        let Some(outcome) = self.gateway.current_outcome() else {
            warn!("gateway reported a pending response without an outcome");
            return Ok(AssociationResult::idle());
        };

        let state = HandshakeState::OutcomeReceived;
        debug!("interpreting {} outcome", outcome.status);
        let decision = self.authorizer.authorize(&outcome, current_account)?;

        let (accepted, message) = match &decision {
            AuthorizationDecision::Authenticated { created: true, .. } => {
                (true, UserMessage::new(MessageKey::Associated))
            }
            AuthorizationDecision::Authenticated { created: false, .. } => {
                let key = if current_account.is_some() {
                    MessageKey::AssociationConfirmed
                } else {
                    MessageKey::LoggedIn
                };
                (true, UserMessage::new(key))
            }
            AuthorizationDecision::AlreadyAssociated { .. } => {
                (false, UserMessage::new(MessageKey::AlreadyAssigned))
            }
            AuthorizationDecision::Rejected(reason) => (false, rejection_message(reason)),
        };

        let redirect = accepted.then(|| {
            resolve_return_location(return_url, &self.settings.default_return_location)
        });

        Ok(AssociationResult {
            state: state.settle(accepted),
            decision: Some(decision),
            message: Some(message),
            redirect,
        })
    }

    /// Removes the association for `identifier`.
    ///
    /// Removing an association that does not exist succeeds with
    /// [`RemovalOutcome::AlreadyGone`].
    ///
    /// # Errors
    ///
    /// Returns [`AssociationError::Store`] if the store fails.
    pub fn remove_association(
        &self,
        identifier: &str,
        requester: &AccountRef,
        is_authorized_to_manage: bool,
    ) -> Result<RemovalOutcome, AssociationError> {
        if !is_authorized_to_manage {
            warn!("{requester} is not authorized to manage associations");
            return Ok(RemovalOutcome::AccessDenied);
        }

        let Ok(normalized) = self.validator().validate(identifier) else {
            debug!("nothing to remove for malformed identifier");
            return Ok(RemovalOutcome::AlreadyGone {
                identifier: identifier.to_string(),
            });
        };

        match self.store.remove(&normalized) {
            Ok(association) => {
                info!(
                    "{requester} removed association {} of account {}",
                    association.external_identifier, association.account
                );
                Ok(RemovalOutcome::Removed { association })
            }
            Err(StoreError::NotFound(_)) => {
                debug!("{normalized} was already removed");
                Ok(RemovalOutcome::AlreadyGone {
                    identifier: identifier.to_string(),
                })
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Removes every listed association that exists.
    ///
    /// Missing or malformed identifiers are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`AssociationError::Store`] if the store fails; removals done
    /// before the failure stay done.
    pub fn bulk_remove<I, S>(
        &self,
        identifiers: I,
        requester: &AccountRef,
        is_authorized_to_manage: bool,
    ) -> Result<BulkRemovalOutcome, AssociationError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if !is_authorized_to_manage {
            warn!("{requester} is not authorized to manage associations");
            return Ok(BulkRemovalOutcome::AccessDenied);
        }

        let validator = self.validator();
        let normalized: Vec<ExternalIdentifier> = identifiers
            .into_iter()
            .filter_map(|raw| validator.validate(raw.as_ref()).ok())
            .collect();

        let removed = self.store.remove_many(&normalized)?;
        info!(
            "{requester} bulk-removed {removed} of {} associations",
            normalized.len()
        );
        Ok(BulkRemovalOutcome::Removed {
            count: u64::try_from(removed).unwrap_or(u64::MAX),
        })
    }

    /// Applies an index-page bulk action to the checked identifiers.
    ///
    /// # Errors
    ///
    /// Returns [`AssociationError::Store`] if the store fails.
    pub fn apply_bulk_action<I, S>(
        &self,
        action: BulkAction,
        checked: I,
        requester: &AccountRef,
        is_authorized_to_manage: bool,
    ) -> Result<BulkRemovalOutcome, AssociationError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        match action {
            BulkAction::None => Ok(BulkRemovalOutcome::Removed { count: 0 }),
            BulkAction::Delete => {
                self.bulk_remove(checked, requester, is_authorized_to_manage)
            }
        }
    }

    /// Lists the associations bound to `account`, in creation order.
    ///
    /// # Errors
    ///
    /// Returns [`AssociationError::Store`] if the store fails.
    pub fn list_for_account(
        &self,
        account: &AccountRef,
    ) -> Result<Vec<Association>, AssociationError> {
        Ok(self.store.list_by_account(account)?)
    }

    /// Returns `true` if `raw_identifier` is already bound to some account.
    ///
    /// # Errors
    ///
    /// Returns [`AssociationError::Store`] if the store fails.
    pub fn is_identifier_assigned(
        &self,
        raw_identifier: &str,
    ) -> Result<bool, AssociationError> {
        match self.validator().validate(raw_identifier) {
            Ok(identifier) => Ok(self.store.contains(&identifier)?),
            Err(_) => Ok(false),
        }
    }
}

fn rejection_message(reason: &RejectionReason) -> UserMessage {
    match reason {
        RejectionReason::Canceled => UserMessage::new(MessageKey::CanceledAtProvider),
        RejectionReason::Failed { message } => {
            UserMessage::with_args(MessageKey::ProviderFailed, vec![message.clone()])
        }
        RejectionReason::InvalidIdentifier => UserMessage::new(MessageKey::InvalidIdentifier),
        RejectionReason::NoAccountContext => UserMessage::new(MessageKey::NoAccountContext),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settle_only_moves_received_outcomes() {
        assert_eq!(
            HandshakeState::OutcomeReceived.settle(true),
            HandshakeState::Completed
        );
        assert_eq!(
            HandshakeState::OutcomeReceived.settle(false),
            HandshakeState::Rejected
        );
        assert_eq!(HandshakeState::Idle.settle(true), HandshakeState::Idle);
        assert!(HandshakeState::Completed.is_terminal());
        assert!(!HandshakeState::HandshakeStarted.is_terminal());
    }

    #[test]
    fn test_rejection_messages() {
        assert_eq!(
            rejection_message(&RejectionReason::Failed {
                message: "boom".to_string()
            }),
            UserMessage::with_args(MessageKey::ProviderFailed, vec!["boom".to_string()])
        );
        assert_eq!(
            rejection_message(&RejectionReason::Canceled).key,
            MessageKey::CanceledAtProvider
        );
    }

    #[test]
    fn test_bulk_outcome_message_carries_count() {
        let message = BulkRemovalOutcome::Removed { count: 3 }.message();
        assert_eq!(message.key, MessageKey::BulkDeleted);
        assert_eq!(message.args, vec!["3".to_string()]);
    }
}
