//! Foreign bindings for the association service.
//!
//! The host implements [`ForeignRelyingParty`] per request and passes it to
//! the handshake methods of [`AssociationServiceHandle`]. Storage lives in the
//! handle.

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::AssociationSettings;
use crate::error::AssociationError;
use crate::gateway::{
    HandshakeOutcome, HandshakeRequest, ProtocolError, RedirectTarget, RelyingPartyGateway,
};
use crate::identifier::AccountRef;
use crate::service::{
    AssociationResult, AssociationService, BeginOutcome, BulkAction, BulkRemovalOutcome,
    RemovalOutcome,
};
use crate::store::{
    Association, AssociationStore, BlobAssociationStore, MemoryAssociationStore, StoragePaths,
};

/// The host's protocol library, seen from the current request.
///
/// Mirrors [`RelyingPartyGateway`].
#[uniffi::export(with_foreign)]
#[async_trait]
pub trait ForeignRelyingParty: Send + Sync {
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

    /// Returns the outcome of the pending response, if any.
    fn current_outcome(&self) -> Option<HandshakeOutcome>;
}

struct ForeignGateway(Arc<dyn ForeignRelyingParty>);

#[async_trait]
impl RelyingPartyGateway for ForeignGateway {
    fn has_pending_response(&self) -> bool {
        self.0.has_pending_response()
    }

    async fn begin_handshake(
        &self,
        request: HandshakeRequest,
    ) -> Result<RedirectTarget, ProtocolError> {
        self.0.begin_handshake(request).await
    }

    fn current_outcome(&self) -> Option<HandshakeOutcome> {
        self.0.current_outcome()
    }
}

/// Stands in for a gateway on operations that never reach a provider.
struct DetachedGateway;

#[async_trait]
impl RelyingPartyGateway for DetachedGateway {
    fn has_pending_response(&self) -> bool {
        false
    }

    async fn begin_handshake(
        &self,
        _request: HandshakeRequest,
    ) -> Result<RedirectTarget, ProtocolError> {
        Err(ProtocolError::Unreachable {
            message: "no relying party attached".to_string(),
        })
    }

    fn current_outcome(&self) -> Option<HandshakeOutcome> {
        None
    }
}

fn parse_settings(settings_json: Option<String>) -> Result<AssociationSettings, AssociationError> {
    settings_json.map_or_else(
        || Ok(AssociationSettings::default()),
        |json| AssociationSettings::from_json(&json),
    )
}

/// An [`AssociationService`] exported to foreign code.
#[derive(Debug, uniffi::Object)]
pub struct AssociationServiceHandle {
    service: AssociationService,
}

impl AssociationServiceHandle {
    fn with_store(store: Arc<dyn AssociationStore>, settings: AssociationSettings) -> Self {
        Self {
            service: AssociationService::new(store, Arc::new(DetachedGateway), settings),
        }
    }

    fn for_request(&self, relying_party: Arc<dyn ForeignRelyingParty>) -> AssociationService {
        self.service
            .with_gateway(Arc::new(ForeignGateway(relying_party)))
    }
}

#[uniffi::export(async_runtime = "tokio")]
impl AssociationServiceHandle {
    /// Creates a handle backed by an in-process store.
    ///
    /// # Errors
    ///
    /// Returns [`AssociationError::InvalidSettings`] if `settings_json` is invalid.
    #[uniffi::constructor]
    pub fn in_memory(settings_json: Option<String>) -> Result<Self, AssociationError> {
        let settings = parse_settings(settings_json)?;
        Ok(Self::with_store(
            Arc::new(MemoryAssociationStore::new()),
            settings,
        ))
    }

    /// Opens (or creates) an on-disk store under `root`.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings are invalid or the store cannot be opened.
    #[uniffi::constructor]
    #[allow(clippy::needless_pass_by_value)]
    pub fn open(root: String, settings_json: Option<String>) -> Result<Self, AssociationError> {
        let settings = parse_settings(settings_json)?;
        let store = BlobAssociationStore::open(&StoragePaths::new(root))?;
        Ok(Self::with_store(Arc::new(store), settings))
    }

    /// See [`AssociationService::begin_association`].
    #[allow(clippy::needless_pass_by_value)]
    pub async fn begin_association(
        &self,
        relying_party: Arc<dyn ForeignRelyingParty>,
        identifier: String,
        return_context: Option<String>,
    ) -> BeginOutcome {
        self.for_request(relying_party)
            .begin_association(&identifier, return_context.as_deref())
            .await
    }

    /// See [`AssociationService::complete_association`].
    ///
    /// # Errors
    ///
    /// Returns [`AssociationError::Store`] if the store fails.
    #[allow(clippy::needless_pass_by_value)]
    pub fn complete_association(
        &self,
        relying_party: Arc<dyn ForeignRelyingParty>,
        current_account: Option<AccountRef>,
        return_url: Option<String>,
    ) -> Result<AssociationResult, AssociationError> {
        self.for_request(relying_party)
            .complete_association(current_account.as_ref(), return_url.as_deref())
    }

    /// See [`AssociationService::remove_association`].
    ///
    /// # Errors
    ///
    /// Returns [`AssociationError::Store`] if the store fails.
    #[allow(clippy::needless_pass_by_value)]
    pub fn remove_association(
        &self,
        identifier: String,
        requester: AccountRef,
        is_authorized_to_manage: bool,
    ) -> Result<RemovalOutcome, AssociationError> {
        self.service
            .remove_association(&identifier, &requester, is_authorized_to_manage)
    }

    /// See [`AssociationService::bulk_remove`].
    ///
    /// # Errors
    ///
    /// Returns [`AssociationError::Store`] if the store fails.
    #[allow(clippy::needless_pass_by_value)]
    pub fn bulk_remove(
        &self,
        identifiers: Vec<String>,
        requester: AccountRef,
        is_authorized_to_manage: bool,
    ) -> Result<BulkRemovalOutcome, AssociationError> {
        self.service
            .bulk_remove(identifiers, &requester, is_authorized_to_manage)
    }

    /// See [`AssociationService::apply_bulk_action`].
    ///
    /// # Errors
    ///
    /// Returns [`AssociationError::Store`] if the store fails.
    #[allow(clippy::needless_pass_by_value)]
    pub fn apply_bulk_action(
        &self,
        action: BulkAction,
        checked: Vec<String>,
        requester: AccountRef,
        is_authorized_to_manage: bool,
    ) -> Result<BulkRemovalOutcome, AssociationError> {
        self.service
            .apply_bulk_action(action, checked, &requester, is_authorized_to_manage)
    }

    /// See [`AssociationService::list_for_account`].
    ///
    /// # Errors
    ///
    /// Returns [`AssociationError::Store`] if the store fails.
    #[allow(clippy::needless_pass_by_value)]
    pub fn list_for_account(
        &self,
        account: AccountRef,
    ) -> Result<Vec<Association>, AssociationError> {
        self.service.list_for_account(&account)
    }

    /// See [`AssociationService::is_identifier_assigned`].
    ///
    /// # Errors
    ///
    /// Returns [`AssociationError::Store`] if the store fails.
    #[allow(clippy::needless_pass_by_value)]
    pub fn is_identifier_assigned(&self, identifier: String) -> Result<bool, AssociationError> {
        self.service.is_identifier_assigned(&identifier)
    }
}
