//! Common test utilities shared across integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use idlink_core::{
    AccountRef, AssociationService, AssociationStore, HandshakeOutcome, HandshakeRequest,
    MemoryAssociationStore, ProtocolError, RedirectTarget, RelyingPartyGateway,
};

pub const ALICE_ID: &str = "https://example.com/alice";
pub const BOB_ID: &str = "https://example.com/bob";

/// Gateway whose behavior is scripted by the test.
#[derive(Default)]
pub struct ScriptedGateway {
    outcome: Mutex<Option<HandshakeOutcome>>,
    begin_error: Mutex<Option<ProtocolError>>,
    requests: Mutex<Vec<HandshakeRequest>>,
}

impl ScriptedGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_outcome(outcome: HandshakeOutcome) -> Arc<Self> {
        let gateway = Self::default();
        *gateway.outcome.lock().unwrap() = Some(outcome);
        Arc::new(gateway)
    }

    /// Makes the next `begin_handshake` fail with `error`.
    pub fn fail_begin_with(&self, error: ProtocolError) {
        *self.begin_error.lock().unwrap() = Some(error);
    }

    /// Simulates the provider sending the user agent back with `outcome`.
    pub fn respond(&self, outcome: HandshakeOutcome) {
        *self.outcome.lock().unwrap() = Some(outcome);
    }

    pub fn requests(&self) -> Vec<HandshakeRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl RelyingPartyGateway for ScriptedGateway {
    fn has_pending_response(&self) -> bool {
        self.outcome.lock().unwrap().is_some()
    }

    async fn begin_handshake(
        &self,
        request: HandshakeRequest,
    ) -> Result<RedirectTarget, ProtocolError> {
        if let Some(error) = self.begin_error.lock().unwrap().take() {
            return Err(error);
        }
        let target = RedirectTarget::new(format!(
            "{}?openid.mode=checkid_setup",
            request.identifier
        ));
        self.requests.lock().unwrap().push(request);
        Ok(target)
    }

    fn current_outcome(&self) -> Option<HandshakeOutcome> {
        self.outcome.lock().unwrap().clone()
    }
}

pub fn memory_service(
    gateway: Arc<ScriptedGateway>,
) -> (Arc<MemoryAssociationStore>, AssociationService) {
    let store = Arc::new(MemoryAssociationStore::new());
    let service = AssociationService::with_defaults(
        Arc::clone(&store) as Arc<dyn AssociationStore>,
        gateway,
    );
    (store, service)
}

pub fn account(id: &str) -> AccountRef {
    AccountRef::new(id)
}
