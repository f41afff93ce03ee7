//! A gateway that builds checkid_setup requests locally and replays provider
//! responses from files. It performs no discovery: URL identifiers are used as
//! their own endpoint and XRIs go through a public proxy resolver.

use async_trait::async_trait;
use idlink_core::{
    AttributeRequest, Demand, ExtensionKind, ExtensionRequest, HandshakeOutcome,
    HandshakeRequest, ProtocolError, RedirectTarget, RelyingPartyGateway,
};
use url::Url;

const OPENID_NS: &str = "http://specs.openid.net/auth/2.0";
const XRI_PROXY: &str = "https://xri.net/";

pub struct LoopbackGateway {
    pending: Option<HandshakeOutcome>,
}

impl LoopbackGateway {
    /// A gateway for a request without a provider response.
    pub const fn idle() -> Self {
        Self { pending: None }
    }

    /// A gateway for a request carrying `outcome`.
    pub const fn with_response(outcome: HandshakeOutcome) -> Self {
        Self {
            pending: Some(outcome),
        }
    }
}

#[async_trait]
impl RelyingPartyGateway for LoopbackGateway {
    fn has_pending_response(&self) -> bool {
        self.pending.is_some()
    }

    async fn begin_handshake(
        &self,
        request: HandshakeRequest,
    ) -> Result<RedirectTarget, ProtocolError> {
        let identifier = request.identifier.as_str();
        let endpoint = if request.identifier.is_xri() {
            format!("{XRI_PROXY}{identifier}")
        } else {
            identifier.to_string()
        };
        let mut url = Url::parse(&endpoint).map_err(|err| ProtocolError::Negotiation {
            message: format!("no OpenID endpoint for {identifier}: {err}"),
        })?;

        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("openid.ns", OPENID_NS)
                .append_pair("openid.mode", "checkid_setup")
                .append_pair("openid.claimed_id", identifier)
                .append_pair("openid.identity", identifier);
            if let Some(return_to) = &request.return_context {
                query.append_pair("openid.return_to", return_to);
            }
            for extension in &request.extensions {
                for (key, value) in extension_params(extension) {
                    query.append_pair(&key, &value);
                }
            }
        }

        tracing::debug!(%url, "built checkid_setup request");
        Ok(RedirectTarget::new(url.to_string()))
    }

    fn current_outcome(&self) -> Option<HandshakeOutcome> {
        self.pending.clone()
    }
}

fn fields_with(
    attributes: &[AttributeRequest],
    demand: Demand,
    field: fn(&AttributeRequest) -> &'static str,
) -> String {
    attributes
        .iter()
        .filter(|request| request.demand == demand)
        .map(field)
        .collect::<Vec<_>>()
        .join(",")
}

fn extension_params(extension: &ExtensionRequest) -> Vec<(String, String)> {
    let alias = |request: &AttributeRequest| request.attribute.sreg_field();
    let mut params = Vec::new();
    let (required_key, optional_key) = match extension.kind {
        ExtensionKind::SimpleRegistration => {
            params.push(("openid.ns.sreg".to_string(), extension.kind.type_uri().to_string()));
            ("openid.sreg.required", "openid.sreg.optional")
        }
        ExtensionKind::AttributeExchange => {
            params.push(("openid.ns.ax".to_string(), extension.kind.type_uri().to_string()));
            params.push(("openid.ax.mode".to_string(), "fetch_request".to_string()));
            for request in &extension.attributes {
                params.push((
                    format!("openid.ax.type.{}", alias(request)),
                    request.attribute.ax_type_uri().to_string(),
                ));
            }
            ("openid.ax.required", "openid.ax.if_available")
        }
    };

    let required = fields_with(&extension.attributes, Demand::Require, alias);
    if !required.is_empty() {
        params.push((required_key.to_string(), required));
    }
    let optional = fields_with(&extension.attributes, Demand::Request, alias);
    if !optional.is_empty() {
        params.push((optional_key.to_string(), optional));
    }
    params
}
