//! Profile attributes requested from the provider during a handshake.
//!
//! Every handshake asks for the same attributes twice: once through Simple
//! Registration (SREG) and once through Attribute Exchange (AX), since
//! providers usually implement only one of the two.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

const SREG_TYPE_URI: &str = "http://openid.net/extensions/sreg/1.1";
const AX_TYPE_URI: &str = "http://openid.net/srv/ax/1.0";

/// A profile attribute a relying party may ask the provider for.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ClaimAttribute {
    /// Email address.
    Email,
    /// Preferred short name.
    Nickname,
    /// Full name.
    FullName,
    /// Date of birth.
    BirthDate,
    /// Gender.
    Gender,
    /// Postal code.
    PostalCode,
    /// Country.
    Country,
    /// Preferred language.
    Language,
    /// Time zone.
    TimeZone,
}

impl ClaimAttribute {
    /// SREG field name for the attribute.
    #[must_use]
    pub const fn sreg_field(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Nickname => "nickname",
            Self::FullName => "fullname",
            Self::BirthDate => "dob",
            Self::Gender => "gender",
            Self::PostalCode => "postcode",
            Self::Country => "country",
            Self::Language => "language",
            Self::TimeZone => "timezone",
        }
    }

    /// AX type URI for the attribute (axschema.org vocabulary).
    #[must_use]
    pub const fn ax_type_uri(&self) -> &'static str {
        match self {
            Self::Email => "http://axschema.org/contact/email",
            Self::Nickname => "http://axschema.org/namePerson/friendly",
            Self::FullName => "http://axschema.org/namePerson",
            Self::BirthDate => "http://axschema.org/birthDate",
            Self::Gender => "http://axschema.org/person/gender",
            Self::PostalCode => "http://axschema.org/contact/postalCode/home",
            Self::Country => "http://axschema.org/contact/country/home",
            Self::Language => "http://axschema.org/pref/language",
            Self::TimeZone => "http://axschema.org/pref/timezone",
        }
    }
}

/// How strongly an attribute is asked for.
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
pub enum Demand {
    /// Not requested.
    #[default]
    NoRequest,
    /// Requested, the provider may omit it.
    Request,
    /// Required for the relying party to proceed.
    Require,
}

/// The protocol extension carrying a set of attribute requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ExtensionKind {
    /// Simple Registration 1.1.
    SimpleRegistration,
    /// Attribute Exchange 1.0 fetch request.
    AttributeExchange,
}

impl ExtensionKind {
    /// Namespace URI of the extension.
    #[must_use]
    pub const fn type_uri(&self) -> &'static str {
        match self {
            Self::SimpleRegistration => SREG_TYPE_URI,
            Self::AttributeExchange => AX_TYPE_URI,
        }
    }
}

/// A single attribute request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct AttributeRequest {
    /// Attribute asked for.
    pub attribute: ClaimAttribute,
    /// Whether it is merely requested or required.
    pub demand: Demand,
}

/// A requested-attribute descriptor handed to the gateway with a handshake.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct ExtensionRequest {
    /// Extension the attributes travel in.
    pub kind: ExtensionKind,
    /// Attributes, in attribute order.
    pub attributes: Vec<AttributeRequest>,
}

/// Which attributes to ask providers for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClaimsSettings {
    requested: BTreeMap<ClaimAttribute, Demand>,
}

impl Default for ClaimsSettings {
    fn default() -> Self {
        Self::none()
            .with(ClaimAttribute::Email, Demand::Request)
            .with(ClaimAttribute::Nickname, Demand::Request)
            .with(ClaimAttribute::FullName, Demand::Request)
    }
}

impl ClaimsSettings {
    /// Settings requesting nothing.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            requested: BTreeMap::new(),
        }
    }

    /// Sets the demand for `attribute`.
    #[must_use]
    pub fn with(mut self, attribute: ClaimAttribute, demand: Demand) -> Self {
        self.requested.insert(attribute, demand);
        self
    }

    /// Returns the demand configured for `attribute`.
    #[must_use]
    pub fn demand(&self, attribute: ClaimAttribute) -> Demand {
        self.requested.get(&attribute).copied().unwrap_or_default()
    }

    /// Builds the SREG and AX requests for the configured attributes.
    ///
    /// Returns an empty list when no attribute is requested.
    #[must_use]
    pub fn extension_requests(&self) -> Vec<ExtensionRequest> {
        let attributes: Vec<AttributeRequest> = self
            .requested
            .iter()
            .filter(|(_, demand)| **demand != Demand::NoRequest)
            .map(|(attribute, demand)| AttributeRequest {
                attribute: *attribute,
                demand: *demand,
            })
            .collect();

        if attributes.is_empty() {
            return Vec::new();
        }

        vec![
            ExtensionRequest {
                kind: ExtensionKind::SimpleRegistration,
                attributes: attributes.clone(),
            },
            ExtensionRequest {
                kind: ExtensionKind::AttributeExchange,
                attributes,
            },
        ]
    }
}
