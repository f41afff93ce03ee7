//! Service settings.

use serde::{Deserialize, Serialize};

use crate::{
    claims::ClaimsSettings,
    error::AssociationError,
    identifier::{IdentifierValidator, DEFAULT_MAX_IDENTIFIER_LENGTH},
};

/// Where a completed association redirects when the caller supplied no usable return URL.
pub const DEFAULT_RETURN_LOCATION: &str = "~/";

/// Settings for an [`crate::AssociationService`].
///
/// Missing JSON fields fall back to their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssociationSettings {
    /// Longest accepted identifier, in characters.
    pub max_identifier_length: usize,
    /// Redirect used after a successful association when no local return URL is given.
    pub default_return_location: String,
    /// Profile attributes requested from providers.
    pub claims: ClaimsSettings,
}

impl Default for AssociationSettings {
    fn default() -> Self {
        Self {
            max_identifier_length: DEFAULT_MAX_IDENTIFIER_LENGTH,
            default_return_location: DEFAULT_RETURN_LOCATION.to_string(),
            claims: ClaimsSettings::default(),
        }
    }
}

impl AssociationSettings {
    /// Parses settings from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`AssociationError::InvalidSettings`] if the JSON is malformed or
    /// the resulting settings are unusable.
    pub fn from_json(json: &str) -> Result<Self, AssociationError> {
        let settings: Self = serde_json::from_str(json)
            .map_err(|err| AssociationError::InvalidSettings(err.to_string()))?;
        settings.check()?;
        Ok(settings)
    }

    /// Serializes the settings to JSON.
    ///
    /// # Errors
    ///
    /// Returns [`AssociationError::InvalidSettings`] if serialization fails.
    pub fn to_json(&self) -> Result<String, AssociationError> {
        serde_json::to_string_pretty(self)
            .map_err(|err| AssociationError::InvalidSettings(err.to_string()))
    }

    /// Returns the validator configured by these settings.
    #[must_use]
    pub const fn validator(&self) -> IdentifierValidator {
        IdentifierValidator::new(self.max_identifier_length)
    }

    fn check(&self) -> Result<(), AssociationError> {
        if self.max_identifier_length == 0 {
            return Err(AssociationError::InvalidSettings(
                "max_identifier_length must be positive".to_string(),
            ));
        }
        if self.default_return_location.trim().is_empty() {
            return Err(AssociationError::InvalidSettings(
                "default_return_location must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claims::{ClaimAttribute, Demand};

    #[test]
    fn test_empty_json_yields_defaults() {
        let settings = AssociationSettings::from_json("{}").unwrap();
        assert_eq!(settings, AssociationSettings::default());
        assert_eq!(settings.validator().max_length(), DEFAULT_MAX_IDENTIFIER_LENGTH);
    }

    #[test]
    fn test_partial_json() {
        let settings = AssociationSettings::from_json(
            r#"{"max_identifier_length": 64, "claims": {"email": "require"}}"#,
        )
        .unwrap();
        assert_eq!(settings.max_identifier_length, 64);
        assert_eq!(settings.default_return_location, DEFAULT_RETURN_LOCATION);
        assert_eq!(settings.claims.demand(ClaimAttribute::Email), Demand::Require);
        assert_eq!(
            settings.claims.demand(ClaimAttribute::Nickname),
            Demand::NoRequest
        );
    }

    #[test]
    fn test_rejects_zero_length_limit() {
        let result = AssociationSettings::from_json(r#"{"max_identifier_length": 0}"#);
        assert!(matches!(result, Err(AssociationError::InvalidSettings(_))));
    }

    #[test]
    fn test_rejects_malformed_json() {
        let result = AssociationSettings::from_json("{not json");
        assert!(matches!(result, Err(AssociationError::InvalidSettings(_))));
    }

    #[test]
    fn test_json_round_trip() {
        let settings = AssociationSettings {
            max_identifier_length: 100,
            default_return_location: "/account".to_string(),
            ..AssociationSettings::default()
        };
        let json = settings.to_json().unwrap();
        assert_eq!(AssociationSettings::from_json(&json).unwrap(), settings);
    }
}
