use std::path::{Path, PathBuf};
use std::sync::Arc;

use eyre::{eyre, Context as _, Result};
use idlink_core::store::StoragePaths;
use idlink_core::{
    AccountRef, AssociationService, AssociationSettings, AssociationStore,
    BlobAssociationStore, HandshakeOutcome, IdentifierValidator,
};
use serde::Serialize;
use serde_json::{json, Value};

use crate::cli::{Command, Requester};
use crate::gateway::LoopbackGateway;

/// Resolves the data directory: flag or env var first, platform data dir otherwise.
pub fn data_dir(explicit: Option<PathBuf>) -> Result<PathBuf> {
    explicit
        .or_else(|| dirs::data_dir().map(|dir| dir.join("idlink")))
        .ok_or_else(|| eyre!("no data directory; pass --data-dir or set IDLINK_DATA_DIR"))
}

pub fn load_settings(path: Option<&Path>) -> Result<AssociationSettings> {
    let Some(path) = path else {
        return Ok(AssociationSettings::default());
    };
    let json = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("reading settings from {}", path.display()))?;
    AssociationSettings::from_json(&json).map_err(|e| eyre!("{}: {e}", path.display()))
}

fn read_outcome(path: &Path) -> Result<HandshakeOutcome> {
    let json = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("reading outcome from {}", path.display()))?;
    serde_json::from_str(&json).wrap_err("outcome is not a valid HandshakeOutcome")
}

fn to_value(value: &impl Serialize) -> Result<Value> {
    serde_json::to_value(value).wrap_err("serializing result")
}

pub struct Context {
    pub store: Arc<dyn AssociationStore>,
    pub settings: AssociationSettings,
}

impl Context {
    pub fn open(data_dir: &Path, settings: AssociationSettings) -> Result<Self> {
        let paths = StoragePaths::new(data_dir);
        let store = BlobAssociationStore::open(&paths)
            .map_err(|e| eyre!("opening store under {}: {e}", data_dir.display()))?;
        tracing::debug!(path = %paths.associations_path().display(), "opened association store");
        Ok(Self {
            store: Arc::new(store),
            settings,
        })
    }

    fn service(&self, gateway: LoopbackGateway) -> AssociationService {
        AssociationService::new(
            Arc::clone(&self.store),
            Arc::new(gateway),
            self.settings.clone(),
        )
    }
}

/// Runs `command`, returning the JSON document to print.
pub async fn run(command: Command, context: &Context) -> Result<Value> {
    match command {
        Command::Validate { identifiers } => {
            Ok(validate(&context.settings.validator(), &identifiers))
        }
        Command::Begin {
            identifier,
            return_url,
        } => {
            let outcome = context
                .service(LoopbackGateway::idle())
                .begin_association(&identifier, return_url.as_deref())
                .await;
            to_value(&outcome)
        }
        Command::Complete {
            outcome,
            account,
            return_url,
        } => {
            let outcome = read_outcome(&outcome)?;
            let account = account.map(AccountRef::new);
            let result = context
                .service(LoopbackGateway::with_response(outcome))
                .complete_association(account.as_ref(), return_url.as_deref())?;
            to_value(&result)
        }
        Command::List { account } => {
            let associations = match account {
                Some(account) => context.store.list_by_account(&AccountRef::new(account)),
                None => context.store.list_all(),
            }
            .map_err(|e| eyre!("listing associations: {e}"))?;
            to_value(&associations)
        }
        Command::Remove {
            identifier,
            requester,
        } => {
            let Requester { account, manage } = requester;
            let outcome = context
                .service(LoopbackGateway::idle())
                .remove_association(&identifier, &AccountRef::new(account), manage)?;
            Ok(json!({ "result": to_value(&outcome)?, "message": to_value(&outcome.message())? }))
        }
        Command::BulkRemove {
            identifiers,
            requester,
        } => {
            let Requester { account, manage } = requester;
            let outcome = context
                .service(LoopbackGateway::idle())
                .bulk_remove(&identifiers, &AccountRef::new(account), manage)?;
            Ok(json!({ "result": to_value(&outcome)?, "message": to_value(&outcome.message())? }))
        }
    }
}

fn validate(validator: &IdentifierValidator, identifiers: &[String]) -> Value {
    identifiers
        .iter()
        .map(|raw| match validator.validate(raw) {
            Ok(normalized) => json!({ "input": raw, "valid": true, "normalized": normalized }),
            Err(err) => json!({ "input": raw, "valid": false, "error": err.to_string() }),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use idlink_core::MemoryAssociationStore;

    use super::*;

    fn memory_context() -> Context {
        Context {
            store: Arc::new(MemoryAssociationStore::new()),
            settings: AssociationSettings::default(),
        }
    }

    #[test]
    fn test_validate_reports_each_identifier() {
        let report = validate(
            &IdentifierValidator::default(),
            &["HTTPS://Example.com".to_string(), "nope".to_string()],
        );
        assert_eq!(report[0]["valid"], true);
        assert_eq!(report[0]["normalized"], "https://example.com/");
        assert_eq!(report[1]["valid"], false);
    }

    #[tokio::test]
    async fn test_complete_then_list_and_remove() {
        let dir = tempfile::tempdir().unwrap();
        let outcome_path = dir.path().join("outcome.json");
        std::fs::write(
            &outcome_path,
            r#"{"status":"authenticated","claimed_identifier":"https://example.com/alice"}"#,
        )
        .unwrap();
        let context = memory_context();

        let completed = run(
            Command::Complete {
                outcome: outcome_path,
                account: Some("alice".to_string()),
                return_url: None,
            },
            &context,
        )
        .await
        .unwrap();
        assert_eq!(completed["state"], "completed");
        assert_eq!(completed["message"]["key"], "openid.associated");

        let listed = run(
            Command::List {
                account: Some("alice".to_string()),
            },
            &context,
        )
        .await
        .unwrap();
        assert_eq!(listed[0]["external_identifier"], "https://example.com/alice");

        let removed = run(
            Command::BulkRemove {
                identifiers: vec!["https://example.com/alice".to_string()],
                requester: Requester {
                    account: "admin".to_string(),
                    manage: true,
                },
            },
            &context,
        )
        .await
        .unwrap();
        assert_eq!(removed["result"]["count"], 1);
        assert_eq!(removed["message"]["args"][0], "1");
    }

    #[tokio::test]
    async fn test_unauthorized_remove_is_denied() {
        let context = memory_context();
        let denied = run(
            Command::Remove {
                identifier: "https://example.com/alice".to_string(),
                requester: Requester {
                    account: "mallory".to_string(),
                    manage: false,
                },
            },
            &context,
        )
        .await
        .unwrap();
        assert_eq!(denied["result"]["outcome"], "access_denied");
        assert_eq!(denied["message"]["key"], "openid.not_authorized");
    }

    #[test]
    fn test_missing_settings_file_is_an_error() {
        assert!(load_settings(Some(Path::new("/nonexistent/idlink.json"))).is_err());
        assert_eq!(load_settings(None).unwrap(), AssociationSettings::default());
    }
}
