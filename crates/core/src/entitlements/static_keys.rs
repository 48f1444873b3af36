use super::{EntitlementError, Entitlements, User};
use crate::config::ApiKeyEntry;
use crate::context::CallerContext;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// API keys declared in configuration, each with its own model grants.
pub struct StaticKeyTable {
    keys: HashMap<String, ApiKeyEntry>,
}

impl StaticKeyTable {
    pub fn new(entries: &[ApiKeyEntry]) -> Self {
        Self {
            keys: entries
                .iter()
                .map(|e| (e.key.clone(), e.clone()))
                .collect(),
        }
    }

    pub async fn validate_entitlements(
        &self,
        caller: &CallerContext<'_>,
        _model: &str,
    ) -> Result<(User, Entitlements), EntitlementError> {
        self.validate_at(caller, Utc::now())
    }

    fn validate_at(
        &self,
        caller: &CallerContext<'_>,
        now: DateTime<Utc>,
    ) -> Result<(User, Entitlements), EntitlementError> {
        let token = caller
            .credential()
            .ok_or(EntitlementError::MissingCredentials)?;
        let entry = self.keys.get(token).ok_or(EntitlementError::InvalidKey)?;

        if entry.disabled {
            return Err(EntitlementError::Disabled);
        }
        if let Some(expires_at) = entry.expires_at
            && expires_at <= now
        {
            return Err(EntitlementError::Expired(expires_at));
        }

        let user = User {
            id: entry
                .user
                .clone()
                .unwrap_or_else(|| redact_key(&entry.key)),
        };
        let entitlements = Entitlements::new(
            entry.completion_models.clone(),
            entry.embedding_models.clone(),
        );
        Ok((user, entitlements))
    }
}

/// Log-safe stand-in for a key without a configured user name.
fn redact_key(key: &str) -> String {
    let prefix: String = key.chars().take(6).collect();
    format!("key:{prefix}…")
}
