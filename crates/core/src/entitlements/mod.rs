//! The entitlement collaborator: who the caller is and which models they may
//! use.
//!
//! The request pipeline only ever talks to [`EntitlementService`]. It treats
//! [`Entitlements`] as opaque and hands the same value to both allow checks.

pub mod remote;
pub mod static_keys;

use crate::config::{EntitlementMode, EntitlementsConfig};
use crate::context::CallerContext;
use arc_swap::ArcSwap;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

pub use remote::RemoteEntitlements;
pub use static_keys::StaticKeyTable;

/// Identity of a validated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: String,
}

/// Resolved permissions of a caller. Only the service that produced it can
/// look inside.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Entitlements {
    completion_models: Vec<String>,
    embedding_models: Vec<String>,
}

impl Entitlements {
    pub fn new(completion_models: Vec<String>, embedding_models: Vec<String>) -> Self {
        Self {
            completion_models,
            embedding_models,
        }
    }

    fn grants_completion(&self, model: &str) -> bool {
        matches_any(&self.completion_models, model)
    }

    fn grants_embedding(&self, model: &str) -> bool {
        matches_any(&self.embedding_models, model)
    }
}

fn matches_any(patterns: &[String], model: &str) -> bool {
    patterns
        .iter()
        .any(|p| crate::glob::glob_match(p, model))
}

/// Why the caller could not be validated. Never leaves the authorizer: every
/// variant collapses into a 401.
#[derive(Debug, thiserror::Error)]
pub enum EntitlementError {
    #[error("missing credentials")]
    MissingCredentials,

    #[error("invalid API key")]
    InvalidKey,

    #[error("API key is disabled")]
    Disabled,

    #[error("API key expired at {0}")]
    Expired(DateTime<Utc>),

    #[error("entitlement service unavailable: {0}")]
    Unavailable(String),

    #[error("entitlement service rejected the caller (status {0})")]
    Rejected(u16),

    #[error("malformed entitlement response: {0}")]
    Malformed(String),
}

/// External authorization collaborator.
#[async_trait]
pub trait EntitlementService: Send + Sync {
    /// Validate the caller for `model`, returning who they are and what they
    /// are entitled to.
    async fn validate_entitlements(
        &self,
        caller: &CallerContext<'_>,
        model: &str,
    ) -> Result<(User, Entitlements), EntitlementError>;

    fn is_allowed_completion_model(&self, model: &str, entitlements: &Entitlements) -> bool;

    fn is_allowed_embedding_model(&self, model: &str, entitlements: &Entitlements) -> bool;
}

enum ActiveService {
    Static(StaticKeyTable),
    Remote(RemoteEntitlements),
}

/// The entitlement service selected by configuration, swappable on reload.
pub struct ConfiguredEntitlements {
    active: ArcSwap<ActiveService>,
}

impl ConfiguredEntitlements {
    pub fn new(config: &EntitlementsConfig) -> Result<Self, anyhow::Error> {
        Ok(Self {
            active: ArcSwap::from_pointee(build_active(config)?),
        })
    }

    /// Rebuild the active service from new configuration. On error the
    /// previous service stays in place.
    pub fn update_from_config(&self, config: &EntitlementsConfig) -> Result<(), anyhow::Error> {
        self.active.store(Arc::new(build_active(config)?));
        Ok(())
    }

    pub fn mode(&self) -> EntitlementMode {
        match **self.active.load() {
            ActiveService::Static(_) => EntitlementMode::Static,
            ActiveService::Remote(_) => EntitlementMode::Remote,
        }
    }
}

fn build_active(config: &EntitlementsConfig) -> Result<ActiveService, anyhow::Error> {
    Ok(match config.mode {
        EntitlementMode::Static => ActiveService::Static(StaticKeyTable::new(&config.keys)),
        EntitlementMode::Remote => {
            ActiveService::Remote(RemoteEntitlements::from_config(&config.remote)?)
        }
    })
}

#[async_trait]
impl EntitlementService for ConfiguredEntitlements {
    async fn validate_entitlements(
        &self,
        caller: &CallerContext<'_>,
        model: &str,
    ) -> Result<(User, Entitlements), EntitlementError> {
        let active = self.active.load_full();
        match &*active {
            ActiveService::Static(table) => table.validate_entitlements(caller, model).await,
            ActiveService::Remote(remote) => remote.validate_entitlements(caller, model).await,
        }
    }

    fn is_allowed_completion_model(&self, model: &str, entitlements: &Entitlements) -> bool {
        entitlements.grants_completion(model)
    }

    fn is_allowed_embedding_model(&self, model: &str, entitlements: &Entitlements) -> bool {
        entitlements.grants_embedding(model)
    }
}
