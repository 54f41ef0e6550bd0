//! Pluggable append-only change log for catalog services.
//!
//! Every successful mutation produces exactly one history record through the
//! active [`VersioningProvider`]. Recording is best-effort by contract: a
//! provider failure on the write path is logged and surfaced as a warning,
//! never an aborted mutation. The read path (`service_history`) returns
//! errors normally.
//!
//! Three providers exist, selected by configuration:
//! - [`NoneProvider`]: disabled; all writes succeed, history is empty
//! - [`SimpleProvider`]: per-service JSON file under `.history/`, capped
//! - [`GitProvider`]: the storage directory is a Git working tree

pub mod git;
pub mod none;
pub mod simple;

pub use git::GitProvider;
pub use none::NoneProvider;
pub use simple::SimpleProvider;

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use dashops_core::UserContext;

use crate::error::{CatalogError, Result};
use crate::service::Service;

/// The lifecycle event a history record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeAction {
    /// The service was created.
    Create,
    /// The service spec was replaced.
    Update,
    /// The service was deleted.
    Delete,
}

impl ChangeAction {
    /// Returns the wire representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl std::fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single field-level change, attached to history records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldChange {
    /// Dotted path of the changed field.
    pub field: String,
    /// Previous value.
    pub old_value: String,
    /// New value.
    pub new_value: String,
}

impl FieldChange {
    /// Creates a field change.
    pub fn new(
        field: impl Into<String>,
        old_value: impl Into<String>,
        new_value: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            old_value: old_value.into(),
            new_value: new_value.into(),
        }
    }
}

/// An immutable history record for one service mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceChange {
    /// Opaque record identifier (commit hash or UUID, provider-specific).
    pub id: String,
    /// Author display name.
    pub author: String,
    /// Author email.
    pub email: String,
    /// When the change was recorded.
    pub timestamp: DateTime<Utc>,
    /// Human-readable change message.
    pub message: String,
    /// Field-level changes, when the provider captured them.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub field_changes: Vec<FieldChange>,
}

/// The provider kind named in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum VersioningProviderKind {
    /// Git working tree in the storage directory.
    Git,
    /// JSON change log under `.history/`.
    #[default]
    Simple,
    /// Versioning disabled.
    None,
}

impl FromStr for VersioningProviderKind {
    type Err = CatalogError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "git" => Ok(Self::Git),
            "simple" => Ok(Self::Simple),
            "none" => Ok(Self::None),
            other => Err(CatalogError::validation(
                "versioning.provider",
                format!("unknown provider '{other}' (expected git, simple, or none)"),
            )),
        }
    }
}

/// Append-only change log, pluggable per deployment.
#[async_trait]
pub trait VersioningProvider: Send + Sync + 'static {
    /// Prepares the provider's on-disk state.
    ///
    /// Fails when state of a DIFFERENT provider already exists in the
    /// directory: switching providers over live history is refused rather
    /// than silently forked.
    async fn initialize(&self) -> Result<()>;

    /// Returns false for the `none` provider.
    fn is_enabled(&self) -> bool;

    /// Records one mutation. Must be called AFTER the successful storage
    /// write, with the post-write entity.
    async fn record_change(
        &self,
        service: &Service,
        user: &UserContext,
        action: ChangeAction,
        changes: &[FieldChange],
    ) -> Result<()>;

    /// Records a deletion for a service that no longer exists in storage.
    async fn record_deletion(&self, name: &str, user: &UserContext) -> Result<()>;

    /// Returns the change history for a service, newest first.
    async fn service_history(&self, name: &str) -> Result<Vec<ServiceChange>>;
}

/// Constructs the provider selected by configuration.
#[must_use]
pub fn provider_for(
    kind: VersioningProviderKind,
    directory: impl AsRef<Path>,
) -> Arc<dyn VersioningProvider> {
    match kind {
        VersioningProviderKind::Git => Arc::new(GitProvider::new(directory)),
        VersioningProviderKind::Simple => Arc::new(SimpleProvider::new(directory)),
        VersioningProviderKind::None => Arc::new(NoneProvider),
    }
}

/// Renders the templated commit/record message shared by providers.
pub(crate) fn change_message(service: &Service, user: &UserContext, action: ChangeAction) -> String {
    format!(
        "{action} service {name} by {user} at {ts} [tier={tier} team={team} version={version}]",
        action = action,
        name = service.metadata.name,
        user = user.username,
        ts = Utc::now().to_rfc3339(),
        tier = service.metadata.tier,
        team = service.spec.team.github_team,
        version = service.metadata.version,
    )
}

/// Renders the deletion message used when the entity is already gone.
pub(crate) fn deletion_message(name: &str, user: &UserContext) -> String {
    format!(
        "delete service {name} by {user} at {ts}",
        user = user.username,
        ts = Utc::now().to_rfc3339(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_kind_parses() {
        assert_eq!(
            "git".parse::<VersioningProviderKind>().unwrap(),
            VersioningProviderKind::Git
        );
        assert_eq!(
            "simple".parse::<VersioningProviderKind>().unwrap(),
            VersioningProviderKind::Simple
        );
        assert_eq!(
            "none".parse::<VersioningProviderKind>().unwrap(),
            VersioningProviderKind::None
        );
        assert!("svn".parse::<VersioningProviderKind>().is_err());
    }
}
