//! The catalog controller.
//!
//! Sole entry point for catalog queries and mutations. Orchestrates the
//! validator, the storage backend, the versioning provider, and lazy team
//! enrichment, and enforces the catalog invariants: unique names, immutable
//! identity/audit fields, monotonic versions, one history record per
//! mutation, and deployment-ownership disjointness.
//!
//! The controller holds no process-wide cache of service bodies: every read
//! goes through storage, entities live only for the request.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::Instrument;

use dashops_core::observability::catalog_span;
use dashops_core::{normalize_name, TeamDirectory, UserContext};

use crate::error::{CatalogError, Result};
use crate::list::{process_service_list, ListResult, ServiceFilter};
use crate::metrics;
use crate::service::Service;
use crate::store::ServiceStore;
use crate::validate;
use crate::versioning::{ChangeAction, ServiceChange, VersioningProvider};

/// A non-fatal problem encountered during a successful mutation.
///
/// Best-effort side effects (history recording, enrichment) that fail are
/// reported here instead of failing the operation, so callers can react
/// without the contract becoming all-or-nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    /// Stable machine-readable warning code.
    pub code: &'static str,
    /// Human-readable description.
    pub message: String,
}

impl Warning {
    fn versioning(action: ChangeAction, error: &CatalogError) -> Self {
        Self {
            code: "history_not_recorded",
            message: format!("history record for {action} was not written: {error}"),
        }
    }
}

/// A successful mutation: the stored entity plus any warnings.
#[derive(Debug, Clone)]
pub struct MutationOutcome {
    /// The entity as persisted.
    pub service: Service,
    /// Non-fatal problems encountered along the way.
    pub warnings: Vec<Warning>,
}

/// Orchestrates storage, versioning, validation, and enrichment.
pub struct Catalog {
    store: Arc<dyn ServiceStore>,
    versioning: Arc<dyn VersioningProvider>,
    teams: Option<Arc<dyn TeamDirectory>>,
}

impl std::fmt::Debug for Catalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Catalog")
            .field("store", &"<ServiceStore>")
            .field("versioning_enabled", &self.versioning.is_enabled())
            .field("team_directory", &self.teams.is_some())
            .finish()
    }
}

impl Catalog {
    /// Creates a controller over the given backends.
    #[must_use]
    pub fn new(store: Arc<dyn ServiceStore>, versioning: Arc<dyn VersioningProvider>) -> Self {
        Self {
            store,
            versioning,
            teams: None,
        }
    }

    /// Attaches a team directory for lazy enrichment.
    #[must_use]
    pub fn with_team_directory(mut self, teams: Arc<dyn TeamDirectory>) -> Self {
        self.teams = Some(teams);
        self
    }

    /// Returns true when the active versioning provider records history.
    #[must_use]
    pub fn versioning_enabled(&self) -> bool {
        self.versioning.is_enabled()
    }

    /// Creates a service.
    ///
    /// Validates, checks name uniqueness and deployment ownership, stamps
    /// audit metadata (`version = 1`), persists, and records history
    /// best-effort.
    ///
    /// # Errors
    ///
    /// `PermissionDenied` without a user, `Validation` on shape violations,
    /// `AlreadyExists` on duplicate names, `Storage` on I/O failures.
    pub async fn create(
        &self,
        mut service: Service,
        user: Option<&UserContext>,
    ) -> Result<MutationOutcome> {
        let Some(user) = user else {
            return Err(CatalogError::permission_denied(
                None,
                "create",
                service.metadata.name.clone(),
            ));
        };

        service.metadata.name = normalize_name(&service.metadata.name);
        let span = catalog_span("create", &service.metadata.name);
        self.create_prepared(service, user).instrument(span).await
    }

    async fn create_prepared(
        &self,
        mut service: Service,
        user: &UserContext,
    ) -> Result<MutationOutcome> {
        validate::validate_service(&service)?;

        // Uniqueness first: a duplicate name is a conflict, not an
        // ownership-overlap validation failure.
        if self.store.exists(&service.metadata.name).await? {
            return Err(CatalogError::AlreadyExists {
                name: service.metadata.name,
            });
        }

        let owned = self.ownership_index(Some(&service.metadata.name)).await?;
        validate::validate_deployment_ownership(&service, &owned)?;

        if service.api_version.is_empty() {
            service.api_version = crate::service::API_VERSION.to_string();
        }
        if service.kind.is_empty() {
            service.kind = crate::service::KIND.to_string();
        }
        let now = Utc::now();
        service.metadata.created_at = Some(now);
        service.metadata.created_by = Some(user.username.clone());
        service.metadata.updated_at = Some(now);
        service.metadata.updated_by = Some(user.username.clone());
        service.metadata.version = 1;
        service.strip_enrichment();

        let stored = self.store.create(&service).await?;
        let warnings = self
            .record_history(&stored, user, ChangeAction::Create, &[])
            .await;

        metrics::record_mutation("create", "ok");
        tracing::info!(
            service = %stored.metadata.name,
            actor = %user.username,
            "service created"
        );
        Ok(MutationOutcome {
            service: stored,
            warnings,
        })
    }

    /// Loads a service by name, enriching its team from the directory.
    ///
    /// Enrichment failures are logged and swallowed; the entity is returned
    /// unaltered.
    ///
    /// # Errors
    ///
    /// `NotFound` when the service does not exist, `Storage` on I/O failures.
    pub async fn get(&self, name: &str) -> Result<Service> {
        let name = normalize_name(name);
        let mut service = self.store.get_by_name(&name).await?;
        self.enrich(&mut service).await;
        Ok(service)
    }

    /// Replaces a service spec.
    ///
    /// Loads the stored revision, authorizes the user against it, validates
    /// the replacement (name immutable), preserves identity and creation
    /// audit fields, bumps the version, persists, and records history with
    /// the field-level diff.
    ///
    /// # Errors
    ///
    /// `NotFound`, `PermissionDenied`, `Validation`, `Conflict` when a
    /// concurrent mutation wins, `Storage` on I/O failures.
    pub async fn update(
        &self,
        mut service: Service,
        user: Option<&UserContext>,
    ) -> Result<MutationOutcome> {
        service.metadata.name = normalize_name(&service.metadata.name);
        let span = catalog_span("update", &service.metadata.name);
        self.update_prepared(service, user).instrument(span).await
    }

    async fn update_prepared(
        &self,
        mut service: Service,
        user: Option<&UserContext>,
    ) -> Result<MutationOutcome> {
        let existing = self.store.get_by_name(&service.metadata.name).await?;
        validate::can_be_modified_by(&existing, user, "update")?;
        let user = user.ok_or_else(|| {
            CatalogError::permission_denied(None, "update", service.metadata.name.clone())
        })?;

        validate::validate_for_update(&existing, &service)?;
        let owned = self.ownership_index(Some(&service.metadata.name)).await?;
        validate::validate_deployment_ownership(&service, &owned)?;

        service.api_version.clone_from(&existing.api_version);
        service.kind.clone_from(&existing.kind);
        service.metadata.created_at = existing.metadata.created_at;
        service
            .metadata
            .created_by
            .clone_from(&existing.metadata.created_by);
        service.metadata.updated_at = Some(Utc::now());
        service.metadata.updated_by = Some(user.username.clone());
        service.metadata.version = existing.metadata.version + 1;
        service.strip_enrichment();

        let changes = validate::diff_services(&existing, &service);
        let stored = self.store.update(&service).await?;
        let warnings = self
            .record_history(&stored, user, ChangeAction::Update, &changes)
            .await;

        metrics::record_mutation("update", "ok");
        tracing::info!(
            service = %stored.metadata.name,
            actor = %user.username,
            version = stored.metadata.version,
            changed_fields = changes.len(),
            "service updated"
        );
        Ok(MutationOutcome {
            service: stored,
            warnings,
        })
    }

    /// Deletes a service.
    ///
    /// # Errors
    ///
    /// `NotFound`, `PermissionDenied`, `Storage` on I/O failures.
    pub async fn delete(&self, name: &str, user: Option<&UserContext>) -> Result<Vec<Warning>> {
        let name = normalize_name(name);
        let span = catalog_span("delete", &name);
        self.delete_prepared(name, user).instrument(span).await
    }

    async fn delete_prepared(
        &self,
        name: String,
        user: Option<&UserContext>,
    ) -> Result<Vec<Warning>> {
        let existing = self.store.get_by_name(&name).await?;
        validate::can_be_modified_by(&existing, user, "delete")?;
        let user =
            user.ok_or_else(|| CatalogError::permission_denied(None, "delete", name.clone()))?;

        self.store.delete(&name).await?;

        let mut warnings = Vec::new();
        if let Err(error) = self.versioning.record_deletion(&name, user).await {
            tracing::warn!(service = %name, error = %error, "failed to record deletion history");
            metrics::record_versioning_failure("delete");
            warnings.push(Warning::versioning(ChangeAction::Delete, &error));
        }

        metrics::record_mutation("delete", "ok");
        tracing::info!(service = %name, actor = %user.username, "service deleted");
        Ok(warnings)
    }

    /// Lists services with filtering and pagination.
    ///
    /// `total` is the post-filter, pre-pagination count.
    ///
    /// # Errors
    ///
    /// `Storage` on I/O failures.
    pub async fn list(&self, filter: Option<&ServiceFilter>) -> Result<ListResult> {
        let services = self.store.list(None).await?;
        Ok(process_service_list(services, filter))
    }

    /// Returns the change history for a service, newest first.
    ///
    /// # Errors
    ///
    /// `VersioningDisabled` when the provider is `none`; provider errors
    /// otherwise (the read path does not swallow).
    pub async fn history(&self, name: &str) -> Result<Vec<ServiceChange>> {
        if !self.versioning.is_enabled() {
            return Err(CatalogError::VersioningDisabled);
        }
        self.versioning.service_history(&normalize_name(name)).await
    }

    /// Records a mutation in history, best-effort.
    async fn record_history(
        &self,
        service: &Service,
        user: &UserContext,
        action: ChangeAction,
        changes: &[crate::versioning::FieldChange],
    ) -> Vec<Warning> {
        match self
            .versioning
            .record_change(service, user, action, changes)
            .await
        {
            Ok(()) => Vec::new(),
            Err(error) => {
                tracing::warn!(
                    service = %service.metadata.name,
                    action = %action,
                    error = %error,
                    "failed to record history"
                );
                metrics::record_versioning_failure(action.as_str());
                vec![Warning::versioning(action, &error)]
            }
        }
    }

    /// Populates team members/url from the directory. Failures are swallowed.
    async fn enrich(&self, service: &mut Service) {
        let Some(teams) = &self.teams else { return };
        let slug = service.spec.team.github_team.trim();
        if slug.is_empty() {
            return;
        }

        match teams.team_profile(slug).await {
            Ok(profile) => {
                service.spec.team.members = Some(profile.members);
                service.spec.team.url = profile.url;
            }
            Err(error) => {
                tracing::debug!(team = %slug, error = %error, "team enrichment skipped");
            }
        }
    }

    /// Collects `(context, namespace, deployment)` triples owned by services
    /// other than `exclude`, for the disjointness check.
    async fn ownership_index(
        &self,
        exclude: Option<&str>,
    ) -> Result<Vec<((String, String, String), String)>> {
        let services = self.store.list(None).await?;
        Ok(services
            .iter()
            .filter(|s| exclude.is_none_or(|name| !s.metadata.name.eq_ignore_ascii_case(name)))
            .flat_map(|s| {
                let owner = s.metadata.name.clone();
                s.deployment_triples()
                    .into_iter()
                    .map(move |triple| (triple, owner.clone()))
            })
            .collect())
    }
}
