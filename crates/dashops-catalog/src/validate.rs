//! Structural validation, authorization checks, and field-level diffing.
//!
//! Validation enforces the shape invariants of a [`Service`] before it ever
//! reaches storage. Authorization is membership-based: a user may mutate a
//! service when their team list contains the service's GitHub team
//! (case-insensitive), or when the service declares no team.

use dashops_core::{ServiceName, UserContext};

use crate::error::{CatalogError, Result};
use crate::service::{DeploymentSpec, Environment, ResourceQuantities, Service};
use crate::versioning::FieldChange;

/// Memory quantity suffixes accepted by [`validate_memory_quantity`].
const MEMORY_SUFFIXES: [&str; 8] = ["Ki", "Mi", "Gi", "Ti", "K", "M", "G", "T"];

/// Validates the structural invariants of a service definition.
///
/// # Errors
///
/// Returns [`CatalogError::Validation`] naming the offending field.
pub fn validate_service(service: &Service) -> Result<()> {
    ServiceName::new(&service.metadata.name)?;

    if service.spec.description.trim().is_empty() {
        return Err(CatalogError::validation(
            "spec.description",
            "description is required",
        ));
    }

    if service.spec.team.github_team.trim().is_empty() {
        return Err(CatalogError::validation(
            "spec.team.githubTeam",
            "owning team is required",
        ));
    }

    if let Some(business) = &service.spec.business {
        if let Some(sla) = business.sla_target.as_deref() {
            validate_sla_target(sla)?;
        }
    }

    if let Some(kubernetes) = &service.spec.kubernetes {
        for (index, env) in kubernetes.environments.iter().enumerate() {
            validate_environment(index, env)?;
        }
    }

    Ok(())
}

/// Validates an update against the stored revision.
///
/// The name is immutable: a definition whose `metadata.name` differs from the
/// stored one is rejected rather than treated as a rename.
///
/// # Errors
///
/// Returns [`CatalogError::Validation`] on name changes or shape violations.
pub fn validate_for_update(existing: &Service, updated: &Service) -> Result<()> {
    if !existing
        .metadata
        .name
        .eq_ignore_ascii_case(&updated.metadata.name)
    {
        return Err(CatalogError::validation(
            "metadata.name",
            format!(
                "service name cannot change (stored '{}', got '{}')",
                existing.metadata.name, updated.metadata.name
            ),
        ));
    }
    validate_service(updated)
}

/// Enforces deployment-ownership disjointness across the catalog.
///
/// `owned` holds every `(context, namespace, deployment)` triple declared by
/// OTHER services, paired with the owning service name. Any overlap with the
/// candidate's triples is a validation failure: no deployment is owned by two
/// services.
///
/// # Errors
///
/// Returns [`CatalogError::Validation`] naming the contested triple.
pub fn validate_deployment_ownership(
    service: &Service,
    owned: &[((String, String, String), String)],
) -> Result<()> {
    for triple in service.deployment_triples() {
        if let Some((_, owner)) = owned.iter().find(|(t, _)| *t == triple) {
            return Err(CatalogError::validation(
                "spec.kubernetes",
                format!(
                    "deployment {}/{}/{} is already owned by service '{owner}'",
                    triple.0, triple.1, triple.2
                ),
            ));
        }
    }
    Ok(())
}

/// Authorizes a mutation by team membership.
///
/// Passes when the service declares no team, or when `user.teams` contains
/// the service's GitHub team (case-insensitive). An absent user always fails:
/// mutations require an authenticated principal.
///
/// # Errors
///
/// Returns [`CatalogError::PermissionDenied`].
pub fn can_be_modified_by(
    service: &Service,
    user: Option<&UserContext>,
    action: &'static str,
) -> Result<()> {
    let Some(user) = user else {
        return Err(CatalogError::permission_denied(
            None,
            action,
            service.name(),
        ));
    };

    let team = service.spec.team.github_team.trim();
    if team.is_empty() || user.is_member_of(team) {
        return Ok(());
    }

    Err(CatalogError::permission_denied(
        Some(&user.username),
        action,
        service.name(),
    ))
}

/// Computes the field-level diff between two revisions of a service.
///
/// Covers the fields history consumers care about: description, tier, owning
/// team, and the Kubernetes topology (environments and replica counts).
#[must_use]
pub fn diff_services(old: &Service, new: &Service) -> Vec<FieldChange> {
    let mut changes = Vec::new();

    if old.spec.description != new.spec.description {
        changes.push(FieldChange::new(
            "spec.description",
            &old.spec.description,
            &new.spec.description,
        ));
    }

    if old.metadata.tier != new.metadata.tier {
        changes.push(FieldChange::new(
            "metadata.tier",
            old.metadata.tier.as_str(),
            new.metadata.tier.as_str(),
        ));
    }

    if old.spec.team.github_team != new.spec.team.github_team {
        changes.push(FieldChange::new(
            "spec.team.githubTeam",
            &old.spec.team.github_team,
            &new.spec.team.github_team,
        ));
    }

    diff_topology(old, new, &mut changes);
    changes
}

fn diff_topology(old: &Service, new: &Service, changes: &mut Vec<FieldChange>) {
    let old_envs = environments(old);
    let new_envs = environments(new);

    for env in &old_envs {
        if !new_envs.iter().any(|e| e.name == env.name) {
            changes.push(FieldChange::new(
                format!("spec.kubernetes.environments.{}", env.name),
                "declared",
                "removed",
            ));
        }
    }

    for env in &new_envs {
        let Some(old_env) = old_envs.iter().find(|e| e.name == env.name) else {
            changes.push(FieldChange::new(
                format!("spec.kubernetes.environments.{}", env.name),
                "absent",
                "declared",
            ));
            continue;
        };

        for deployment in &env.resources.deployments {
            let old_deploy = old_env
                .resources
                .deployments
                .iter()
                .find(|d| d.name == deployment.name);
            match old_deploy {
                None => changes.push(FieldChange::new(
                    format!("{}.deployments.{}", env.name, deployment.name),
                    "absent",
                    "declared",
                )),
                Some(old_deploy) if old_deploy.replicas != deployment.replicas => {
                    changes.push(FieldChange::new(
                        format!("{}.deployments.{}.replicas", env.name, deployment.name),
                        old_deploy.replicas.to_string(),
                        deployment.replicas.to_string(),
                    ));
                }
                Some(_) => {}
            }
        }

        for old_deploy in &old_env.resources.deployments {
            if !env
                .resources
                .deployments
                .iter()
                .any(|d| d.name == old_deploy.name)
            {
                changes.push(FieldChange::new(
                    format!("{}.deployments.{}", env.name, old_deploy.name),
                    "declared",
                    "removed",
                ));
            }
        }
    }
}

fn environments(service: &Service) -> Vec<&Environment> {
    service
        .spec
        .kubernetes
        .as_ref()
        .map(|k| k.environments.iter().collect())
        .unwrap_or_default()
}

fn validate_environment(index: usize, env: &Environment) -> Result<()> {
    let field = |suffix: &str| format!("spec.kubernetes.environments[{index}].{suffix}");

    if env.name.trim().is_empty() {
        return Err(CatalogError::validation(
            field("name"),
            "environment name is required",
        ));
    }
    if env.context.trim().is_empty() {
        return Err(CatalogError::validation(
            field("context"),
            "cluster context is required",
        ));
    }
    if env.namespace.trim().is_empty() {
        return Err(CatalogError::validation(
            field("namespace"),
            "namespace is required",
        ));
    }

    for deployment in &env.resources.deployments {
        validate_deployment(&field("resources.deployments"), deployment)?;
    }
    Ok(())
}

fn validate_deployment(field: &str, deployment: &DeploymentSpec) -> Result<()> {
    if deployment.name.trim().is_empty() {
        return Err(CatalogError::validation(
            format!("{field}.name"),
            "deployment name is required",
        ));
    }
    if deployment.replicas < 1 {
        return Err(CatalogError::validation(
            format!("{field}.{}.replicas", deployment.name),
            format!("replicas must be >= 1, got {}", deployment.replicas),
        ));
    }

    if let Some(resources) = &deployment.resources {
        for (kind, quantities) in [
            ("requests", resources.requests.as_ref()),
            ("limits", resources.limits.as_ref()),
        ] {
            if let Some(quantities) = quantities {
                validate_quantities(
                    &format!("{field}.{}.resources.{kind}", deployment.name),
                    quantities,
                )?;
            }
        }
    }
    Ok(())
}

fn validate_quantities(field: &str, quantities: &ResourceQuantities) -> Result<()> {
    if let Some(cpu) = quantities.cpu.as_deref() {
        if !is_valid_cpu_quantity(cpu) {
            return Err(CatalogError::validation(
                format!("{field}.cpu"),
                format!("invalid cpu quantity '{cpu}' (expected millicores like '250m' or cores like '0.5')"),
            ));
        }
    }
    if let Some(memory) = quantities.memory.as_deref() {
        if !is_valid_memory_quantity(memory) {
            return Err(CatalogError::validation(
                format!("{field}.memory"),
                format!("invalid memory quantity '{memory}' (expected a positive integer with a Mi|Gi|M|G|K|Ki|T|Ti suffix)"),
            ));
        }
    }
    Ok(())
}

/// Returns true for `\d+m` (millicores) or `\d+(\.\d+)?` (cores).
#[must_use]
pub fn is_valid_cpu_quantity(value: &str) -> bool {
    if let Some(millis) = value.strip_suffix('m') {
        return !millis.is_empty() && millis.bytes().all(|b| b.is_ascii_digit());
    }

    let mut parts = value.splitn(2, '.');
    let whole = parts.next().unwrap_or("");
    if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    match parts.next() {
        None => true,
        Some(frac) => !frac.is_empty() && frac.bytes().all(|b| b.is_ascii_digit()),
    }
}

/// Returns true for a positive integer magnitude with a binary or decimal
/// byte suffix (`Mi`, `Gi`, `M`, `G`, `K`, `Ki`, `T`, `Ti`).
#[must_use]
pub fn is_valid_memory_quantity(value: &str) -> bool {
    for suffix in MEMORY_SUFFIXES {
        if let Some(magnitude) = value.strip_suffix(suffix) {
            return !magnitude.is_empty()
                && !magnitude.starts_with('0')
                && magnitude.bytes().all(|b| b.is_ascii_digit());
        }
    }
    false
}

fn validate_sla_target(sla: &str) -> Result<()> {
    let Some(number) = sla.strip_suffix('%') else {
        return Err(CatalogError::validation(
            "spec.business.slaTarget",
            format!("invalid SLA target '{sla}' (expected a percentage like '99.9%')"),
        ));
    };
    let valid = number
        .parse::<f64>()
        .is_ok_and(|value| (0.0..=100.0).contains(&value));
    if valid {
        Ok(())
    } else {
        Err(CatalogError::validation(
            "spec.business.slaTarget",
            format!("invalid SLA target '{sla}' (expected a percentage like '99.9%')"),
        ))
    }
}
