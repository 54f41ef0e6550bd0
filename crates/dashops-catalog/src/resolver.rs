//! Deployment-to-service resolution.
//!
//! Answers "which catalog service owns this Kubernetes deployment?" by
//! scanning declared environments. The kubernetes module consumes this
//! through the [`DeploymentOwner`] contract it owns; the catalog never
//! returns the full entity, only the [`ServiceContext`] projection.
//!
//! Each resolution is O(services x environments x deployments). The
//! disjointness invariant enforced on write makes the first match the only
//! match, so the scan short-circuits deterministically.

use std::sync::Arc;

use async_trait::async_trait;

use dashops_core::kubernetes::{DeploymentOwner, ServiceContext};
use dashops_core::Error as CoreError;

use crate::catalog::Catalog;
use crate::service::Service;

/// Reverse index from deployment triples to owning services.
pub struct DeploymentResolver {
    catalog: Arc<Catalog>,
}

impl DeploymentResolver {
    /// Creates a resolver over the catalog.
    #[must_use]
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self { catalog }
    }

    fn project(service: &Service, environment: &str, context: &str) -> ServiceContext {
        let team = service.spec.team.github_team.trim();
        ServiceContext {
            service_name: service.metadata.name.clone(),
            service_tier: service.metadata.tier,
            environment: environment.to_string(),
            context: context.to_string(),
            team: (!team.is_empty()).then(|| team.to_string()),
            description: service.spec.description.clone(),
        }
    }
}

#[async_trait]
impl DeploymentOwner for DeploymentResolver {
    async fn resolve(
        &self,
        deployment: &str,
        namespace: &str,
        context: &str,
    ) -> dashops_core::Result<Option<ServiceContext>> {
        let services = self
            .catalog
            .list(None)
            .await
            .map_err(|e| CoreError::backend("catalog", "resolve", e.to_string()))?
            .services;

        for service in &services {
            let Some(kubernetes) = &service.spec.kubernetes else {
                continue;
            };
            for env in &kubernetes.environments {
                if env.context != context || env.namespace != namespace {
                    continue;
                }
                let matched = env.resources.deployments.iter().any(|d| {
                    // Exact match preferred; case-differing declarations are
                    // tolerated rather than treated as foreign.
                    d.name == deployment || d.name.eq_ignore_ascii_case(deployment)
                });
                if matched {
                    return Ok(Some(Self::project(service, &env.name, context)));
                }
            }
        }

        Ok(None)
    }
}
