//! Service health aggregation.
//!
//! Composes the catalog with the Kubernetes facade: for every declared
//! environment, observed deployment state is translated into a deployment
//! status, reduced to an environment status, and finally reduced to an
//! overall service status using the service's tier policy.
//!
//! The aggregator never fails a request because one deployment is
//! unreachable: facade errors degrade to `unknown` at the deployment level
//! and the reduction propagates. Only a failure to load the service itself
//! is an error. Health is a pure function of (declaration, observation,
//! tier); nothing here is persisted.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::Instrument;

use dashops_core::kubernetes::{DeploymentObservation, KubernetesFacade};
use dashops_core::observability::health_span;
use dashops_core::{Error as CoreError, Tier};

use crate::catalog::Catalog;
use crate::error::Result;
use crate::metrics;
use crate::service::{DeploymentSpec, Environment};

/// Default deadline for a single cluster call.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(10);

/// Observed status of one deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentStatus {
    /// Ready, at the declared scale.
    Healthy,
    /// Ready, but the cluster's desired scale differs from the declaration.
    Drift,
    /// Some replicas are not ready.
    Degraded,
    /// Unavailable or zero ready replicas.
    Down,
    /// The deployment does not exist in the cluster.
    NotFound,
    /// The cluster could not be observed.
    Unknown,
}

impl DeploymentStatus {
    /// Returns the wire representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Drift => "drift",
            Self::Degraded => "degraded",
            Self::Down => "down",
            Self::NotFound => "not_found",
            Self::Unknown => "unknown",
        }
    }
}

/// Reduced status of one environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvironmentStatus {
    /// Every deployment healthy.
    Healthy,
    /// Healthy apart from scale drift.
    Drift,
    /// At least one deployment degraded.
    Degraded,
    /// At least one deployment down or missing.
    Down,
    /// Not enough signal to judge.
    Unknown,
}

impl EnvironmentStatus {
    /// Returns the wire representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Drift => "drift",
            Self::Degraded => "degraded",
            Self::Down => "down",
            Self::Unknown => "unknown",
        }
    }
}

/// Tier-reduced overall status of a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceStatus {
    /// Production is healthy.
    Healthy,
    /// Production drifts from the declared scale.
    Drift,
    /// Production is impaired.
    Degraded,
    /// Production is impaired on a TIER-1 service.
    Critical,
    /// Production is down.
    Down,
    /// Not enough signal to judge.
    Unknown,
}

impl ServiceStatus {
    /// Returns the wire representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Drift => "drift",
            Self::Degraded => "degraded",
            Self::Critical => "critical",
            Self::Down => "down",
            Self::Unknown => "unknown",
        }
    }
}

/// Health derived for one deployment. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentHealth {
    /// Deployment name.
    pub name: String,
    /// Replicas observed ready.
    pub ready_replicas: i32,
    /// Replicas the cluster wants.
    pub desired_replicas: i32,
    /// Derived status.
    pub status: DeploymentStatus,
    /// When the cluster last transitioned this deployment.
    pub last_updated: Option<DateTime<Utc>>,
}

/// Health derived for one environment. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentHealth {
    /// Environment name as declared.
    pub name: String,
    /// Cluster context.
    pub context: String,
    /// Reduced status.
    pub status: EnvironmentStatus,
    /// Per-deployment detail.
    pub deployments: Vec<DeploymentHealth>,
}

/// Health derived for one service. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceHealth {
    /// Service name.
    pub service_name: String,
    /// Tier-reduced overall status.
    pub overall_status: ServiceStatus,
    /// Per-environment detail, in declaration order.
    pub environments: Vec<EnvironmentHealth>,
    /// When this aggregation ran.
    pub last_updated: DateTime<Utc>,
}

/// Composes catalog declarations with cluster observations.
pub struct HealthAggregator {
    catalog: Arc<Catalog>,
    kubernetes: Arc<dyn KubernetesFacade>,
    call_timeout: Duration,
}

impl HealthAggregator {
    /// Creates an aggregator with the default 10 s per-cluster-call deadline.
    #[must_use]
    pub fn new(catalog: Arc<Catalog>, kubernetes: Arc<dyn KubernetesFacade>) -> Self {
        Self {
            catalog,
            kubernetes,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    /// Overrides the per-call deadline (mainly for tests).
    #[must_use]
    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    /// Aggregates health for one service.
    ///
    /// # Errors
    ///
    /// Fails only when the service itself cannot be loaded; cluster failures
    /// degrade to `unknown` statuses instead.
    pub async fn service_health(&self, name: &str) -> Result<ServiceHealth> {
        let start = Instant::now();
        let service = self.catalog.get(name).await?;

        let Some(kubernetes) = &service.spec.kubernetes else {
            // No footprint declared: nothing to observe, and the facade is
            // deliberately not called.
            let health = ServiceHealth {
                service_name: service.metadata.name.clone(),
                overall_status: ServiceStatus::Unknown,
                environments: Vec::new(),
                last_updated: Utc::now(),
            };
            metrics::record_health_aggregation(
                health.overall_status.as_str(),
                start.elapsed().as_secs_f64(),
            );
            return Ok(health);
        };

        let environments = join_all(
            kubernetes
                .environments
                .iter()
                .map(|env| self.observe_environment(&service.metadata.name, env)),
        )
        .await;

        let primary = service
            .primary_environment()
            .map(|env| env.name.clone())
            .and_then(|name| environments.iter().find(|e| e.name == name))
            .map_or(EnvironmentStatus::Unknown, |env| env.status);

        let health = ServiceHealth {
            service_name: service.metadata.name.clone(),
            overall_status: reduce_tier(service.metadata.tier, primary),
            environments,
            last_updated: Utc::now(),
        };

        metrics::record_health_aggregation(
            health.overall_status.as_str(),
            start.elapsed().as_secs_f64(),
        );
        Ok(health)
    }

    async fn observe_environment(&self, service: &str, env: &Environment) -> EnvironmentHealth {
        let span = health_span(service, &env.name, &env.context);
        async {
            let deployments = join_all(
                env.resources
                    .deployments
                    .iter()
                    .map(|deployment| self.observe_deployment(env, deployment)),
            )
            .await;

            EnvironmentHealth {
                name: env.name.clone(),
                context: env.context.clone(),
                status: reduce_environment(&deployments),
                deployments,
            }
        }
        .instrument(span)
        .await
    }

    async fn observe_deployment(
        &self,
        env: &Environment,
        deployment: &DeploymentSpec,
    ) -> DeploymentHealth {
        let observed = tokio::time::timeout(
            self.call_timeout,
            self.kubernetes
                .deployment_health(&env.context, &env.namespace, &deployment.name),
        )
        .await;

        match observed {
            Ok(Ok(observation)) => DeploymentHealth {
                name: deployment.name.clone(),
                ready_replicas: observation.ready_replicas,
                desired_replicas: observation.desired_replicas,
                status: deployment_status(&observation, deployment.replicas),
                last_updated: observation.last_updated,
            },
            Ok(Err(CoreError::NotFound(_))) => DeploymentHealth {
                name: deployment.name.clone(),
                ready_replicas: 0,
                desired_replicas: 0,
                status: DeploymentStatus::NotFound,
                last_updated: None,
            },
            Ok(Err(error)) => {
                tracing::warn!(
                    deployment = %deployment.name,
                    context = %env.context,
                    error = %error,
                    "cluster observation failed"
                );
                synthesized_unknown(&deployment.name)
            }
            Err(_elapsed) => {
                tracing::warn!(
                    deployment = %deployment.name,
                    context = %env.context,
                    timeout_secs = self.call_timeout.as_secs(),
                    "cluster observation timed out"
                );
                synthesized_unknown(&deployment.name)
            }
        }
    }
}

fn synthesized_unknown(name: &str) -> DeploymentHealth {
    DeploymentHealth {
        name: name.to_string(),
        ready_replicas: 0,
        desired_replicas: 0,
        status: DeploymentStatus::Unknown,
        last_updated: None,
    }
}

/// Derives a deployment status from an observation and the declared scale.
#[must_use]
pub fn deployment_status(
    observation: &DeploymentObservation,
    declared_replicas: i32,
) -> DeploymentStatus {
    if !observation.is_available() || observation.ready_replicas == 0 {
        return DeploymentStatus::Down;
    }
    if observation.ready_replicas < observation.desired_replicas {
        return DeploymentStatus::Degraded;
    }
    if observation.is_available()
        && observation.is_progressing()
        && observation.ready_replicas == observation.desired_replicas
    {
        return if observation.desired_replicas == declared_replicas {
            DeploymentStatus::Healthy
        } else {
            DeploymentStatus::Drift
        };
    }
    DeploymentStatus::Unknown
}

/// Reduces deployment statuses to an environment status.
#[must_use]
pub fn reduce_environment(deployments: &[DeploymentHealth]) -> EnvironmentStatus {
    if deployments.is_empty() {
        return EnvironmentStatus::Unknown;
    }

    let count = |status: DeploymentStatus| deployments.iter().filter(|d| d.status == status).count();
    let down = count(DeploymentStatus::Down) + count(DeploymentStatus::NotFound);
    let degraded = count(DeploymentStatus::Degraded);
    let healthy = count(DeploymentStatus::Healthy);
    let drift = count(DeploymentStatus::Drift);

    if down > 0 {
        EnvironmentStatus::Down
    } else if degraded > 0 {
        EnvironmentStatus::Degraded
    } else if healthy == deployments.len() {
        EnvironmentStatus::Healthy
    } else if drift > 0 && healthy + drift == deployments.len() {
        EnvironmentStatus::Drift
    } else {
        EnvironmentStatus::Unknown
    }
}

/// Applies tier policy to the production environment's status.
#[must_use]
pub fn reduce_tier(tier: Tier, status: EnvironmentStatus) -> ServiceStatus {
    match (status, tier) {
        (EnvironmentStatus::Down | EnvironmentStatus::Degraded, Tier::Tier1) => {
            ServiceStatus::Critical
        }
        (EnvironmentStatus::Down | EnvironmentStatus::Degraded, _) => ServiceStatus::Degraded,
        (EnvironmentStatus::Drift, Tier::Tier1) => ServiceStatus::Degraded,
        (EnvironmentStatus::Drift, Tier::Tier2) => ServiceStatus::Drift,
        (EnvironmentStatus::Drift, Tier::Tier3) => ServiceStatus::Healthy,
        (EnvironmentStatus::Healthy, _) => ServiceStatus::Healthy,
        (EnvironmentStatus::Unknown, _) => ServiceStatus::Unknown,
    }
}
