//! The Kubernetes contract consumed by the catalog.
//!
//! The catalog never talks to a cluster directly. It calls the narrow
//! [`KubernetesFacade`] defined here; cluster wire details (client-go
//! equivalents, kubeconfig handling) are the facade implementation's
//! problem. In the other direction, the kubernetes module asks "which
//! service owns this deployment?" through [`DeploymentOwner`], which the
//! catalog implements. Both contracts living in this crate keeps the two
//! modules free of imports of each other.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::tier::Tier;

/// Status of a deployment condition, mirroring the Kubernetes tri-state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionStatus {
    /// The condition holds.
    True,
    /// The condition does not hold.
    False,
    /// The controller could not determine the condition.
    Unknown,
}

/// The deployment condition types the health aggregator inspects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConditionType {
    /// Minimum availability has been reached.
    Available,
    /// A rollout is progressing (or has completed successfully).
    Progressing,
    /// Replicas failed to be created.
    ReplicaFailure,
}

/// A single observed deployment condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentCondition {
    /// The condition type.
    #[serde(rename = "type")]
    pub condition_type: ConditionType,
    /// The observed status of the condition.
    pub status: ConditionStatus,
}

/// Replica and condition data observed for one deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentObservation {
    /// Replicas currently ready.
    pub ready_replicas: i32,
    /// Replicas the cluster wants (the deployment's own spec, which may have
    /// been scaled away from the catalog declaration).
    pub desired_replicas: i32,
    /// Observed conditions.
    pub conditions: Vec<DeploymentCondition>,
    /// When the cluster last transitioned this deployment.
    pub last_updated: Option<DateTime<Utc>>,
}

impl DeploymentObservation {
    /// Looks up a condition by type.
    #[must_use]
    pub fn condition(&self, condition_type: ConditionType) -> Option<ConditionStatus> {
        self.conditions
            .iter()
            .find(|c| c.condition_type == condition_type)
            .map(|c| c.status)
    }

    /// Returns true when the `Available` condition is `True`.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.condition(ConditionType::Available) == Some(ConditionStatus::True)
    }

    /// Returns true when the `Progressing` condition is `True`.
    #[must_use]
    pub fn is_progressing(&self) -> bool {
        self.condition(ConditionType::Progressing) == Some(ConditionStatus::True)
    }
}

/// A deployment listed from a cluster, without health detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentRef {
    /// Deployment name.
    pub name: String,
    /// Namespace the deployment lives in.
    pub namespace: String,
    /// Cluster context identifier.
    pub context: String,
}

/// Endpoint readiness observed for a Kubernetes Service object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceObservation {
    /// Service name.
    pub name: String,
    /// Whether the service has at least one ready endpoint.
    pub endpoints_ready: bool,
}

/// Narrow facade over a set of Kubernetes clusters.
///
/// One implementation serves all configured contexts; `context` selects the
/// cluster on every call. Implementations must be safe for concurrent use:
/// the health aggregator fans out across environments in parallel.
#[async_trait]
pub trait KubernetesFacade: Send + Sync + 'static {
    /// Observes replica/condition data for one deployment.
    ///
    /// Returns `Error::NotFound` when the deployment does not exist and
    /// `Error::Backend` when the cluster is unreachable.
    async fn deployment_health(
        &self,
        context: &str,
        namespace: &str,
        name: &str,
    ) -> Result<DeploymentObservation>;

    /// Lists deployments in a namespace.
    async fn list_deployments(&self, context: &str, namespace: &str)
        -> Result<Vec<DeploymentRef>>;

    /// Returns true when `context` names a configured, reachable cluster.
    async fn validate_context(&self, context: &str) -> Result<bool>;

    /// Observes endpoint readiness for one Kubernetes Service object.
    async fn service_health(
        &self,
        context: &str,
        namespace: &str,
        name: &str,
    ) -> Result<ServiceObservation>;
}

/// Projection of a catalog service returned to the kubernetes module.
///
/// This is deliberately not the full catalog entity: consumers annotating a
/// deployment list only need ownership and criticality.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceContext {
    /// Owning service name.
    pub service_name: String,
    /// Owning service tier.
    pub service_tier: Tier,
    /// The declared environment name that matched (e.g. `production`).
    pub environment: String,
    /// Cluster context of the match.
    pub context: String,
    /// Owning team slug.
    pub team: Option<String>,
    /// Service description.
    pub description: String,
}

/// Reverse lookup from a deployment triple to its owning catalog service.
///
/// Implemented by the catalog; consumed by the kubernetes module.
#[async_trait]
pub trait DeploymentOwner: Send + Sync + 'static {
    /// Resolves the owner of `(deployment, namespace, context)`.
    ///
    /// `Ok(None)` means "no owner". Errors are reserved for catalog-load
    /// failures, never for a missing owner.
    async fn resolve(
        &self,
        deployment: &str,
        namespace: &str,
        context: &str,
    ) -> Result<Option<ServiceContext>>;
}

/// Deterministic in-memory facade for tests and debug bootstrap.
///
/// Thread-safe via `RwLock`. Not suitable for production. Deployments are
/// keyed by `(context, namespace, name)`; a key can be marked as failing to
/// simulate an unreachable cluster.
#[derive(Debug, Default)]
pub struct StaticCluster {
    deployments: RwLock<HashMap<(String, String, String), DeploymentObservation>>,
    services: RwLock<HashMap<(String, String, String), ServiceObservation>>,
    contexts: RwLock<HashSet<String>>,
    failing: RwLock<HashSet<(String, String, String)>>,
}

impl StaticCluster {
    /// Creates an empty cluster set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a context as reachable.
    pub fn add_context(&self, context: impl Into<String>) {
        if let Ok(mut contexts) = self.contexts.write() {
            contexts.insert(context.into());
        }
    }

    /// Registers an observation for a deployment.
    pub fn set_deployment(
        &self,
        context: impl Into<String>,
        namespace: impl Into<String>,
        name: impl Into<String>,
        observation: DeploymentObservation,
    ) {
        let key = (context.into(), namespace.into(), name.into());
        if let Ok(mut contexts) = self.contexts.write() {
            contexts.insert(key.0.clone());
        }
        if let Ok(mut deployments) = self.deployments.write() {
            deployments.insert(key, observation);
        }
    }

    /// Registers a service endpoint observation.
    pub fn set_service(
        &self,
        context: impl Into<String>,
        namespace: impl Into<String>,
        name: impl Into<String>,
        observation: ServiceObservation,
    ) {
        if let Ok(mut services) = self.services.write() {
            services.insert((context.into(), namespace.into(), name.into()), observation);
        }
    }

    /// Marks a deployment as failing: calls for it return `Error::Backend`.
    pub fn fail_deployment(
        &self,
        context: impl Into<String>,
        namespace: impl Into<String>,
        name: impl Into<String>,
    ) {
        if let Ok(mut failing) = self.failing.write() {
            failing.insert((context.into(), namespace.into(), name.into()));
        }
    }

    fn is_failing(&self, key: &(String, String, String)) -> bool {
        self.failing
            .read()
            .map(|failing| failing.contains(key))
            .unwrap_or(false)
    }
}

#[async_trait]
impl KubernetesFacade for StaticCluster {
    async fn deployment_health(
        &self,
        context: &str,
        namespace: &str,
        name: &str,
    ) -> Result<DeploymentObservation> {
        let key = (context.to_string(), namespace.to_string(), name.to_string());
        if self.is_failing(&key) {
            return Err(Error::backend(
                "kubernetes",
                "deployment_health",
                format!("context {context} unreachable"),
            ));
        }

        let deployments = self.deployments.read().map_err(|_| Error::Internal {
            message: "lock poisoned".into(),
        })?;
        deployments.get(&key).cloned().ok_or_else(|| {
            Error::NotFound(format!("deployment {name} in {context}/{namespace}"))
        })
    }

    async fn list_deployments(
        &self,
        context: &str,
        namespace: &str,
    ) -> Result<Vec<DeploymentRef>> {
        let deployments = self.deployments.read().map_err(|_| Error::Internal {
            message: "lock poisoned".into(),
        })?;
        Ok(deployments
            .keys()
            .filter(|(c, n, _)| c == context && n == namespace)
            .map(|(c, n, d)| DeploymentRef {
                name: d.clone(),
                namespace: n.clone(),
                context: c.clone(),
            })
            .collect())
    }

    async fn validate_context(&self, context: &str) -> Result<bool> {
        let contexts = self.contexts.read().map_err(|_| Error::Internal {
            message: "lock poisoned".into(),
        })?;
        Ok(contexts.contains(context))
    }

    async fn service_health(
        &self,
        context: &str,
        namespace: &str,
        name: &str,
    ) -> Result<ServiceObservation> {
        let key = (context.to_string(), namespace.to_string(), name.to_string());
        let services = self.services.read().map_err(|_| Error::Internal {
            message: "lock poisoned".into(),
        })?;
        services
            .get(&key)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("service {name} in {context}/{namespace}")))
    }
}

/// Builds a healthy observation with both `Available` and `Progressing` true.
#[must_use]
pub fn healthy_observation(ready: i32, desired: i32) -> DeploymentObservation {
    DeploymentObservation {
        ready_replicas: ready,
        desired_replicas: desired,
        conditions: vec![
            DeploymentCondition {
                condition_type: ConditionType::Available,
                status: ConditionStatus::True,
            },
            DeploymentCondition {
                condition_type: ConditionType::Progressing,
                status: ConditionStatus::True,
            },
        ],
        last_updated: None,
    }
}
