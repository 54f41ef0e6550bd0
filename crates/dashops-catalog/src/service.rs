//! Service data model for the Dash-Ops catalog.
//!
//! A service is the declarative root aggregate: identity and audit metadata
//! plus a spec describing ownership, business context, and the Kubernetes
//! footprint used for health aggregation.
//!
//! # Persistence format
//!
//! Services persist as one YAML document per service with camelCase keys
//! (`apiVersion`, `githubTeam`, `createdAt`, ...). The HTTP layer exposes
//! the same shape with snake_case keys; the conversion lives there, not
//! here. `team.members` and `team.url` are runtime-enriched from the team
//! directory and never persisted as source of truth.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use dashops_core::Tier;

/// Current format-version tag written to new services.
pub const API_VERSION: &str = "v1";

/// Kind tag written to new services.
pub const KIND: &str = "Service";

fn default_api_version() -> String {
    API_VERSION.to_string()
}

fn default_kind() -> String {
    KIND.to_string()
}

/// The declarative root entity owned by the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    /// Format-version tag, `v1`.
    #[serde(default = "default_api_version")]
    pub api_version: String,
    /// Kind tag, `Service`.
    #[serde(default = "default_kind")]
    pub kind: String,
    /// Identity and audit metadata.
    pub metadata: ServiceMetadata,
    /// The declarative service specification.
    pub spec: ServiceSpec,
}

/// Identity and audit metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceMetadata {
    /// Unique slug identifier (3–100 chars, `[a-z0-9]([-a-z0-9]*[a-z0-9])?`).
    pub name: String,
    /// Business-criticality tier.
    #[serde(default)]
    pub tier: Tier,
    /// When the service was first persisted. Immutable after creation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Who created the service. Immutable after creation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    /// When the service was last mutated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    /// Who last mutated the service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
    /// Monotonic revision counter, 1 on creation, incremented every update.
    #[serde(default)]
    pub version: u64,
}

/// The declarative service specification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceSpec {
    /// Human-readable description. Required, non-empty.
    pub description: String,
    /// Owning team.
    pub team: TeamSpec,
    /// Business context.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business: Option<BusinessSpec>,
    /// Technology stack hints.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technology: Option<TechnologySpec>,
    /// Kubernetes footprint, when the service runs on a cluster.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kubernetes: Option<KubernetesSpec>,
    /// Opaque observability links.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observability: Option<ObservabilitySpec>,
    /// Operational runbooks.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub runbooks: Vec<Runbook>,
}

/// Owning team declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamSpec {
    /// GitHub team slug. Required.
    pub github_team: String,
    /// Member logins, enriched at read time. Never persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub members: Option<Vec<String>>,
    /// Team page URL, enriched at read time. Never persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Business context attached to a service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct BusinessSpec {
    /// SLA target, e.g. `99.9%`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sla_target: Option<String>,
    /// Names of services this one depends on.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
    /// Blast-radius classification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impact: Option<Impact>,
}

/// Blast-radius classification of a service outage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    /// Customer-visible, revenue impacting.
    High,
    /// Internal users blocked.
    Medium,
    /// Degradation tolerable for days.
    Low,
}

/// Technology stack hints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct TechnologySpec {
    /// Primary implementation language.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Primary framework.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub framework: Option<String>,
}

/// Kubernetes footprint of a service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KubernetesSpec {
    /// Deployment environments, ordered by declaration.
    pub environments: Vec<Environment>,
}

/// A named (cluster context, namespace) pair with declared resources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Environment {
    /// Environment name, e.g. `production`.
    pub name: String,
    /// Cluster context identifier.
    pub context: String,
    /// Namespace within the cluster.
    pub namespace: String,
    /// Declared resources.
    pub resources: EnvironmentResources,
}

/// Resources declared for an environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentResources {
    /// Deployments owned by the service in this environment.
    #[serde(default)]
    pub deployments: Vec<DeploymentSpec>,
    /// Kubernetes Service objects owned by the service.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub services: Vec<String>,
    /// ConfigMaps owned by the service.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub configmaps: Vec<String>,
}

/// A declared deployment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentSpec {
    /// Deployment name.
    pub name: String,
    /// Declared desired replicas. Must be >= 1; deviation between this and
    /// the cluster's own desired count is what the aggregator calls drift.
    pub replicas: i32,
    /// Container resource requirements.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceRequirements>,
}

/// Requests/limits pair for a deployment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRequirements {
    /// Requested quantities.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requests: Option<ResourceQuantities>,
    /// Limit quantities.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limits: Option<ResourceQuantities>,
}

/// CPU/memory quantity pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ResourceQuantities {
    /// CPU quantity: millicores (`250m`) or cores (`1`, `0.5`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu: Option<String>,
    /// Memory quantity: positive integer with `Mi|Gi|M|G|K|Ki|T|Ti` suffix.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<String>,
}

/// Opaque observability links.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ObservabilitySpec {
    /// Metrics dashboard URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<String>,
    /// Log explorer URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logs: Option<String>,
    /// Trace explorer URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traces: Option<String>,
}

/// A named runbook link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Runbook {
    /// Runbook title.
    pub name: String,
    /// Runbook URL.
    pub url: String,
}

impl Service {
    /// Returns the service name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    /// Returns every declared `(context, namespace, deployment)` triple.
    ///
    /// The set of these triples must be disjoint across all services in the
    /// catalog: no deployment is owned by two services.
    #[must_use]
    pub fn deployment_triples(&self) -> Vec<(String, String, String)> {
        let Some(kubernetes) = &self.spec.kubernetes else {
            return Vec::new();
        };
        kubernetes
            .environments
            .iter()
            .flat_map(|env| {
                env.resources.deployments.iter().map(|d| {
                    (
                        env.context.clone(),
                        env.namespace.clone(),
                        d.name.clone(),
                    )
                })
            })
            .collect()
    }

    /// Returns the environment driving the overall health status.
    ///
    /// Prefers an environment named `production` (tolerating `prod`,
    /// case-insensitive); falls back to the first declared environment.
    #[must_use]
    pub fn primary_environment(&self) -> Option<&Environment> {
        let environments = &self.spec.kubernetes.as_ref()?.environments;
        environments
            .iter()
            .find(|env| {
                env.name.eq_ignore_ascii_case("production") || env.name.eq_ignore_ascii_case("prod")
            })
            .or_else(|| environments.first())
    }

    /// Clears fields populated at read time from external directories.
    ///
    /// Called before every persist so enrichment never becomes source of truth.
    pub fn strip_enrichment(&mut self) {
        self.spec.team.members = None;
        self.spec.team.url = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Service {
        Service {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: ServiceMetadata {
                name: "cart".to_string(),
                tier: Tier::Tier3,
                created_at: None,
                created_by: None,
                updated_at: None,
                updated_by: None,
                version: 0,
            },
            spec: ServiceSpec {
                description: "Shopping cart".to_string(),
                team: TeamSpec {
                    github_team: "shop-squad".to_string(),
                    members: None,
                    url: None,
                },
                business: None,
                technology: None,
                kubernetes: Some(KubernetesSpec {
                    environments: vec![
                        Environment {
                            name: "staging".to_string(),
                            context: "stg".to_string(),
                            namespace: "shop".to_string(),
                            resources: EnvironmentResources {
                                deployments: vec![DeploymentSpec {
                                    name: "cart-api".to_string(),
                                    replicas: 1,
                                    resources: None,
                                }],
                                ..EnvironmentResources::default()
                            },
                        },
                        Environment {
                            name: "Production".to_string(),
                            context: "prod".to_string(),
                            namespace: "shop".to_string(),
                            resources: EnvironmentResources {
                                deployments: vec![DeploymentSpec {
                                    name: "cart-api".to_string(),
                                    replicas: 3,
                                    resources: None,
                                }],
                                ..EnvironmentResources::default()
                            },
                        },
                    ],
                }),
                observability: None,
                runbooks: Vec::new(),
            },
        }
    }

    #[test]
    fn yaml_round_trip_uses_camel_case() {
        let service = sample();
        let yaml = serde_yaml::to_string(&service).unwrap();
        assert!(yaml.contains("apiVersion: v1"));
        assert!(yaml.contains("githubTeam: shop-squad"));
        assert!(!yaml.contains("github_team"));

        let parsed: Service = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, service);
    }

    #[test]
    fn deployment_triples_cover_all_environments() {
        let triples = sample().deployment_triples();
        assert_eq!(
            triples,
            vec![
                ("stg".to_string(), "shop".to_string(), "cart-api".to_string()),
                ("prod".to_string(), "shop".to_string(), "cart-api".to_string()),
            ]
        );
    }

    #[test]
    fn primary_environment_prefers_production() {
        let service = sample();
        assert_eq!(service.primary_environment().unwrap().name, "Production");

        let mut no_prod = sample();
        no_prod.spec.kubernetes.as_mut().unwrap().environments[1].name = "dr".to_string();
        assert_eq!(no_prod.primary_environment().unwrap().name, "staging");
    }

    #[test]
    fn strip_enrichment_clears_directory_fields() {
        let mut service = sample();
        service.spec.team.members = Some(vec!["jdoe".to_string()]);
        service.spec.team.url = Some("https://example.com".to_string());
        service.strip_enrichment();
        assert!(service.spec.team.members.is_none());
        assert!(service.spec.team.url.is_none());
    }

    #[test]
    fn defaults_applied_on_parse() {
        let yaml = "metadata:\n  name: cart\nspec:\n  description: d\n  team:\n    githubTeam: t\n";
        let parsed: Service = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(parsed.api_version, "v1");
        assert_eq!(parsed.kind, "Service");
        assert_eq!(parsed.metadata.tier, Tier::Tier3);
        assert_eq!(parsed.metadata.version, 0);
    }
}
