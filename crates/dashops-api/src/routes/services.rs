//! Service catalog API routes.
//!
//! ## Routes
//!
//! - `GET    /services` - List services (team/tier/status/search/limit/offset)
//! - `POST   /services` - Create a service
//! - `GET    /services/{name}` - Get a service
//! - `PUT    /services/{name}` - Replace a service spec
//! - `DELETE /services/{name}` - Delete a service
//! - `GET    /services/{name}/health` - Aggregated Kubernetes health
//! - `GET    /services/{name}/history` - Change history
//! - `GET    /resolve` - Deployment ownership lookup
//!
//! Wire DTOs use snake_case; the persisted YAML model keeps its camelCase
//! keys. Conversion lives here so neither side leaks into the other.

use std::str::FromStr;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use dashops_catalog::service::{
    BusinessSpec, DeploymentSpec, Environment, EnvironmentResources, Impact, KubernetesSpec,
    ObservabilitySpec, ResourceQuantities, ResourceRequirements, Runbook, Service,
    ServiceMetadata, ServiceSpec, TeamSpec, TechnologySpec,
};
use dashops_catalog::{
    DeploymentHealth, EnvironmentHealth, ServiceChange, ServiceFilter, ServiceHealth, Warning,
};
use dashops_core::kubernetes::{DeploymentOwner, ServiceContext};
use dashops_core::Tier;

use crate::context::RequestContext;
use crate::error::ApiError;
use crate::server::AppState;

// ============================================================================
// Wire DTOs
// ============================================================================

/// Team on the wire. `members` and `github_url` are server-populated.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TeamBody {
    /// GitHub team slug.
    pub github_team: String,
    /// Member logins (enriched, response only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub members: Option<Vec<String>>,
    /// Team page URL (enriched, response only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_url: Option<String>,
}

/// Business context on the wire.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct BusinessBody {
    /// SLA target, e.g. `99.9%`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sla_target: Option<String>,
    /// Upstream service names.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
    /// Blast radius: `high`, `medium`, or `low`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impact: Option<String>,
}

/// Technology hints on the wire.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct TechnologyBody {
    /// Primary language.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Primary framework.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub framework: Option<String>,
}

/// Kubernetes footprint on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct KubernetesBody {
    /// Deployment environments.
    pub environments: Vec<EnvironmentBody>,
}

/// One environment on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EnvironmentBody {
    /// Environment name.
    pub name: String,
    /// Cluster context.
    pub context: String,
    /// Namespace.
    pub namespace: String,
    /// Declared resources.
    pub resources: EnvironmentResourcesBody,
}

/// Environment resources on the wire.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct EnvironmentResourcesBody {
    /// Declared deployments.
    #[serde(default)]
    pub deployments: Vec<DeploymentBody>,
    /// Declared Kubernetes Service objects.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub services: Vec<String>,
    /// Declared ConfigMaps.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub configmaps: Vec<String>,
}

/// One declared deployment on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DeploymentBody {
    /// Deployment name.
    pub name: String,
    /// Declared replicas (>= 1).
    pub replicas: i32,
    /// Resource requirements.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceRequirementsBody>,
}

/// Requests/limits pair on the wire.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ResourceRequirementsBody {
    /// Requested quantities.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requests: Option<ResourceQuantitiesBody>,
    /// Limit quantities.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limits: Option<ResourceQuantitiesBody>,
}

/// CPU/memory pair on the wire.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ResourceQuantitiesBody {
    /// CPU quantity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu: Option<String>,
    /// Memory quantity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<String>,
}

/// Observability links on the wire.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ObservabilityBody {
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

/// Runbook link on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RunbookBody {
    /// Runbook title.
    pub name: String,
    /// Runbook URL.
    pub url: String,
}

/// Request to create a service.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateServiceRequest {
    /// Service name (normalized to a slug).
    pub name: String,
    /// Tier (`TIER-1` ... `TIER-3`), default `TIER-3`.
    #[serde(default)]
    pub tier: Option<String>,
    /// Description (required, non-empty).
    pub description: String,
    /// Owning team.
    pub team: TeamBody,
    /// Business context.
    #[serde(default)]
    pub business: Option<BusinessBody>,
    /// Technology hints.
    #[serde(default)]
    pub technology: Option<TechnologyBody>,
    /// Kubernetes footprint.
    #[serde(default)]
    pub kubernetes: Option<KubernetesBody>,
    /// Observability links.
    #[serde(default)]
    pub observability: Option<ObservabilityBody>,
    /// Runbooks.
    #[serde(default)]
    pub runbooks: Vec<RunbookBody>,
}

/// Request to replace a service spec. The path names the service.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdateServiceRequest {
    /// Tier (`TIER-1` ... `TIER-3`), default `TIER-3`.
    #[serde(default)]
    pub tier: Option<String>,
    /// Description (required, non-empty).
    pub description: String,
    /// Owning team.
    pub team: TeamBody,
    /// Business context.
    #[serde(default)]
    pub business: Option<BusinessBody>,
    /// Technology hints.
    #[serde(default)]
    pub technology: Option<TechnologyBody>,
    /// Kubernetes footprint.
    #[serde(default)]
    pub kubernetes: Option<KubernetesBody>,
    /// Observability links.
    #[serde(default)]
    pub observability: Option<ObservabilityBody>,
    /// Runbooks.
    #[serde(default)]
    pub runbooks: Vec<RunbookBody>,
}

/// A stored service on the wire.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ServiceResponse {
    /// Service name.
    pub name: String,
    /// Tier.
    pub tier: String,
    /// Revision counter.
    pub version: u64,
    /// Creation timestamp (RFC 3339).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    /// Creating user.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    /// Last mutation timestamp (RFC 3339).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    /// Last mutating user.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
    /// Description.
    pub description: String,
    /// Owning team, possibly enriched.
    pub team: TeamBody,
    /// Business context.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business: Option<BusinessBody>,
    /// Technology hints.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub technology: Option<TechnologyBody>,
    /// Kubernetes footprint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kubernetes: Option<KubernetesBody>,
    /// Observability links.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observability: Option<ObservabilityBody>,
    /// Runbooks.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub runbooks: Vec<RunbookBody>,
}

/// A non-fatal problem attached to a successful mutation.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct WarningBody {
    /// Stable machine-readable code.
    pub code: String,
    /// Human-readable description.
    pub message: String,
}

/// Mutation envelope: the entity plus best-effort warnings.
#[derive(Debug, Serialize, ToSchema)]
pub struct ServiceEnvelope {
    /// The stored service.
    pub service: ServiceResponse,
    /// Non-fatal problems (e.g. history not recorded).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<WarningBody>,
}

/// Echo of the applied list filter.
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct FilterEcho {
    /// Team filter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team: Option<String>,
    /// Tier filter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier: Option<String>,
    /// Status filter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Search filter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    /// Page size.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    /// Page offset.
    pub offset: usize,
}

/// List services response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ListServicesResponse {
    /// The requested page.
    pub services: Vec<ServiceResponse>,
    /// Post-filter, pre-pagination count.
    pub total: usize,
    /// The filter that was applied.
    pub filters: FilterEcho,
}

/// Query options recognized by `GET /services`. Unknown options are ignored.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ListQuery {
    /// Owning team filter (case-insensitive).
    pub team: Option<String>,
    /// Tier filter (`TIER-1` ... `TIER-3`).
    pub tier: Option<String>,
    /// Health status filter.
    pub status: Option<String>,
    /// Substring search over name and description.
    pub search: Option<String>,
    /// Page size.
    pub limit: Option<usize>,
    /// Page offset.
    pub offset: Option<usize>,
}

/// One deployment's health on the wire.
#[derive(Debug, Serialize, ToSchema)]
pub struct DeploymentHealthBody {
    /// Deployment name.
    pub name: String,
    /// Ready replicas.
    pub ready_replicas: i32,
    /// Cluster-desired replicas.
    pub desired_replicas: i32,
    /// Derived status.
    pub status: String,
    /// Last cluster transition (RFC 3339).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
}

/// One environment's health on the wire.
#[derive(Debug, Serialize, ToSchema)]
pub struct EnvironmentHealthBody {
    /// Environment name.
    pub name: String,
    /// Cluster context.
    pub context: String,
    /// Reduced status.
    pub status: String,
    /// Per-deployment detail.
    pub deployments: Vec<DeploymentHealthBody>,
}

/// Aggregated service health response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ServiceHealthResponse {
    /// Service name.
    pub service_name: String,
    /// Tier-reduced overall status.
    pub overall_status: String,
    /// Per-environment detail.
    pub environments: Vec<EnvironmentHealthBody>,
    /// When this aggregation ran (RFC 3339).
    pub last_updated: String,
}

/// One history record on the wire.
#[derive(Debug, Serialize, ToSchema)]
pub struct ChangeBody {
    /// Opaque record identifier.
    pub id: String,
    /// Author display name.
    pub author: String,
    /// Author email.
    pub email: String,
    /// Record timestamp (RFC 3339).
    pub timestamp: String,
    /// Change message.
    pub message: String,
    /// Field-level changes, when captured.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub field_changes: Vec<FieldChangeBody>,
}

/// One field-level change on the wire.
#[derive(Debug, Serialize, ToSchema)]
pub struct FieldChangeBody {
    /// Dotted field path.
    pub field: String,
    /// Previous value.
    pub old_value: String,
    /// New value.
    pub new_value: String,
}

/// Service history response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ServiceHistoryResponse {
    /// Service name.
    pub service: String,
    /// Change records, newest first.
    pub history: Vec<ChangeBody>,
}

/// Query for the deployment ownership lookup.
#[derive(Debug, Deserialize, IntoParams)]
pub struct ResolveQuery {
    /// Deployment name.
    pub deployment: String,
    /// Namespace.
    pub namespace: String,
    /// Cluster context.
    pub context: String,
}

/// Owning-service projection on the wire.
#[derive(Debug, Serialize, ToSchema)]
pub struct ServiceContextBody {
    /// Owning service name.
    pub service_name: String,
    /// Owning service tier.
    pub service_tier: String,
    /// Matched environment name.
    pub environment: String,
    /// Cluster context.
    pub context: String,
    /// Owning team slug.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team: Option<String>,
    /// Service description.
    pub description: String,
}

/// Deployment ownership response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ResolveResponse {
    /// Whether any service owns the triple.
    pub found: bool,
    /// The owner, when found.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_context: Option<ServiceContextBody>,
}

// ============================================================================
// Routes
// ============================================================================

/// Creates service catalog routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/services", get(list_services).post(create_service))
        .route(
            "/services/:name",
            get(get_service).put(update_service).delete(delete_service),
        )
        .route("/services/:name/health", get(service_health))
        .route("/services/:name/history", get(service_history))
        .route("/resolve", get(resolve_deployment))
}

/// List services.
///
/// GET /api/service-catalog/services
#[utoipa::path(
    get,
    path = "/api/service-catalog/services",
    tag = "services",
    params(ListQuery),
    responses(
        (status = 200, description = "Services listed", body = ListServicesResponse),
        (status = 500, description = "Internal error", body = ApiErrorBody),
    )
)]
pub(crate) async fn list_services(
    ctx: RequestContext,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    tracing::debug!(request_id = %ctx.request_id, "Listing services");

    let filter = filter_from_query(&query)?;
    let echo = echo_filter(&filter);
    let result = state.catalog.list(Some(&filter)).await.map_err(ApiError::from)?;

    Ok(Json(ListServicesResponse {
        services: result.services.into_iter().map(service_to_response).collect(),
        total: result.total,
        filters: echo,
    }))
}

/// Create a service.
///
/// POST /api/service-catalog/services
#[utoipa::path(
    post,
    path = "/api/service-catalog/services",
    tag = "services",
    request_body = CreateServiceRequest,
    responses(
        (status = 201, description = "Service created", body = ServiceEnvelope),
        (status = 400, description = "Bad request", body = ApiErrorBody),
        (status = 401, description = "Unauthorized", body = ApiErrorBody),
        (status = 409, description = "Conflict", body = ApiErrorBody),
    )
)]
pub(crate) async fn create_service(
    ctx: RequestContext,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateServiceRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = ctx.require_user()?.clone();
    tracing::info!(service = %req.name, actor = %user.username, "Creating service");

    let service = create_request_to_service(req)?;
    let outcome = state
        .catalog
        .create(service, Some(&user))
        .await
        .map_err(ApiError::from)?;

    let location = format!("/api/service-catalog/services/{}", outcome.service.metadata.name);
    let body = ServiceEnvelope {
        service: service_to_response(outcome.service),
        warnings: outcome.warnings.into_iter().map(warning_to_body).collect(),
    };
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(body),
    ))
}

/// Get a service by name.
///
/// GET /api/service-catalog/services/{name}
#[utoipa::path(
    get,
    path = "/api/service-catalog/services/{name}",
    tag = "services",
    params(("name" = String, Path, description = "Service name")),
    responses(
        (status = 200, description = "Service found", body = ServiceResponse),
        (status = 404, description = "Not found", body = ApiErrorBody),
    )
)]
pub(crate) async fn get_service(
    ctx: RequestContext,
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    tracing::debug!(service = %name, request_id = %ctx.request_id, "Getting service");
    let service = state.catalog.get(&name).await.map_err(ApiError::from)?;
    Ok(Json(service_to_response(service)))
}

/// Replace a service spec.
///
/// PUT /api/service-catalog/services/{name}
#[utoipa::path(
    put,
    path = "/api/service-catalog/services/{name}",
    tag = "services",
    params(("name" = String, Path, description = "Service name")),
    request_body = UpdateServiceRequest,
    responses(
        (status = 200, description = "Service updated", body = ServiceEnvelope),
        (status = 400, description = "Bad request", body = ApiErrorBody),
        (status = 401, description = "Unauthorized", body = ApiErrorBody),
        (status = 403, description = "Forbidden", body = ApiErrorBody),
        (status = 404, description = "Not found", body = ApiErrorBody),
        (status = 409, description = "Conflict", body = ApiErrorBody),
    )
)]
pub(crate) async fn update_service(
    ctx: RequestContext,
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Json(req): Json<UpdateServiceRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = ctx.require_user()?.clone();
    tracing::info!(service = %name, actor = %user.username, "Updating service");

    let service = update_request_to_service(&name, req)?;
    let outcome = state
        .catalog
        .update(service, Some(&user))
        .await
        .map_err(ApiError::from)?;

    Ok(Json(ServiceEnvelope {
        service: service_to_response(outcome.service),
        warnings: outcome.warnings.into_iter().map(warning_to_body).collect(),
    }))
}

/// Delete a service.
///
/// DELETE /api/service-catalog/services/{name}
#[utoipa::path(
    delete,
    path = "/api/service-catalog/services/{name}",
    tag = "services",
    params(("name" = String, Path, description = "Service name")),
    responses(
        (status = 204, description = "Service deleted"),
        (status = 401, description = "Unauthorized", body = ApiErrorBody),
        (status = 403, description = "Forbidden", body = ApiErrorBody),
        (status = 404, description = "Not found", body = ApiErrorBody),
    )
)]
pub(crate) async fn delete_service(
    ctx: RequestContext,
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let user = ctx.require_user()?.clone();
    tracing::info!(service = %name, actor = %user.username, "Deleting service");

    let warnings = state
        .catalog
        .delete(&name, Some(&user))
        .await
        .map_err(ApiError::from)?;
    for warning in &warnings {
        tracing::warn!(service = %name, code = warning.code, "{}", warning.message);
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Aggregated Kubernetes health for a service.
///
/// GET /api/service-catalog/services/{name}/health
#[utoipa::path(
    get,
    path = "/api/service-catalog/services/{name}/health",
    tag = "services",
    params(("name" = String, Path, description = "Service name")),
    responses(
        (status = 200, description = "Health aggregated", body = ServiceHealthResponse),
        (status = 404, description = "Not found", body = ApiErrorBody),
        (status = 500, description = "Internal error", body = ApiErrorBody),
    )
)]
pub(crate) async fn service_health(
    ctx: RequestContext,
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    tracing::debug!(service = %name, request_id = %ctx.request_id, "Aggregating health");
    let health = state
        .aggregator
        .service_health(&name)
        .await
        .map_err(ApiError::from)?;
    Ok(Json(health_to_response(health)))
}

/// Change history for a service.
///
/// GET /api/service-catalog/services/{name}/history
#[utoipa::path(
    get,
    path = "/api/service-catalog/services/{name}/history",
    tag = "services",
    params(("name" = String, Path, description = "Service name")),
    responses(
        (status = 200, description = "History returned", body = ServiceHistoryResponse),
        (status = 404, description = "Not found", body = ApiErrorBody),
        (status = 503, description = "Versioning disabled", body = ApiErrorBody),
    )
)]
pub(crate) async fn service_history(
    ctx: RequestContext,
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    tracing::debug!(service = %name, request_id = %ctx.request_id, "Reading history");

    // History for a service that never existed is a 404, not an empty page.
    state.catalog.get(&name).await.map_err(ApiError::from)?;
    let history = state.catalog.history(&name).await.map_err(ApiError::from)?;

    Ok(Json(ServiceHistoryResponse {
        service: name,
        history: history.into_iter().map(change_to_body).collect(),
    }))
}

/// Resolve the owning service of a deployment triple.
///
/// GET /api/service-catalog/resolve
#[utoipa::path(
    get,
    path = "/api/service-catalog/resolve",
    tag = "services",
    params(ResolveQuery),
    responses(
        (status = 200, description = "Lookup performed", body = ResolveResponse),
        (status = 500, description = "Internal error", body = ApiErrorBody),
    )
)]
pub(crate) async fn resolve_deployment(
    ctx: RequestContext,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ResolveQuery>,
) -> Result<impl IntoResponse, ApiError> {
    tracing::debug!(
        deployment = %query.deployment,
        namespace = %query.namespace,
        context = %query.context,
        request_id = %ctx.request_id,
        "Resolving deployment owner"
    );

    let owner = state
        .resolver
        .resolve(&query.deployment, &query.namespace, &query.context)
        .await
        .map_err(ApiError::from)?;

    Ok(Json(ResolveResponse {
        found: owner.is_some(),
        service_context: owner.map(context_to_body),
    }))
}

// ============================================================================
// Conversions
// ============================================================================

fn parse_tier(tier: Option<&str>) -> Result<Tier, ApiError> {
    match tier {
        None => Ok(Tier::default()),
        Some(value) => {
            Tier::from_str(value).map_err(|e| ApiError::bad_request(e.to_string()))
        }
    }
}

fn parse_impact(impact: &str) -> Result<Impact, ApiError> {
    match impact {
        "high" => Ok(Impact::High),
        "medium" => Ok(Impact::Medium),
        "low" => Ok(Impact::Low),
        other => Err(ApiError::bad_request(format!(
            "unknown impact '{other}' (expected high, medium, or low)"
        ))),
    }
}

fn filter_from_query(query: &ListQuery) -> Result<ServiceFilter, ApiError> {
    let tier = match query.tier.as_deref() {
        None => None,
        Some(value) => {
            Some(Tier::from_str(value).map_err(|e| ApiError::bad_request(e.to_string()))?)
        }
    };
    Ok(ServiceFilter {
        team: query.team.clone(),
        tier,
        status: query.status.clone(),
        search: query.search.clone(),
        limit: query.limit,
        offset: query.offset.unwrap_or(0),
    })
}

fn echo_filter(filter: &ServiceFilter) -> FilterEcho {
    FilterEcho {
        team: filter.team.clone(),
        tier: filter.tier.map(|t| t.as_str().to_string()),
        status: filter.status.clone(),
        search: filter.search.clone(),
        limit: filter.limit,
        offset: filter.offset,
    }
}

fn create_request_to_service(req: CreateServiceRequest) -> Result<Service, ApiError> {
    build_service(
        req.name,
        req.tier,
        req.description,
        req.team,
        req.business,
        req.technology,
        req.kubernetes,
        req.observability,
        req.runbooks,
    )
}

fn update_request_to_service(name: &str, req: UpdateServiceRequest) -> Result<Service, ApiError> {
    build_service(
        name.to_string(),
        req.tier,
        req.description,
        req.team,
        req.business,
        req.technology,
        req.kubernetes,
        req.observability,
        req.runbooks,
    )
}

#[allow(clippy::too_many_arguments)]
fn build_service(
    name: String,
    tier: Option<String>,
    description: String,
    team: TeamBody,
    business: Option<BusinessBody>,
    technology: Option<TechnologyBody>,
    kubernetes: Option<KubernetesBody>,
    observability: Option<ObservabilityBody>,
    runbooks: Vec<RunbookBody>,
) -> Result<Service, ApiError> {
    let business = business
        .map(|b| {
            Ok::<_, ApiError>(BusinessSpec {
                sla_target: b.sla_target,
                dependencies: b.dependencies,
                impact: b.impact.as_deref().map(parse_impact).transpose()?,
            })
        })
        .transpose()?;

    Ok(Service {
        api_version: String::new(),
        kind: String::new(),
        metadata: ServiceMetadata {
            name,
            tier: parse_tier(tier.as_deref())?,
            created_at: None,
            created_by: None,
            updated_at: None,
            updated_by: None,
            version: 0,
        },
        spec: ServiceSpec {
            description,
            team: TeamSpec {
                github_team: team.github_team,
                members: None,
                url: None,
            },
            business,
            technology: technology.map(|t| TechnologySpec {
                language: t.language,
                framework: t.framework,
            }),
            kubernetes: kubernetes.map(kubernetes_from_body),
            observability: observability.map(|o| ObservabilitySpec {
                metrics: o.metrics,
                logs: o.logs,
                traces: o.traces,
            }),
            runbooks: runbooks
                .into_iter()
                .map(|r| Runbook {
                    name: r.name,
                    url: r.url,
                })
                .collect(),
        },
    })
}

fn kubernetes_from_body(body: KubernetesBody) -> KubernetesSpec {
    KubernetesSpec {
        environments: body
            .environments
            .into_iter()
            .map(|env| Environment {
                name: env.name,
                context: env.context,
                namespace: env.namespace,
                resources: EnvironmentResources {
                    deployments: env
                        .resources
                        .deployments
                        .into_iter()
                        .map(|d| DeploymentSpec {
                            name: d.name,
                            replicas: d.replicas,
                            resources: d.resources.map(|r| ResourceRequirements {
                                requests: r.requests.map(quantities_from_body),
                                limits: r.limits.map(quantities_from_body),
                            }),
                        })
                        .collect(),
                    services: env.resources.services,
                    configmaps: env.resources.configmaps,
                },
            })
            .collect(),
    }
}

fn quantities_from_body(body: ResourceQuantitiesBody) -> ResourceQuantities {
    ResourceQuantities {
        cpu: body.cpu,
        memory: body.memory,
    }
}

fn quantities_to_body(quantities: ResourceQuantities) -> ResourceQuantitiesBody {
    ResourceQuantitiesBody {
        cpu: quantities.cpu,
        memory: quantities.memory,
    }
}

fn kubernetes_to_body(spec: KubernetesSpec) -> KubernetesBody {
    KubernetesBody {
        environments: spec
            .environments
            .into_iter()
            .map(|env| EnvironmentBody {
                name: env.name,
                context: env.context,
                namespace: env.namespace,
                resources: EnvironmentResourcesBody {
                    deployments: env
                        .resources
                        .deployments
                        .into_iter()
                        .map(|d| DeploymentBody {
                            name: d.name,
                            replicas: d.replicas,
                            resources: d.resources.map(|r| ResourceRequirementsBody {
                                requests: r.requests.map(quantities_to_body),
                                limits: r.limits.map(quantities_to_body),
                            }),
                        })
                        .collect(),
                    services: env.resources.services,
                    configmaps: env.resources.configmaps,
                },
            })
            .collect(),
    }
}

fn impact_to_string(impact: Impact) -> String {
    match impact {
        Impact::High => "high",
        Impact::Medium => "medium",
        Impact::Low => "low",
    }
    .to_string()
}

pub(crate) fn service_to_response(service: Service) -> ServiceResponse {
    let metadata = service.metadata;
    let spec = service.spec;
    ServiceResponse {
        name: metadata.name,
        tier: metadata.tier.as_str().to_string(),
        version: metadata.version,
        created_at: metadata.created_at.map(|t| t.to_rfc3339()),
        created_by: metadata.created_by,
        updated_at: metadata.updated_at.map(|t| t.to_rfc3339()),
        updated_by: metadata.updated_by,
        description: spec.description,
        team: TeamBody {
            github_team: spec.team.github_team,
            members: spec.team.members,
            github_url: spec.team.url,
        },
        business: spec.business.map(|b| BusinessBody {
            sla_target: b.sla_target,
            dependencies: b.dependencies,
            impact: b.impact.map(impact_to_string),
        }),
        technology: spec.technology.map(|t| TechnologyBody {
            language: t.language,
            framework: t.framework,
        }),
        kubernetes: spec.kubernetes.map(kubernetes_to_body),
        observability: spec.observability.map(|o| ObservabilityBody {
            metrics: o.metrics,
            logs: o.logs,
            traces: o.traces,
        }),
        runbooks: spec
            .runbooks
            .into_iter()
            .map(|r| RunbookBody {
                name: r.name,
                url: r.url,
            })
            .collect(),
    }
}

fn warning_to_body(warning: Warning) -> WarningBody {
    WarningBody {
        code: warning.code.to_string(),
        message: warning.message,
    }
}

fn deployment_health_to_body(health: DeploymentHealth) -> DeploymentHealthBody {
    DeploymentHealthBody {
        name: health.name,
        ready_replicas: health.ready_replicas,
        desired_replicas: health.desired_replicas,
        status: health.status.as_str().to_string(),
        last_updated: health.last_updated.map(|t| t.to_rfc3339()),
    }
}

fn environment_health_to_body(health: EnvironmentHealth) -> EnvironmentHealthBody {
    EnvironmentHealthBody {
        name: health.name,
        context: health.context,
        status: health.status.as_str().to_string(),
        deployments: health
            .deployments
            .into_iter()
            .map(deployment_health_to_body)
            .collect(),
    }
}

fn health_to_response(health: ServiceHealth) -> ServiceHealthResponse {
    ServiceHealthResponse {
        service_name: health.service_name,
        overall_status: health.overall_status.as_str().to_string(),
        environments: health
            .environments
            .into_iter()
            .map(environment_health_to_body)
            .collect(),
        last_updated: health.last_updated.to_rfc3339(),
    }
}

fn change_to_body(change: ServiceChange) -> ChangeBody {
    ChangeBody {
        id: change.id,
        author: change.author,
        email: change.email,
        timestamp: change.timestamp.to_rfc3339(),
        message: change.message,
        field_changes: change
            .field_changes
            .into_iter()
            .map(|c| FieldChangeBody {
                field: c.field,
                old_value: c.old_value,
                new_value: c.new_value,
            })
            .collect(),
    }
}

fn context_to_body(ctx: ServiceContext) -> ServiceContextBody {
    ServiceContextBody {
        service_name: ctx.service_name,
        service_tier: ctx.service_tier.as_str().to_string(),
        environment: ctx.environment,
        context: ctx.context,
        team: ctx.team,
        description: ctx.description,
    }
}
