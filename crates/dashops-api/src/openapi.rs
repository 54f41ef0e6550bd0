//! `OpenAPI` (3.x) specification generation for `dashops-api`.
//!
//! The generated spec feeds the frontend client and detects breaking API
//! changes in CI.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

/// `OpenAPI` documentation for the Dash-Ops REST API
/// (`/api/service-catalog/*`).
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Dash-Ops API",
        description = "Dash-Ops service catalog REST API"
    ),
    paths(
        crate::routes::services::list_services,
        crate::routes::services::create_service,
        crate::routes::services::get_service,
        crate::routes::services::update_service,
        crate::routes::services::delete_service,
        crate::routes::services::service_health,
        crate::routes::services::service_history,
        crate::routes::services::resolve_deployment,
    ),
    components(
        schemas(
            crate::error::ApiErrorBody,
            crate::routes::services::CreateServiceRequest,
            crate::routes::services::UpdateServiceRequest,
            crate::routes::services::ServiceResponse,
            crate::routes::services::ServiceEnvelope,
            crate::routes::services::WarningBody,
            crate::routes::services::ListServicesResponse,
            crate::routes::services::FilterEcho,
            crate::routes::services::TeamBody,
            crate::routes::services::BusinessBody,
            crate::routes::services::TechnologyBody,
            crate::routes::services::KubernetesBody,
            crate::routes::services::EnvironmentBody,
            crate::routes::services::EnvironmentResourcesBody,
            crate::routes::services::DeploymentBody,
            crate::routes::services::ResourceRequirementsBody,
            crate::routes::services::ResourceQuantitiesBody,
            crate::routes::services::ObservabilityBody,
            crate::routes::services::RunbookBody,
            crate::routes::services::ServiceHealthResponse,
            crate::routes::services::EnvironmentHealthBody,
            crate::routes::services::DeploymentHealthBody,
            crate::routes::services::ServiceHistoryResponse,
            crate::routes::services::ChangeBody,
            crate::routes::services::FieldChangeBody,
            crate::routes::services::ResolveResponse,
            crate::routes::services::ServiceContextBody,
        )
    ),
    tags(
        (name = "services", description = "Service catalog operations"),
    ),
    modifiers(&SecurityAddon),
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearerAuth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

/// Returns the generated `OpenAPI` spec.
#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}
