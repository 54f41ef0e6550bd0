//! API server implementation.
//!
//! Wires the catalog, the health aggregator, and the deployment resolver
//! behind the HTTP surface, plus health/ready/metrics endpoints.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::middleware;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use dashops_catalog::versioning::{NoneProvider, VersioningProvider};
use dashops_catalog::{Catalog, DeploymentResolver, HealthAggregator, MemoryStore, ServiceStore};
use dashops_core::kubernetes::{KubernetesFacade, StaticCluster};
use dashops_core::TeamDirectory;

use crate::config::{Config, CorsConfig};

// ============================================================================
// Health and Ready Responses
// ============================================================================

/// Health check response.
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
}

/// Readiness check response.
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct ReadyResponse {
    /// Service readiness status.
    pub ready: bool,
    /// Optional message about readiness state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

// ============================================================================
// Application State
// ============================================================================

/// Shared application state for all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Config,
    /// The catalog controller.
    pub catalog: Arc<Catalog>,
    /// The health aggregator.
    pub aggregator: Arc<HealthAggregator>,
    /// The deployment resolver.
    pub resolver: Arc<DeploymentResolver>,
    /// The raw store, for readiness probes.
    store: Arc<dyn ServiceStore>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("catalog", &self.catalog)
            .finish()
    }
}

// ============================================================================
// Route Handlers
// ============================================================================

/// Health check endpoint handler.
///
/// Returns 200 OK if the service is alive. This is a shallow check that
/// doesn't verify dependencies.
async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Readiness check endpoint handler.
///
/// Verifies the storage backend is reachable with a single existence probe.
async fn ready(
    axum::extract::State(state): axum::extract::State<Arc<AppState>>,
) -> impl IntoResponse {
    match state.store.exists("__dashops-ready-check").await {
        Ok(_) => (
            StatusCode::OK,
            Json(ReadyResponse {
                ready: true,
                message: None,
            }),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadyResponse {
                ready: false,
                message: Some(format!("storage check failed: {e}")),
            }),
        ),
    }
}

/// OpenAPI document endpoint handler.
async fn openapi_json() -> impl IntoResponse {
    Json(crate::openapi::openapi())
}

// ============================================================================
// Server
// ============================================================================

/// The Dash-Ops API server.
pub struct Server {
    config: Config,
    store: Arc<dyn ServiceStore>,
    versioning: Arc<dyn VersioningProvider>,
    kubernetes: Arc<dyn KubernetesFacade>,
    teams: Option<Arc<dyn TeamDirectory>>,
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("config", &self.config)
            .field("store", &"<ServiceStore>")
            .field("versioning_enabled", &self.versioning.is_enabled())
            .field("kubernetes", &"<KubernetesFacade>")
            .field("teams", &self.teams.is_some())
            .finish()
    }
}

impl Server {
    /// Creates a server with in-memory backends and no history.
    ///
    /// Intended for tests and local experiments; production wiring supplies
    /// real backends through the `with_*` methods.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            store: Arc::new(MemoryStore::new()),
            versioning: Arc::new(NoneProvider),
            kubernetes: Arc::new(StaticCluster::new()),
            teams: None,
        }
    }

    /// Replaces the service store.
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn ServiceStore>) -> Self {
        self.store = store;
        self
    }

    /// Replaces the versioning provider.
    #[must_use]
    pub fn with_versioning(mut self, versioning: Arc<dyn VersioningProvider>) -> Self {
        self.versioning = versioning;
        self
    }

    /// Replaces the Kubernetes facade.
    #[must_use]
    pub fn with_kubernetes(mut self, kubernetes: Arc<dyn KubernetesFacade>) -> Self {
        self.kubernetes = kubernetes;
        self
    }

    /// Attaches a team directory for enrichment.
    #[must_use]
    pub fn with_team_directory(mut self, teams: Arc<dyn TeamDirectory>) -> Self {
        self.teams = Some(teams);
        self
    }

    /// Returns the server configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Creates the router with all routes and middleware.
    #[must_use]
    pub fn router(&self) -> Router {
        let mut catalog = Catalog::new(Arc::clone(&self.store), Arc::clone(&self.versioning));
        if let Some(teams) = &self.teams {
            catalog = catalog.with_team_directory(Arc::clone(teams));
        }
        let catalog = Arc::new(catalog);

        let state = Arc::new(AppState {
            config: self.config.clone(),
            aggregator: Arc::new(HealthAggregator::new(
                Arc::clone(&catalog),
                Arc::clone(&self.kubernetes),
            )),
            resolver: Arc::new(DeploymentResolver::new(Arc::clone(&catalog))),
            catalog,
            store: Arc::clone(&self.store),
        });

        let auth_layer =
            middleware::from_fn_with_state(Arc::clone(&state), crate::context::auth_middleware);
        let metrics_layer = middleware::from_fn(crate::metrics::metrics_middleware);

        Router::new()
            // Health, ready, metrics, and the OpenAPI document (no auth).
            .route("/health", get(health))
            .route("/ready", get(ready))
            .route("/metrics", get(crate::metrics::serve_metrics))
            .route("/openapi.json", get(openapi_json))
            // Catalog routes (identity via RequestContext extractor).
            .nest(
                "/api/service-catalog",
                crate::routes::service_catalog_routes().layer(auth_layer),
            )
            // Middleware (order matters): metrics outermost, then trace, then CORS.
            .layer(self.build_cors_layer())
            .layer(TraceLayer::new_for_http())
            .layer(metrics_layer)
            .with_state(state)
    }

    /// Returns a router for in-process testing.
    #[must_use]
    pub fn test_router(&self) -> Router {
        self.router()
    }

    /// Binds the configured port and serves until shutdown.
    ///
    /// # Errors
    ///
    /// Returns an error when the port cannot be bound or the server fails.
    pub async fn serve(self) -> dashops_core::Result<()> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.config.http_port));
        let router = self.router();

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| dashops_core::Error::backend("http", "bind", e.to_string()))?;
        tracing::info!(addr = %addr, "Dash-Ops API listening");

        axum::serve(listener, router)
            .await
            .map_err(|e| dashops_core::Error::backend("http", "serve", e.to_string()))
    }

    /// Builds the CORS layer from configuration.
    fn build_cors_layer(&self) -> CorsLayer {
        let cors_config = &self.config.cors;
        let cors = Self::build_cors_base(cors_config);
        Self::apply_cors_allowed_origins(cors, cors_config)
    }

    fn build_cors_base(cors_config: &CorsConfig) -> CorsLayer {
        CorsLayer::new()
            .allow_methods([
                Method::GET,
                Method::HEAD,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([
                header::AUTHORIZATION,
                header::CONTENT_TYPE,
                header::ACCEPT,
                header::HeaderName::from_static("x-user"),
                header::HeaderName::from_static("x-email"),
                header::HeaderName::from_static("x-teams"),
                header::HeaderName::from_static("x-request-id"),
            ])
            .expose_headers([
                header::CONTENT_TYPE,
                header::LOCATION,
                header::HeaderName::from_static("x-request-id"),
            ])
            .max_age(Duration::from_secs(cors_config.max_age_seconds))
    }

    fn apply_cors_allowed_origins(cors: CorsLayer, cors_config: &CorsConfig) -> CorsLayer {
        if cors_config.allowed_origins.is_empty() {
            return cors;
        }

        let any_origin = cors_config.allowed_origins.len() == 1
            && cors_config
                .allowed_origins
                .first()
                .is_some_and(|origin| origin == "*");
        if any_origin {
            return cors.allow_origin(Any);
        }

        if cors_config.allowed_origins.iter().any(|origin| origin == "*") {
            tracing::error!(
                origins = ?cors_config.allowed_origins,
                "Invalid CORS config: '*' must be the only allowed origin"
            );
            return cors;
        }

        let allowed: Vec<HeaderValue> = cors_config
            .allowed_origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::error!(origin = %origin, "Invalid CORS origin; skipping");
                    None
                }
            })
            .collect();

        if allowed.is_empty() {
            tracing::warn!("All configured CORS origins were invalid; disabling CORS");
            cors
        } else {
            cors.allow_origin(AllowOrigin::list(allowed))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn debug_config() -> Config {
        Config {
            debug: true,
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn health_endpoint_is_open() {
        let router = Server::new(debug_config()).test_router();
        let response = router
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn ready_endpoint_probes_storage() {
        let router = Server::new(debug_config()).test_router();
        let response = router
            .oneshot(Request::builder().uri("/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn openapi_document_is_served() {
        let router = Server::new(debug_config()).test_router();
        let response = router
            .oneshot(
                Request::builder()
                    .uri("/openapi.json")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
