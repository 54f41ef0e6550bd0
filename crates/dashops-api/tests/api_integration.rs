//! API integration tests.
//!
//! Tests the complete request flow: HTTP -> routes -> catalog -> storage.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use tower::ServiceExt;

use dashops_api::config::Config;
use dashops_api::server::Server;
use dashops_catalog::versioning::{SimpleProvider, VersioningProvider};
use dashops_catalog::FilesystemStore;
use dashops_core::kubernetes::{healthy_observation, StaticCluster};

fn debug_config() -> Config {
    Config {
        debug: true,
        ..Config::default()
    }
}

/// In-memory router: memory store, versioning disabled, empty cluster.
fn test_router() -> axum::Router {
    Server::new(debug_config()).test_router()
}

async fn filesystem_router(dir: &std::path::Path) -> axum::Router {
    let store = Arc::new(FilesystemStore::new(dir));
    store.initialize().await.unwrap();
    let versioning = Arc::new(SimpleProvider::new(dir));
    versioning.initialize().await.unwrap();

    Server::new(debug_config())
        .with_store(store)
        .with_versioning(versioning)
        .test_router()
}

fn service_body(name: &str) -> serde_json::Value {
    serde_json::json!({
        "name": name,
        "tier": "TIER-1",
        "description": format!("{name} service"),
        "team": {"github_team": "platform"},
        "kubernetes": {
            "environments": [{
                "name": "production",
                "context": "prod",
                "namespace": "shop",
                "resources": {
                    "deployments": [{"name": format!("{name}-api"), "replicas": 3}]
                }
            }]
        }
    })
}

mod helpers {
    use super::*;

    pub fn request(
        method: Method,
        uri: &str,
        body: Option<serde_json::Value>,
        authenticated: bool,
    ) -> Result<Request<Body>> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");

        if authenticated {
            builder = builder
                .header("X-User", "jdoe")
                .header("X-Email", "jdoe@example.com")
                .header("X-Teams", "platform");
        }

        let body = match body {
            Some(v) => Body::from(serde_json::to_vec(&v).context("serialize request body")?),
            None => Body::empty(),
        };
        builder.body(body).context("build request")
    }

    pub async fn send(
        router: axum::Router,
        request: Request<Body>,
    ) -> Result<(StatusCode, serde_json::Value)> {
        let response = router.oneshot(request).await?;
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), 256 * 1024)
            .await
            .context("read response body")?;
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).with_context(|| {
                format!(
                    "parse JSON response (status={status}): {}",
                    String::from_utf8_lossy(&bytes)
                )
            })?
        };
        Ok((status, json))
    }
}

#[tokio::test]
async fn create_then_get_round_trips() -> Result<()> {
    let router = test_router();

    let (status, body) = helpers::send(
        router.clone(),
        helpers::request(
            Method::POST,
            "/api/service-catalog/services",
            Some(service_body("cart")),
            true,
        )?,
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["service"]["name"], "cart");
    assert_eq!(body["service"]["version"], 1);
    assert_eq!(body["service"]["tier"], "TIER-1");
    assert_eq!(body["service"]["created_by"], "jdoe");

    let (status, body) = helpers::send(
        router,
        helpers::request(Method::GET, "/api/service-catalog/services/cart", None, false)?,
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "cart");
    assert_eq!(body["team"]["github_team"], "platform");
    Ok(())
}

#[tokio::test]
async fn create_sets_location_header() -> Result<()> {
    let router = test_router();
    let response = router
        .oneshot(helpers::request(
            Method::POST,
            "/api/service-catalog/services",
            Some(service_body("cart")),
            true,
        )?)
        .await
        ?;

    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(
        response.headers().get(header::LOCATION).unwrap(),
        "/api/service-catalog/services/cart"
    );
    Ok(())
}

#[tokio::test]
async fn missing_description_is_rejected_and_leaves_no_file() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let router = filesystem_router(dir.path()).await;

    let mut body = service_body("cart");
    body["description"] = serde_json::json!("");

    let (status, _) = helpers::send(
        router,
        helpers::request(Method::POST, "/api/service-catalog/services", Some(body), true)?,
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(!dir.path().join("cart.yaml").exists());
    Ok(())
}

#[tokio::test]
async fn duplicate_create_conflicts() -> Result<()> {
    let router = test_router();

    let (status, _) = helpers::send(
        router.clone(),
        helpers::request(
            Method::POST,
            "/api/service-catalog/services",
            Some(service_body("cart")),
            true,
        )?,
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = helpers::send(
        router,
        helpers::request(
            Method::POST,
            "/api/service-catalog/services",
            Some(service_body("cart")),
            true,
        )?,
    )
    .await?;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");
    Ok(())
}

#[tokio::test]
async fn anonymous_mutations_are_unauthorized() -> Result<()> {
    let router = test_router();

    let (status, body) = helpers::send(
        router,
        helpers::request(
            Method::POST,
            "/api/service-catalog/services",
            Some(service_body("cart")),
            false,
        )?,
    )
    .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "MISSING_AUTH");
    Ok(())
}

#[tokio::test]
async fn foreign_team_updates_are_forbidden() -> Result<()> {
    let router = test_router();
    helpers::send(
        router.clone(),
        helpers::request(
            Method::POST,
            "/api/service-catalog/services",
            Some(service_body("cart")),
            true,
        )?,
    )
    .await?;

    let update = serde_json::json!({
        "tier": "TIER-1",
        "description": "new description",
        "team": {"github_team": "platform"},
    });
    let request = Request::builder()
        .method(Method::PUT)
        .uri("/api/service-catalog/services/cart")
        .header(header::CONTENT_TYPE, "application/json")
        .header("X-User", "mallory")
        .header("X-Email", "mallory@example.com")
        .header("X-Teams", "growth")
        .body(Body::from(serde_json::to_vec(&update)?))?;

    let (status, body) = helpers::send(router, request).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");
    Ok(())
}

#[tokio::test]
async fn update_bumps_version() -> Result<()> {
    let router = test_router();
    helpers::send(
        router.clone(),
        helpers::request(
            Method::POST,
            "/api/service-catalog/services",
            Some(service_body("cart")),
            true,
        )?,
    )
    .await?;

    let update = serde_json::json!({
        "tier": "TIER-2",
        "description": "rewritten",
        "team": {"github_team": "platform"},
    });
    let (status, body) = helpers::send(
        router,
        helpers::request(
            Method::PUT,
            "/api/service-catalog/services/cart",
            Some(update),
            true,
        )?,
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["service"]["version"], 2);
    assert_eq!(body["service"]["tier"], "TIER-2");
    assert_eq!(body["service"]["description"], "rewritten");
    Ok(())
}

#[tokio::test]
async fn delete_returns_no_content_then_404() -> Result<()> {
    let router = test_router();
    helpers::send(
        router.clone(),
        helpers::request(
            Method::POST,
            "/api/service-catalog/services",
            Some(service_body("cart")),
            true,
        )?,
    )
    .await?;

    let (status, _) = helpers::send(
        router.clone(),
        helpers::request(
            Method::DELETE,
            "/api/service-catalog/services/cart",
            None,
            true,
        )?,
    )
    .await?;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = helpers::send(
        router,
        helpers::request(Method::GET, "/api/service-catalog/services/cart", None, false)?,
    )
    .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn list_supports_filters_and_pagination() -> Result<()> {
    let router = test_router();
    for name in ["cart", "checkout", "ledger"] {
        let mut body = service_body(name);
        if name == "ledger" {
            body["team"]["github_team"] = serde_json::json!("billing");
        }
        // Each service must own distinct deployments.
        helpers::send(
            router.clone(),
            helpers::request(Method::POST, "/api/service-catalog/services", Some(body), true)?,
        )
        .await?;
    }

    let (status, body) = helpers::send(
        router.clone(),
        helpers::request(
            Method::GET,
            "/api/service-catalog/services?team=PLATFORM",
            None,
            false,
        )?,
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);
    assert_eq!(body["filters"]["team"], "PLATFORM");

    let (status, body) = helpers::send(
        router,
        helpers::request(
            Method::GET,
            "/api/service-catalog/services?limit=1&offset=5",
            None,
            false,
        )?,
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 3);
    assert_eq!(body["services"].as_array().unwrap().len(), 0);
    Ok(())
}

#[tokio::test]
async fn history_is_unavailable_without_versioning() -> Result<()> {
    // Default test server runs the `none` provider.
    let router = test_router();
    helpers::send(
        router.clone(),
        helpers::request(
            Method::POST,
            "/api/service-catalog/services",
            Some(service_body("cart")),
            true,
        )?,
    )
    .await?;

    let (status, body) = helpers::send(
        router,
        helpers::request(
            Method::GET,
            "/api/service-catalog/services/cart/history",
            None,
            false,
        )?,
    )
    .await?;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["code"], "SERVICE_UNAVAILABLE");
    Ok(())
}

#[tokio::test]
async fn history_returns_records_newest_first() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let router = filesystem_router(dir.path()).await;

    helpers::send(
        router.clone(),
        helpers::request(
            Method::POST,
            "/api/service-catalog/services",
            Some(service_body("cart")),
            true,
        )?,
    )
    .await?;
    let update = serde_json::json!({
        "tier": "TIER-1",
        "description": "rewritten",
        "team": {"github_team": "platform"},
    });
    helpers::send(
        router.clone(),
        helpers::request(
            Method::PUT,
            "/api/service-catalog/services/cart",
            Some(update),
            true,
        )?,
    )
    .await?;

    let (status, body) = helpers::send(
        router,
        helpers::request(
            Method::GET,
            "/api/service-catalog/services/cart/history",
            None,
            false,
        )?,
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    let history = body["history"].as_array().unwrap();
    assert_eq!(history.len(), 2);
    assert!(history[0]["message"].as_str().unwrap().starts_with("update"));
    assert!(history[1]["message"].as_str().unwrap().starts_with("create"));
    Ok(())
}

#[tokio::test]
async fn health_endpoint_aggregates_cluster_state() -> Result<()> {
    let cluster = Arc::new(StaticCluster::new());
    cluster.set_deployment("prod", "shop", "cart-api", healthy_observation(3, 3));

    let router = Server::new(debug_config())
        .with_kubernetes(cluster)
        .test_router();

    helpers::send(
        router.clone(),
        helpers::request(
            Method::POST,
            "/api/service-catalog/services",
            Some(service_body("cart")),
            true,
        )?,
    )
    .await?;

    let (status, body) = helpers::send(
        router,
        helpers::request(
            Method::GET,
            "/api/service-catalog/services/cart/health",
            None,
            false,
        )?,
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["service_name"], "cart");
    assert_eq!(body["overall_status"], "healthy");
    assert_eq!(body["environments"][0]["status"], "healthy");
    assert_eq!(body["environments"][0]["deployments"][0]["ready_replicas"], 3);
    Ok(())
}

#[tokio::test]
async fn health_for_unknown_service_is_404() -> Result<()> {
    let router = test_router();
    let (status, _) = helpers::send(
        router,
        helpers::request(
            Method::GET,
            "/api/service-catalog/services/ghost/health",
            None,
            false,
        )?,
    )
    .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn resolve_endpoint_projects_the_owner() -> Result<()> {
    let router = test_router();
    helpers::send(
        router.clone(),
        helpers::request(
            Method::POST,
            "/api/service-catalog/services",
            Some(service_body("cart")),
            true,
        )?,
    )
    .await?;

    let (status, body) = helpers::send(
        router.clone(),
        helpers::request(
            Method::GET,
            "/api/service-catalog/resolve?deployment=cart-api&namespace=shop&context=prod",
            None,
            false,
        )?,
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["found"], true);
    assert_eq!(body["service_context"]["service_name"], "cart");
    assert_eq!(body["service_context"]["service_tier"], "TIER-1");
    assert_eq!(body["service_context"]["environment"], "production");

    let (status, body) = helpers::send(
        router,
        helpers::request(
            Method::GET,
            "/api/service-catalog/resolve?deployment=ghost&namespace=shop&context=prod",
            None,
            false,
        )?,
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["found"], false);
    Ok(())
}

#[tokio::test]
async fn responses_echo_a_request_id() -> Result<()> {
    let router = test_router();
    let response = router
        .oneshot(
            Request::builder()
                .method(Method::GET)
                .uri("/api/service-catalog/services")
                .header("X-Request-Id", "req-abc")
                .body(Body::empty())?,
        )
        .await
        ?;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("x-request-id").unwrap(), "req-abc");
    Ok(())
}
