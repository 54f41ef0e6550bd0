//! End-to-end catalog flows over a real filesystem store.
//!
//! Covers the CRUD round-trip laws, audit-field immutability, history
//! growth, deployment-ownership disjointness, and authorization.

use std::sync::Arc;

use dashops_catalog::versioning::{SimpleProvider, VersioningProvider};
use dashops_catalog::{
    Catalog, CatalogError, DeploymentSpec, Environment, EnvironmentResources, FilesystemStore,
    Service, ServiceFilter, ServiceMetadata, ServiceSpec, TeamSpec,
};
use dashops_core::{Tier, UserContext};

fn definition(name: &str, team: &str) -> Service {
    Service {
        api_version: String::new(),
        kind: String::new(),
        metadata: ServiceMetadata {
            name: name.to_string(),
            tier: Tier::Tier2,
            created_at: None,
            created_by: None,
            updated_at: None,
            updated_by: None,
            version: 0,
        },
        spec: ServiceSpec {
            description: format!("{name} service"),
            team: TeamSpec {
                github_team: team.to_string(),
                members: None,
                url: None,
            },
            business: None,
            technology: None,
            kubernetes: None,
            observability: None,
            runbooks: Vec::new(),
        },
    }
}

fn with_deployment(mut service: Service, context: &str, namespace: &str, deployment: &str) -> Service {
    service.spec.kubernetes = Some(dashops_catalog::service::KubernetesSpec {
        environments: vec![Environment {
            name: "production".to_string(),
            context: context.to_string(),
            namespace: namespace.to_string(),
            resources: EnvironmentResources {
                deployments: vec![DeploymentSpec {
                    name: deployment.to_string(),
                    replicas: 2,
                    resources: None,
                }],
                ..EnvironmentResources::default()
            },
        }],
    });
    service
}

fn member() -> UserContext {
    UserContext::new("jdoe", "Jane Doe", "jdoe@example.com")
        .with_teams(vec!["platform".to_string()])
}

async fn catalog_in(dir: &std::path::Path) -> Catalog {
    let store = Arc::new(FilesystemStore::new(dir));
    store.initialize().await.unwrap();
    let versioning = Arc::new(SimpleProvider::new(dir));
    versioning.initialize().await.unwrap();
    Catalog::new(store, versioning)
}

#[tokio::test]
async fn create_then_get_round_trips_with_audit() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = catalog_in(dir.path()).await;

    let outcome = catalog
        .create(definition("cart", "platform"), Some(&member()))
        .await
        .unwrap();
    assert!(outcome.warnings.is_empty());

    let loaded = catalog.get("cart").await.unwrap();
    assert_eq!(loaded.metadata.version, 1);
    assert_eq!(loaded.metadata.created_by.as_deref(), Some("jdoe"));
    assert_eq!(loaded.metadata.updated_by.as_deref(), Some("jdoe"));
    assert!(loaded.metadata.created_at.is_some());
    assert_eq!(loaded.spec.description, "cart service");
    assert_eq!(loaded.api_version, "v1");
    assert_eq!(loaded.kind, "Service");
}

#[tokio::test]
async fn update_bumps_version_and_preserves_creation() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = catalog_in(dir.path()).await;

    let created = catalog
        .create(definition("cart", "platform"), Some(&member()))
        .await
        .unwrap()
        .service;

    let mut replacement = definition("cart", "platform");
    replacement.spec.description = "rewritten".to_string();
    let updated = catalog
        .update(replacement, Some(&member()))
        .await
        .unwrap()
        .service;

    assert_eq!(updated.metadata.version, created.metadata.version + 1);
    assert_eq!(updated.metadata.created_at, created.metadata.created_at);
    assert_eq!(updated.metadata.created_by, created.metadata.created_by);

    let loaded = catalog.get("cart").await.unwrap();
    assert_eq!(loaded.metadata.version, 2);
    assert_eq!(loaded.spec.description, "rewritten");
}

#[tokio::test]
async fn delete_removes_from_storage_and_listing() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = catalog_in(dir.path()).await;

    catalog
        .create(definition("cart", "platform"), Some(&member()))
        .await
        .unwrap();
    catalog
        .create(definition("billing", "platform"), Some(&member()))
        .await
        .unwrap();

    catalog.delete("cart", Some(&member())).await.unwrap();

    assert!(matches!(
        catalog.get("cart").await,
        Err(CatalogError::NotFound { .. })
    ));
    let listed = catalog.list(None).await.unwrap();
    assert_eq!(listed.total, 1);
    assert_eq!(listed.services[0].metadata.name, "billing");
    assert!(!dir.path().join("cart.yaml").exists());
}

#[tokio::test]
async fn every_mutation_appends_exactly_one_history_record() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = catalog_in(dir.path()).await;

    catalog
        .create(definition("cart", "platform"), Some(&member()))
        .await
        .unwrap();
    assert_eq!(catalog.history("cart").await.unwrap().len(), 1);

    let mut replacement = definition("cart", "platform");
    replacement.metadata.tier = Tier::Tier1;
    catalog.update(replacement, Some(&member())).await.unwrap();
    assert_eq!(catalog.history("cart").await.unwrap().len(), 2);

    catalog.delete("cart", Some(&member())).await.unwrap();
    let history = catalog.history("cart").await.unwrap();
    assert_eq!(history.len(), 3);

    // Newest first, monotonic timestamps.
    assert!(history[0].message.starts_with("delete"));
    assert!(history.windows(2).all(|w| w[0].timestamp >= w[1].timestamp));
}

#[tokio::test]
async fn update_history_carries_field_changes() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = catalog_in(dir.path()).await;

    catalog
        .create(definition("cart", "platform"), Some(&member()))
        .await
        .unwrap();
    let mut replacement = definition("cart", "platform");
    replacement.metadata.tier = Tier::Tier1;
    catalog.update(replacement, Some(&member())).await.unwrap();

    let history = catalog.history("cart").await.unwrap();
    let update = &history[0];
    assert_eq!(update.field_changes.len(), 1);
    assert_eq!(update.field_changes[0].field, "metadata.tier");
    assert_eq!(update.field_changes[0].old_value, "TIER-2");
    assert_eq!(update.field_changes[0].new_value, "TIER-1");
}

#[tokio::test]
async fn duplicate_names_are_rejected_case_insensitively() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = catalog_in(dir.path()).await;

    catalog
        .create(definition("cart", "platform"), Some(&member()))
        .await
        .unwrap();
    // Normalization lower-cases, so this collides with the stored entry.
    assert!(matches!(
        catalog.create(definition("CART", "platform"), Some(&member())).await,
        Err(CatalogError::AlreadyExists { .. })
    ));
}

#[tokio::test]
async fn deployment_ownership_is_disjoint_across_services() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = catalog_in(dir.path()).await;

    catalog
        .create(
            with_deployment(definition("cart", "platform"), "prod", "shop", "cart-api"),
            Some(&member()),
        )
        .await
        .unwrap();

    // A second service claiming the same triple is refused on create...
    let err = catalog
        .create(
            with_deployment(definition("basket", "platform"), "prod", "shop", "cart-api"),
            Some(&member()),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::Validation { .. }));
    assert!(err.to_string().contains("cart"));

    // ...and on update.
    catalog
        .create(definition("basket", "platform"), Some(&member()))
        .await
        .unwrap();
    let err = catalog
        .update(
            with_deployment(definition("basket", "platform"), "prod", "shop", "cart-api"),
            Some(&member()),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::Validation { .. }));

    // A service may keep its own triples across updates.
    let mut own = with_deployment(definition("cart", "platform"), "prod", "shop", "cart-api");
    own.spec.description = "updated".to_string();
    catalog.update(own, Some(&member())).await.unwrap();
}

#[tokio::test]
async fn authorization_probes() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = catalog_in(dir.path()).await;

    catalog
        .create(definition("cart", "platform"), Some(&member()))
        .await
        .unwrap();

    // Non-member is denied.
    let outsider = UserContext::new("mallory", "Mallory", "m@example.com")
        .with_teams(vec!["growth".to_string()]);
    assert!(matches!(
        catalog
            .update(definition("cart", "platform"), Some(&outsider))
            .await,
        Err(CatalogError::PermissionDenied { .. })
    ));

    // Case-differing membership succeeds.
    let shouty = UserContext::new("ann", "Ann", "a@example.com")
        .with_teams(vec!["PLATFORM".to_string()]);
    catalog
        .update(definition("cart", "platform"), Some(&shouty))
        .await
        .unwrap();
}

#[tokio::test]
async fn list_filters_compose_over_storage() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = catalog_in(dir.path()).await;

    catalog
        .create(definition("cart", "shop"), Some(&member()))
        .await
        .unwrap();
    catalog
        .create(definition("ledger", "billing"), Some(&member()))
        .await
        .unwrap();

    let filter = ServiceFilter {
        team: Some("BILLING".to_string()),
        ..ServiceFilter::default()
    };
    let result = catalog.list(Some(&filter)).await.unwrap();
    assert_eq!(result.total, 1);
    assert_eq!(result.services[0].metadata.name, "ledger");
}

#[tokio::test]
async fn concurrent_mutations_to_different_services_succeed() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = Arc::new(catalog_in(dir.path()).await);

    let mut handles = Vec::new();
    for i in 0..8 {
        let catalog = Arc::clone(&catalog);
        handles.push(tokio::spawn(async move {
            catalog
                .create(definition(&format!("svc-{i}"), "platform"), Some(&member()))
                .await
                .unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(catalog.list(None).await.unwrap().total, 8);
}
