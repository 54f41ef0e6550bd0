//! Git versioning provider against a real working tree.
//!
//! These tests shell out to the `git` binary, mirroring production use.

use std::sync::Arc;

use dashops_catalog::versioning::{GitProvider, VersioningProvider};
use dashops_catalog::{
    Catalog, CatalogError, FilesystemStore, Service, ServiceMetadata, ServiceSpec, TeamSpec,
};
use dashops_core::{Tier, UserContext};

fn definition(name: &str) -> Service {
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
            description: "A service".to_string(),
            team: TeamSpec {
                github_team: "platform".to_string(),
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

fn user() -> UserContext {
    UserContext::new("jdoe", "Jane Doe", "jdoe@example.com")
        .with_teams(vec!["platform".to_string()])
}

#[tokio::test]
async fn mutations_become_commits_with_the_user_as_author() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FilesystemStore::new(dir.path()));
    store.initialize().await.unwrap();
    let versioning = Arc::new(GitProvider::new(dir.path()));
    versioning.initialize().await.unwrap();
    assert!(dir.path().join(".git").exists());
    assert!(dir.path().join(".gitignore").exists());

    let catalog = Catalog::new(store, versioning);
    catalog
        .create(definition("cart"), Some(&user()))
        .await
        .unwrap();

    let mut replacement = definition("cart");
    replacement.spec.description = "rewritten".to_string();
    catalog.update(replacement, Some(&user())).await.unwrap();

    let history = catalog.history("cart").await.unwrap();
    assert_eq!(history.len(), 2);
    assert!(history[0].message.starts_with("update service cart"));
    assert!(history[1].message.starts_with("create service cart"));
    assert_eq!(history[0].author, "Jane Doe");
    assert_eq!(history[0].email, "jdoe@example.com");
    assert!(history[0].timestamp >= history[1].timestamp);
}

#[tokio::test]
async fn deletion_is_recorded_against_the_removed_file() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FilesystemStore::new(dir.path()));
    store.initialize().await.unwrap();
    let versioning = Arc::new(GitProvider::new(dir.path()));
    versioning.initialize().await.unwrap();

    let catalog = Catalog::new(store, versioning);
    catalog
        .create(definition("cart"), Some(&user()))
        .await
        .unwrap();
    let warnings = catalog.delete("cart", Some(&user())).await.unwrap();
    assert!(warnings.is_empty());

    let history = catalog.history("cart").await.unwrap();
    assert_eq!(history.len(), 2);
    assert!(history[0].message.starts_with("delete service cart"));
}

#[tokio::test]
async fn history_scopes_to_one_service() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FilesystemStore::new(dir.path()));
    store.initialize().await.unwrap();
    let versioning = Arc::new(GitProvider::new(dir.path()));
    versioning.initialize().await.unwrap();

    let catalog = Catalog::new(store, versioning);
    catalog
        .create(definition("cart"), Some(&user()))
        .await
        .unwrap();
    catalog
        .create(definition("billing"), Some(&user()))
        .await
        .unwrap();

    assert_eq!(catalog.history("cart").await.unwrap().len(), 1);
    assert_eq!(catalog.history("billing").await.unwrap().len(), 1);
}

#[tokio::test]
async fn refuses_directory_with_simple_history_state() {
    let dir = tempfile::tempdir().unwrap();
    tokio::fs::create_dir(dir.path().join(".history"))
        .await
        .unwrap();

    let provider = GitProvider::new(dir.path());
    assert!(matches!(
        provider.initialize().await,
        Err(CatalogError::Conflict { .. })
    ));
}
