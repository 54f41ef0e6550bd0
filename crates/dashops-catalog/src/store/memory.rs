//! In-memory service store for testing.
//!
//! Thread-safe via `RwLock`. Not suitable for production: state dies with
//! the process. Semantics mirror [`FilesystemStore`](super::FilesystemStore)
//! exactly, including the optimistic version check on update.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::{CatalogError, Result};
use crate::list::{process_service_list, ServiceFilter};
use crate::service::Service;
use crate::store::ServiceStore;

/// HashMap-backed store used by tests and debug bootstrap.
#[derive(Debug, Default)]
pub struct MemoryStore {
    services: RwLock<HashMap<String, Service>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned() -> CatalogError {
        CatalogError::Internal {
            message: "store lock poisoned".to_string(),
        }
    }
}

#[async_trait]
impl ServiceStore for MemoryStore {
    async fn create(&self, service: &Service) -> Result<Service> {
        let mut services = self.services.write().map_err(|_| Self::poisoned())?;
        let name = service.metadata.name.clone();
        if services.contains_key(&name) {
            return Err(CatalogError::AlreadyExists { name });
        }
        services.insert(name, service.clone());
        Ok(service.clone())
    }

    async fn get_by_name(&self, name: &str) -> Result<Service> {
        let services = self.services.read().map_err(|_| Self::poisoned())?;
        services
            .get(name)
            .cloned()
            .ok_or_else(|| CatalogError::NotFound {
                name: name.to_string(),
            })
    }

    async fn update(&self, service: &Service) -> Result<Service> {
        let mut services = self.services.write().map_err(|_| Self::poisoned())?;
        let name = service.metadata.name.clone();
        let current = services
            .get(&name)
            .ok_or_else(|| CatalogError::NotFound { name: name.clone() })?;

        if current.metadata.version + 1 != service.metadata.version {
            return Err(CatalogError::Conflict {
                message: format!(
                    "service {name} changed concurrently (stored version {}, update built against {})",
                    current.metadata.version,
                    service.metadata.version.saturating_sub(1),
                ),
            });
        }

        services.insert(name, service.clone());
        Ok(service.clone())
    }

    async fn delete(&self, name: &str) -> Result<()> {
        let mut services = self.services.write().map_err(|_| Self::poisoned())?;
        services
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| CatalogError::NotFound {
                name: name.to_string(),
            })
    }

    async fn list(&self, filter: Option<&ServiceFilter>) -> Result<Vec<Service>> {
        let services = self.services.read().map_err(|_| Self::poisoned())?;
        let all: Vec<Service> = services.values().cloned().collect();
        Ok(process_service_list(all, filter).services)
    }

    async fn exists(&self, name: &str) -> Result<bool> {
        let services = self.services.read().map_err(|_| Self::poisoned())?;
        Ok(services.contains_key(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::{ServiceMetadata, ServiceSpec, TeamSpec};
    use dashops_core::Tier;

    fn service(name: &str, version: u64) -> Service {
        Service {
            api_version: "v1".to_string(),
            kind: "Service".to_string(),
            metadata: ServiceMetadata {
                name: name.to_string(),
                tier: Tier::Tier3,
                created_at: None,
                created_by: None,
                updated_at: None,
                updated_by: None,
                version,
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

    #[tokio::test]
    async fn mirrors_filesystem_semantics() {
        let store = MemoryStore::new();
        store.create(&service("cart", 1)).await.unwrap();
        assert!(store.exists("cart").await.unwrap());
        assert!(matches!(
            store.create(&service("cart", 1)).await,
            Err(CatalogError::AlreadyExists { .. })
        ));

        store.update(&service("cart", 2)).await.unwrap();
        assert!(matches!(
            store.update(&service("cart", 2)).await,
            Err(CatalogError::Conflict { .. })
        ));

        store.delete("cart").await.unwrap();
        assert!(!store.exists("cart").await.unwrap());
    }
}
