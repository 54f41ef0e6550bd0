//! JSON-file versioning provider.
//!
//! One change log per service at `<dir>/.history/<name>.json`, holding a
//! newest-first array of [`ServiceChange`] capped at the most recent 100
//! entries. Appending is a read-modify-write of that file; the containing
//! mutation already holds the per-service key mutex, so records for one
//! service never race each other.

use std::path::{Path, PathBuf};

use chrono::Utc;
use uuid::Uuid;

use async_trait::async_trait;

use dashops_core::UserContext;

use crate::error::{CatalogError, Result};
use crate::service::Service;

use super::{
    change_message, deletion_message, ChangeAction, FieldChange, ServiceChange, VersioningProvider,
};

/// Maximum history entries retained per service.
pub const HISTORY_CAP: usize = 100;

/// Name of the history subdirectory inside the storage directory.
pub const HISTORY_DIR: &str = ".history";

/// File-backed change log without external tooling.
#[derive(Debug, Clone)]
pub struct SimpleProvider {
    directory: PathBuf,
}

impl SimpleProvider {
    /// Creates a provider writing under `<directory>/.history/`.
    pub fn new(directory: impl AsRef<Path>) -> Self {
        Self {
            directory: directory.as_ref().to_path_buf(),
        }
    }

    fn history_dir(&self) -> PathBuf {
        self.directory.join(HISTORY_DIR)
    }

    fn history_file(&self, name: &str) -> PathBuf {
        self.history_dir().join(format!("{name}.json"))
    }

    async fn read_history(&self, name: &str) -> Result<Vec<ServiceChange>> {
        let path = self.history_file(name);
        match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| CatalogError::Serialization {
                message: format!("history file {} is corrupt: {e}", path.display()),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(CatalogError::storage("read history", e)),
        }
    }

    async fn append(&self, name: &str, record: ServiceChange) -> Result<()> {
        let mut history = self.read_history(name).await?;
        history.insert(0, record);
        history.truncate(HISTORY_CAP);

        let path = self.history_file(name);
        let tmp = path.with_extension("json.tmp");
        let bytes = serde_json::to_vec_pretty(&history).map_err(|e| CatalogError::Serialization {
            message: e.to_string(),
        })?;
        tokio::fs::write(&tmp, bytes)
            .await
            .map_err(|e| CatalogError::storage("write history", e))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| CatalogError::storage("write history", e))?;
        Ok(())
    }
}

#[async_trait]
impl VersioningProvider for SimpleProvider {
    async fn initialize(&self) -> Result<()> {
        if self.directory.join(".git").exists() {
            return Err(CatalogError::Conflict {
                message: format!(
                    "{} already holds git versioning state; refusing to switch providers",
                    self.directory.display()
                ),
            });
        }
        tokio::fs::create_dir_all(self.history_dir())
            .await
            .map_err(|e| CatalogError::storage("initialize history", e))
    }

    fn is_enabled(&self) -> bool {
        true
    }

    async fn record_change(
        &self,
        service: &Service,
        user: &UserContext,
        action: ChangeAction,
        changes: &[FieldChange],
    ) -> Result<()> {
        let record = ServiceChange {
            id: Uuid::new_v4().to_string(),
            author: user.name.clone(),
            email: user.email.clone(),
            timestamp: Utc::now(),
            message: change_message(service, user, action),
            field_changes: changes.to_vec(),
        };
        self.append(&service.metadata.name, record).await
    }

    async fn record_deletion(&self, name: &str, user: &UserContext) -> Result<()> {
        let record = ServiceChange {
            id: Uuid::new_v4().to_string(),
            author: user.name.clone(),
            email: user.email.clone(),
            timestamp: Utc::now(),
            message: deletion_message(name, user),
            field_changes: Vec::new(),
        };
        self.append(name, record).await
    }

    async fn service_history(&self, name: &str) -> Result<Vec<ServiceChange>> {
        self.read_history(name).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::{ServiceMetadata, ServiceSpec, TeamSpec};
    use dashops_core::Tier;

    fn service(version: u64) -> Service {
        Service {
            api_version: "v1".to_string(),
            kind: "Service".to_string(),
            metadata: ServiceMetadata {
                name: "cart".to_string(),
                tier: Tier::Tier3,
                created_at: None,
                created_by: None,
                updated_at: None,
                updated_by: None,
                version,
            },
            spec: ServiceSpec {
                description: "Cart".to_string(),
                team: TeamSpec {
                    github_team: "shop".to_string(),
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
    }

    #[tokio::test]
    async fn records_are_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let provider = SimpleProvider::new(dir.path());
        provider.initialize().await.unwrap();

        provider
            .record_change(&service(1), &user(), ChangeAction::Create, &[])
            .await
            .unwrap();
        provider
            .record_change(&service(2), &user(), ChangeAction::Update, &[])
            .await
            .unwrap();

        let history = provider.service_history("cart").await.unwrap();
        assert_eq!(history.len(), 2);
        assert!(history[0].message.starts_with("update"));
        assert!(history[1].message.starts_with("create"));
        assert!(history[0].timestamp >= history[1].timestamp);
    }

    #[tokio::test]
    async fn history_is_capped() {
        let dir = tempfile::tempdir().unwrap();
        let provider = SimpleProvider::new(dir.path());
        provider.initialize().await.unwrap();

        for version in 1..=(HISTORY_CAP as u64 + 20) {
            provider
                .record_change(&service(version), &user(), ChangeAction::Update, &[])
                .await
                .unwrap();
        }

        let history = provider.service_history("cart").await.unwrap();
        assert_eq!(history.len(), HISTORY_CAP);
        // The newest record survives the cap.
        assert!(history[0]
            .message
            .contains(&format!("version={}", HISTORY_CAP as u64 + 20)));
    }

    #[tokio::test]
    async fn unknown_service_has_empty_history() {
        let dir = tempfile::tempdir().unwrap();
        let provider = SimpleProvider::new(dir.path());
        provider.initialize().await.unwrap();
        assert!(provider.service_history("ghost").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn refuses_directory_with_git_state() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::create_dir(dir.path().join(".git")).await.unwrap();
        let provider = SimpleProvider::new(dir.path());
        assert!(matches!(
            provider.initialize().await,
            Err(CatalogError::Conflict { .. })
        ));
    }
}
