//! Filesystem-backed service store.
//!
//! One YAML file per service at `<directory>/<name>.yaml`. Writes marshal to
//! a `.tmp` sibling and rename over the target, so readers never observe a
//! torn file. The history subdirectory and hidden entries are invisible to
//! the scan.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::{CatalogError, Result};
use crate::list::{process_service_list, ServiceFilter};
use crate::lock::KeyLocks;
use crate::service::Service;
use crate::store::ServiceStore;

/// Directory-of-YAML-files store. The filesystem is the index.
#[derive(Debug)]
pub struct FilesystemStore {
    directory: PathBuf,
    locks: KeyLocks,
}

impl FilesystemStore {
    /// Creates a store rooted at `directory`. No I/O happens until
    /// [`FilesystemStore::initialize`] or the first operation.
    pub fn new(directory: impl AsRef<Path>) -> Self {
        Self {
            directory: directory.as_ref().to_path_buf(),
            locks: KeyLocks::new(),
        }
    }

    /// Returns the storage directory.
    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Creates the storage directory if absent.
    ///
    /// # Errors
    ///
    /// Returns a storage error when the directory cannot be created.
    pub async fn initialize(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.directory)
            .await
            .map_err(|e| CatalogError::storage("initialize", e))
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.directory.join(format!("{name}.yaml"))
    }

    async fn read_service(&self, path: &Path) -> Result<Option<Service>> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(CatalogError::storage("read", e)),
        };
        let service = serde_yaml::from_slice(&bytes).map_err(|e| CatalogError::Serialization {
            message: format!("{}: {e}", path.display()),
        })?;
        Ok(Some(service))
    }

    async fn write_atomic(&self, service: &Service) -> Result<()> {
        let path = self.path_for(&service.metadata.name);
        let tmp = path.with_extension("yaml.tmp");
        let yaml = serde_yaml::to_string(service).map_err(|e| CatalogError::Serialization {
            message: e.to_string(),
        })?;
        tokio::fs::write(&tmp, yaml)
            .await
            .map_err(|e| CatalogError::storage("write", e))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| CatalogError::storage("write", e))
    }
}

#[async_trait]
impl ServiceStore for FilesystemStore {
    async fn create(&self, service: &Service) -> Result<Service> {
        let name = service.metadata.name.clone();
        let _guard = self.locks.acquire(&name).await;

        self.initialize().await?;
        if self.read_service(&self.path_for(&name)).await?.is_some() {
            return Err(CatalogError::AlreadyExists { name });
        }

        self.write_atomic(service).await?;
        Ok(service.clone())
    }

    async fn get_by_name(&self, name: &str) -> Result<Service> {
        self.read_service(&self.path_for(name))
            .await?
            .ok_or_else(|| CatalogError::NotFound {
                name: name.to_string(),
            })
    }

    async fn update(&self, service: &Service) -> Result<Service> {
        let name = service.metadata.name.clone();
        let _guard = self.locks.acquire(&name).await;

        let current = self
            .read_service(&self.path_for(&name))
            .await?
            .ok_or_else(|| CatalogError::NotFound { name: name.clone() })?;

        // The incoming entity carries version N+1 prepared against a
        // pre-read at version N. Anything else on disk means a concurrent
        // writer got there first.
        if current.metadata.version + 1 != service.metadata.version {
            return Err(CatalogError::Conflict {
                message: format!(
                    "service {name} changed concurrently (stored version {}, update built against {})",
                    current.metadata.version,
                    service.metadata.version.saturating_sub(1),
                ),
            });
        }

        self.write_atomic(service).await?;
        Ok(service.clone())
    }

    async fn delete(&self, name: &str) -> Result<()> {
        let _guard = self.locks.acquire(name).await;
        match tokio::fs::remove_file(self.path_for(name)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(CatalogError::NotFound {
                name: name.to_string(),
            }),
            Err(e) => Err(CatalogError::storage("delete", e)),
        }
    }

    async fn list(&self, filter: Option<&ServiceFilter>) -> Result<Vec<Service>> {
        let mut entries = match tokio::fs::read_dir(&self.directory).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(CatalogError::storage("list", e)),
        };

        let mut services = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| CatalogError::storage("list", e))?
        {
            let path = entry.path();
            let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            // Hidden entries (.history, .git) and tmp files are not catalog state.
            if file_name.starts_with('.') || path.extension().is_none_or(|ext| ext != "yaml") {
                continue;
            }
            if entry
                .file_type()
                .await
                .map_err(|e| CatalogError::storage("list", e))?
                .is_dir()
            {
                continue;
            }

            match self.read_service(&path).await {
                Ok(Some(service)) => services.push(service),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(file = %path.display(), error = %e, "skipping unparseable service file");
                }
            }
        }

        Ok(process_service_list(services, filter).services)
    }

    async fn exists(&self, name: &str) -> Result<bool> {
        match tokio::fs::try_exists(self.path_for(name)).await {
            Ok(exists) => Ok(exists),
            Err(e) => Err(CatalogError::storage("exists", e)),
        }
    }
}
