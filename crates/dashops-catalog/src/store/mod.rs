//! Durable persistence of service definitions.
//!
//! The contract is deliberately narrow: one entity type, keyed by normalized
//! name. The production backend is a directory of YAML files where the
//! filesystem IS the index; an in-memory backend serves tests.

pub mod filesystem;
pub mod memory;

pub use filesystem::FilesystemStore;
pub use memory::MemoryStore;

use async_trait::async_trait;

use crate::error::Result;
use crate::list::ServiceFilter;
use crate::service::Service;

/// Storage backend for service definitions.
///
/// Callers pass normalized names (see `dashops_core::normalize_name`); the
/// controller owns normalization, so backends treat names as opaque keys.
/// Mutations to the same service are serialized internally; reads are
/// lock-free. Cancellation follows the tokio model: dropping the future
/// abandons the operation at its next await point.
#[async_trait]
pub trait ServiceStore: Send + Sync + 'static {
    /// Persists a new service.
    ///
    /// Fails with `CatalogError::AlreadyExists` when the name is taken.
    async fn create(&self, service: &Service) -> Result<Service>;

    /// Loads a service by normalized name.
    ///
    /// Fails with `CatalogError::NotFound` when absent.
    async fn get_by_name(&self, name: &str) -> Result<Service>;

    /// Replaces a stored service.
    ///
    /// The incoming entity carries the already-incremented version; the
    /// backend compares the on-disk revision against `version - 1` and fails
    /// with `CatalogError::Conflict` when a concurrent mutation won.
    async fn update(&self, service: &Service) -> Result<Service>;

    /// Removes a service.
    ///
    /// Fails with `CatalogError::NotFound` when absent.
    async fn delete(&self, name: &str) -> Result<()>;

    /// Returns stored services, optionally filtered.
    ///
    /// Unparseable entries are logged and skipped rather than failing the
    /// whole scan. Ordering is unspecified.
    async fn list(&self, filter: Option<&ServiceFilter>) -> Result<Vec<Service>>;

    /// Returns true when a service with this name exists.
    async fn exists(&self, name: &str) -> Result<bool>;
}
