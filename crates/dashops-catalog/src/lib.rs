//! # dashops-catalog
//!
//! Service catalog domain for the Dash-Ops operations dashboard.
//!
//! This crate implements the catalog core, providing:
//!
//! - **Service Registry**: versioned, file-backed declarative service
//!   definitions with per-service history and concurrent safety
//! - **Deployment Resolver**: reverse index answering "which service owns
//!   this Kubernetes deployment?"
//! - **Health Aggregation**: per-service health derived from cluster
//!   observations using service-tier policy and drift detection
//!
//! ## Architecture
//!
//! The filesystem IS the index: one YAML file per service in a configured
//! directory. Mutations to the same service are serialized by a per-name
//! key mutex; the atomic tmp-file + rename protocol guarantees readers
//! never observe torn files. History is a pluggable append-only change log
//! (`none` | `simple` | `git`) recorded best-effort after each successful
//! write.
//!
//! ## Example
//!
//! ```rust,ignore
//! use dashops_catalog::{Catalog, FilesystemStore};
//! use dashops_catalog::versioning::SimpleProvider;
//!
//! let store = Arc::new(FilesystemStore::new("./services"));
//! let versioning = Arc::new(SimpleProvider::new("./services"));
//! let catalog = Catalog::new(store, versioning);
//!
//! let outcome = catalog.create(service, Some(&user)).await?;
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod catalog;
pub mod error;
pub mod health;
pub mod list;
pub mod lock;
pub mod metrics;
pub mod resolver;
pub mod service;
pub mod store;
pub mod validate;
pub mod versioning;

pub use catalog::{Catalog, MutationOutcome, Warning};
pub use error::{CatalogError, Result};
pub use health::{
    DeploymentHealth, DeploymentStatus, EnvironmentHealth, EnvironmentStatus, HealthAggregator,
    ServiceHealth, ServiceStatus,
};
pub use list::{ListResult, ServiceFilter};
pub use resolver::DeploymentResolver;
pub use service::{
    DeploymentSpec, Environment, EnvironmentResources, Service, ServiceMetadata, ServiceSpec,
    TeamSpec,
};
pub use store::{FilesystemStore, MemoryStore, ServiceStore};
pub use versioning::{
    ChangeAction, FieldChange, ServiceChange, VersioningProvider, VersioningProviderKind,
};
