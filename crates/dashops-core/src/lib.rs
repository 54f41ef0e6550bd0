//! # dashops-core
//!
//! Core abstractions for the Dash-Ops operations dashboard backend.
//!
//! This crate provides the foundational types and contracts used across all
//! Dash-Ops components:
//!
//! - **Identity**: the authenticated [`UserContext`] supplied by the transport
//! - **Naming**: the validated [`ServiceName`] slug and its normalizer
//! - **Kubernetes Contract**: the narrow cluster facade and the
//!   deployment-ownership lookup consumed by the kubernetes module
//! - **Team Contract**: the directory used to enrich catalog teams
//! - **Error Types**: shared error definitions and result types
//! - **Observability**: structured logging initialization
//!
//! ## Crate Boundary
//!
//! `dashops-core` is the **only** crate allowed to define shared primitives.
//! Cross-component contracts (the Kubernetes facade, the team directory,
//! deployment ownership) live here so that the catalog and the kubernetes
//! module never import each other.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod kubernetes;
pub mod name;
pub mod observability;
pub mod team;
pub mod tier;
pub mod user;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::kubernetes::{
        ConditionStatus, ConditionType, DeploymentCondition, DeploymentObservation, DeploymentRef,
        DeploymentOwner, KubernetesFacade, ServiceContext, StaticCluster,
    };
    pub use crate::name::{normalize_name, ServiceName};
    pub use crate::team::{StaticTeamDirectory, TeamDirectory, TeamProfile};
    pub use crate::tier::Tier;
    pub use crate::user::UserContext;
}

pub use error::{Error, Result};
pub use kubernetes::{
    ConditionStatus, ConditionType, DeploymentCondition, DeploymentObservation, DeploymentOwner,
    DeploymentRef, KubernetesFacade, ServiceContext, ServiceObservation, StaticCluster,
};
pub use name::{normalize_name, ServiceName};
pub use observability::{init_logging, LogFormat};
pub use team::{StaticTeamDirectory, TeamDirectory, TeamProfile};
pub use tier::Tier;
pub use user::UserContext;
