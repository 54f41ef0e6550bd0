//! # dashops-api
//!
//! HTTP composition layer for the Dash-Ops operations dashboard backend.
//!
//! This crate provides the API surface consumed by the single-page frontend:
//!
//! - **Routing**: service-catalog CRUD, health, history, and resolution
//! - **Identity**: `UserContext` extraction from the upstream auth layer
//! - **Error Mapping**: catalog errors onto stable HTTP statuses and codes
//! - **Observability**: request metrics, tracing, health/ready endpoints
//!
//! ## Design Principles
//!
//! This crate is a **thin composition layer** with no domain policy.
//! All catalog logic lives in `dashops-catalog`.
//!
//! ## Endpoints
//!
//! ```text
//! GET  /health                              - Liveness check
//! GET  /ready                               - Readiness check
//! GET  /metrics                             - Prometheus metrics
//! GET  /openapi.json                        - OpenAPI document
//! /api/service-catalog/services             - Service CRUD + listing
//! /api/service-catalog/services/{name}      - Single service operations
//! /api/service-catalog/services/{name}/health
//! /api/service-catalog/services/{name}/history
//! /api/service-catalog/resolve              - Deployment ownership lookup
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod context;
pub mod error;
pub mod github;
pub mod metrics;
pub mod openapi;
pub mod routes;
pub mod server;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::context::RequestContext;
    pub use crate::error::{ApiError, ApiResult};
    pub use crate::server::Server;
}
