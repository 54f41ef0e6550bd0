//! HTTP route handlers.

pub mod services;

use std::sync::Arc;

use axum::Router;

use crate::server::AppState;

/// `/api/service-catalog` routes (identity via `RequestContext` extractor).
pub fn service_catalog_routes() -> Router<Arc<AppState>> {
    services::routes()
}
