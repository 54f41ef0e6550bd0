//! `dashops-api` binary entrypoint.
//!
//! Loads configuration, wires the catalog backends, and starts the HTTP
//! server.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]

use std::sync::Arc;

use anyhow::Result;

use dashops_api::config::Config;
use dashops_api::github::GithubTeamClient;
use dashops_api::server::Server;
use dashops_catalog::versioning::provider_for;
use dashops_catalog::FilesystemStore;
use dashops_core::kubernetes::StaticCluster;
use dashops_core::observability::{init_logging, LogFormat};
use dashops_core::TeamDirectory;

fn choose_log_format(config: &Config) -> LogFormat {
    if config.debug {
        LogFormat::Pretty
    } else {
        LogFormat::Json
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;
    init_logging(choose_log_format(&config));
    dashops_api::metrics::init_metrics();

    let directory = config
        .service_catalog
        .storage
        .filesystem
        .directory_or_default()
        .to_string();
    tracing::info!(directory = %directory, "Using filesystem catalog storage");

    let store = Arc::new(FilesystemStore::new(&directory));
    store.initialize().await?;

    let provider_kind = config.service_catalog.versioning.effective_provider();
    let versioning = provider_for(provider_kind, &directory);
    // Fails fast when the directory holds the other provider's state.
    versioning.initialize().await?;
    tracing::info!(provider = ?provider_kind, "Versioning initialized");

    let mut server = Server::new(config.clone())
        .with_store(store)
        .with_versioning(versioning);

    if let Some(github) = config.github.as_ref().filter(|g| !g.org.is_empty()) {
        let teams: Arc<dyn TeamDirectory> = Arc::new(GithubTeamClient::new(
            github.api_url.clone(),
            github.org.clone(),
            github.token.clone(),
        ));
        tracing::info!(org = %github.org, "GitHub team enrichment enabled");
        server = server.with_team_directory(teams);
    }

    // The in-cluster facade is provided by the kubernetes module at
    // deployment time; the empty static facade keeps health endpoints
    // answering `unknown`/`down` until one is wired in.
    if config.debug {
        tracing::warn!("No Kubernetes facade configured; health reports degrade to unknown");
    }
    let server = server.with_kubernetes(Arc::new(StaticCluster::new()));

    server.serve().await?;
    Ok(())
}
