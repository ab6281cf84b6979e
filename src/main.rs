//! # crd-purge
//!
//! Deletes every instance of one custom resource type in every namespace,
//! removing finalizers that would otherwise hold the deletion.
//!
//! Runs once and exits. Configuration comes from the environment
//! (see [`crd_purge::config::PurgeConfig::from_env`]); credentials are
//! in-cluster when `KUBERNETES_SERVICE_HOST` is set, otherwise the local
//! kubeconfig.
//!
//! Exit status is 0 once every namespace was walked, regardless of
//! individual item failures; 1 when setup failed or a namespace listing
//! had to be abandoned.

use anyhow::{Context, Result};
use crd_purge::prelude::*;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> ExitCode {
    let config = PurgeConfig::from_env();
    crd_purge::observability::init_tracing(&config);

    match run(&config).await {
        Ok(outcome) if outcome.is_complete() => ExitCode::SUCCESS,
        Ok(outcome) => {
            warn!(
                "{} of {} namespaces could not be listed to completion",
                outcome.abandoned.len(),
                outcome.namespaces
            );
            ExitCode::FAILURE
        }
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(config: &PurgeConfig) -> Result<RunOutcome> {
    config.validate().context("Invalid configuration")?;

    // Must happen before any TLS connection is made
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        warn!("rustls crypto provider was already installed");
    }

    info!("Starting crd-purge");
    info!(
        "Build info: timestamp={}, datetime={}, git_hash={}",
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_DATETIME"),
        env!("BUILD_GIT_HASH")
    );
    info!(
        resource = %config.target,
        api_version = %config.target.api_version(),
        kind = %config.target.kind,
        page_size = config.page_size,
        concurrency = config.concurrency,
        dry_run = config.dry_run,
        "Purge configuration"
    );

    let store = KubeStore::connect()
        .await
        .context("Failed to connect to the cluster")?;

    let purger = Purger::new(Arc::new(store), Arc::new(TracingReporter), config);
    let outcome = purger.run().await?;
    Ok(outcome)
}
