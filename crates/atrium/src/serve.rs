// SPDX-FileCopyrightText: 2026 Atrium Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `atrium serve` implementation.
//!
//! Opens the store, registers the configured work groups, starts the
//! background sweep and the HTTP gateway, and waits for a shutdown signal.

use std::sync::Arc;
use std::time::Duration;

use atrium_config::AtriumConfig;
use atrium_core::{AtriumError, PluginAdapter, StorageAdapter};
use atrium_engine::{ClaimEngine, spawn_sweeper};
use atrium_gateway::{GatewayConfig, GatewayState, start_server};
use atrium_storage::SqliteStore;
use tracing::{info, warn};

use crate::shutdown;

/// Run the service until SIGINT/SIGTERM.
pub async fn run_serve(config: AtriumConfig) -> Result<(), AtriumError> {
    init_tracing(&config.log.level);
    info!(version = env!("CARGO_PKG_VERSION"), "starting atrium");

    let store = Arc::new(SqliteStore::new(config.storage.clone()));
    store.initialize().await?;
    info!(path = %config.storage.database_path, "storage ready");

    let engine = Arc::new(ClaimEngine::from_config(store.clone(), &config));
    engine.seed_work_groups(&config.work_group_specs()).await?;
    if config.work_groups.is_empty() {
        warn!("no [[work_groups]] configured; only previously registered groups are served");
    }

    let cancel = shutdown::install_signal_handler();

    let sweeper = match config.engine.sweep_interval_secs {
        0 => None,
        secs => {
            info!(interval_secs = secs, "background sweep started");
            Some(spawn_sweeper(
                engine.clone(),
                Duration::from_secs(secs),
                cancel.clone(),
            ))
        }
    };

    let gateway_config = GatewayConfig {
        host: config.server.host.clone(),
        port: config.server.port,
        api_token: config.server.api_token.clone(),
        admin_token: config.server.admin_token.clone(),
    };
    if gateway_config.api_token.is_none() {
        warn!("server.api_token is not set; agent routes will reject every request");
    }
    if gateway_config.admin_token.is_none() {
        warn!("server.admin_token is not set; admin routes will reject every request");
    }

    let state = GatewayState::new(
        engine,
        Duration::from_secs(config.server.request_timeout_secs),
    );
    let served = start_server(&gateway_config, state, cancel.clone()).await;

    cancel.cancel();
    if let Some(handle) = sweeper
        && let Err(e) = handle.await
    {
        warn!(error = %e, "sweeper task ended abnormally");
    }

    if let Err(e) = store.shutdown().await {
        warn!(error = %e, "storage shutdown failed");
    }
    info!("atrium stopped");
    served
}

/// Initialize the tracing subscriber. `RUST_LOG` wins over `log.level`.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "atrium={log_level},atrium_engine={log_level},atrium_storage={log_level},\
             atrium_gateway={log_level},tower_http=info,warn"
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
