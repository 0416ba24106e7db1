// SPDX-FileCopyrightText: 2026 Atrium Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `atrium agent add` implementation.

use std::sync::Arc;

use atrium_config::AtriumConfig;
use atrium_core::types::AgentCode;
use atrium_core::{AtriumError, StorageAdapter};
use atrium_engine::ClaimEngine;
use atrium_storage::SqliteStore;

/// Provision one agent directly in the configured database.
pub async fn add(
    config: &AtriumConfig,
    code: i64,
    name: &str,
    work_group: &str,
    source: &str,
) -> Result<(), AtriumError> {
    let store = Arc::new(SqliteStore::new(config.storage.clone()));
    store.initialize().await?;

    let engine = ClaimEngine::from_config(store.clone(), config);
    // Register configured groups so a fresh database accepts the home group.
    engine.seed_work_groups(&config.work_group_specs()).await?;
    let created = engine
        .create_agent(AgentCode(code), name, work_group, source)
        .await;

    store.close().await?;
    let agent = created?;
    println!(
        "agent {} ({}) provisioned in work group `{}`",
        agent.code, agent.display_name, agent.home_work_group
    );
    Ok(())
}
