// SPDX-FileCopyrightText: 2026 Atrium Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Orphan sweep: claims held by agents who left the work group.

use std::sync::Arc;
use std::time::Duration;

use atrium_core::{AssignmentStore, AtriumError};
use chrono::Utc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::ClaimEngine;

impl ClaimEngine {
    /// End every open claim whose agent is no longer online in its work group.
    ///
    /// Runs at the start of every claim. Safe to run concurrently.
    pub async fn sweep(&self) -> Result<u64, AtriumError> {
        let swept = self.store.sweep_orphans(Utc::now()).await?;
        if swept > 0 {
            info!(swept, "released claims of offline agents");
        }
        Ok(swept)
    }
}

/// Run [`ClaimEngine::sweep`] every `every` until `cancel` fires.
pub fn spawn_sweeper(
    engine: Arc<ClaimEngine>,
    every: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        // Skip the first immediate tick.
        interval.tick().await;

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match engine.sweep().await {
                        Ok(0) => debug!("sweep found no orphaned claims"),
                        Ok(_) => {}
                        Err(e) => warn!(error = %e, "background sweep failed (non-fatal)"),
                    }
                }
                _ = cancel.cancelled() => {
                    info!("sweeper shutting down");
                    break;
                }
            }
        }
    })
}
