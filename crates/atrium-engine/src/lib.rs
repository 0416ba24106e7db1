// SPDX-FileCopyrightText: 2026 Atrium Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation claim and assignment engine.
//!
//! The [`ClaimEngine`] decides which single agent, if any, owns a customer
//! conversation. It orchestrates the queue registry (presence), the capacity
//! limiter, candidate selection over the conversation timeline, the atomic
//! reservation primitive of the assignment store, and the cooldown ledger.
//!
//! The engine holds no locks of its own. Every exclusion guarantee comes from
//! the store: a reservation is one conditional insert that either lands or
//! reports the conversation as taken.

pub mod capacity;
pub mod claim;
pub mod housekeeping;
pub mod presence;
pub mod release;
pub mod selection;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

use atrium_config::model::{AtriumConfig, EngineConfig};
use atrium_core::types::{AgentCode, QueueMembership, WorkGroupSpec};
use atrium_core::{
    AtriumError, ConversationKey, EngineStore, PhoneNormalizer, PresenceStore, WorkGroupDirectory,
};
use chrono::TimeDelta;
use tracing::info;

pub use claim::{ClaimRequest, ClaimSummary};
pub use housekeeping::spawn_sweeper;
pub use release::ClosedClaim;

/// Tunables that shape claim selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    /// How recent a conversation's last message must be to count as a candidate.
    pub recency_window: TimeDelta,
    /// Upper bound accepted by [`ClaimEngine::set_capacity`].
    pub max_capacity_limit: u32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            recency_window: TimeDelta::hours(24),
            max_capacity_limit: 50,
        }
    }
}

impl From<&EngineConfig> for EngineSettings {
    fn from(config: &EngineConfig) -> Self {
        Self {
            recency_window: TimeDelta::hours(i64::from(config.recency_window_hours)),
            max_capacity_limit: config.max_capacity_limit,
        }
    }
}

/// Orchestrates claim, release, and close over an [`EngineStore`].
pub struct ClaimEngine {
    store: Arc<dyn EngineStore>,
    normalizer: PhoneNormalizer,
    settings: EngineSettings,
}

impl ClaimEngine {
    pub fn new(
        store: Arc<dyn EngineStore>,
        normalizer: PhoneNormalizer,
        settings: EngineSettings,
    ) -> Self {
        Self {
            store,
            normalizer,
            settings,
        }
    }

    /// Build an engine using the `[engine]` and `[identity]` sections.
    pub fn from_config(store: Arc<dyn EngineStore>, config: &AtriumConfig) -> Self {
        Self::new(
            store,
            config.phone_normalizer(),
            EngineSettings::from(&config.engine),
        )
    }

    pub fn store(&self) -> &Arc<dyn EngineStore> {
        &self.store
    }

    pub fn normalizer(&self) -> &PhoneNormalizer {
        &self.normalizer
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Register the configured work groups with the store.
    pub async fn seed_work_groups(&self, specs: &[WorkGroupSpec]) -> Result<(), AtriumError> {
        for spec in specs {
            self.store.upsert_work_group(spec).await?;
            info!(
                work_group = %spec.name,
                channels = spec.channels.len(),
                "work group registered"
            );
        }
        Ok(())
    }

    fn key(&self, phone: &str, channel: &str) -> Result<ConversationKey, AtriumError> {
        self.normalizer.key(phone, channel)
    }

    /// Channels mapped to a work group.
    async fn channels(&self, work_group: &str) -> Result<Vec<String>, AtriumError> {
        self.store
            .channels_for(work_group)
            .await?
            .ok_or_else(|| AtriumError::UnknownWorkGroup(work_group.to_string()))
    }

    async fn require_online(
        &self,
        agent: AgentCode,
        work_group: &str,
    ) -> Result<QueueMembership, AtriumError> {
        self.store
            .get_membership(agent, work_group)
            .await?
            .ok_or_else(|| AtriumError::AgentOffline {
                agent,
                work_group: work_group.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_follow_engine_config() {
        let config = EngineConfig {
            recency_window_hours: 6,
            sweep_interval_secs: 0,
            max_capacity_limit: 12,
        };
        let settings = EngineSettings::from(&config);
        assert_eq!(settings.recency_window, TimeDelta::hours(6));
        assert_eq!(settings.max_capacity_limit, 12);
    }

    #[tokio::test]
    async fn seeding_registers_channels() {
        let (engine, _dir) = testing::engine().await;
        engine
            .seed_work_groups(&[WorkGroupSpec {
                name: "billing".to_string(),
                channels: vec!["line-9".to_string()],
                capacity: 4,
            }])
            .await
            .unwrap();

        assert_eq!(engine.channels("billing").await.unwrap(), vec!["line-9"]);
        assert!(matches!(
            engine.channels("ghost").await,
            Err(AtriumError::UnknownWorkGroup(name)) if name == "ghost"
        ));
    }
}
