// SPDX-FileCopyrightText: 2026 Atrium Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end claim scenarios.
//!
//! `TestHarness` owns a temp database and a [`ClaimEngine`] built from a full
//! [`AtriumConfig`], so tests exercise the same wiring `atrium serve` uses.
//! Message helpers take "minutes ago" so fixtures stay inside the recency
//! window no matter when the test runs.

use std::sync::Arc;

use atrium_config::model::{AtriumConfig, StorageConfig, WorkGroupConfig};
use atrium_core::types::{
    AgentCode, Direction, NewAdhocMessage, NewCampaignSend, NewMessage,
};
use atrium_core::{AtriumError, EngineStore, StorageAdapter, TimelineView};
use atrium_engine::ClaimEngine;
use atrium_storage::SqliteStore;
use chrono::{DateTime, TimeDelta, Utc};

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    config: AtriumConfig,
    agents: Vec<(AgentCode, String, String)>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            config: AtriumConfig::default(),
            agents: Vec::new(),
        }
    }

    /// Register a work group served by `channels`. Capacity 0 is unlimited.
    pub fn with_work_group(mut self, name: &str, channels: &[&str], capacity: u32) -> Self {
        self.config.work_groups.push(WorkGroupConfig {
            name: name.to_string(),
            channels: channels.iter().map(|c| c.to_string()).collect(),
            capacity,
        });
        self
    }

    /// Provision an agent (offline until [`TestHarness::online`]).
    pub fn with_agent(mut self, code: i64, display_name: &str, home_work_group: &str) -> Self {
        self.agents.push((
            AgentCode(code),
            display_name.to_string(),
            home_work_group.to_string(),
        ));
        self
    }

    pub fn with_recency_window_hours(mut self, hours: u32) -> Self {
        self.config.engine.recency_window_hours = hours;
        self
    }

    pub fn with_api_tokens(mut self, api: &str, admin: &str) -> Self {
        self.config.server.api_token = Some(api.to_string());
        self.config.server.admin_token = Some(admin.to_string());
        self
    }

    /// Build the harness: open the database, seed work groups, provision agents.
    pub async fn build(mut self) -> Result<TestHarness, AtriumError> {
        let temp_dir = tempfile::TempDir::new().map_err(|e| AtriumError::Storage {
            source: Box::new(e),
        })?;
        self.config.storage = StorageConfig {
            database_path: temp_dir
                .path()
                .join("atrium-test.db")
                .to_string_lossy()
                .into_owned(),
            ..StorageConfig::default()
        };

        let store = SqliteStore::new(self.config.storage.clone());
        store.initialize().await?;
        let store: Arc<dyn EngineStore> = Arc::new(store);

        let engine = ClaimEngine::from_config(store.clone(), &self.config);
        engine
            .seed_work_groups(&self.config.work_group_specs())
            .await?;
        for (code, name, work_group) in &self.agents {
            engine.create_agent(*code, name, work_group, "test").await?;
        }

        Ok(TestHarness {
            engine: Arc::new(engine),
            store,
            config: self.config,
            _temp_dir: temp_dir,
        })
    }
}

/// A claim engine over a temp database, cleaned up on drop.
pub struct TestHarness {
    pub engine: Arc<ClaimEngine>,
    pub store: Arc<dyn EngineStore>,
    /// Effective configuration, storage path included.
    pub config: AtriumConfig,
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Work group "support" on `line-1` and `line-2`, agents 1 (Ana) and 2 (Bruno).
    pub async fn support_desk() -> Result<TestHarness, AtriumError> {
        Self::builder()
            .with_work_group("support", &["line-1", "line-2"], 0)
            .with_agent(1, "Ana", "support")
            .with_agent(2, "Bruno", "support")
            .build()
            .await
    }

    pub async fn online(&self, code: i64, work_group: &str) -> Result<(), AtriumError> {
        self.engine
            .go_online(AgentCode(code), work_group)
            .await
            .map(|_| ())
    }

    /// Log a customer message `minutes_ago` minutes in the past.
    pub async fn inbound(
        &self,
        phone: &str,
        channel: &str,
        minutes_ago: i64,
    ) -> Result<i64, AtriumError> {
        self.message_at(phone, channel, Direction::Inbound, None, ago(minutes_ago))
            .await
    }

    /// Log a customer message carrying a profile name.
    pub async fn inbound_named(
        &self,
        phone: &str,
        channel: &str,
        name: &str,
        minutes_ago: i64,
    ) -> Result<i64, AtriumError> {
        self.message_at(
            phone,
            channel,
            Direction::Inbound,
            Some(name),
            ago(minutes_ago),
        )
        .await
    }

    /// Log a customer message at an exact instant (may be in the future).
    pub async fn inbound_at(
        &self,
        phone: &str,
        channel: &str,
        at: DateTime<Utc>,
    ) -> Result<i64, AtriumError> {
        self.message_at(phone, channel, Direction::Inbound, None, at)
            .await
    }

    pub async fn outbound(
        &self,
        phone: &str,
        channel: &str,
        minutes_ago: i64,
    ) -> Result<i64, AtriumError> {
        self.message_at(phone, channel, Direction::Outbound, None, ago(minutes_ago))
            .await
    }

    /// Log a bulk campaign send for the first configured work group.
    pub async fn campaign(
        &self,
        phone: &str,
        channel: &str,
        minutes_ago: i64,
    ) -> Result<i64, AtriumError> {
        let work_group = self
            .config
            .work_groups
            .first()
            .map(|wg| wg.name.clone())
            .unwrap_or_default();
        self.store
            .append_campaign_send(&NewCampaignSend {
                campaign: "harness".to_string(),
                work_group,
                key: self.engine.normalizer().key(phone, channel)?,
                phone_raw: phone.to_string(),
                status: "sent".to_string(),
                text: "campaign message".to_string(),
                at: ago(minutes_ago),
            })
            .await
    }

    /// Log an agent reply sent outside the message webhook.
    pub async fn adhoc(
        &self,
        phone: &str,
        channel: &str,
        sender: &str,
        minutes_ago: i64,
    ) -> Result<i64, AtriumError> {
        self.store
            .append_adhoc(&NewAdhocMessage {
                sender_name: sender.to_string(),
                key: self.engine.normalizer().key(phone, channel)?,
                phone_raw: phone.to_string(),
                text: format!("reply from {sender}"),
                status: "delivered".to_string(),
                provider_message_id: None,
                at: ago(minutes_ago),
            })
            .await
    }

    async fn message_at(
        &self,
        phone: &str,
        channel: &str,
        direction: Direction,
        display_name: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<i64, AtriumError> {
        self.store
            .append_message(&NewMessage {
                key: self.engine.normalizer().key(phone, channel)?,
                phone_raw: phone.to_string(),
                direction,
                text: format!("{direction} message"),
                display_name: display_name.map(str::to_string),
                provider_message_id: None,
                at,
            })
            .await
    }
}

fn ago(minutes: i64) -> DateTime<Utc> {
    Utc::now() - TimeDelta::minutes(minutes)
}
