// SPDX-FileCopyrightText: 2026 Atrium Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fixtures for the engine's unit tests.

use std::sync::Arc;

use atrium_config::model::StorageConfig;
use atrium_core::types::{Agent, AgentCode, Direction, NewCampaignSend, NewMessage, WorkGroupSpec};
use atrium_core::{PhoneNormalizer, PresenceStore, StorageAdapter, TimelineView};
use atrium_storage::SqliteStore;
use chrono::{DateTime, TimeDelta, Utc};
use tempfile::TempDir;

use crate::{ClaimEngine, EngineSettings};

/// Engine over a temp database with work group "support" (line-1, line-2)
/// and agents 1, 2, 3 provisioned but offline.
pub async fn engine() -> (ClaimEngine, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteStore::new(StorageConfig {
        database_path: dir.path().join("engine.db").to_string_lossy().into_owned(),
        wal_mode: true,
        busy_timeout_ms: 2000,
    });
    store.initialize().await.unwrap();

    let engine = ClaimEngine::new(
        Arc::new(store),
        PhoneNormalizer::default(),
        EngineSettings::default(),
    );
    engine
        .seed_work_groups(&[WorkGroupSpec {
            name: "support".to_string(),
            channels: vec!["line-1".to_string(), "line-2".to_string()],
            capacity: 0,
        }])
        .await
        .unwrap();

    for (code, name) in [(1, "Ana"), (2, "Bruno"), (3, "Carla")] {
        engine
            .store()
            .create_agent(&Agent {
                code: AgentCode(code),
                display_name: name.to_string(),
                home_work_group: "support".to_string(),
                source: "test".to_string(),
                created_at: Utc::now(),
            })
            .await
            .unwrap();
    }
    (engine, dir)
}

pub fn ago(minutes: i64) -> DateTime<Utc> {
    Utc::now() - TimeDelta::minutes(minutes)
}

/// Log a customer message on a channel.
pub async fn inbound(engine: &ClaimEngine, phone: &str, channel: &str, at: DateTime<Utc>) {
    message(engine, phone, channel, Direction::Inbound, at).await;
}

pub async fn message(
    engine: &ClaimEngine,
    phone: &str,
    channel: &str,
    direction: Direction,
    at: DateTime<Utc>,
) {
    let key = engine.normalizer().key(phone, channel).unwrap();
    engine
        .store()
        .append_message(&NewMessage {
            key,
            phone_raw: phone.to_string(),
            direction,
            text: format!("{direction} message"),
            display_name: None,
            provider_message_id: None,
            at,
        })
        .await
        .unwrap();
}

/// Log a campaign send on a channel.
pub async fn campaign(engine: &ClaimEngine, phone: &str, channel: &str, at: DateTime<Utc>) {
    let key = engine.normalizer().key(phone, channel).unwrap();
    engine
        .store()
        .append_campaign_send(&NewCampaignSend {
            campaign: "reactivation".to_string(),
            work_group: "support".to_string(),
            key,
            phone_raw: phone.to_string(),
            status: "sent".to_string(),
            text: "We miss you".to_string(),
            at,
        })
        .await
        .unwrap();
}
