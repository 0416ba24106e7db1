// SPDX-FileCopyrightText: 2026 Atrium Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of every Atrium store trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::OnceCell;
use tracing::debug;

use atrium_config::model::StorageConfig;
use atrium_core::types::{
    ActiveAssignment, Agent, AgentCode, BlockRecord, Candidate, CandidateQuery, EndReason,
    LastMessage, NewAdhocMessage, NewCampaignSend, NewMessage, NewReservation, OpenClaimCount,
    QueueMembership, ReserveOutcome, TimelineEntry, WorkGroupSpec,
};
use atrium_core::{
    AssignmentStore, AtriumError, BlockLedger, CapacityStore, ConversationKey, HealthStatus,
    PluginAdapter, PresenceStore, StorageAdapter, TimelineView, WorkGroupDirectory,
};

use crate::database::{Database, OpenOptions, map_tr_err};
use crate::queries;

/// SQLite-backed store.
///
/// Wraps a [`Database`] handle and delegates all query operations to the
/// typed query modules. The database is opened on the first call to
/// [`StorageAdapter::initialize`].
pub struct SqliteStore {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStore {
    /// Create a new store with the given configuration.
    ///
    /// The database connection is not opened until [`StorageAdapter::initialize`] is called.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Returns a reference to the underlying Database, or an error if not initialized.
    fn db(&self) -> Result<&Database, AtriumError> {
        self.db.get().ok_or_else(|| AtriumError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }

    async fn checkpoint(&self, db: &Database) -> Result<(), AtriumError> {
        if !self.config.wal_mode {
            return Ok(());
        }
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        debug!("WAL checkpoint complete");
        Ok(())
    }
}

#[async_trait]
impl PluginAdapter for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    async fn health_check(&self) -> Result<HealthStatus, AtriumError> {
        let Some(db) = self.db.get() else {
            return Ok(HealthStatus::Unhealthy("storage not initialized".to_string()));
        };
        let ping = db
            .connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err);
        match ping {
            Ok(()) => Ok(HealthStatus::Healthy),
            Err(e) if e.is_retryable() => Ok(HealthStatus::Degraded(e.to_string())),
            Err(e) => Ok(HealthStatus::Unhealthy(e.to_string())),
        }
    }

    async fn shutdown(&self) -> Result<(), AtriumError> {
        if let Some(db) = self.db.get() {
            self.checkpoint(db).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for SqliteStore {
    async fn initialize(&self) -> Result<(), AtriumError> {
        let db = Database::open_with(
            &self.config.database_path,
            OpenOptions::from(&self.config),
        )
        .await?;
        self.db.set(db).map_err(|_| AtriumError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), AtriumError> {
        let db = self.db()?;
        self.checkpoint(db).await
    }
}

#[async_trait]
impl PresenceStore for SqliteStore {
    async fn create_agent(&self, agent: &Agent) -> Result<(), AtriumError> {
        if queries::agents::create_agent(self.db()?, agent).await? {
            Ok(())
        } else {
            Err(AtriumError::AgentExists(agent.code))
        }
    }

    async fn get_agent(&self, code: AgentCode) -> Result<Option<Agent>, AtriumError> {
        queries::agents::get_agent(self.db()?, code).await
    }

    async fn insert_membership(
        &self,
        agent: AgentCode,
        work_group: &str,
        joined_at: DateTime<Utc>,
    ) -> Result<bool, AtriumError> {
        queries::memberships::insert_membership(self.db()?, agent, work_group, joined_at).await
    }

    async fn delete_membership(
        &self,
        agent: AgentCode,
        work_group: &str,
    ) -> Result<bool, AtriumError> {
        queries::memberships::delete_membership(self.db()?, agent, work_group).await
    }

    async fn get_membership(
        &self,
        agent: AgentCode,
        work_group: &str,
    ) -> Result<Option<QueueMembership>, AtriumError> {
        queries::memberships::get_membership(self.db()?, agent, work_group).await
    }

    async fn list_memberships(
        &self,
        work_group: Option<&str>,
    ) -> Result<Vec<QueueMembership>, AtriumError> {
        queries::memberships::list_memberships(self.db()?, work_group).await
    }
}

#[async_trait]
impl WorkGroupDirectory for SqliteStore {
    async fn upsert_work_group(&self, spec: &WorkGroupSpec) -> Result<(), AtriumError> {
        queries::work_groups::upsert_work_group(self.db()?, spec).await
    }

    async fn channels_for(&self, work_group: &str) -> Result<Option<Vec<String>>, AtriumError> {
        queries::work_groups::channels_for(self.db()?, work_group).await
    }

    async fn list_work_groups(&self) -> Result<Vec<String>, AtriumError> {
        queries::work_groups::list_work_groups(self.db()?).await
    }
}

#[async_trait]
impl AssignmentStore for SqliteStore {
    async fn reserve(
        &self,
        reservation: &NewReservation,
        capacity_limit: u32,
    ) -> Result<ReserveOutcome, AtriumError> {
        queries::assignments::reserve(self.db()?, reservation, capacity_limit).await
    }

    async fn open_assignment(
        &self,
        key: &ConversationKey,
    ) -> Result<Option<ActiveAssignment>, AtriumError> {
        queries::assignments::open_assignment(self.db()?, key).await
    }

    async fn end_assignment(
        &self,
        agent: AgentCode,
        key: &ConversationKey,
        ended_at: DateTime<Utc>,
        reason: EndReason,
    ) -> Result<Option<ActiveAssignment>, AtriumError> {
        queries::assignments::end_assignment(self.db()?, agent, key, ended_at, reason).await
    }

    async fn close_assignment(
        &self,
        block: &BlockRecord,
    ) -> Result<Option<ActiveAssignment>, AtriumError> {
        queries::assignments::close_assignment(self.db()?, block).await
    }

    async fn open_for_agent(
        &self,
        agent: AgentCode,
        work_group: Option<&str>,
    ) -> Result<Vec<ActiveAssignment>, AtriumError> {
        queries::assignments::open_for_agent(self.db()?, agent, work_group).await
    }

    async fn count_open(&self, agent: AgentCode, work_group: &str) -> Result<u32, AtriumError> {
        queries::assignments::count_open(self.db()?, agent, work_group).await
    }

    async fn open_counts(
        &self,
        work_group: Option<&str>,
    ) -> Result<Vec<OpenClaimCount>, AtriumError> {
        queries::assignments::open_counts(self.db()?, work_group).await
    }

    async fn sweep_orphans(&self, now: DateTime<Utc>) -> Result<u64, AtriumError> {
        queries::assignments::sweep_orphans(self.db()?, now).await
    }
}

#[async_trait]
impl BlockLedger for SqliteStore {
    async fn get_block(&self, key: &ConversationKey) -> Result<Option<BlockRecord>, AtriumError> {
        queries::blocks::get_block(self.db()?, key).await
    }
}

#[async_trait]
impl CapacityStore for SqliteStore {
    async fn capacity_limit(&self, work_group: &str) -> Result<Option<u32>, AtriumError> {
        queries::capacity::capacity_limit(self.db()?, work_group).await
    }

    async fn set_capacity_limit(&self, work_group: &str, limit: u32) -> Result<(), AtriumError> {
        queries::capacity::set_capacity_limit(self.db()?, work_group, limit).await
    }
}

#[async_trait]
impl TimelineView for SqliteStore {
    async fn candidates_for(&self, query: &CandidateQuery) -> Result<Vec<Candidate>, AtriumError> {
        queries::timeline::candidates_for(self.db()?, query).await
    }

    async fn last_message(
        &self,
        key: &ConversationKey,
    ) -> Result<Option<LastMessage>, AtriumError> {
        queries::timeline::last_message(self.db()?, key).await
    }

    async fn history(
        &self,
        key: &ConversationKey,
        limit: u32,
    ) -> Result<Vec<TimelineEntry>, AtriumError> {
        queries::timeline::history(self.db()?, key, limit).await
    }

    async fn display_name(&self, key: &ConversationKey) -> Result<Option<String>, AtriumError> {
        queries::timeline::display_name(self.db()?, key).await
    }

    async fn append_message(&self, message: &NewMessage) -> Result<i64, AtriumError> {
        queries::timeline::append_message(self.db()?, message).await
    }

    async fn append_campaign_send(&self, send: &NewCampaignSend) -> Result<i64, AtriumError> {
        queries::timeline::append_campaign_send(self.db()?, send).await
    }

    async fn append_adhoc(&self, message: &NewAdhocMessage) -> Result<i64, AtriumError> {
        queries::timeline::append_adhoc(self.db()?, message).await
    }
}
