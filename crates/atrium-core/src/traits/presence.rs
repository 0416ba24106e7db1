// SPDX-FileCopyrightText: 2026 Atrium Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Agent provisioning, queue membership, and work-group directory traits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::AtriumError;
use crate::types::{Agent, AgentCode, QueueMembership, WorkGroupSpec};

/// Agents and their per-work-group online presence.
#[async_trait]
pub trait PresenceStore: Send + Sync {
    /// Provision an agent. Fails with `AgentExists` on a duplicate code.
    async fn create_agent(&self, agent: &Agent) -> Result<(), AtriumError>;

    async fn get_agent(&self, code: AgentCode) -> Result<Option<Agent>, AtriumError>;

    /// Insert a membership. Returns `false` when the pair already exists.
    async fn insert_membership(
        &self,
        agent: AgentCode,
        work_group: &str,
        joined_at: DateTime<Utc>,
    ) -> Result<bool, AtriumError>;

    /// Delete a membership. Returns `false` when no row existed.
    async fn delete_membership(
        &self,
        agent: AgentCode,
        work_group: &str,
    ) -> Result<bool, AtriumError>;

    async fn get_membership(
        &self,
        agent: AgentCode,
        work_group: &str,
    ) -> Result<Option<QueueMembership>, AtriumError>;

    /// Memberships ordered by join time ascending (first online, first served).
    async fn list_memberships(
        &self,
        work_group: Option<&str>,
    ) -> Result<Vec<QueueMembership>, AtriumError>;
}

/// Registered work groups and the channels each one serves.
#[async_trait]
pub trait WorkGroupDirectory: Send + Sync {
    /// Register a work group, replacing its channel set.
    ///
    /// The capacity in `spec` only seeds the limit when none is stored yet.
    async fn upsert_work_group(&self, spec: &WorkGroupSpec) -> Result<(), AtriumError>;

    /// Channels of a work group, or `None` if the group is unknown.
    async fn channels_for(&self, work_group: &str) -> Result<Option<Vec<String>>, AtriumError>;

    async fn list_work_groups(&self) -> Result<Vec<String>, AtriumError>;
}
