// SPDX-FileCopyrightText: 2026 Atrium Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Assignment store, block ledger, and capacity configuration traits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::AtriumError;
use crate::identity::ConversationKey;
use crate::types::{
    ActiveAssignment, AgentCode, BlockRecord, EndReason, NewReservation, OpenClaimCount,
    ReserveOutcome,
};

/// The single source of truth for who owns which conversation.
///
/// At most one open row (no `ended_at`) may exist per [`ConversationKey`];
/// implementations must enforce this inside the store itself.
#[async_trait]
pub trait AssignmentStore: Send + Sync {
    /// Atomically insert an open row, or report why it could not be inserted.
    ///
    /// `capacity_limit` of 0 means unlimited. The limit is re-checked in the
    /// same atomic step as the insert.
    async fn reserve(
        &self,
        reservation: &NewReservation,
        capacity_limit: u32,
    ) -> Result<ReserveOutcome, AtriumError>;

    /// The open row for a conversation, if any.
    async fn open_assignment(
        &self,
        key: &ConversationKey,
    ) -> Result<Option<ActiveAssignment>, AtriumError>;

    /// End the agent's open row for a conversation. Returns the ended row.
    async fn end_assignment(
        &self,
        agent: AgentCode,
        key: &ConversationKey,
        ended_at: DateTime<Utc>,
        reason: EndReason,
    ) -> Result<Option<ActiveAssignment>, AtriumError>;

    /// End the agent's open row and record its cooldown block in one atomic
    /// step. `block` names the agent, the conversation, the close instant
    /// and the reason. Returns `None`, writing nothing, when the agent holds
    /// no open row on the conversation.
    async fn close_assignment(
        &self,
        block: &BlockRecord,
    ) -> Result<Option<ActiveAssignment>, AtriumError>;

    /// Open rows held by an agent, optionally within one work group.
    async fn open_for_agent(
        &self,
        agent: AgentCode,
        work_group: Option<&str>,
    ) -> Result<Vec<ActiveAssignment>, AtriumError>;

    async fn count_open(&self, agent: AgentCode, work_group: &str) -> Result<u32, AtriumError>;

    /// Open rows grouped by (agent, work group).
    async fn open_counts(
        &self,
        work_group: Option<&str>,
    ) -> Result<Vec<OpenClaimCount>, AtriumError>;

    /// End every open row whose agent no longer has a membership in that
    /// row's work group. Idempotent. Returns the number of rows ended.
    async fn sweep_orphans(&self, now: DateTime<Utc>) -> Result<u64, AtriumError>;
}

/// Cooldown records, written by [`AssignmentStore::close_assignment`].
#[async_trait]
pub trait BlockLedger: Send + Sync {
    async fn get_block(&self, key: &ConversationKey) -> Result<Option<BlockRecord>, AtriumError>;
}

/// Per-work-group limit on concurrently open claims per agent.
#[async_trait]
pub trait CapacityStore: Send + Sync {
    /// Stored limit; `None` when never configured.
    async fn capacity_limit(&self, work_group: &str) -> Result<Option<u32>, AtriumError>;

    async fn set_capacity_limit(&self, work_group: &str, limit: u32) -> Result<(), AtriumError>;
}
