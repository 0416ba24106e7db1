// SPDX-FileCopyrightText: 2026 Atrium Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Release and close of held conversations.

use std::str::FromStr;

use atrium_core::types::{ActiveAssignment, AgentCode, BlockRecord, CloseReason, EndReason};
use atrium_core::{AssignmentStore, AtriumError};
use chrono::{SubsecRound, Utc};
use serde::Serialize;
use tracing::info;

use crate::ClaimEngine;

/// Result of a close: the ended row and the cooldown it started.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClosedClaim {
    pub assignment: ActiveAssignment,
    pub block: BlockRecord,
}

impl ClaimEngine {
    /// Give a conversation back to the pool without cooldown.
    pub async fn release(
        &self,
        agent: AgentCode,
        phone: &str,
        channel: &str,
    ) -> Result<ActiveAssignment, AtriumError> {
        let key = self.key(phone, channel)?;
        let ended = self
            .store
            .end_assignment(agent, &key, Utc::now(), EndReason::Released)
            .await?
            .ok_or(AtriumError::NotFound)?;

        info!(
            agent = %agent,
            work_group = %ended.work_group,
            phone_key = %key.phone_key,
            channel = %key.channel,
            "conversation released"
        );
        Ok(ended)
    }

    /// End a conversation and hold it out of the pool until the customer writes again.
    pub async fn close(
        &self,
        agent: AgentCode,
        phone: &str,
        channel: &str,
        reason: &str,
    ) -> Result<ClosedClaim, AtriumError> {
        let reason = CloseReason::from_str(reason.trim())
            .map_err(|_| AtriumError::InvalidReason(reason.to_string()))?;
        let key = self.key(phone, channel)?;

        let block = BlockRecord {
            key,
            blocked_at: Utc::now().trunc_subsecs(3),
            reason,
            agent,
        };
        let assignment = self
            .store
            .close_assignment(&block)
            .await?
            .ok_or(AtriumError::NotFound)?;

        info!(
            agent = %agent,
            work_group = %assignment.work_group,
            phone_key = %block.key.phone_key,
            channel = %block.key.channel,
            reason = %reason,
            "conversation closed"
        );
        Ok(ClosedClaim { assignment, block })
    }
}
