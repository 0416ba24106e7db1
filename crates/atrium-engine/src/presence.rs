// SPDX-FileCopyrightText: 2026 Atrium Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Queue registry: agent provisioning and per-work-group presence.
//!
//! Presence order is join order. The first agent online in a work group is
//! first in [`ClaimEngine::list_online`], which is the fair-dispatch order
//! supervisors see.

use atrium_core::types::{Agent, AgentCode, QueueMembership};
use atrium_core::{AtriumError, PresenceStore};
use chrono::Utc;
use tracing::info;

use crate::ClaimEngine;

impl ClaimEngine {
    /// Provision an agent whose home work group must already be registered.
    pub async fn create_agent(
        &self,
        code: AgentCode,
        display_name: &str,
        home_work_group: &str,
        source: &str,
    ) -> Result<Agent, AtriumError> {
        self.channels(home_work_group).await?;

        let agent = Agent {
            code,
            display_name: display_name.to_string(),
            home_work_group: home_work_group.to_string(),
            source: source.to_string(),
            created_at: Utc::now(),
        };
        self.store.create_agent(&agent).await?;
        info!(agent = %code, work_group = home_work_group, source, "agent provisioned");
        Ok(agent)
    }

    pub async fn get_agent(&self, code: AgentCode) -> Result<Agent, AtriumError> {
        self.store
            .get_agent(code)
            .await?
            .ok_or(AtriumError::UnknownAgent(code))
    }

    /// Put an agent online in a work group.
    ///
    /// A second login for the same pair is rejected rather than merged.
    pub async fn go_online(
        &self,
        agent: AgentCode,
        work_group: &str,
    ) -> Result<QueueMembership, AtriumError> {
        self.get_agent(agent).await?;
        self.channels(work_group).await?;

        let joined_at = Utc::now();
        if !self
            .store
            .insert_membership(agent, work_group, joined_at)
            .await?
        {
            return Err(AtriumError::AlreadyOnline {
                agent,
                work_group: work_group.to_string(),
            });
        }

        info!(agent = %agent, work_group, "agent online");
        Ok(QueueMembership {
            agent,
            work_group: work_group.to_string(),
            joined_at,
        })
    }

    /// Take an agent offline. Open claims in the group are ended by the next sweep.
    pub async fn go_offline(&self, agent: AgentCode, work_group: &str) -> Result<(), AtriumError> {
        if !self.store.delete_membership(agent, work_group).await? {
            return Err(AtriumError::NotOnline {
                agent,
                work_group: work_group.to_string(),
            });
        }
        info!(agent = %agent, work_group, "agent offline");
        Ok(())
    }

    pub async fn list_online(
        &self,
        work_group: Option<&str>,
    ) -> Result<Vec<QueueMembership>, AtriumError> {
        self.store.list_memberships(work_group).await
    }
}
