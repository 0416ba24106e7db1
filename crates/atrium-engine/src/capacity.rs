// SPDX-FileCopyrightText: 2026 Atrium Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-agent capacity limits and open-claim introspection.

use atrium_core::types::{ActiveAssignment, AgentCode, OpenClaimCount};
use atrium_core::{AssignmentStore, AtriumError, CapacityStore};
use tracing::info;

use crate::ClaimEngine;

impl ClaimEngine {
    /// Configured limit for a work group. 0 means unlimited.
    pub async fn capacity_limit(&self, work_group: &str) -> Result<u32, AtriumError> {
        self.channels(work_group).await?;
        Ok(self.store.capacity_limit(work_group).await?.unwrap_or(0))
    }

    /// Claims the agent may still open in the work group; `None` when unlimited.
    pub async fn remaining_capacity(
        &self,
        agent: AgentCode,
        work_group: &str,
    ) -> Result<Option<u32>, AtriumError> {
        let limit = self.capacity_limit(work_group).await?;
        if limit == 0 {
            return Ok(None);
        }
        let open = self.store.count_open(agent, work_group).await?;
        Ok(Some(limit.saturating_sub(open)))
    }

    /// Admin update of a work group's limit, accepted within `0..=max_capacity_limit`.
    pub async fn set_capacity(&self, work_group: &str, limit: i64) -> Result<(), AtriumError> {
        let max = self.settings.max_capacity_limit;
        let accepted = u32::try_from(limit)
            .ok()
            .filter(|l| *l <= max)
            .ok_or(AtriumError::InvalidCapacity { limit, max })?;

        self.channels(work_group).await?;
        self.store.set_capacity_limit(work_group, accepted).await?;
        info!(work_group, limit = accepted, "capacity limit updated");
        Ok(())
    }

    /// Open claims grouped by (agent, work group).
    pub async fn capacity_overview(
        &self,
        work_group: Option<&str>,
    ) -> Result<Vec<OpenClaimCount>, AtriumError> {
        if let Some(wg) = work_group {
            self.channels(wg).await?;
        }
        self.store.open_counts(work_group).await
    }

    /// Conversations the agent currently holds, oldest claim first.
    pub async fn open_claims(
        &self,
        agent: AgentCode,
        work_group: Option<&str>,
    ) -> Result<Vec<ActiveAssignment>, AtriumError> {
        self.store.open_for_agent(agent, work_group).await
    }

    /// Fail with `CapacityExceeded` when the agent is full. Returns the limit in force.
    pub(crate) async fn capacity_guard(
        &self,
        agent: AgentCode,
        work_group: &str,
    ) -> Result<u32, AtriumError> {
        let limit = self.store.capacity_limit(work_group).await?.unwrap_or(0);
        if limit == 0 {
            return Ok(0);
        }
        let current = self.store.count_open(agent, work_group).await?;
        if current >= limit {
            return Err(AtriumError::CapacityExceeded { limit, current });
        }
        Ok(limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{self, ago, inbound};
    use crate::ClaimRequest;

    #[tokio::test]
    async fn limits_outside_range_are_rejected() {
        let (engine, _dir) = testing::engine().await;
        for bad in [-1, 51, i64::from(u32::MAX) + 1] {
            assert!(matches!(
                engine.set_capacity("support", bad).await,
                Err(AtriumError::InvalidCapacity { max: 50, .. })
            ));
        }
        engine.set_capacity("support", 50).await.unwrap();
        engine.set_capacity("support", 0).await.unwrap();
        assert_eq!(engine.capacity_limit("support").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn unknown_group_is_reported() {
        let (engine, _dir) = testing::engine().await;
        assert!(matches!(
            engine.set_capacity("sales", 3).await,
            Err(AtriumError::UnknownWorkGroup(_))
        ));
        assert!(matches!(
            engine.capacity_overview(Some("sales")).await,
            Err(AtriumError::UnknownWorkGroup(_))
        ));
    }

    #[tokio::test]
    async fn remaining_counts_down_with_claims() {
        let (engine, _dir) = testing::engine().await;
        engine.go_online(AgentCode(1), "support").await.unwrap();
        assert_eq!(
            engine.remaining_capacity(AgentCode(1), "support").await.unwrap(),
            None
        );

        engine.set_capacity("support", 2).await.unwrap();
        inbound(&engine, "5511999990001", "line-1", ago(5)).await;
        engine
            .claim(ClaimRequest::directed(AgentCode(1), "support", "5511999990001"))
            .await
            .unwrap();

        assert_eq!(
            engine.remaining_capacity(AgentCode(1), "support").await.unwrap(),
            Some(1)
        );
        let overview = engine.capacity_overview(Some("support")).await.unwrap();
        assert_eq!(
            overview,
            vec![OpenClaimCount {
                agent: AgentCode(1),
                work_group: "support".to_string(),
                open: 1,
            }]
        );
    }
}
