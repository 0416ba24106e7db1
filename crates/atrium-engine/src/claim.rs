// SPDX-FileCopyrightText: 2026 Atrium Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Directed and undirected claims.
//!
//! Both paths end in the store's reserve-or-fail primitive. A directed claim
//! that loses the race reads the holder once and reports it; an undirected
//! claim moves on to the next ranked candidate.

use std::sync::Arc;
use std::time::Duration;

use atrium_core::types::{
    ActiveAssignment, AgentCode, Candidate, CandidateQuery, Direction, EndReason, NewReservation,
    ReserveOutcome,
};
use atrium_core::{
    AssignmentStore, AtriumError, BlockLedger, ConversationKey, PhoneKey, PresenceStore,
    TimelineView,
};
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn, Instrument};

use crate::ClaimEngine;

/// A claim request as sent by the agent console.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimRequest {
    pub agent: AgentCode,
    pub work_group: String,
    /// Target conversation. Absent or blank means "give me the next one".
    #[serde(default)]
    pub phone: Option<String>,
    /// Restricts the claim to one channel of the work group.
    #[serde(default)]
    pub channel: Option<String>,
    /// Directed: ignore the recency window. Undirected: inbound conversations only.
    #[serde(default)]
    pub priority: bool,
}

impl ClaimRequest {
    pub fn undirected(agent: AgentCode, work_group: &str) -> Self {
        Self {
            agent,
            work_group: work_group.to_string(),
            phone: None,
            channel: None,
            priority: false,
        }
    }

    pub fn directed(agent: AgentCode, work_group: &str, phone: &str) -> Self {
        Self {
            phone: Some(phone.to_string()),
            ..Self::undirected(agent, work_group)
        }
    }

    pub fn on_channel(mut self, channel: &str) -> Self {
        self.channel = Some(channel.to_string());
        self
    }

    pub fn with_priority(mut self) -> Self {
        self.priority = true;
        self
    }

    fn target(&self) -> Option<&str> {
        self.phone.as_deref().map(str::trim).filter(|p| !p.is_empty())
    }
}

/// What the agent console shows for a claimed conversation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimSummary {
    /// Phone as logged, for replies.
    pub phone: String,
    pub phone_key: PhoneKey,
    pub channel: String,
    pub work_group: String,
    pub agent: AgentCode,
    pub display_name: String,
    pub last_message: Option<String>,
    pub last_message_at: Option<DateTime<Utc>>,
    pub direction: Option<Direction>,
    pub claimed_at: DateTime<Utc>,
    /// The agent already held this conversation; nothing was written.
    pub reused: bool,
}

impl ClaimEngine {
    /// Claim a conversation for an agent.
    pub async fn claim(&self, request: ClaimRequest) -> Result<ClaimSummary, AtriumError> {
        self.sweep().await?;
        self.require_online(request.agent, &request.work_group)
            .await?;
        let channels = self.channels(&request.work_group).await?;

        match request.target() {
            Some(phone) => self.claim_directed(&request, phone, &channels).await,
            None => self.claim_undirected(&request, &channels).await,
        }
    }

    /// [`claim`](Self::claim) under a deadline.
    ///
    /// The claim runs in its own task and is never cancelled partway. Once
    /// the deadline passes the caller gets [`AtriumError::Timeout`]; if the
    /// claim still lands afterwards, the new row is ended with
    /// [`EndReason::TimedOut`] so the caller holds nothing they were not told
    /// about. A late reclaim of a conversation the agent already held is kept.
    pub async fn claim_within(
        self: &Arc<Self>,
        request: ClaimRequest,
        deadline: Duration,
    ) -> Result<ClaimSummary, AtriumError> {
        let engine = Arc::clone(self);
        let mut task =
            tokio::spawn(async move { engine.claim(request).await }.in_current_span());

        match tokio::time::timeout(deadline, &mut task).await {
            Ok(joined) => joined
                .map_err(|e| AtriumError::Internal(format!("claim task failed: {e}")))?,
            Err(_) => {
                let engine = Arc::clone(self);
                tokio::spawn(engine.settle_late_claim(task).in_current_span());
                Err(AtriumError::Timeout { duration: deadline })
            }
        }
    }

    async fn settle_late_claim(
        self: Arc<Self>,
        task: JoinHandle<Result<ClaimSummary, AtriumError>>,
    ) {
        let summary = match task.await {
            Ok(Ok(summary)) => summary,
            Ok(Err(e)) => {
                debug!(error = %e, "claim failed after its deadline");
                return;
            }
            Err(e) => {
                warn!(error = %e, "claim task failed after its deadline");
                return;
            }
        };
        if summary.reused {
            debug!(agent = %summary.agent, "late reclaim kept, the agent already held it");
            return;
        }

        let key = ConversationKey::new(summary.phone_key, summary.channel);
        match self
            .store
            .end_assignment(summary.agent, &key, Utc::now(), EndReason::TimedOut)
            .await
        {
            Ok(ended) => warn!(
                agent = %summary.agent,
                conversation = %key,
                ended = ended.is_some(),
                "claim completed after its deadline, released"
            ),
            Err(e) => error!(
                agent = %summary.agent,
                conversation = %key,
                error = %e,
                "failed to release claim that completed after its deadline"
            ),
        }
    }

    async fn claim_directed(
        &self,
        request: &ClaimRequest,
        phone: &str,
        channels: &[String],
    ) -> Result<ClaimSummary, AtriumError> {
        let agent = request.agent;
        let phone_key = self.normalizer.normalize(phone)?;
        let since = (!request.priority).then(|| self.window_start());

        let channel = match request.channel.as_deref() {
            Some(c) if channels.iter().any(|known| known == c) => c.to_string(),
            Some(c) => {
                debug!(agent = %agent, channel = c, "channel is not served by the work group");
                return Err(AtriumError::NotInQueue);
            }
            None => {
                self.resolve_channel(agent, &phone_key, channels, since)
                    .await?
            }
        };
        let key = ConversationKey::new(phone_key, channel);

        if let Some(open) = self.store.open_assignment(&key).await? {
            return self.existing(agent, open).await;
        }

        let limit = self.capacity_guard(agent, &request.work_group).await?;

        let Some(candidate) = self.eligible(&key, since).await? else {
            match self.store.get_block(&key).await? {
                Some(block) => debug!(
                    agent = %agent,
                    conversation = %key,
                    reason = %block.reason,
                    closed_by = %block.agent,
                    blocked_at = %block.blocked_at,
                    "conversation is cooling down"
                ),
                None => debug!(agent = %agent, conversation = %key, "conversation is not a candidate"),
            }
            return Err(AtriumError::NotInQueue);
        };

        let reservation = reservation(request, &candidate);
        match self.store.reserve(&reservation, limit).await? {
            ReserveOutcome::Reserved(assignment) => {
                info!(
                    agent = %agent,
                    work_group = %request.work_group,
                    phone_key = %key.phone_key,
                    channel = %key.channel,
                    "conversation claimed"
                );
                self.summary(assignment, false).await
            }
            ReserveOutcome::Taken => {
                warn!(agent = %agent, conversation = %key, "lost claim race");
                match self.store.open_assignment(&key).await? {
                    Some(open) => self.existing(agent, open).await,
                    None => Err(AtriumError::StoreUnavailable {
                        message: "conversation changed hands during the claim, retry".to_string(),
                    }),
                }
            }
            ReserveOutcome::AtCapacity { current } => {
                Err(AtriumError::CapacityExceeded { limit, current })
            }
        }
    }

    async fn claim_undirected(
        &self,
        request: &ClaimRequest,
        channels: &[String],
    ) -> Result<ClaimSummary, AtriumError> {
        let agent = request.agent;
        let channels = match request.channel.as_deref() {
            Some(c) if channels.iter().any(|known| known == c) => vec![c.to_string()],
            Some(_) => return Err(AtriumError::NotInQueue),
            None => channels.to_vec(),
        };

        let limit = self.capacity_guard(agent, &request.work_group).await?;

        let ranked = self
            .store
            .candidates_for(&CandidateQuery {
                channels,
                since: Some(self.window_start()),
                phone_key: None,
                include_assigned: false,
                inbound_only: request.priority,
            })
            .await?;
        debug!(agent = %agent, candidates = ranked.len(), "walking candidates");

        for candidate in &ranked {
            match self
                .store
                .reserve(&reservation(request, candidate), limit)
                .await?
            {
                ReserveOutcome::Reserved(assignment) => {
                    info!(
                        agent = %agent,
                        work_group = %request.work_group,
                        phone_key = %candidate.key.phone_key,
                        channel = %candidate.key.channel,
                        "conversation dispatched"
                    );
                    return self.summary(assignment, false).await;
                }
                ReserveOutcome::Taken => {
                    debug!(agent = %agent, conversation = %candidate.key, "candidate taken, advancing");
                }
                ReserveOutcome::AtCapacity { current } => {
                    return Err(AtriumError::CapacityExceeded { limit, current });
                }
            }
        }

        Err(AtriumError::NoneAvailable)
    }

    /// Resolve an already-open conversation: reuse for the holder, conflict for anyone else.
    async fn existing(
        &self,
        agent: AgentCode,
        open: ActiveAssignment,
    ) -> Result<ClaimSummary, AtriumError> {
        if open.agent == agent {
            debug!(agent = %agent, conversation = %open.key, "re-claim of held conversation");
            return self.summary(open, true).await;
        }
        let holder_name = self
            .store
            .get_agent(open.agent)
            .await?
            .map(|a| a.display_name);
        Err(AtriumError::AlreadyAssigned {
            holder: open.agent,
            holder_name,
        })
    }

    async fn summary(
        &self,
        assignment: ActiveAssignment,
        reused: bool,
    ) -> Result<ClaimSummary, AtriumError> {
        let last = self.store.last_message(&assignment.key).await?;
        let display_name = self
            .store
            .display_name(&assignment.key)
            .await?
            .unwrap_or_else(|| assignment.phone_raw.clone());

        Ok(ClaimSummary {
            display_name,
            last_message_at: last.as_ref().map(|m| m.at),
            direction: last.as_ref().map(|m| m.direction),
            last_message: last.map(|m| m.text),
            phone: assignment.phone_raw,
            phone_key: assignment.key.phone_key,
            channel: assignment.key.channel,
            work_group: assignment.work_group,
            agent: assignment.agent,
            claimed_at: assignment.started_at,
            reused,
        })
    }
}

fn reservation(request: &ClaimRequest, candidate: &Candidate) -> NewReservation {
    NewReservation {
        key: candidate.key.clone(),
        phone_raw: candidate.phone_raw.clone(),
        work_group: request.work_group.clone(),
        agent: request.agent,
        // Persisted with millisecond precision; keep the returned row identical.
        started_at: Utc::now().trunc_subsecs(3),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{self, ago, campaign, inbound, message};
    use tracing_test::traced_test;

    const PHONE: &str = "5511999990000";

    async fn online(engine: &ClaimEngine, codes: &[i64]) {
        for code in codes {
            engine
                .go_online(AgentCode(*code), "support")
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn offline_agent_cannot_claim() {
        let (engine, _dir) = testing::engine().await;
        inbound(&engine, PHONE, "line-1", ago(1)).await;
        let err = engine
            .claim(ClaimRequest::directed(AgentCode(3), "support", PHONE))
            .await
            .unwrap_err();
        assert!(matches!(err, AtriumError::AgentOffline { agent: AgentCode(3), .. }));
    }

    #[tokio::test]
    async fn directed_claim_returns_summary() {
        let (engine, _dir) = testing::engine().await;
        online(&engine, &[1]).await;
        inbound(&engine, PHONE, "line-1", ago(4)).await;

        let summary = engine
            .claim(ClaimRequest::directed(AgentCode(1), "support", PHONE))
            .await
            .unwrap();
        assert_eq!(summary.phone, PHONE);
        assert_eq!(summary.phone_key.as_str(), "551199990000");
        assert_eq!(summary.channel, "line-1");
        assert_eq!(summary.display_name, PHONE);
        assert_eq!(summary.last_message.as_deref(), Some("inbound message"));
        assert_eq!(summary.direction, Some(Direction::Inbound));
        assert!(!summary.reused);
    }

    #[tokio::test]
    async fn reclaim_by_holder_is_idempotent() {
        let (engine, _dir) = testing::engine().await;
        online(&engine, &[1]).await;
        inbound(&engine, PHONE, "line-1", ago(4)).await;

        let first = engine
            .claim(ClaimRequest::directed(AgentCode(1), "support", PHONE))
            .await
            .unwrap();
        message(&engine, PHONE, "line-1", Direction::Outbound, ago(1)).await;
        let again = engine
            .claim(ClaimRequest::directed(AgentCode(1), "support", "551199990000"))
            .await
            .unwrap();

        assert!(again.reused);
        assert_eq!(again.claimed_at, first.claimed_at);
        assert_eq!(again.last_message.as_deref(), Some("outbound message"));
        assert_eq!(engine.capacity_overview(None).await.unwrap()[0].open, 1);
    }

    #[tokio::test]
    async fn other_agents_see_the_holder() {
        let (engine, _dir) = testing::engine().await;
        online(&engine, &[1, 2]).await;
        inbound(&engine, PHONE, "line-1", ago(4)).await;

        engine
            .claim(ClaimRequest::directed(AgentCode(1), "support", PHONE))
            .await
            .unwrap();
        let err = engine
            .claim(ClaimRequest::directed(AgentCode(2), "support", PHONE))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AtriumError::AlreadyAssigned { holder: AgentCode(1), holder_name: Some(ref n) } if n == "Ana"
        ));
    }

    #[tokio::test]
    async fn stale_conversation_needs_priority() {
        let (engine, _dir) = testing::engine().await;
        online(&engine, &[1]).await;
        inbound(&engine, PHONE, "line-1", ago(60 * 30)).await;

        let err = engine
            .claim(ClaimRequest::directed(AgentCode(1), "support", PHONE))
            .await
            .unwrap_err();
        assert!(matches!(err, AtriumError::NotInQueue));

        let summary = engine
            .claim(ClaimRequest::directed(AgentCode(1), "support", PHONE).with_priority())
            .await
            .unwrap();
        assert_eq!(summary.channel, "line-1");
    }

    #[tokio::test]
    #[traced_test]
    async fn cooldown_is_named_when_a_directed_claim_is_refused() {
        let (engine, _dir) = testing::engine().await;
        online(&engine, &[1]).await;
        inbound(&engine, PHONE, "line-1", ago(5)).await;
        engine
            .claim(ClaimRequest::directed(AgentCode(1), "support", PHONE))
            .await
            .unwrap();
        engine
            .close(AgentCode(1), PHONE, "line-1", "spam")
            .await
            .unwrap();

        let err = engine
            .claim(ClaimRequest::directed(AgentCode(1), "support", PHONE).on_channel("line-1"))
            .await
            .unwrap_err();
        assert!(matches!(err, AtriumError::NotInQueue));
        assert!(logs_contain("conversation is cooling down"));
        assert!(logs_contain("reason=spam"));
    }

    const DEADLINE: Duration = Duration::from_millis(50);

    /// Hold the database write lock from a second connection so a claim
    /// cannot finish until the returned connection is dropped.
    fn hold_write_lock(dir: &tempfile::TempDir) -> rusqlite::Connection {
        let conn = rusqlite::Connection::open(dir.path().join("engine.db")).unwrap();
        conn.execute_batch("BEGIN IMMEDIATE").unwrap();
        conn
    }

    async fn wait_for_log(logs_contain: impl Fn(&str) -> bool, line: &str) {
        for _ in 0..300 {
            if logs_contain(line) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("log line never appeared: {line}");
    }

    #[tokio::test]
    #[traced_test]
    async fn claim_landing_after_its_deadline_is_released() {
        let (engine, dir) = testing::engine().await;
        let engine = Arc::new(engine);
        online(&engine, &[1]).await;
        inbound(&engine, PHONE, "line-1", ago(2)).await;

        let lock = hold_write_lock(&dir);
        let err = engine
            .claim_within(ClaimRequest::undirected(AgentCode(1), "support"), DEADLINE)
            .await
            .unwrap_err();
        assert!(matches!(err, AtriumError::Timeout { .. }));
        assert!(err.is_retryable());
        drop(lock);

        wait_for_log(logs_contain, "claim completed after its deadline, released").await;
        assert!(engine.open_claims(AgentCode(1), None).await.unwrap().is_empty());
        assert!(!engine.has_human_owner(PHONE, "line-1").await.unwrap());

        // The retry gets the same conversation and the agent holds exactly one.
        let summary = engine
            .claim_within(
                ClaimRequest::undirected(AgentCode(1), "support"),
                Duration::from_secs(5),
            )
            .await
            .unwrap();
        assert_eq!(summary.phone, PHONE);
        assert_eq!(engine.open_claims(AgentCode(1), None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    #[traced_test]
    async fn late_reclaim_keeps_the_held_conversation() {
        let (engine, dir) = testing::engine().await;
        let engine = Arc::new(engine);
        online(&engine, &[1]).await;
        inbound(&engine, PHONE, "line-1", ago(2)).await;
        engine
            .claim(ClaimRequest::directed(AgentCode(1), "support", PHONE))
            .await
            .unwrap();

        let lock = hold_write_lock(&dir);
        let err = engine
            .claim_within(ClaimRequest::directed(AgentCode(1), "support", PHONE), DEADLINE)
            .await
            .unwrap_err();
        assert!(matches!(err, AtriumError::Timeout { .. }));
        drop(lock);

        wait_for_log(logs_contain, "late reclaim kept").await;
        assert!(engine.has_human_owner(PHONE, "line-1").await.unwrap());
    }

    #[tokio::test]
    async fn channel_outside_work_group_is_not_in_queue() {
        let (engine, _dir) = testing::engine().await;
        online(&engine, &[1]).await;
        inbound(&engine, PHONE, "line-9", ago(1)).await;

        for request in [
            ClaimRequest::directed(AgentCode(1), "support", PHONE).on_channel("line-9"),
            ClaimRequest::directed(AgentCode(1), "support", PHONE),
        ] {
            assert!(matches!(
                engine.claim(request).await,
                Err(AtriumError::NotInQueue)
            ));
        }
        assert!(matches!(
            engine
                .claim(ClaimRequest::undirected(AgentCode(1), "support").on_channel("line-9"))
                .await,
            Err(AtriumError::NotInQueue)
        ));
    }

    #[tokio::test]
    async fn capacity_blocks_new_claims_but_not_reclaims() {
        let (engine, _dir) = testing::engine().await;
        online(&engine, &[1]).await;
        engine.set_capacity("support", 1).await.unwrap();
        inbound(&engine, PHONE, "line-1", ago(4)).await;
        inbound(&engine, "5511999990001", "line-1", ago(3)).await;

        engine
            .claim(ClaimRequest::directed(AgentCode(1), "support", PHONE))
            .await
            .unwrap();
        assert!(matches!(
            engine
                .claim(ClaimRequest::directed(AgentCode(1), "support", "5511999990001"))
                .await,
            Err(AtriumError::CapacityExceeded { limit: 1, current: 1 })
        ));
        assert!(matches!(
            engine
                .claim(ClaimRequest::undirected(AgentCode(1), "support"))
                .await,
            Err(AtriumError::CapacityExceeded { limit: 1, current: 1 })
        ));

        let again = engine
            .claim(ClaimRequest::directed(AgentCode(1), "support", PHONE))
            .await
            .unwrap();
        assert!(again.reused);
    }

    #[tokio::test]
    async fn undirected_prefers_fresh_inbound() {
        let (engine, _dir) = testing::engine().await;
        online(&engine, &[1]).await;
        campaign(&engine, "5511999990002", "line-2", ago(120)).await;
        inbound(&engine, "5511999990001", "line-1", ago(1)).await;

        let summary = engine
            .claim(ClaimRequest::undirected(AgentCode(1), "support"))
            .await
            .unwrap();
        assert_eq!(summary.phone, "5511999990001");
    }

    #[tokio::test]
    async fn undirected_priority_skips_outbound_only() {
        let (engine, _dir) = testing::engine().await;
        online(&engine, &[1]).await;
        campaign(&engine, "5511999990002", "line-2", ago(2)).await;

        assert!(matches!(
            engine
                .claim(ClaimRequest::undirected(AgentCode(1), "support").with_priority())
                .await,
            Err(AtriumError::NoneAvailable)
        ));
        let summary = engine
            .claim(ClaimRequest::undirected(AgentCode(1), "support"))
            .await
            .unwrap();
        assert_eq!(summary.channel, "line-2");
    }

    #[tokio::test]
    async fn undirected_walks_past_claimed_conversations() {
        let (engine, _dir) = testing::engine().await;
        online(&engine, &[1, 2]).await;
        inbound(&engine, "5511999990001", "line-1", ago(1)).await;
        inbound(&engine, "5511999990002", "line-1", ago(2)).await;

        let first = engine
            .claim(ClaimRequest::undirected(AgentCode(1), "support"))
            .await
            .unwrap();
        let second = engine
            .claim(ClaimRequest::undirected(AgentCode(2), "support"))
            .await
            .unwrap();
        assert_eq!(first.phone, "5511999990001");
        assert_eq!(second.phone, "5511999990002");

        assert!(matches!(
            engine
                .claim(ClaimRequest::undirected(AgentCode(2), "support"))
                .await,
            Err(AtriumError::NoneAvailable)
        ));
    }

    #[tokio::test]
    async fn blank_phone_is_undirected() {
        let (engine, _dir) = testing::engine().await;
        online(&engine, &[1]).await;
        inbound(&engine, PHONE, "line-2", ago(1)).await;

        let summary = engine
            .claim(ClaimRequest::directed(AgentCode(1), "support", "   "))
            .await
            .unwrap();
        assert_eq!(summary.channel, "line-2");
    }

    #[test]
    fn request_deserializes_from_camel_case() {
        let request: ClaimRequest = serde_json::from_str(
            r#"{"agent": 4, "workGroup": "support", "phone": "5511999990000"}"#,
        )
        .unwrap();
        assert_eq!(request.agent, AgentCode(4));
        assert_eq!(request.work_group, "support");
        assert!(!request.priority);
        assert_eq!(request.channel, None);
    }
}
