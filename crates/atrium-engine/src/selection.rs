// SPDX-FileCopyrightText: 2026 Atrium Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Candidate selection and conversation lookups over the timeline view.

use atrium_core::types::{AgentCode, Candidate, CandidateQuery, TimelineEntry};
use atrium_core::{AssignmentStore, AtriumError, ConversationKey, PhoneKey, TimelineView};
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::ClaimEngine;

impl ClaimEngine {
    /// Ranked conversations an undirected claim would walk right now.
    pub async fn candidates(&self, work_group: &str) -> Result<Vec<Candidate>, AtriumError> {
        let channels = self.channels(work_group).await?;
        self.store
            .candidates_for(&CandidateQuery {
                channels,
                since: Some(self.window_start()),
                ..Default::default()
            })
            .await
    }

    /// Merged timeline of one conversation, oldest first.
    pub async fn timeline(
        &self,
        phone: &str,
        channel: &str,
        limit: u32,
    ) -> Result<Vec<TimelineEntry>, AtriumError> {
        let key = self.key(phone, channel)?;
        self.store.history(&key, limit).await
    }

    /// Whether a human agent currently holds the conversation.
    ///
    /// Automated responders check this before replying.
    pub async fn has_human_owner(&self, phone: &str, channel: &str) -> Result<bool, AtriumError> {
        let key = self.key(phone, channel)?;
        Ok(self.store.open_assignment(&key).await?.is_some())
    }

    pub(crate) fn window_start(&self) -> DateTime<Utc> {
        Utc::now() - self.settings.recency_window
    }

    /// The conversation as a candidate, open claims included.
    pub(crate) async fn eligible(
        &self,
        key: &ConversationKey,
        since: Option<DateTime<Utc>>,
    ) -> Result<Option<Candidate>, AtriumError> {
        let mut found = self
            .store
            .candidates_for(&CandidateQuery {
                channels: vec![key.channel.clone()],
                since,
                phone_key: Some(key.phone_key.clone()),
                include_assigned: true,
                inbound_only: false,
            })
            .await?;
        Ok(found.pop())
    }

    /// Pick the channel a phone-only directed claim targets.
    ///
    /// Preference: a conversation the agent already holds, then the best
    /// ranked eligible one, then one held by someone else (so the caller
    /// reports the holder).
    pub(crate) async fn resolve_channel(
        &self,
        agent: AgentCode,
        phone_key: &PhoneKey,
        channels: &[String],
        since: Option<DateTime<Utc>>,
    ) -> Result<String, AtriumError> {
        let held = self.store.open_for_agent(agent, None).await?;
        if let Some(own) = held
            .iter()
            .find(|a| &a.key.phone_key == phone_key && channels.contains(&a.key.channel))
        {
            return Ok(own.key.channel.clone());
        }

        let ranked = self
            .store
            .candidates_for(&CandidateQuery {
                channels: channels.to_vec(),
                since,
                phone_key: Some(phone_key.clone()),
                include_assigned: false,
                inbound_only: false,
            })
            .await?;
        if let Some(best) = ranked.into_iter().next() {
            return Ok(best.key.channel);
        }

        for channel in channels {
            let key = ConversationKey::new(phone_key.clone(), channel.clone());
            if self.store.open_assignment(&key).await?.is_some() {
                return Ok(channel.clone());
            }
        }

        debug!(phone_key = %phone_key, "no channel of the work group has this conversation");
        Err(AtriumError::NotInQueue)
    }
}
