// SPDX-FileCopyrightText: 2026 Atrium Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read side over the three append-only message logs, plus their append interfaces.

use async_trait::async_trait;

use crate::error::AtriumError;
use crate::identity::ConversationKey;
use crate::types::{
    Candidate, CandidateQuery, LastMessage, NewAdhocMessage, NewCampaignSend, NewMessage,
    TimelineEntry,
};

/// Unified conversation timeline over campaign sends, the message log, and
/// ad-hoc messages.
#[async_trait]
pub trait TimelineView: Send + Sync {
    /// Eligible conversations, ranked inbound-first then most recent first.
    ///
    /// Conversations with a block record are kept only when an inbound
    /// message arrived after the block.
    async fn candidates_for(&self, query: &CandidateQuery) -> Result<Vec<Candidate>, AtriumError>;

    async fn last_message(&self, key: &ConversationKey)
        -> Result<Option<LastMessage>, AtriumError>;

    /// Full merged timeline of one conversation, oldest first, capped at `limit` newest rows.
    async fn history(
        &self,
        key: &ConversationKey,
        limit: u32,
    ) -> Result<Vec<TimelineEntry>, AtriumError>;

    /// Most recent customer-provided display name.
    async fn display_name(&self, key: &ConversationKey) -> Result<Option<String>, AtriumError>;

    async fn append_message(&self, message: &NewMessage) -> Result<i64, AtriumError>;

    async fn append_campaign_send(&self, send: &NewCampaignSend) -> Result<i64, AtriumError>;

    async fn append_adhoc(&self, message: &NewAdhocMessage) -> Result<i64, AtriumError>;
}
