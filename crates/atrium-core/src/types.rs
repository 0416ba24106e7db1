// SPDX-FileCopyrightText: 2026 Atrium Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared by the store traits, the claim engine, and the gateway.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::identity::ConversationKey;

/// Fixed-width UTC timestamp layout used for every persisted instant.
///
/// Lexicographic order of formatted values equals chronological order.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Format an instant in the canonical persisted layout.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a persisted timestamp. Any RFC 3339 offset is accepted and converted to UTC.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    match DateTime::parse_from_rfc3339(value) {
        Ok(at) => Ok(at.with_timezone(&Utc)),
        Err(_) => NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT).map(|n| n.and_utc()),
    }
}

/// Integer identity of a support agent.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct AgentCode(pub i64);

impl std::fmt::Display for AgentCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// A provisioned support agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    pub code: AgentCode,
    pub display_name: String,
    pub home_work_group: String,
    /// Where the agent record came from (e.g. "admin", "sso", "import").
    pub source: String,
    pub created_at: DateTime<Utc>,
}

/// An agent's presence in a work group. Exists only while the agent is online.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueMembership {
    pub agent: AgentCode,
    pub work_group: String,
    pub joined_at: DateTime<Utc>,
}

/// Why an assignment row stopped being open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    /// The agent released the conversation.
    Released,
    /// The agent closed the conversation (a block record was written).
    Closed,
    /// Housekeeping ended it because the agent left the work group.
    Swept,
    /// The claim landed after the caller's deadline and was undone.
    TimedOut,
}

/// A claim row. Open while `ended_at` is `None`; never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveAssignment {
    pub id: i64,
    pub key: ConversationKey,
    /// Phone as it appears in the conversation log (used for replies).
    pub phone_raw: String,
    pub work_group: String,
    pub agent: AgentCode,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub end_reason: Option<EndReason>,
}

impl ActiveAssignment {
    pub fn is_open(&self) -> bool {
        self.ended_at.is_none()
    }
}

/// Input to the atomic reservation primitive.
#[derive(Debug, Clone, PartialEq)]
pub struct NewReservation {
    pub key: ConversationKey,
    pub phone_raw: String,
    pub work_group: String,
    pub agent: AgentCode,
    pub started_at: DateTime<Utc>,
}

/// Result of one reserve-or-fail attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum ReserveOutcome {
    /// The open row was inserted.
    Reserved(ActiveAssignment),
    /// Another open row for the same conversation already exists.
    Taken,
    /// The agent reached the capacity limit between the check and the insert.
    AtCapacity { current: u32 },
}

/// Enumerated reasons accepted when closing a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    Resolved,
    NoResponse,
    WrongNumber,
    OptOut,
    Spam,
    Transferred,
}

/// Cooldown marker written when an agent closes a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockRecord {
    pub key: ConversationKey,
    pub blocked_at: DateTime<Utc>,
    pub reason: CloseReason,
    pub agent: AgentCode,
}

/// Direction of a logged message relative to the customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Inbound,
    Outbound,
}

/// Which append-only log a timeline entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MessageSource {
    /// Bulk campaign sends.
    Campaign,
    /// Inbound/outbound message log written by the channel webhook.
    Message,
    /// Ad-hoc outbound messages sent by agents or the virtual agent.
    Adhoc,
}

/// A conversation eligible for claiming, with its most recent message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub key: ConversationKey,
    pub phone_raw: String,
    pub direction: Direction,
    pub last_message: String,
    pub last_message_at: DateTime<Utc>,
    pub display_name: Option<String>,
}

/// Filter for candidate selection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidateQuery {
    /// Channels mapped to the work group (or the single requested channel).
    pub channels: Vec<String>,
    /// Lower bound on the most recent message. `None` disables the recency window.
    pub since: Option<DateTime<Utc>>,
    /// Restrict to one conversation phone.
    pub phone_key: Option<crate::identity::PhoneKey>,
    /// Keep conversations that currently have an open claim.
    pub include_assigned: bool,
    /// Keep only conversations whose most recent message is inbound.
    pub inbound_only: bool,
}

/// Most recent message of a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastMessage {
    pub text: String,
    pub at: DateTime<Utc>,
    pub direction: Direction,
}

/// One row of a conversation's merged timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEntry {
    pub at: DateTime<Utc>,
    pub direction: Direction,
    pub source: MessageSource,
    pub text: String,
    pub phone_raw: String,
}

/// A message-log row as written by the channel webhook.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMessage {
    pub key: ConversationKey,
    pub phone_raw: String,
    pub direction: Direction,
    pub text: String,
    /// Customer profile name reported by the channel, if any.
    pub display_name: Option<String>,
    pub provider_message_id: Option<String>,
    pub at: DateTime<Utc>,
}

/// A campaign-log row as written by the bulk sender.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCampaignSend {
    pub campaign: String,
    pub work_group: String,
    pub key: ConversationKey,
    pub phone_raw: String,
    pub status: String,
    /// Rendered template body.
    pub text: String,
    pub at: DateTime<Utc>,
}

/// An ad-hoc outbound message (agent reply or virtual agent).
#[derive(Debug, Clone, PartialEq)]
pub struct NewAdhocMessage {
    pub sender_name: String,
    pub key: ConversationKey,
    pub phone_raw: String,
    pub text: String,
    pub status: String,
    pub provider_message_id: Option<String>,
    pub at: DateTime<Utc>,
}

/// A work group and the channels it serves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkGroupSpec {
    pub name: String,
    pub channels: Vec<String>,
    /// Initial capacity limit; 0 means unlimited.
    pub capacity: u32,
}

/// Open claim count for one (agent, work group) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenClaimCount {
    pub agent: AgentCode,
    pub work_group: String,
    pub open: u32,
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use chrono::TimeZone;

    use super::*;

    #[test]
    fn timestamps_sort_lexicographically() {
        let early = Utc.with_ymd_and_hms(2026, 3, 1, 9, 5, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap();
        let (a, b) = (format_timestamp(early), format_timestamp(late));
        assert_eq!(a, "2026-03-01T09:05:00.000Z");
        assert!(a < b);
        assert_eq!(parse_timestamp(&a).unwrap(), early);
    }

    #[test]
    fn offsets_are_folded_to_utc() {
        let at = parse_timestamp("2026-03-01T06:00:00-03:00").unwrap();
        assert_eq!(format_timestamp(at), "2026-03-01T09:00:00.000Z");
    }

    #[test]
    fn close_reasons_parse_from_snake_case() {
        assert_eq!(
            CloseReason::from_str("no_response").unwrap(),
            CloseReason::NoResponse
        );
        assert_eq!(CloseReason::OptOut.to_string(), "opt_out");
        assert!(CloseReason::from_str("bored").is_err());
    }

    #[test]
    fn direction_serializes_as_snake_case() {
        let json = serde_json::to_string(&Direction::Inbound).unwrap();
        assert_eq!(json, "\"inbound\"");
        assert_eq!(Direction::from_str("outbound").unwrap(), Direction::Outbound);
    }

    #[test]
    fn agent_code_is_transparent_on_the_wire() {
        let json = serde_json::to_string(&AgentCode(42)).unwrap();
        assert_eq!(json, "42");
    }
}
