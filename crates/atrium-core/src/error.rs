// SPDX-FileCopyrightText: 2026 Atrium Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Atrium claim engine.

use thiserror::Error;

use crate::types::AgentCode;

/// The primary error type used across all Atrium store traits and engine operations.
///
/// Conflicts detected by the store's uniqueness guard never surface as
/// `Storage` errors; they are resolved into one of the structured variants
/// below before reaching the caller.
#[derive(Debug, Error)]
pub enum AtriumError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Unexpected storage backend fault (query failure, corrupt row, migration failure).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The store is temporarily unable to serve the request (busy, locked, closed).
    #[error("store unavailable: {message}")]
    StoreUnavailable { message: String },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// The agent has no queue membership for the work group.
    #[error("agent {agent} is not online in work group `{work_group}`")]
    AgentOffline { agent: AgentCode, work_group: String },

    /// A membership for this exact (agent, work group) pair already exists.
    #[error("agent {agent} is already online in work group `{work_group}`")]
    AlreadyOnline { agent: AgentCode, work_group: String },

    /// No membership exists for this (agent, work group) pair.
    #[error("agent {agent} is not online in work group `{work_group}`")]
    NotOnline { agent: AgentCode, work_group: String },

    /// The referenced agent was never provisioned.
    #[error("unknown agent {0}")]
    UnknownAgent(AgentCode),

    /// An agent with this code is already provisioned.
    #[error("agent {0} already exists")]
    AgentExists(AgentCode),

    /// The conversation already has an open claim held by another agent.
    #[error("conversation is already assigned to agent {holder}")]
    AlreadyAssigned {
        holder: AgentCode,
        holder_name: Option<String>,
    },

    /// The agent holds as many open claims as the work group allows.
    #[error("capacity exceeded: {current} of {limit} open claims")]
    CapacityExceeded { limit: u32, current: u32 },

    /// The target conversation is not an eligible candidate for the work group.
    #[error("conversation is not in the queue")]
    NotInQueue,

    /// An undirected claim found no conversation it could reserve.
    #[error("no conversation available")]
    NoneAvailable,

    /// Release or close of a claim the agent does not hold.
    #[error("no open claim found")]
    NotFound,

    /// Close reason outside the enumerated set.
    #[error("invalid close reason `{0}`")]
    InvalidReason(String),

    /// Capacity limit outside the accepted range.
    #[error("invalid capacity limit {limit}: must be between 0 and {max}")]
    InvalidCapacity { limit: i64, max: u32 },

    /// Phone number with no usable digits.
    #[error("invalid phone number `{0}`")]
    InvalidPhone(String),

    /// The work group is not registered.
    #[error("unknown work group `{0}`")]
    UnknownWorkGroup(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AtriumError {
    /// Stable machine-readable code used in API error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::Storage { .. } => "internal",
            Self::StoreUnavailable { .. } => "store_unavailable",
            Self::Timeout { .. } => "timeout",
            Self::AgentOffline { .. } => "agent_offline",
            Self::AlreadyOnline { .. } => "already_online",
            Self::NotOnline { .. } => "not_online",
            Self::UnknownAgent(_) => "unknown_agent",
            Self::AgentExists(_) => "agent_exists",
            Self::AlreadyAssigned { .. } => "already_assigned",
            Self::CapacityExceeded { .. } => "capacity_exceeded",
            Self::NotInQueue => "not_in_queue",
            Self::NoneAvailable => "none_available",
            Self::NotFound => "not_found",
            Self::InvalidReason(_) => "invalid_reason",
            Self::InvalidCapacity { .. } => "invalid_capacity",
            Self::InvalidPhone(_) => "invalid_phone",
            Self::UnknownWorkGroup(_) => "unknown_work_group",
            Self::Internal(_) => "internal",
        }
    }

    /// Whether the caller may retry the same request later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StoreUnavailable { .. } | Self::Timeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transient_errors_are_retryable() {
        assert!(AtriumError::StoreUnavailable {
            message: "database is locked".into()
        }
        .is_retryable());
        assert!(AtriumError::Timeout {
            duration: std::time::Duration::from_secs(5)
        }
        .is_retryable());
        assert!(!AtriumError::NotInQueue.is_retryable());
        assert!(!AtriumError::AlreadyAssigned {
            holder: AgentCode(7),
            holder_name: None
        }
        .is_retryable());
    }

    #[test]
    fn storage_faults_do_not_leak_detail_through_code() {
        let err = AtriumError::Storage {
            source: Box::new(std::io::Error::other("disk I/O error at page 42")),
        };
        assert_eq!(err.code(), "internal");
        assert!(err.to_string().contains("disk I/O"));
    }

    #[test]
    fn conflict_messages_carry_context() {
        let err = AtriumError::CapacityExceeded {
            limit: 2,
            current: 2,
        };
        assert_eq!(err.to_string(), "capacity exceeded: 2 of 2 open claims");
        assert_eq!(err.code(), "capacity_exceeded");

        let err = AtriumError::AlreadyAssigned {
            holder: AgentCode(12),
            holder_name: Some("Ana".into()),
        };
        assert_eq!(err.to_string(), "conversation is already assigned to agent 12");
    }
}
