// SPDX-FileCopyrightText: 2026 Atrium Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Atrium conversation claim engine.
//!
//! This crate provides the error taxonomy, the conversation identity layer,
//! the domain types, and the store traits shared by the storage backend,
//! the engine, and the HTTP gateway.

pub mod error;
pub mod identity;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::AtriumError;
pub use identity::{ConversationKey, PhoneKey, PhoneNormalizer};
pub use types::{AgentCode, HealthStatus};

// Re-export all store traits at crate root.
pub use traits::{
    AssignmentStore, BlockLedger, CapacityStore, EngineStore, PluginAdapter, PresenceStore,
    StorageAdapter, TimelineView, WorkGroupDirectory,
};
