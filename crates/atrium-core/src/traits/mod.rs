// SPDX-FileCopyrightText: 2026 Atrium Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Store trait definitions for the Atrium claim engine.
//!
//! Every backend implements [`PluginAdapter`] plus the narrow store traits
//! below, and uses `#[async_trait]` for dynamic dispatch compatibility.
//! The engine only ever sees `Arc<dyn EngineStore>`, so the storage
//! technology is swappable.

pub mod adapter;
pub mod assignment;
pub mod presence;
pub mod storage;
pub mod timeline;

pub use adapter::PluginAdapter;
pub use assignment::{AssignmentStore, BlockLedger, CapacityStore};
pub use presence::{PresenceStore, WorkGroupDirectory};
pub use storage::StorageAdapter;
pub use timeline::TimelineView;

/// Everything the claim engine needs from a backend.
pub trait EngineStore:
    StorageAdapter
    + PresenceStore
    + WorkGroupDirectory
    + AssignmentStore
    + BlockLedger
    + CapacityStore
    + TimelineView
{
}

impl<T> EngineStore for T where
    T: StorageAdapter
        + PresenceStore
        + WorkGroupDirectory
        + AssignmentStore
        + BlockLedger
        + CapacityStore
        + TimelineView
{
}
