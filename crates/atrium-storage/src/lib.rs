// SPDX-FileCopyrightText: 2026 Atrium Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the Atrium claim engine.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a single-writer
//! connection via `tokio-rusqlite`, and typed query modules for presence,
//! claims, cooldown blocks, capacity limits, and the conversation timeline.
//!
//! Claim exclusion does not depend on the single writer: the schema carries a
//! partial unique index over open assignments, so several processes sharing
//! one database file still never hold two open claims on a conversation.

pub mod adapter;
pub mod database;
pub mod migrations;
pub mod models;
pub mod queries;

pub use adapter::SqliteStore;
pub use database::{Database, OpenOptions};
