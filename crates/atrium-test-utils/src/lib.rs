// SPDX-FileCopyrightText: 2026 Atrium Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Atrium integration tests.
//!
//! [`TestHarness`] assembles a claim engine over a temp SQLite database with
//! seeded work groups, agents, and conversation history.

pub mod harness;

pub use harness::{TestHarness, TestHarnessBuilder};
