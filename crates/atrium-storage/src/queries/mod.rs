// SPDX-FileCopyrightText: 2026 Atrium Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules. Each function takes `&Database` and runs one closure
//! on the connection thread.

pub mod agents;
pub mod assignments;
pub mod blocks;
pub mod capacity;
pub mod memberships;
pub mod timeline;
pub mod work_groups;
