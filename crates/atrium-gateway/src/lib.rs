// SPDX-FileCopyrightText: 2026 Atrium Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP gateway for the Atrium claim engine.
//!
//! Agent-facing routes (`/queue/*`, `/tickets/*`, `/conversations/*`) take the
//! API bearer token; provisioning and capacity configuration take the admin
//! token. `/health` is public.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod server;

pub use auth::AuthConfig;
pub use error::ApiError;
pub use server::{GatewayConfig, GatewayState, router, start_server};
