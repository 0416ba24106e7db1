// SPDX-FileCopyrightText: 2026 Atrium Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the gateway.

use std::sync::Arc;
use std::time::{Duration, Instant};

use atrium_core::AtriumError;
use atrium_engine::ClaimEngine;
use axum::{
    middleware as axum_middleware,
    routing::{delete, get, post, put},
    Router,
};
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::{auth_middleware, AuthConfig};
use crate::handlers;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub engine: Arc<ClaimEngine>,
    /// Deadline applied to every engine call.
    pub request_timeout: Duration,
    /// Process start time for uptime reporting.
    pub start_time: Instant,
}

impl GatewayState {
    pub fn new(engine: Arc<ClaimEngine>, request_timeout: Duration) -> Self {
        Self {
            engine,
            request_timeout,
            start_time: Instant::now(),
        }
    }
}

/// Gateway server configuration.
///
/// Mirrors `ServerConfig` from `atrium-config` so the gateway does not
/// depend on the config crate.
#[derive(Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    /// Token for agent-facing routes.
    pub api_token: Option<String>,
    /// Token for provisioning and capacity configuration.
    pub admin_token: Option<String>,
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("api_token", &self.api_token.as_ref().map(|_| "[redacted]"))
            .field("admin_token", &self.admin_token.as_ref().map(|_| "[redacted]"))
            .finish()
    }
}

/// Build the full router.
///
/// - `GET /health` (public)
/// - `/queue/*`, `/tickets/*`, `/conversations/*` (API token)
/// - `POST /agents`, `PUT /tickets/capacity-config` (admin token)
pub fn router(config: &GatewayConfig, state: GatewayState) -> Router {
    let api_auth = AuthConfig::new("api", config.api_token.clone());
    let admin_auth = AuthConfig::new("admin", config.admin_token.clone());

    let public_routes = Router::new()
        .route("/health", get(handlers::get_health))
        .with_state(state.clone());

    let api_routes = Router::new()
        .route("/queue/online", post(handlers::post_online))
        .route("/queue/offline", delete(handlers::delete_offline))
        .route("/queue/status", get(handlers::get_queue_status))
        .route("/tickets/claim", post(handlers::post_claim))
        .route("/tickets/release", delete(handlers::delete_release))
        .route("/tickets/close", post(handlers::post_close))
        .route("/tickets/mine", get(handlers::get_mine))
        .route("/tickets/capacity", get(handlers::get_capacity))
        .route("/tickets/candidates", get(handlers::get_candidates))
        .route(
            "/conversations/{phone}/owner",
            get(handlers::get_conversation_owner),
        )
        .route(
            "/conversations/{phone}/timeline",
            get(handlers::get_conversation_timeline),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            api_auth,
            auth_middleware,
        ))
        .with_state(state.clone());

    let admin_routes = Router::new()
        .route("/agents", post(handlers::post_agent))
        .route("/tickets/capacity-config", put(handlers::put_capacity_config))
        .route_layer(axum_middleware::from_fn_with_state(
            admin_auth,
            auth_middleware,
        ))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .merge(admin_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Serve the gateway until `shutdown` is cancelled.
pub async fn start_server(
    config: &GatewayConfig,
    state: GatewayState,
    shutdown: CancellationToken,
) -> Result<(), AtriumError> {
    let app = router(config, state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AtriumError::Internal(format!("failed to bind gateway to {addr}: {e}")))?;

    tracing::info!("gateway listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| AtriumError::Internal(format!("gateway server error: {e}")))?;

    tracing::info!("gateway stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_debug_redacts_tokens() {
        let config = GatewayConfig {
            host: "127.0.0.1".to_string(),
            port: 8480,
            api_token: Some("agent-secret".to_string()),
            admin_token: Some("admin-secret".to_string()),
        };
        let debug = format!("{config:?}");
        assert!(debug.contains("127.0.0.1"));
        assert!(!debug.contains("secret"));
    }
}
