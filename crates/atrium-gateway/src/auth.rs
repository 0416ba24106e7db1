// SPDX-FileCopyrightText: 2026 Atrium Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bearer-token middleware for the gateway.
//!
//! Each route group carries its own [`AuthConfig`]. When no token is
//! configured for a group, every request to it is rejected (fail-closed).

use axum::{
    extract::{Request, State},
    http::{StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

use crate::error::ErrorBody;

/// Token accepted by one route group.
#[derive(Clone)]
pub struct AuthConfig {
    /// Expected bearer token. `None` rejects every request.
    pub bearer_token: Option<String>,
    /// Route group name, for logs.
    pub scope: &'static str,
}

impl AuthConfig {
    pub fn new(scope: &'static str, bearer_token: Option<String>) -> Self {
        Self {
            bearer_token,
            scope,
        }
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("scope", &self.scope)
            .field(
                "bearer_token",
                &self.bearer_token.as_ref().map(|_| "[redacted]"),
            )
            .finish()
    }
}

/// Middleware that validates `Authorization: Bearer <token>`.
pub async fn auth_middleware(
    State(auth): State<AuthConfig>,
    request: Request,
    next: Next,
) -> Response {
    let Some(expected) = auth.bearer_token.as_deref() else {
        tracing::error!(scope = auth.scope, "no token configured -- rejecting request");
        return unauthorized();
    };

    let presented = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    if presented == Some(expected) {
        next.run(request).await
    } else {
        tracing::debug!(scope = auth.scope, path = %request.uri().path(), "bearer token rejected");
        unauthorized()
    }
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorBody::plain("unauthorized", "missing or invalid bearer token")),
    )
        .into_response()
}
