// SPDX-FileCopyrightText: 2026 Atrium Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mapping of engine errors onto HTTP responses.

use atrium_core::AtriumError;
use atrium_core::types::AgentCode;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// JSON body of every error response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub error: String,
    pub code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub holder: Option<AgentCode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub holder_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<u32>,
    pub retryable: bool,
}

impl ErrorBody {
    pub fn plain(code: &'static str, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code,
            holder: None,
            holder_name: None,
            limit: None,
            current: None,
            retryable: false,
        }
    }
}

/// An [`AtriumError`] on its way out of a handler.
#[derive(Debug)]
pub struct ApiError(pub AtriumError);

impl From<AtriumError> for ApiError {
    fn from(err: AtriumError) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            AtriumError::InvalidReason(_)
            | AtriumError::InvalidCapacity { .. }
            | AtriumError::InvalidPhone(_) => StatusCode::BAD_REQUEST,
            AtriumError::NotOnline { .. }
            | AtriumError::NotInQueue
            | AtriumError::NoneAvailable
            | AtriumError::NotFound
            | AtriumError::UnknownWorkGroup(_)
            | AtriumError::UnknownAgent(_) => StatusCode::NOT_FOUND,
            AtriumError::AlreadyOnline { .. }
            | AtriumError::AlreadyAssigned { .. }
            | AtriumError::CapacityExceeded { .. }
            | AtriumError::AgentOffline { .. }
            | AtriumError::AgentExists(_) => StatusCode::CONFLICT,
            AtriumError::StoreUnavailable { .. } | AtriumError::Timeout { .. } => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            AtriumError::Config(_) | AtriumError::Storage { .. } | AtriumError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn body(&self) -> ErrorBody {
        let err = &self.0;
        let mut body = ErrorBody::plain(err.code(), err.to_string());
        body.retryable = err.is_retryable();
        match err {
            AtriumError::AlreadyAssigned {
                holder,
                holder_name,
            } => {
                body.holder = Some(*holder);
                body.holder_name = holder_name.clone();
            }
            AtriumError::CapacityExceeded { limit, current } => {
                body.limit = Some(*limit);
                body.current = Some(*current);
            }
            AtriumError::Config(_) | AtriumError::Storage { .. } | AtriumError::Internal(_) => {
                body.code = "internal";
                body.error = "internal error".to_string();
            }
            _ => {}
        }
        body
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self.0, "unexpected store fault");
        } else if self.0.is_retryable() {
            tracing::warn!(error = %self.0, "request failed, retryable");
        } else {
            tracing::debug!(code = self.0.code(), "request rejected");
        }
        (status, Json(self.body())).into_response()
    }
}
