// SPDX-FileCopyrightText: 2026 Atrium Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the gateway REST API.

use std::collections::BTreeMap;
use std::future::Future;

use atrium_core::types::{
    ActiveAssignment, Agent, AgentCode, Candidate, HealthStatus, QueueMembership, TimelineEntry,
};
use atrium_core::{AtriumError, PluginAdapter};
use atrium_engine::{ClaimRequest, ClaimSummary, ClosedClaim};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::server::GatewayState;

const DEFAULT_TIMELINE_LIMIT: u32 = 200;
const MAX_TIMELINE_LIMIT: u32 = 1000;

type ApiResult<T> = Result<T, ApiError>;

/// Run an engine call under the request deadline.
async fn within<T>(
    state: &GatewayState,
    call: impl Future<Output = Result<T, AtriumError>>,
) -> ApiResult<T> {
    match tokio::time::timeout(state.request_timeout, call).await {
        Ok(result) => result.map_err(ApiError::from),
        Err(_) => Err(ApiError(AtriumError::Timeout {
            duration: state.request_timeout,
        })),
    }
}

/// Body of `POST /queue/online` and `DELETE /queue/offline`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceRequest {
    pub agent: AgentCode,
    pub work_group: String,
}

/// Body of `DELETE /tickets/release`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseRequest {
    pub agent: AgentCode,
    pub phone: String,
    pub channel: String,
}

/// Body of `POST /tickets/close`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseRequest {
    pub agent: AgentCode,
    pub phone: String,
    pub channel: String,
    pub reason: String,
}

/// Body of `PUT /tickets/capacity-config`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapacityConfigRequest {
    pub work_group: String,
    pub limit: i64,
}

/// Body of `POST /agents`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAgentRequest {
    pub code: AgentCode,
    pub display_name: String,
    pub home_work_group: String,
    #[serde(default = "default_source")]
    pub source: String,
}

fn default_source() -> String {
    "admin".to_string()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkGroupQuery {
    #[serde(default)]
    pub work_group: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MineQuery {
    pub agent: AgentCode,
    #[serde(default)]
    pub work_group: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ConversationQuery {
    pub channel: String,
    #[serde(default)]
    pub limit: Option<u32>,
}

/// Response body for `GET /health`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub version: &'static str,
    pub uptime_secs: u64,
}

/// Response body for `GET /tickets/capacity`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CapacityResponse {
    pub work_group: String,
    /// 0 means unlimited.
    pub limit: u32,
    /// Open claims per agent code.
    pub agents: BTreeMap<AgentCode, u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CapacityConfigResponse {
    pub work_group: String,
    pub limit: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerResponse {
    pub phone: String,
    pub channel: String,
    pub has_human_owner: bool,
}

/// GET /health
///
/// Reports storage health. Degraded still answers 200; unhealthy answers 503.
pub async fn get_health(State(state): State<GatewayState>) -> (StatusCode, Json<HealthResponse>) {
    let (code, status, detail) =
        match within(&state, state.engine.store().health_check()).await {
            Ok(HealthStatus::Healthy) => (StatusCode::OK, "ok", None),
            Ok(HealthStatus::Degraded(why)) => (StatusCode::OK, "degraded", Some(why)),
            Ok(HealthStatus::Unhealthy(why)) => {
                (StatusCode::SERVICE_UNAVAILABLE, "unhealthy", Some(why))
            }
            Err(ApiError(e)) => (StatusCode::SERVICE_UNAVAILABLE, "unhealthy", Some(e.to_string())),
        };
    (
        code,
        Json(HealthResponse {
            status,
            detail,
            version: env!("CARGO_PKG_VERSION"),
            uptime_secs: state.start_time.elapsed().as_secs(),
        }),
    )
}

/// POST /queue/online
pub async fn post_online(
    State(state): State<GatewayState>,
    Json(body): Json<PresenceRequest>,
) -> ApiResult<(StatusCode, Json<QueueMembership>)> {
    let membership = within(&state, state.engine.go_online(body.agent, &body.work_group)).await?;
    Ok((StatusCode::CREATED, Json(membership)))
}

/// DELETE /queue/offline
pub async fn delete_offline(
    State(state): State<GatewayState>,
    Json(body): Json<PresenceRequest>,
) -> ApiResult<StatusCode> {
    within(&state, state.engine.go_offline(body.agent, &body.work_group)).await?;
    Ok(StatusCode::OK)
}

/// GET /queue/status?workGroup=
pub async fn get_queue_status(
    State(state): State<GatewayState>,
    Query(query): Query<WorkGroupQuery>,
) -> ApiResult<Json<Vec<QueueMembership>>> {
    let online = within(&state, state.engine.list_online(query.work_group.as_deref())).await?;
    Ok(Json(online))
}

/// POST /tickets/claim
pub async fn post_claim(
    State(state): State<GatewayState>,
    Json(body): Json<ClaimRequest>,
) -> ApiResult<Json<ClaimSummary>> {
    // Not `within`: a claim that outlives the deadline must be undone, not dropped.
    let summary = state.engine.claim_within(body, state.request_timeout).await?;
    Ok(Json(summary))
}

/// DELETE /tickets/release
pub async fn delete_release(
    State(state): State<GatewayState>,
    Json(body): Json<ReleaseRequest>,
) -> ApiResult<Json<ActiveAssignment>> {
    let ended = within(
        &state,
        state.engine.release(body.agent, &body.phone, &body.channel),
    )
    .await?;
    Ok(Json(ended))
}

/// POST /tickets/close
pub async fn post_close(
    State(state): State<GatewayState>,
    Json(body): Json<CloseRequest>,
) -> ApiResult<Json<ClosedClaim>> {
    let closed = within(
        &state,
        state
            .engine
            .close(body.agent, &body.phone, &body.channel, &body.reason),
    )
    .await?;
    Ok(Json(closed))
}

/// GET /tickets/mine?agent=&workGroup=
pub async fn get_mine(
    State(state): State<GatewayState>,
    Query(query): Query<MineQuery>,
) -> ApiResult<Json<Vec<ActiveAssignment>>> {
    let open = within(
        &state,
        state
            .engine
            .open_claims(query.agent, query.work_group.as_deref()),
    )
    .await?;
    Ok(Json(open))
}

/// GET /tickets/capacity?workGroup=
pub async fn get_capacity(
    State(state): State<GatewayState>,
    Query(query): Query<WorkGroupQuery>,
) -> ApiResult<Json<CapacityResponse>> {
    let work_group = required_work_group(query)?;
    let limit = within(&state, state.engine.capacity_limit(&work_group)).await?;
    let counts = within(&state, state.engine.capacity_overview(Some(&work_group))).await?;

    let agents = counts.into_iter().map(|c| (c.agent, c.open)).collect();
    Ok(Json(CapacityResponse {
        work_group,
        limit,
        agents,
    }))
}

/// GET /tickets/candidates?workGroup=
pub async fn get_candidates(
    State(state): State<GatewayState>,
    Query(query): Query<WorkGroupQuery>,
) -> ApiResult<Json<Vec<Candidate>>> {
    let work_group = required_work_group(query)?;
    let candidates = within(&state, state.engine.candidates(&work_group)).await?;
    Ok(Json(candidates))
}

/// GET /conversations/{phone}/owner?channel=
pub async fn get_conversation_owner(
    State(state): State<GatewayState>,
    Path(phone): Path<String>,
    Query(query): Query<ConversationQuery>,
) -> ApiResult<Json<OwnerResponse>> {
    let owned = within(&state, state.engine.has_human_owner(&phone, &query.channel)).await?;
    Ok(Json(OwnerResponse {
        phone,
        channel: query.channel,
        has_human_owner: owned,
    }))
}

/// GET /conversations/{phone}/timeline?channel=&limit=
pub async fn get_conversation_timeline(
    State(state): State<GatewayState>,
    Path(phone): Path<String>,
    Query(query): Query<ConversationQuery>,
) -> ApiResult<Json<Vec<TimelineEntry>>> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_TIMELINE_LIMIT)
        .min(MAX_TIMELINE_LIMIT);
    let entries = within(
        &state,
        state.engine.timeline(&phone, &query.channel, limit),
    )
    .await?;
    Ok(Json(entries))
}

/// POST /agents (admin)
pub async fn post_agent(
    State(state): State<GatewayState>,
    Json(body): Json<CreateAgentRequest>,
) -> ApiResult<(StatusCode, Json<Agent>)> {
    let agent = within(
        &state,
        state.engine.create_agent(
            body.code,
            &body.display_name,
            &body.home_work_group,
            &body.source,
        ),
    )
    .await?;
    Ok((StatusCode::CREATED, Json(agent)))
}

/// PUT /tickets/capacity-config (admin)
pub async fn put_capacity_config(
    State(state): State<GatewayState>,
    Json(body): Json<CapacityConfigRequest>,
) -> ApiResult<Json<CapacityConfigResponse>> {
    within(&state, state.engine.set_capacity(&body.work_group, body.limit)).await?;
    let limit = within(&state, state.engine.capacity_limit(&body.work_group)).await?;
    Ok(Json(CapacityConfigResponse {
        work_group: body.work_group,
        limit,
    }))
}

fn required_work_group(query: WorkGroupQuery) -> ApiResult<String> {
    query
        .work_group
        .filter(|wg| !wg.trim().is_empty())
        .ok_or_else(|| ApiError(AtriumError::UnknownWorkGroup(String::new())))
}
